//! Capabilities: one verifiable contract function each, identified by its canonical signature.

use alloy_dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::{keccak256, Address, Selector, B256, I256, U256};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Whether invoking a capability can change chain state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallKind {
    Read,
    Write,
}

/// Derive the 4-byte selector of a canonical signature.
pub fn selector_of(signature: &str) -> Selector {
    Selector::from_slice(&keccak256(signature.as_bytes())[..4])
}

/// A single contract function the caller wants to rely on.
///
/// Equality, ordering and hashing only look at the canonical signature, so two
/// independently constructed capabilities with the same signature are interchangeable.
#[derive(Clone)]
pub struct Capability {
    signature: String,
    selector: Selector,
    kind: CallKind,
    label: String,
}

impl Capability {
    /// Build a capability. Whitespace is stripped from `signature` before the selector is derived.
    pub fn new(signature: &str, kind: CallKind, label: impl Into<String>) -> Self {
        let signature: String = signature.chars().filter(|c| !c.is_whitespace()).collect();
        let selector = selector_of(&signature);
        Self {
            signature,
            selector,
            kind,
            label: label.into(),
        }
    }

    pub fn read(signature: &str, label: impl Into<String>) -> Self {
        Self::new(signature, CallKind::Read, label)
    }

    pub fn write(signature: &str, label: impl Into<String>) -> Self {
        Self::new(signature, CallKind::Write, label)
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn selector(&self) -> Selector {
        self.selector
    }

    pub fn kind(&self) -> CallKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Function name without the parameter list.
    pub fn name(&self) -> &str {
        self.signature
            .split_once('(')
            .map_or(self.signature.as_str(), |(name, _)| name)
    }

    /// Top-level parameter types, in declaration order.
    pub fn params(&self) -> Vec<&str> {
        let inner = self
            .signature
            .find('(')
            .and_then(|start| {
                self.signature
                    .rfind(')')
                    .map(|end| &self.signature[start + 1..end])
            })
            .unwrap_or("");
        split_top_level(inner)
    }

    /// Selector followed by already-encoded arguments.
    pub fn calldata(&self, args: &[u8]) -> Vec<u8> {
        let mut data = Vec::with_capacity(4 + args.len());
        data.extend_from_slice(self.selector.as_slice());
        data.extend_from_slice(args);
        data
    }

    /// Calldata with every parameter set to its zero value, used for trial invocations.
    ///
    /// A parameter list the ABI parser rejects yields the bare selector; the
    /// dispatcher still sees the selector and answers for it.
    pub fn trial_calldata(&self) -> Vec<u8> {
        let list = &self.signature[self.name().len()..];
        if self.params().is_empty() {
            return self.calldata(&[]);
        }
        match DynSolType::parse(list) {
            Ok(ty) => self.calldata(&zero_value(&ty).abi_encode_params()),
            Err(_) => self.calldata(&[]),
        }
    }
}

fn zero_value(ty: &DynSolType) -> DynSolValue {
    match ty {
        DynSolType::Bool => DynSolValue::Bool(false),
        DynSolType::Int(bits) => DynSolValue::Int(I256::ZERO, *bits),
        DynSolType::Uint(bits) => DynSolValue::Uint(U256::ZERO, *bits),
        DynSolType::FixedBytes(size) => DynSolValue::FixedBytes(B256::ZERO, *size),
        DynSolType::Address => DynSolValue::Address(Address::ZERO),
        DynSolType::Bytes => DynSolValue::Bytes(Vec::new()),
        DynSolType::String => DynSolValue::String(String::new()),
        DynSolType::Array(_) => DynSolValue::Array(Vec::new()),
        DynSolType::FixedArray(inner, len) => DynSolValue::FixedArray(vec![zero_value(inner); *len]),
        DynSolType::Tuple(inner) => DynSolValue::Tuple(inner.iter().map(zero_value).collect()),
        // function pointers
        _ => DynSolValue::Uint(U256::ZERO, 256),
    }
}

fn split_top_level(list: &str) -> Vec<&str> {
    if list.is_empty() {
        return Vec::new();
    }
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in list.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&list[start..]);
    parts
}

impl PartialEq for Capability {
    fn eq(&self, other: &Self) -> bool {
        self.signature == other.signature
    }
}

impl Eq for Capability {}

impl Hash for Capability {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.signature.hash(state);
    }
}

impl PartialOrd for Capability {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Capability {
    fn cmp(&self, other: &Self) -> Ordering {
        self.signature.cmp(&other.signature)
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Capability({} {})", self.signature, self.selector)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature)
    }
}

/// A set of capabilities, deduplicated by selector.
///
/// If two different signatures ever share a selector, the lexicographically smaller
/// signature is kept regardless of insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    by_selector: BTreeMap<Selector, Capability>,
}

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, capability: Capability) {
        match self.by_selector.get(&capability.selector) {
            Some(existing) if existing.signature <= capability.signature => {}
            _ => {
                self.by_selector.insert(capability.selector, capability);
            }
        }
    }

    pub fn contains(&self, capability: &Capability) -> bool {
        self.by_selector
            .get(&capability.selector)
            .is_some_and(|c| c.signature == capability.signature)
    }

    pub fn len(&self) -> usize {
        self.by_selector.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_selector.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.by_selector.values()
    }

    /// Members ordered by canonical signature.
    pub fn sorted(&self) -> Vec<&Capability> {
        let mut caps: Vec<&Capability> = self.by_selector.values().collect();
        caps.sort();
        caps
    }

    /// Canonical signatures, sorted.
    pub fn signatures(&self) -> Vec<String> {
        self.sorted()
            .into_iter()
            .map(|c| c.signature.clone())
            .collect()
    }

    pub fn union(&self, other: &CapabilitySet) -> CapabilitySet {
        let mut merged = self.clone();
        merged.extend(other.iter().cloned());
        merged
    }

    /// Members of `self` that are not in `other`.
    pub fn difference(&self, other: &CapabilitySet) -> CapabilitySet {
        self.iter().filter(|c| !other.contains(c)).cloned().collect()
    }

    pub fn is_subset(&self, other: &CapabilitySet) -> bool {
        self.iter().all(|c| other.contains(c))
    }
}

impl Extend<Capability> for CapabilitySet {
    fn extend<I: IntoIterator<Item = Capability>>(&mut self, iter: I) {
        for capability in iter {
            self.insert(capability);
        }
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        let mut set = CapabilitySet::new();
        set.extend(iter);
        set
    }
}

impl<'a> FromIterator<&'a Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = &'a Capability>>(iter: I) -> Self {
        iter.into_iter().cloned().collect()
    }
}
