//! Catalogue of known standards, extensions and custom revert errors.
//!
//! A [`Registry`] is assembled once through [`RegistryBuilder`] and never
//! mutated afterwards; sessions share it behind an `Arc`.

use crate::capability::{selector_of, CapabilitySet};
use crate::client::ClientError;
use alloy_primitives::Selector;
use std::collections::{BTreeMap, BTreeSet};

/// A named, optional capability bundle layered on top of a base session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Extension {
    name: String,
    capabilities: CapabilitySet,
    incompatible: BTreeSet<String>,
}

impl Extension {
    pub fn new(name: impl Into<String>, capabilities: CapabilitySet) -> Self {
        Self {
            name: name.into(),
            capabilities,
            incompatible: BTreeSet::new(),
        }
    }

    /// Declare that this extension cannot be composed together with `other`.
    pub fn incompatible_with(mut self, other: impl Into<String>) -> Self {
        self.incompatible.insert(other.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    /// True if either side declares the other incompatible.
    pub fn conflicts_with(&self, other: &Extension) -> bool {
        self.incompatible.contains(&other.name) || other.incompatible.contains(&self.name)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Registry {
    standards: BTreeMap<String, CapabilitySet>,
    extensions: BTreeMap<String, Extension>,
    errors: BTreeMap<Selector, String>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn standard(&self, name: &str) -> Option<&CapabilitySet> {
        self.standards.get(name)
    }

    pub fn extension(&self, name: &str) -> Option<&Extension> {
        self.extensions.get(name)
    }

    pub fn extensions(&self) -> impl Iterator<Item = &Extension> {
        self.extensions.values()
    }

    pub fn error_signature(&self, selector: Selector) -> Option<&str> {
        self.errors.get(&selector).map(String::as_str)
    }

    /// Name a custom revert error when the payload matches a registered signature.
    pub fn annotate(&self, cause: ClientError) -> ClientError {
        match cause {
            ClientError::Reverted(revert) if revert.reason().is_none() => {
                let known = revert
                    .error_selector()
                    .and_then(|s| self.error_signature(s))
                    .map(str::to_string);
                match known {
                    Some(signature) => ClientError::Reverted(revert.with_reason(signature)),
                    None => ClientError::Reverted(revert),
                }
            }
            other => other,
        }
    }
}

#[derive(Default)]
pub struct RegistryBuilder {
    inner: Registry,
}

impl RegistryBuilder {
    pub fn standard(mut self, name: impl Into<String>, capabilities: CapabilitySet) -> Self {
        self.inner.standards.insert(name.into(), capabilities);
        self
    }

    pub fn extension(mut self, extension: Extension) -> Self {
        self.inner
            .extensions
            .insert(extension.name.clone(), extension);
        self
    }

    /// Register a custom error signature such as `ERC20InsufficientBalance(address,uint256,uint256)`.
    pub fn error(mut self, signature: &str) -> Self {
        let signature: String = signature.chars().filter(|c| !c.is_whitespace()).collect();
        self.inner.errors.insert(selector_of(&signature), signature);
        self
    }

    pub fn build(self) -> Registry {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Capability;
    use crate::revert::Revert;

    fn set(sigs: &[&str]) -> CapabilitySet {
        sigs.iter().map(|s| Capability::read(s, *s)).collect()
    }

    #[test]
    fn independently_built_registries_agree() {
        let build = || {
            Registry::builder()
                .standard("base", set(&["name()", "balanceOf(address)"]))
                .extension(Extension::new("ext", set(&["extra(uint256)"])))
                .build()
        };
        let (a, b) = (build(), build());
        assert_eq!(a.standard("base"), b.standard("base"));
        assert_eq!(a.extension("ext"), b.extension("ext"));
        assert!(a.extension("missing").is_none());
    }

    #[test]
    fn conflicts_are_symmetric() {
        let a = Extension::new("a", set(&["a()"])).incompatible_with("b");
        let b = Extension::new("b", set(&["b()"]));
        let c = Extension::new("c", set(&["c()"]));
        assert!(a.conflicts_with(&b));
        assert!(b.conflicts_with(&a));
        assert!(!a.conflicts_with(&c));
    }

    #[test]
    fn annotate_names_registered_custom_errors() {
        let registry = Registry::builder()
            .error("ERC20InsufficientBalance(address, uint256, uint256)")
            .build();
        let selector = selector_of("ERC20InsufficientBalance(address,uint256,uint256)");
        let mut data = selector.0.to_vec();
        data.extend_from_slice(&[0u8; 96]);

        let cause = registry.annotate(ClientError::Reverted(Revert::new(data)));
        assert_eq!(
            cause.revert().and_then(Revert::reason),
            Some("ERC20InsufficientBalance(address,uint256,uint256)")
        );

        let unknown = registry.annotate(ClientError::Reverted(Revert::new(vec![1, 2, 3, 4])));
        assert!(unknown.revert().unwrap().reason().is_none());
        assert_eq!(registry.annotate(ClientError::Timeout), ClientError::Timeout);
    }
}
