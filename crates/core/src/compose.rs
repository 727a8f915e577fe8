//! Extension composition: layer named capability bundles over a verified session.

use crate::capability::{Capability, CapabilitySet};
use crate::client::TxContext;
use crate::error::{Error, ExtensionConflictError, Result};
use crate::registry::Extension;
use crate::session::Session;
use alloy_primitives::{Address, TxHash};
use crate::verifier::Verifier;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// A base session plus the extensions verified on top of it.
///
/// Holds a reference to the base session rather than a copy; the borrow checker
/// keeps the base alive for as long as any composed session built from it.
#[derive(Debug)]
pub struct ComposedSession<'a> {
    base: &'a Session,
    extensions: Vec<String>,
    capabilities: CapabilitySet,
}

impl Session {
    /// Verify the named extensions against this session's contract and merge them in.
    ///
    /// Conflicts are reported before any network call. Missing capabilities are
    /// collected across every requested extension and reported together, so the
    /// result never depends on the order of `names`.
    pub async fn compose<S: AsRef<str>>(&self, names: &[S]) -> Result<ComposedSession<'_>> {
        let mut requested: BTreeMap<&str, &Extension> = BTreeMap::new();
        for name in names {
            let name = name.as_ref();
            let extension = self
                .registry()
                .extension(name)
                .ok_or_else(|| Error::UnknownExtension(name.to_string()))?;
            requested.insert(extension.name(), extension);
        }

        check_conflicts(&requested)?;

        let wanted: CapabilitySet = requested
            .values()
            .flat_map(|e| e.capabilities().iter())
            .collect();
        let pending = wanted.difference(self.capabilities());
        debug!(
            address = %self.address(),
            extensions = ?requested.keys().collect::<Vec<_>>(),
            pending = pending.len(),
            "composing session"
        );

        let verifier = Verifier::new(self.client().clone());
        verifier
            .require(self.address(), Some(self.context().from), &pending)
            .await?;

        let extensions: Vec<String> = requested.keys().map(|n| n.to_string()).collect();
        info!(address = %self.address(), extensions = ?extensions, "extensions verified");
        Ok(ComposedSession {
            base: self,
            extensions,
            capabilities: self.capabilities().union(&wanted),
        })
    }
}

fn check_conflicts(requested: &BTreeMap<&str, &Extension>) -> Result<()> {
    let extensions: Vec<&Extension> = requested.values().copied().collect();
    for (i, a) in extensions.iter().enumerate() {
        for b in &extensions[i + 1..] {
            if a.conflicts_with(b) {
                return Err(ExtensionConflictError {
                    first: a.name().to_string(),
                    second: b.name().to_string(),
                }
                .into());
            }
        }
    }
    Ok(())
}

impl<'a> ComposedSession<'a> {
    pub fn base(&self) -> &'a Session {
        self.base
    }

    pub fn address(&self) -> Address {
        self.base.address()
    }

    pub fn context(&self) -> &TxContext {
        self.base.context()
    }

    /// Names of the composed extensions, sorted.
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn has_extension(&self, name: &str) -> bool {
        self.extensions.iter().any(|e| e == name)
    }

    /// Union of the base set and every composed extension's set.
    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    pub async fn call(&self, capability: &Capability, args: &[u8]) -> Result<Vec<u8>> {
        self.base
            .invoke_call(&self.capabilities, capability, args)
            .await
    }

    pub async fn send(&self, capability: &Capability, args: &[u8]) -> Result<TxHash> {
        self.base
            .invoke_send(&self.capabilities, capability, args)
            .await
    }
}
