//! Verified sessions and the factory that builds them.

use crate::capability::{Capability, CapabilitySet};
use crate::client::{CallRequest, ChainClient, TxContext};
use crate::error::{wrap_call_error, ConnectionError, Error, Result};
use crate::registry::Registry;
use alloy_primitives::{Address, TxHash};
use crate::verifier::Verifier;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Builds [`Session`]s for one chain client and sending account.
#[derive(Clone)]
pub struct SessionFactory {
    client: Arc<dyn ChainClient>,
    registry: Arc<Registry>,
    ctx: TxContext,
    probe: Option<Capability>,
}

impl SessionFactory {
    pub fn new(client: Arc<dyn ChainClient>, registry: Arc<Registry>, ctx: TxContext) -> Self {
        Self {
            client,
            registry,
            ctx,
            probe: None,
        }
    }

    /// Use `capability` for the liveness probe instead of a bare call with empty calldata.
    pub fn with_probe(mut self, capability: Capability) -> Self {
        self.probe = Some(capability);
        self
    }

    pub fn client(&self) -> &Arc<dyn ChainClient> {
        &self.client
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn context(&self) -> &TxContext {
        &self.ctx
    }

    /// Verify `requested` against `address` and bind a session to it.
    ///
    /// Fails with [`Error::SignatureMismatch`] listing every missing signature, or
    /// [`Error::Connection`] when the client cannot reach the node. No partially
    /// verified session is ever returned.
    pub async fn open(&self, address: Address, requested: CapabilitySet) -> Result<Session> {
        debug!(%address, requested = requested.len(), "opening session");
        let verifier = Verifier::new(self.client.clone());
        let capabilities = verifier
            .require(address, Some(self.ctx.from), &requested)
            .await?;

        self.probe(address).await?;

        info!(%address, capabilities = capabilities.len(), "session verified");
        Ok(Session {
            address,
            capabilities,
            client: self.client.clone(),
            registry: self.registry.clone(),
            ctx: self.ctx.clone(),
        })
    }

    /// Open a session over every capability of a registered standard.
    pub async fn open_standard(&self, address: Address, standard: &str) -> Result<Session> {
        let requested = self
            .registry
            .standard(standard)
            .cloned()
            .ok_or_else(|| Error::UnknownStandard(standard.to_string()))?;
        self.open(address, requested).await
    }

    /// One harmless read to prove the client plumbing works. Only transport-class
    /// failures count; whatever the contract itself answers is irrelevant here.
    async fn probe(&self, address: Address) -> Result<()> {
        let data = self
            .probe
            .as_ref()
            .map_or_else(Vec::new, Capability::trial_calldata);
        let outcome = self
            .client
            .call(CallRequest {
                from: Some(self.ctx.from),
                to: address,
                data,
            })
            .await;
        match outcome {
            Err(source) if source.is_connection() => {
                warn!(%address, error = %source, "liveness probe failed");
                Err(ConnectionError {
                    context: "liveness probe".to_string(),
                    address,
                    source,
                }
                .into())
            }
            _ => Ok(()),
        }
    }
}

/// An immutable binding of one contract address to a verified capability set.
pub struct Session {
    address: Address,
    capabilities: CapabilitySet,
    client: Arc<dyn ChainClient>,
    registry: Arc<Registry>,
    ctx: TxContext,
}

impl Session {
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    pub fn context(&self) -> &TxContext {
        &self.ctx
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub(crate) fn client(&self) -> &Arc<dyn ChainClient> {
        &self.client
    }

    /// Read-only invocation of a verified capability; returns raw return data.
    pub async fn call(&self, capability: &Capability, args: &[u8]) -> Result<Vec<u8>> {
        self.invoke_call(&self.capabilities, capability, args).await
    }

    /// State-mutating invocation of a verified capability.
    pub async fn send(&self, capability: &Capability, args: &[u8]) -> Result<TxHash> {
        self.invoke_send(&self.capabilities, capability, args).await
    }

    fn ensure(&self, verified: &CapabilitySet, capability: &Capability) -> Result<()> {
        if verified.contains(capability) {
            return Ok(());
        }
        Err(Error::Unverified {
            capability: capability.signature().to_string(),
            address: self.address,
        })
    }

    pub(crate) async fn invoke_call(
        &self,
        verified: &CapabilitySet,
        capability: &Capability,
        args: &[u8],
    ) -> Result<Vec<u8>> {
        self.ensure(verified, capability)?;
        debug!(address = %self.address, capability = capability.label(), "call");
        let request = CallRequest {
            from: Some(self.ctx.from),
            to: self.address,
            data: capability.calldata(args),
        };
        self.client
            .call(request)
            .await
            .map_err(|cause| self.wrap(capability, cause))
    }

    pub(crate) async fn invoke_send(
        &self,
        verified: &CapabilitySet,
        capability: &Capability,
        args: &[u8],
    ) -> Result<TxHash> {
        self.ensure(verified, capability)?;
        debug!(address = %self.address, capability = capability.label(), "send");
        let request = CallRequest {
            from: Some(self.ctx.from),
            to: self.address,
            data: capability.calldata(args),
        };
        self.client
            .send_transaction(request, self.ctx.clone())
            .await
            .map_err(|cause| self.wrap(capability, cause))
    }

    fn wrap(&self, capability: &Capability, cause: crate::client::ClientError) -> Error {
        let cause = self.registry.annotate(cause);
        wrap_call_error(capability.signature(), self.address, cause)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("address", &self.address)
            .field("capabilities", &self.capabilities.signatures())
            .field("from", &self.ctx.from)
            .finish()
    }
}
