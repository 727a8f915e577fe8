//! Signature verification: trial-call each requested capability without mutating state.

use crate::capability::{Capability, CapabilitySet};
use crate::client::{CallRequest, ChainClient, ClientError};
use crate::error::{ConnectionError, Result, SignatureMismatchError};
use alloy_primitives::Address;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of checking a capability set against one contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationResult {
    supported: CapabilitySet,
    /// Sorted by canonical signature.
    missing: Vec<Capability>,
}

impl VerificationResult {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn supported(&self) -> &CapabilitySet {
        &self.supported
    }

    pub fn missing(&self) -> &[Capability] {
        &self.missing
    }

    pub fn missing_signatures(&self) -> Vec<String> {
        self.missing
            .iter()
            .map(|c| c.signature().to_string())
            .collect()
    }

    /// Succeed with the supported set, or fail listing every missing signature.
    pub fn into_verified(self, address: Address) -> Result<CapabilitySet> {
        if self.is_complete() {
            return Ok(self.supported);
        }
        Err(SignatureMismatchError {
            address,
            missing: self.missing_signatures(),
        }
        .into())
    }
}

enum Trial {
    Present,
    Absent,
}

fn classify(outcome: std::result::Result<Vec<u8>, ClientError>) -> std::result::Result<Trial, ClientError> {
    match outcome {
        Ok(_) => Ok(Trial::Present),
        // presence of the function is what matters, not what it decided to do
        Err(ClientError::Reverted(_)) | Err(ClientError::Decode(_)) => Ok(Trial::Present),
        Err(ClientError::UnknownSelector(_)) => Ok(Trial::Absent),
        Err(e) => Err(e),
    }
}

/// Checks which capabilities a deployed contract actually answers.
///
/// Every capability is trial-called through [`ChainClient::call`] with zero-valued
/// arguments. Trials run concurrently; results are aggregated in signature order,
/// so the outcome never depends on completion order. No retries are performed.
#[derive(Clone)]
pub struct Verifier {
    client: Arc<dyn ChainClient>,
}

impl Verifier {
    pub fn new(client: Arc<dyn ChainClient>) -> Self {
        Self { client }
    }

    pub async fn verify(
        &self,
        address: Address,
        from: Option<Address>,
        requested: &CapabilitySet,
    ) -> Result<VerificationResult> {
        let ordered = requested.sorted();
        let trials = ordered.iter().map(|cap| {
            debug!(%address, signature = cap.signature(), "trial call");
            self.client.call(CallRequest {
                from,
                to: address,
                data: cap.trial_calldata(),
            })
        });
        let outcomes = join_all(trials).await;

        let mut supported = CapabilitySet::new();
        let mut missing = Vec::new();
        for (cap, outcome) in ordered.into_iter().zip(outcomes) {
            match classify(outcome) {
                Ok(Trial::Present) => supported.insert(cap.clone()),
                Ok(Trial::Absent) => missing.push(cap.clone()),
                Err(source) => {
                    warn!(%address, signature = cap.signature(), error = %source, "verification aborted");
                    return Err(ConnectionError {
                        context: format!("verification of {}", cap.signature()),
                        address,
                        source,
                    }
                    .into());
                }
            }
        }

        if !missing.is_empty() {
            warn!(%address, missing = missing.len(), "contract lacks requested capabilities");
        }
        Ok(VerificationResult { supported, missing })
    }

    /// Verify and require the whole set to be present.
    pub async fn require(
        &self,
        address: Address,
        from: Option<Address>,
        requested: &CapabilitySet,
    ) -> Result<CapabilitySet> {
        self.verify(address, from, requested)
            .await?
            .into_verified(address)
    }
}
