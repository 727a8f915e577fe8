//! The chain client collaborator: read-only calls and state-mutating transactions.

use crate::revert::Revert;
use alloy_primitives::{Address, Selector, TxHash};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by [`ChainClient`] methods.
pub type ClientFuture<T> = Pin<Box<dyn Future<Output = Result<T, ClientError>> + Send>>;

/// A call against one contract: target address plus encoded calldata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallRequest {
    pub from: Option<Address>,
    pub to: Address,
    pub data: Vec<u8>,
}

/// Account context for state-mutating calls. Passed through to the client untouched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxContext {
    pub from: Address,
    #[serde(default)]
    pub gas_limit: Option<u64>,
}

impl TxContext {
    pub fn new(from: Address) -> Self {
        Self {
            from,
            gas_limit: None,
        }
    }
}

/// Failure reported by a chain client.
///
/// Clients must keep the three classes apart: the contract does not know the
/// selector, the contract knows it but reverted, or the node could not be reached.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("function selector {0} not recognized by contract")]
    UnknownSelector(Selector),

    #[error("{0}")]
    Reverted(Revert),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("malformed return data: {0}")]
    Decode(String),
}

impl ClientError {
    /// Transport and timeout failures say nothing about the contract itself.
    pub fn is_connection(&self) -> bool {
        matches!(self, ClientError::Transport(_) | ClientError::Timeout)
    }

    pub fn revert(&self) -> Option<&Revert> {
        match self {
            ClientError::Reverted(revert) => Some(revert),
            _ => None,
        }
    }
}

/// Abstraction over the node connection.
pub trait ChainClient: Send + Sync + 'static {
    /// Execute `request` without committing any state change.
    fn call(&self, request: CallRequest) -> ClientFuture<Vec<u8>>;

    /// Submit `request` as a transaction from `ctx.from`.
    fn send_transaction(&self, request: CallRequest, ctx: TxContext) -> ClientFuture<TxHash>;
}
