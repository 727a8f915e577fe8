//! Error taxonomy shared by verification, composition and capability calls.

use crate::client::ClientError;
use alloy_primitives::Address;
use thiserror::Error;

/// The node could not be reached, or the request was cancelled or timed out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("connection error during {context} on {address}: {source}")]
pub struct ConnectionError {
    pub context: String,
    pub address: Address,
    #[source]
    pub source: ClientError,
}

/// The contract does not answer every requested signature.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("signatureMismatch on {address}: not supported functions: {}", .missing.join(", "))]
pub struct SignatureMismatchError {
    pub address: Address,
    /// Canonical signatures, sorted.
    pub missing: Vec<String>,
}

/// Two requested extensions declare each other incompatible.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("extensionConflict: {first} is incompatible with {second}")]
pub struct ExtensionConflictError {
    pub first: String,
    pub second: String,
}

/// A verified capability failed when invoked. The session stays usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("call error on {capability} at {address}: {cause}")]
pub struct CallError {
    pub capability: String,
    pub address: Address,
    #[source]
    pub cause: ClientError,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    SignatureMismatch(#[from] SignatureMismatchError),

    #[error(transparent)]
    ExtensionConflict(#[from] ExtensionConflictError),

    #[error(transparent)]
    Call(#[from] CallError),

    /// A capability outside the verified set was invoked. This is a bug in the caller.
    #[error("unverifiedCapability: {capability} was never verified on {address}")]
    Unverified { capability: String, address: Address },

    #[error("unknownExtension: {0}")]
    UnknownExtension(String),

    #[error("unknownStandard: {0}")]
    UnknownStandard(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection(_))
    }

    /// Missing signatures, when this is a signature mismatch.
    pub fn missing(&self) -> Option<&[String]> {
        match self {
            Error::SignatureMismatch(e) => Some(&e.missing),
            _ => None,
        }
    }

    pub fn as_call(&self) -> Option<&CallError> {
        match self {
            Error::Call(e) => Some(e),
            _ => None,
        }
    }
}

/// Turn a failed capability invocation into an [`Error`].
///
/// Connection-class causes become [`Error::Connection`]; everything else is a
/// [`CallError`]. Either way the original cause is kept as the error source.
pub fn wrap_call_error(capability: &str, address: Address, cause: ClientError) -> Error {
    if cause.is_connection() {
        return ConnectionError {
            context: capability.to_string(),
            address,
            source: cause,
        }
        .into();
    }
    CallError {
        capability: capability.to_string(),
        address,
        cause,
    }
    .into()
}
