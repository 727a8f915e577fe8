//! Capability-verified contract sessions.
//!
//! A caller never trusts that a deployed contract implements the functions it
//! intends to call. This crate proves it first:
//!
//! - **Capability**: one function signature with its derived selector
//! - **Registry**: immutable catalogue of standards, extensions and custom errors
//! - **Verifier**: trial-calls a capability set without mutating state
//! - **SessionFactory / Session**: binds a contract to a verified set
//! - **ComposedSession**: a session plus verified, conflict-free extensions
//! - **Error**: connection, signature mismatch, extension conflict and call errors

pub mod capability;
pub mod client;
pub mod compose;
pub mod error;
pub mod registry;
pub mod revert;
pub mod session;
pub mod verifier;

pub use capability::{selector_of, CallKind, Capability, CapabilitySet};
pub use client::{CallRequest, ChainClient, ClientError, ClientFuture, TxContext};
pub use compose::ComposedSession;
pub use error::{
    wrap_call_error, CallError, ConnectionError, Error, ExtensionConflictError, Result,
    SignatureMismatchError,
};
pub use registry::{Extension, Registry, RegistryBuilder};
pub use revert::Revert;
pub use session::{Session, SessionFactory};
pub use verifier::{VerificationResult, Verifier};

pub use alloy_primitives::{Address, Selector, TxHash};
