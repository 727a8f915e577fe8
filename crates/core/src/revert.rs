//! Revert payloads and their human-readable rendering.

use alloy_primitives::{hex, Selector};
use alloy_sol_types::{Panic, Revert as ErrorString, SolError};
use std::fmt;

/// Data returned by a contract that reverted.
///
/// The raw bytes are always kept. `Error(string)` and `Panic(uint256)` payloads
/// are decoded on construction; custom errors get their reason from
/// [`Revert::with_reason`] once a catalogue has matched the selector.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Revert {
    data: Vec<u8>,
    reason: Option<String>,
}

impl Revert {
    pub fn new(data: Vec<u8>) -> Self {
        let reason = decode_builtin(&data);
        Self { data, reason }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Selector of the error payload, if the revert carried one.
    pub fn error_selector(&self) -> Option<Selector> {
        self.data.get(..4).map(Selector::from_slice)
    }
}

impl fmt::Display for Revert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.reason, self.data.is_empty()) {
            (Some(reason), _) => write!(f, "execution reverted: {reason}"),
            (None, true) => f.write_str("execution reverted"),
            (None, false) => write!(f, "execution reverted: {}", hex::encode_prefixed(&self.data)),
        }
    }
}

fn decode_builtin(data: &[u8]) -> Option<String> {
    if let Ok(err) = ErrorString::abi_decode(data, true) {
        return Some(err.reason);
    }
    if let Ok(panic) = Panic::abi_decode(data, true) {
        return Some(format!("panic code 0x{:x}", panic.code));
    }
    None
}
