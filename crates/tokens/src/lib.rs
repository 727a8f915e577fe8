//! Typed token sessions built on capability verification.
//!
//! The [`signatures`] catalogue defines the ERC-20 and ERC-721 standards plus
//! their optional extensions, and registers them in a shared [`registry()`].
//! [`Erc20Session`] and [`Erc721Session`] wrap a verified core session with
//! decoded, strongly typed calls.

pub mod abi;
pub mod erc20;
pub mod erc721;
pub mod signatures;

#[cfg(feature = "eth-call")]
pub mod rpc;

#[cfg(test)]
mod testing;

use std::sync::Arc;
use tokengate_core::{ChainClient, SessionFactory, TxContext};

pub use alloy_primitives::U256;
pub use erc20::{Erc20Burnable, Erc20Session};
pub use erc721::{Erc721Extended, Erc721Session, RoyaltyInfo, DEFAULT_ENUMERATION_LIMIT};
pub use signatures::{names, registry};

#[cfg(feature = "eth-call")]
pub use rpc::{JsonRpcClient, RpcConfig};

/// Name and symbol, shared by both token standards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMeta {
    pub name: String,
    pub symbol: String,
}

/// Session factory over the default token registry.
///
/// Sessions are probed with `name()`, which every supported token exposes.
pub fn token_factory(client: Arc<dyn ChainClient>, ctx: TxContext) -> SessionFactory {
    SessionFactory::new(client, registry(), ctx).with_probe(signatures::erc20::NAME.clone())
}
