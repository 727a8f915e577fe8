//! Signature catalogue for the token standards and their optional extensions,
//! and the process-wide default [`Registry`] built from it.

use crate::abi::*;
use alloy_sol_types::{SolCall, SolError};
use std::sync::{Arc, LazyLock};
use tokengate_core::{Capability, CapabilitySet, Extension, Registry};

/// Standard and extension names understood by the default registry.
pub mod names {
    pub const ERC20: &str = "erc20";
    pub const ERC721: &str = "erc721";
    pub const ERC20_BURNABLE: &str = "erc20.burnable";
    pub const ERC721_ENUMERABLE: &str = "erc721.enumerable";
    pub const ERC721_ROYALTIES: &str = "erc721.royalties";
    pub const ERC721_BURNABLE: &str = "erc721.burnable";
}

macro_rules! capabilities {
    ($($name:ident = $kind:ident($call:ty, $label:literal);)*) => {
        $(
            pub static $name: LazyLock<Capability> =
                LazyLock::new(|| Capability::$kind(<$call as SolCall>::SIGNATURE, $label));
        )*

        /// Every capability declared in this module.
        pub fn all() -> CapabilitySet {
            [$(&*$name),*].into_iter().collect()
        }

        /// Each capability next to the selector its call type encodes with.
        #[cfg(test)]
        pub(crate) fn encoded_selectors() -> Vec<(&'static Capability, [u8; 4])> {
            vec![$((&*$name, <$call as SolCall>::SELECTOR)),*]
        }
    };
}

pub mod erc20 {
    use super::*;

    capabilities! {
        NAME = read(IERC20::nameCall, "erc20.Name()");
        SYMBOL = read(IERC20::symbolCall, "erc20.Symbol()");
        DECIMALS = read(IERC20::decimalsCall, "erc20.Decimals()");
        TOTAL_SUPPLY = read(IERC20::totalSupplyCall, "erc20.TotalSupply()");
        BALANCE_OF = read(IERC20::balanceOfCall, "erc20.BalanceOf()");
        ALLOWANCE = read(IERC20::allowanceCall, "erc20.Allowance()");
        TRANSFER = write(IERC20::transferCall, "erc20.Transfer()");
        APPROVE = write(IERC20::approveCall, "erc20.Approve()");
        TRANSFER_FROM = write(IERC20::transferFromCall, "erc20.TransferFrom()");
    }
}

pub mod erc20_burnable {
    use super::*;

    capabilities! {
        BURN = write(IERC20Burnable::burnCall, "erc20.Burn()");
        BURN_FROM = write(IERC20Burnable::burnFromCall, "erc20.BurnFrom()");
    }
}

pub mod erc721 {
    use super::*;

    capabilities! {
        NAME = read(IERC721::nameCall, "nft.Name()");
        SYMBOL = read(IERC721::symbolCall, "nft.Symbol()");
        TOKEN_URI = read(IERC721::tokenURICall, "nft.TokenURI()");
        BALANCE_OF = read(IERC721::balanceOfCall, "nft.BalanceOf()");
        OWNER_OF = read(IERC721::ownerOfCall, "nft.OwnerOf()");
        GET_APPROVED = read(IERC721::getApprovedCall, "nft.GetApproved()");
        IS_APPROVED_FOR_ALL = read(IERC721::isApprovedForAllCall, "nft.IsApprovedForAll()");
        APPROVE = write(IERC721::approveCall, "nft.Approve()");
        SET_APPROVAL_FOR_ALL = write(IERC721::setApprovalForAllCall, "nft.SetApprovalForAll()");
        TRANSFER_FROM = write(IERC721::transferFromCall, "nft.TransferFrom()");
        SAFE_TRANSFER_FROM = write(IERC721::safeTransferFromCall, "nft.SafeTransferFrom()");
    }
}

pub mod erc721_enumerable {
    use super::*;

    capabilities! {
        TOTAL_SUPPLY = read(IERC721Enumerable::totalSupplyCall, "nft.TotalSupply()");
        TOKEN_BY_INDEX = read(IERC721Enumerable::tokenByIndexCall, "nft.TokenByIndex()");
        TOKEN_OF_OWNER_BY_INDEX = read(IERC721Enumerable::tokenOfOwnerByIndexCall, "nft.TokenOfOwnerByIndex()");
    }
}

pub mod erc721_royalties {
    use super::*;

    capabilities! {
        ROYALTY_INFO = read(IERC2981::royaltyInfoCall, "nft.RoyaltyInfo()");
    }
}

pub mod erc721_burnable {
    use super::*;

    capabilities! {
        BURN = write(IERC721Burnable::burnCall, "nft.Burn()");
    }
}

/// Custom revert errors raised by common token implementations.
const ERRORS: &[&str] = &[
    ERC20InsufficientBalance::SIGNATURE,
    ERC20InvalidSender::SIGNATURE,
    ERC20InvalidReceiver::SIGNATURE,
    ERC20InsufficientAllowance::SIGNATURE,
    ERC20InvalidApprover::SIGNATURE,
    ERC20InvalidSpender::SIGNATURE,
    ERC721InvalidOwner::SIGNATURE,
    ERC721NonexistentToken::SIGNATURE,
    ERC721IncorrectOwner::SIGNATURE,
    ERC721InvalidSender::SIGNATURE,
    ERC721InvalidReceiver::SIGNATURE,
    ERC721InsufficientApproval::SIGNATURE,
    ERC721InvalidApprover::SIGNATURE,
    ERC721InvalidOperator::SIGNATURE,
    ERC721OutOfBoundsIndex::SIGNATURE,
];

static REGISTRY: LazyLock<Arc<Registry>> = LazyLock::new(|| {
    let builder = Registry::builder()
        .standard(names::ERC20, erc20::all())
        .standard(names::ERC721, erc721::all())
        .extension(Extension::new(names::ERC20_BURNABLE, erc20_burnable::all()))
        .extension(Extension::new(names::ERC721_ENUMERABLE, erc721_enumerable::all()))
        .extension(Extension::new(names::ERC721_ROYALTIES, erc721_royalties::all()))
        .extension(Extension::new(names::ERC721_BURNABLE, erc721_burnable::all()));
    Arc::new(ERRORS.iter().fold(builder, |b, sig| b.error(sig)).build())
});

/// The default registry of token standards, built once per process.
pub fn registry() -> Arc<Registry> {
    REGISTRY.clone()
}
