//! Solidity interfaces of the token standards, and the glue between their
//! generated call types and a verified session.

use alloy_sol_types::{sol, SolCall};
use std::fmt::Display;
use tokengate_core::{wrap_call_error, Address, Capability, ClientError, Error, Result};

sol! {
    #[derive(Debug)]
    interface IERC20 {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function totalSupply() external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function transfer(address to, uint256 value) external returns (bool);
        function approve(address spender, uint256 value) external returns (bool);
        function transferFrom(address from, address to, uint256 value) external returns (bool);
    }

    #[derive(Debug)]
    interface IERC20Burnable {
        function burn(uint256 value) external;
        function burnFrom(address account, uint256 value) external;
    }

    #[derive(Debug)]
    interface IERC721 {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function tokenURI(uint256 tokenId) external view returns (string);
        function balanceOf(address owner) external view returns (uint256);
        function ownerOf(uint256 tokenId) external view returns (address);
        function getApproved(uint256 tokenId) external view returns (address);
        function isApprovedForAll(address owner, address operator) external view returns (bool);
        function approve(address to, uint256 tokenId) external;
        function setApprovalForAll(address operator, bool approved) external;
        function transferFrom(address from, address to, uint256 tokenId) external;
        function safeTransferFrom(address from, address to, uint256 tokenId) external;
    }

    #[derive(Debug)]
    interface IERC721Enumerable {
        function totalSupply() external view returns (uint256);
        function tokenByIndex(uint256 index) external view returns (uint256);
        function tokenOfOwnerByIndex(address owner, uint256 index) external view returns (uint256);
    }

    #[derive(Debug)]
    interface IERC2981 {
        function royaltyInfo(uint256 tokenId, uint256 salePrice)
            external
            view
            returns (address receiver, uint256 royaltyAmount);
    }

    #[derive(Debug)]
    interface IERC721Burnable {
        function burn(uint256 tokenId) external;
    }

    error ERC20InsufficientBalance(address sender, uint256 balance, uint256 needed);
    error ERC20InvalidSender(address sender);
    error ERC20InvalidReceiver(address receiver);
    error ERC20InsufficientAllowance(address spender, uint256 allowance, uint256 needed);
    error ERC20InvalidApprover(address approver);
    error ERC20InvalidSpender(address spender);
    error ERC721InvalidOwner(address owner);
    error ERC721NonexistentToken(uint256 tokenId);
    error ERC721IncorrectOwner(address sender, uint256 tokenId, address owner);
    error ERC721InvalidSender(address sender);
    error ERC721InvalidReceiver(address receiver);
    error ERC721InsufficientApproval(address operator, uint256 tokenId);
    error ERC721InvalidApprover(address approver);
    error ERC721InvalidOperator(address operator);
    error ERC721OutOfBoundsIndex(address owner, uint256 index);
}

/// Arguments of `call` without the selector; the session prepends it.
pub(crate) fn args<C: SolCall>(call: &C) -> Vec<u8> {
    let mut out = Vec::with_capacity(call.abi_encoded_size());
    call.abi_encode_raw(&mut out);
    out
}

/// Decode what `capability` returned, turning codec failures into a call error.
pub(crate) fn returns<C: SolCall>(capability: &Capability, address: Address, raw: &[u8]) -> Result<C::Return> {
    C::abi_decode_returns(raw, true).map_err(|e| malformed(capability, address, e))
}

/// A call error for return data that decoded but cannot be used.
pub(crate) fn malformed(capability: &Capability, address: Address, cause: impl Display) -> Error {
    wrap_call_error(
        capability.signature(),
        address,
        ClientError::Decode(cause.to_string()),
    )
}
