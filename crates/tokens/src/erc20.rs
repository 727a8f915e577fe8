//! Fungible-token sessions.

use crate::abi::{self, IERC20Burnable, IERC20};
use crate::signatures::{erc20, erc20_burnable, names};
use crate::TokenMeta;
use alloy_primitives::U256;
use alloy_sol_types::SolCall;
use tokengate_core::{
    Address, Capability, CapabilitySet, ComposedSession, Result, Session, SessionFactory, TxHash,
};

/// A verified session over an ERC-20 contract.
#[derive(Debug)]
pub struct Erc20Session {
    session: Session,
}

impl Erc20Session {
    /// Verify `requested` and bind to `address`. Only verified functions may be called later.
    pub async fn open(factory: &SessionFactory, address: Address, requested: CapabilitySet) -> Result<Self> {
        let session = factory.open(address, requested).await?;
        Ok(Self { session })
    }

    /// Verify the whole ERC-20 interface.
    pub async fn open_standard(factory: &SessionFactory, address: Address) -> Result<Self> {
        let session = factory.open_standard(address, names::ERC20).await?;
        Ok(Self { session })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn address(&self) -> Address {
        self.session.address()
    }

    async fn read<C: SolCall>(&self, capability: &Capability, call: C) -> Result<C::Return> {
        let raw = self.session.call(capability, &abi::args(&call)).await?;
        abi::returns::<C>(capability, self.address(), &raw)
    }

    pub async fn name(&self) -> Result<String> {
        Ok(self.read(&erc20::NAME, IERC20::nameCall {}).await?._0)
    }

    pub async fn symbol(&self) -> Result<String> {
        Ok(self.read(&erc20::SYMBOL, IERC20::symbolCall {}).await?._0)
    }

    pub async fn decimals(&self) -> Result<u8> {
        Ok(self.read(&erc20::DECIMALS, IERC20::decimalsCall {}).await?._0)
    }

    pub async fn total_supply(&self) -> Result<U256> {
        Ok(self.read(&erc20::TOTAL_SUPPLY, IERC20::totalSupplyCall {}).await?._0)
    }

    pub async fn balance_of(&self, account: Address) -> Result<U256> {
        Ok(self.read(&erc20::BALANCE_OF, IERC20::balanceOfCall { account }).await?._0)
    }

    /// Balance of the session's own account.
    pub async fn balance(&self) -> Result<U256> {
        self.balance_of(self.session.context().from).await
    }

    pub async fn allowance(&self, owner: Address, spender: Address) -> Result<U256> {
        let call = IERC20::allowanceCall { owner, spender };
        Ok(self.read(&erc20::ALLOWANCE, call).await?._0)
    }

    pub async fn token_meta(&self) -> Result<TokenMeta> {
        Ok(TokenMeta {
            name: self.name().await?,
            symbol: self.symbol().await?,
        })
    }

    pub async fn transfer(&self, to: Address, value: U256) -> Result<TxHash> {
        let call = IERC20::transferCall { to, value };
        self.session.send(&erc20::TRANSFER, &abi::args(&call)).await
    }

    pub async fn approve(&self, spender: Address, value: U256) -> Result<TxHash> {
        let call = IERC20::approveCall { spender, value };
        self.session.send(&erc20::APPROVE, &abi::args(&call)).await
    }

    pub async fn transfer_from(&self, from: Address, to: Address, value: U256) -> Result<TxHash> {
        let call = IERC20::transferFromCall { from, to, value };
        self.session.send(&erc20::TRANSFER_FROM, &abi::args(&call)).await
    }

    /// Verify burn support and return a session that can burn.
    pub async fn burnable(&self) -> Result<Erc20Burnable<'_>> {
        let composed = self.session.compose(&[names::ERC20_BURNABLE]).await?;
        Ok(Erc20Burnable {
            base: self,
            composed,
        })
    }
}

/// ERC-20 session extended with `burn` / `burnFrom`.
#[derive(Debug)]
pub struct Erc20Burnable<'a> {
    base: &'a Erc20Session,
    composed: ComposedSession<'a>,
}

impl<'a> Erc20Burnable<'a> {
    pub fn base(&self) -> &'a Erc20Session {
        self.base
    }

    pub fn composed(&self) -> &ComposedSession<'a> {
        &self.composed
    }

    pub async fn burn(&self, value: U256) -> Result<TxHash> {
        let call = IERC20Burnable::burnCall { value };
        self.composed.send(&erc20_burnable::BURN, &abi::args(&call)).await
    }

    pub async fn burn_from(&self, account: Address, value: U256) -> Result<TxHash> {
        let call = IERC20Burnable::burnFromCall { account, value };
        self.composed.send(&erc20_burnable::BURN_FROM, &abi::args(&call)).await
    }

    pub async fn balance(&self) -> Result<U256> {
        self.base.balance().await
    }

    pub async fn balance_of(&self, account: Address) -> Result<U256> {
        self.base.balance_of(account).await
    }

    pub async fn total_supply(&self) -> Result<U256> {
        self.base.total_supply().await
    }
}
