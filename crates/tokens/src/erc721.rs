//! Non-fungible token sessions and their optional extensions.

use crate::abi::{self, IERC2981, IERC721Burnable, IERC721Enumerable, IERC721};
use crate::signatures::{erc721, erc721_burnable, erc721_enumerable, erc721_royalties, names};
use crate::TokenMeta;
use alloy_primitives::U256;
use alloy_sol_types::SolCall;
use tokengate_core::{
    Address, Capability, CapabilitySet, ComposedSession, Result, Session, SessionFactory, TxHash,
};
use tracing::{debug, warn};

/// Most token ids [`Erc721Extended::owned_tokens`] and
/// [`Erc721Extended::all_token_ids`] will walk unless the limit is changed.
pub const DEFAULT_ENUMERATION_LIMIT: u64 = 10_000;

/// Royalty owed on a sale, as reported by `royaltyInfo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoyaltyInfo {
    pub receiver: Address,
    pub amount: U256,
}

/// A verified session over an ERC-721 contract.
#[derive(Debug)]
pub struct Erc721Session {
    session: Session,
}

impl Erc721Session {
    pub async fn open(factory: &SessionFactory, address: Address, requested: CapabilitySet) -> Result<Self> {
        let session = factory.open(address, requested).await?;
        Ok(Self { session })
    }

    /// Verify the whole ERC-721 interface.
    pub async fn open_standard(factory: &SessionFactory, address: Address) -> Result<Self> {
        let session = factory.open_standard(address, names::ERC721).await?;
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

    async fn write<C: SolCall>(&self, capability: &Capability, call: C) -> Result<TxHash> {
        self.session.send(capability, &abi::args(&call)).await
    }

    pub async fn name(&self) -> Result<String> {
        Ok(self.read(&erc721::NAME, IERC721::nameCall {}).await?._0)
    }

    pub async fn symbol(&self) -> Result<String> {
        Ok(self.read(&erc721::SYMBOL, IERC721::symbolCall {}).await?._0)
    }

    pub async fn token_uri(&self, token_id: U256) -> Result<String> {
        Ok(self.read(&erc721::TOKEN_URI, IERC721::tokenURICall { tokenId: token_id }).await?._0)
    }

    pub async fn token_meta(&self) -> Result<TokenMeta> {
        Ok(TokenMeta {
            name: self.name().await?,
            symbol: self.symbol().await?,
        })
    }

    pub async fn balance_of(&self, owner: Address) -> Result<U256> {
        Ok(self.read(&erc721::BALANCE_OF, IERC721::balanceOfCall { owner }).await?._0)
    }

    pub async fn balance(&self) -> Result<U256> {
        self.balance_of(self.session.context().from).await
    }

    pub async fn owner_of(&self, token_id: U256) -> Result<Address> {
        Ok(self.read(&erc721::OWNER_OF, IERC721::ownerOfCall { tokenId: token_id }).await?._0)
    }

    pub async fn get_approved(&self, token_id: U256) -> Result<Address> {
        let call = IERC721::getApprovedCall { tokenId: token_id };
        Ok(self.read(&erc721::GET_APPROVED, call).await?._0)
    }

    pub async fn is_approved_for_all(&self, owner: Address, operator: Address) -> Result<bool> {
        let call = IERC721::isApprovedForAllCall { owner, operator };
        Ok(self.read(&erc721::IS_APPROVED_FOR_ALL, call).await?._0)
    }

    pub async fn approve(&self, to: Address, token_id: U256) -> Result<TxHash> {
        self.write(&erc721::APPROVE, IERC721::approveCall { to, tokenId: token_id })
            .await
    }

    pub async fn set_approval_for_all(&self, operator: Address, approved: bool) -> Result<TxHash> {
        let call = IERC721::setApprovalForAllCall { operator, approved };
        self.write(&erc721::SET_APPROVAL_FOR_ALL, call).await
    }

    pub async fn transfer_from(&self, from: Address, to: Address, token_id: U256) -> Result<TxHash> {
        let call = IERC721::transferFromCall {
            from,
            to,
            tokenId: token_id,
        };
        self.write(&erc721::TRANSFER_FROM, call).await
    }

    /// Transfer a token owned by the session's account.
    pub async fn transfer_to(&self, to: Address, token_id: U256) -> Result<TxHash> {
        self.transfer_from(self.session.context().from, to, token_id).await
    }

    pub async fn safe_transfer_from(&self, from: Address, to: Address, token_id: U256) -> Result<TxHash> {
        let call = IERC721::safeTransferFromCall {
            from,
            to,
            tokenId: token_id,
        };
        self.write(&erc721::SAFE_TRANSFER_FROM, call).await
    }

    /// Verify the named extensions together and return the extended session.
    ///
    /// The order of `names` does not matter.
    pub async fn extend<S: AsRef<str>>(&self, names: &[S]) -> Result<Erc721Extended<'_>> {
        let composed = self.session.compose(names).await?;
        debug!(address = %self.address(), extensions = ?composed.extensions(), "nft session extended");
        Ok(Erc721Extended {
            base: self,
            composed,
            limit: DEFAULT_ENUMERATION_LIMIT,
        })
    }

    pub async fn enumerable(&self) -> Result<Erc721Extended<'_>> {
        self.extend(&[names::ERC721_ENUMERABLE]).await
    }

    pub async fn royalties(&self) -> Result<Erc721Extended<'_>> {
        self.extend(&[names::ERC721_ROYALTIES]).await
    }

    pub async fn burnable(&self) -> Result<Erc721Extended<'_>> {
        self.extend(&[names::ERC721_BURNABLE]).await
    }
}

/// An ERC-721 session plus whichever extensions were verified for it.
///
/// Calling into an extension that was not composed fails with
/// [`tokengate_core::Error::Unverified`].
#[derive(Debug)]
pub struct Erc721Extended<'a> {
    base: &'a Erc721Session,
    composed: ComposedSession<'a>,
    limit: u64,
}

impl<'a> Erc721Extended<'a> {
    pub fn base(&self) -> &'a Erc721Session {
        self.base
    }

    pub fn composed(&self) -> &ComposedSession<'a> {
        &self.composed
    }

    pub fn extensions(&self) -> &[String] {
        self.composed.extensions()
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        self.composed.capabilities()
    }

    /// Cap the number of ids a single enumeration may walk.
    pub fn with_enumeration_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    async fn read<C: SolCall>(&self, capability: &Capability, call: C) -> Result<C::Return> {
        let raw = self.composed.call(capability, &abi::args(&call)).await?;
        abi::returns::<C>(capability, self.composed.address(), &raw)
    }

    /// Turn a count reported by the contract into a loop bound, rejecting
    /// counts that do not fit or exceed the enumeration limit.
    fn walk_length(&self, capability: &Capability, count: U256) -> Result<u64> {
        let address = self.composed.address();
        let n = u64::try_from(count)
            .map_err(|_| abi::malformed(capability, address, format!("count {count} does not fit in 64 bits")))?;
        if n > self.limit {
            warn!(%address, count = n, limit = self.limit, "enumeration refused");
            return Err(abi::malformed(
                capability,
                address,
                format!("count {n} exceeds the enumeration limit of {}", self.limit),
            ));
        }
        Ok(n)
    }

    pub async fn total_supply(&self) -> Result<U256> {
        let call = IERC721Enumerable::totalSupplyCall {};
        Ok(self.read(&erc721_enumerable::TOTAL_SUPPLY, call).await?._0)
    }

    pub async fn token_by_index(&self, index: U256) -> Result<U256> {
        let call = IERC721Enumerable::tokenByIndexCall { index };
        Ok(self.read(&erc721_enumerable::TOKEN_BY_INDEX, call).await?._0)
    }

    pub async fn token_of_owner_by_index(&self, owner: Address, index: U256) -> Result<U256> {
        let call = IERC721Enumerable::tokenOfOwnerByIndexCall { owner, index };
        Ok(self.read(&erc721_enumerable::TOKEN_OF_OWNER_BY_INDEX, call).await?._0)
    }

    /// Every token id held by `owner`, in enumeration order.
    pub async fn owned_tokens(&self, owner: Address) -> Result<Vec<U256>> {
        let count = self.base.balance_of(owner).await?;
        let n = self.walk_length(&erc721::BALANCE_OF, count)?;
        let mut ids = Vec::new();
        for index in 0..n {
            ids.push(self.token_of_owner_by_index(owner, U256::from(index)).await?);
        }
        Ok(ids)
    }

    /// Every token id in the collection, in enumeration order.
    pub async fn all_token_ids(&self) -> Result<Vec<U256>> {
        let supply = self.total_supply().await?;
        let n = self.walk_length(&erc721_enumerable::TOTAL_SUPPLY, supply)?;
        let mut ids = Vec::new();
        for index in 0..n {
            ids.push(self.token_by_index(U256::from(index)).await?);
        }
        Ok(ids)
    }

    pub async fn royalty_info(&self, token_id: U256, sale_price: U256) -> Result<RoyaltyInfo> {
        let call = IERC2981::royaltyInfoCall {
            tokenId: token_id,
            salePrice: sale_price,
        };
        let info = self.read(&erc721_royalties::ROYALTY_INFO, call).await?;
        Ok(RoyaltyInfo {
            receiver: info.receiver,
            amount: info.royaltyAmount,
        })
    }

    pub async fn burn(&self, token_id: U256) -> Result<TxHash> {
        let call = IERC721Burnable::burnCall { tokenId: token_id };
        self.composed.send(&erc721_burnable::BURN, &abi::args(&call)).await
    }

    pub async fn balance_of(&self, owner: Address) -> Result<U256> {
        self.base.balance_of(owner).await
    }

    pub async fn balance(&self) -> Result<U256> {
        self.base.balance().await
    }

    pub async fn owner_of(&self, token_id: U256) -> Result<Address> {
        self.base.owner_of(token_id).await
    }
}
