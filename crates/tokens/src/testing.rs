//! In-memory token contracts standing in for a node in the session tests.
//!
//! Reads execute against a scratch copy of the ledger; transactions commit only
//! when they succeed, so a reverted transaction leaves state untouched.

use crate::abi::{
    ERC20InsufficientAllowance, ERC20InsufficientBalance, ERC721IncorrectOwner,
    ERC721InsufficientApproval, ERC721InvalidApprover, ERC721NonexistentToken,
    ERC721OutOfBoundsIndex, IERC20Burnable, IERC2981, IERC721Burnable, IERC721Enumerable, IERC20,
    IERC721,
};
use crate::signatures::{
    erc20, erc20_burnable, erc721, erc721_burnable, erc721_enumerable, erc721_royalties,
};
use alloy_primitives::U256;
use alloy_sol_types::{SolCall, SolError, SolInterface};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use tokengate_core::{
    Address, CallRequest, Capability, CapabilitySet, ChainClient, ClientError, ClientFuture,
    Revert, Selector, TxContext, TxHash,
};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Kind {
    Fungible,
    NonFungible,
}

#[derive(Clone, Default)]
struct Ledger {
    balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
    supply: U256,
    owners: BTreeMap<U256, Address>,
    approvals: HashMap<U256, Address>,
    operators: BTreeSet<(Address, Address)>,
    royalty_receiver: Address,
    royalty_bps: U256,
    /// Answer for `balanceOf` and `totalSupply` regardless of holdings.
    reported_count: Option<U256>,
}

pub(crate) struct SimulatedToken {
    kind: Kind,
    known: BTreeSet<Selector>,
    ledger: Mutex<Ledger>,
    offline: AtomicBool,
    committed: AtomicU64,
    calls: AtomicU64,
}

fn selectors(sets: &[CapabilitySet]) -> BTreeSet<Selector> {
    sets.iter()
        .flat_map(|s| s.iter().map(Capability::selector))
        .collect()
}

impl SimulatedToken {
    fn new(kind: Kind, known: BTreeSet<Selector>, ledger: Ledger) -> Self {
        Self {
            kind,
            known,
            ledger: Mutex::new(ledger),
            offline: AtomicBool::new(false),
            committed: AtomicU64::new(0),
            calls: AtomicU64::new(0),
        }
    }

    /// ERC-20 with burn support; `holder` starts with `amount`.
    pub(crate) fn fungible(holder: Address, amount: u64) -> Self {
        let mut ledger = Ledger::default();
        ledger.balances.insert(holder, U256::from(amount));
        ledger.supply = U256::from(amount);
        Self::new(
            Kind::Fungible,
            selectors(&[erc20::all(), erc20_burnable::all()]),
            ledger,
        )
    }

    /// ERC-721 with enumeration, royalties and burn; `holder` owns tokens `0..count`.
    pub(crate) fn non_fungible(holder: Address, count: u64) -> Self {
        let mut ledger = Ledger {
            royalty_receiver: holder,
            royalty_bps: U256::from(500u64),
            ..Default::default()
        };
        for id in 0..count {
            ledger.owners.insert(U256::from(id), holder);
        }
        let known = selectors(&[
            erc721::all(),
            erc721_enumerable::all(),
            erc721_royalties::all(),
            erc721_burnable::all(),
        ]);
        Self::new(Kind::NonFungible, known, ledger)
    }

    /// Drop functions from the deployed interface.
    pub(crate) fn without(mut self, capabilities: &[&Capability]) -> Self {
        for capability in capabilities {
            self.known.remove(&capability.selector());
        }
        self
    }

    /// Make `balanceOf` and `totalSupply` report `count` whatever the ledger holds.
    pub(crate) fn reporting_count(self, count: U256) -> Self {
        self.ledger.lock().unwrap().reported_count = Some(count);
        self
    }

    pub(crate) fn mint_to(&self, owner: Address, id: u64) {
        self.ledger.lock().unwrap().owners.insert(U256::from(id), owner);
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub(crate) fn balance(&self, account: Address) -> U256 {
        let ledger = self.ledger.lock().unwrap();
        match self.kind {
            Kind::Fungible => ledger.balances.get(&account).copied().unwrap_or_default(),
            Kind::NonFungible => U256::from(ledger.owned_by(account).count()),
        }
    }

    pub(crate) fn committed(&self) -> u64 {
        self.committed.load(Ordering::SeqCst)
    }

    /// Read calls received so far, trial calls included.
    pub(crate) fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    fn execute(&self, ledger: &mut Ledger, sender: Address, data: &[u8]) -> Result<Vec<u8>, ClientError> {
        let Some(head) = data.get(..4) else {
            return Err(ClientError::Reverted(Revert::default()));
        };
        let selector = Selector::from_slice(head);
        if !self.known.contains(&selector) {
            return Err(ClientError::UnknownSelector(selector));
        }
        match self.kind {
            Kind::Fungible => fungible(ledger, sender, data),
            Kind::NonFungible => non_fungible(ledger, sender, data),
        }
    }
}

impl Ledger {
    fn owned_by(&self, owner: Address) -> impl Iterator<Item = &U256> {
        self.owners
            .iter()
            .filter(move |(_, o)| **o == owner)
            .map(|(id, _)| id)
    }
}

fn custom<E: SolError>(error: E) -> ClientError {
    ClientError::Reverted(Revert::new(error.abi_encode()))
}

/// Arguments that fail to decode revert without data, as the EVM does.
fn decode<I: SolInterface>(data: &[u8]) -> Result<I, ClientError> {
    I::abi_decode(data, true).map_err(|_| ClientError::Reverted(Revert::default()))
}

fn position(index: U256) -> Option<usize> {
    u64::try_from(index).ok().and_then(|i| usize::try_from(i).ok())
}

fn debit(ledger: &mut Ledger, account: Address, amount: U256) -> Result<(), ClientError> {
    let balance = ledger.balances.get(&account).copied().unwrap_or_default();
    if balance < amount {
        return Err(custom(ERC20InsufficientBalance {
            sender: account,
            balance,
            needed: amount,
        }));
    }
    ledger.balances.insert(account, balance - amount);
    Ok(())
}

fn spend_allowance(ledger: &mut Ledger, owner: Address, spender: Address, amount: U256) -> Result<(), ClientError> {
    let allowance = ledger.allowances.get(&(owner, spender)).copied().unwrap_or_default();
    if allowance < amount {
        return Err(custom(ERC20InsufficientAllowance {
            spender,
            allowance,
            needed: amount,
        }));
    }
    ledger.allowances.insert((owner, spender), allowance - amount);
    Ok(())
}

fn credit(ledger: &mut Ledger, account: Address, amount: U256) {
    *ledger.balances.entry(account).or_default() += amount;
}

fn fungible(ledger: &mut Ledger, sender: Address, data: &[u8]) -> Result<Vec<u8>, ClientError> {
    use IERC20::IERC20Calls as Erc20;
    use IERC20Burnable::IERC20BurnableCalls as Burnable;

    if let Ok(call) = IERC20::IERC20Calls::abi_decode(data, true) {
        return Ok(match call {
            Erc20::name(_) => IERC20::nameCall::abi_encode_returns(&("MyToken".to_string(),)),
            Erc20::symbol(_) => IERC20::symbolCall::abi_encode_returns(&("MTK".to_string(),)),
            Erc20::decimals(_) => IERC20::decimalsCall::abi_encode_returns(&(18u8,)),
            Erc20::totalSupply(_) => IERC20::totalSupplyCall::abi_encode_returns(&(ledger.supply,)),
            Erc20::balanceOf(c) => {
                let balance = ledger.balances.get(&c.account).copied().unwrap_or_default();
                IERC20::balanceOfCall::abi_encode_returns(&(balance,))
            }
            Erc20::allowance(c) => {
                let allowance = ledger.allowances.get(&(c.owner, c.spender)).copied().unwrap_or_default();
                IERC20::allowanceCall::abi_encode_returns(&(allowance,))
            }
            Erc20::transfer(c) => {
                debit(ledger, sender, c.value)?;
                credit(ledger, c.to, c.value);
                IERC20::transferCall::abi_encode_returns(&(true,))
            }
            Erc20::approve(c) => {
                ledger.allowances.insert((sender, c.spender), c.value);
                IERC20::approveCall::abi_encode_returns(&(true,))
            }
            Erc20::transferFrom(c) => {
                spend_allowance(ledger, c.from, sender, c.value)?;
                debit(ledger, c.from, c.value)?;
                credit(ledger, c.to, c.value);
                IERC20::transferFromCall::abi_encode_returns(&(true,))
            }
        });
    }
    match decode::<Burnable>(data)? {
        Burnable::burn(c) => {
            debit(ledger, sender, c.value)?;
            ledger.supply -= c.value;
        }
        Burnable::burnFrom(c) => {
            spend_allowance(ledger, c.account, sender, c.value)?;
            debit(ledger, c.account, c.value)?;
            ledger.supply -= c.value;
        }
    }
    Ok(Vec::new())
}

fn owner_of(ledger: &Ledger, token_id: U256) -> Result<Address, ClientError> {
    ledger
        .owners
        .get(&token_id)
        .copied()
        .ok_or_else(|| custom(ERC721NonexistentToken { tokenId: token_id }))
}

fn authorized(ledger: &Ledger, owner: Address, spender: Address, token_id: U256) -> bool {
    spender == owner
        || ledger.approvals.get(&token_id) == Some(&spender)
        || ledger.operators.contains(&(owner, spender))
}

fn require_authorized(ledger: &Ledger, sender: Address, token_id: U256) -> Result<Address, ClientError> {
    let owner = owner_of(ledger, token_id)?;
    if !authorized(ledger, owner, sender, token_id) {
        return Err(custom(ERC721InsufficientApproval {
            operator: sender,
            tokenId: token_id,
        }));
    }
    Ok(owner)
}

fn move_token(ledger: &mut Ledger, sender: Address, from: Address, to: Address, token_id: U256) -> Result<(), ClientError> {
    let owner = require_authorized(ledger, sender, token_id)?;
    if owner != from {
        return Err(custom(ERC721IncorrectOwner {
            sender: from,
            tokenId: token_id,
            owner,
        }));
    }
    ledger.owners.insert(token_id, to);
    ledger.approvals.remove(&token_id);
    Ok(())
}

fn non_fungible(ledger: &mut Ledger, sender: Address, data: &[u8]) -> Result<Vec<u8>, ClientError> {
    use IERC721::IERC721Calls as Nft;
    use IERC721Enumerable::IERC721EnumerableCalls as Enumerable;

    if let Ok(call) = IERC721::IERC721Calls::abi_decode(data, true) {
        return Ok(match call {
            Nft::name(_) => IERC721::nameCall::abi_encode_returns(&("MyNFT".to_string(),)),
            Nft::symbol(_) => IERC721::symbolCall::abi_encode_returns(&("MNFT".to_string(),)),
            Nft::tokenURI(c) => {
                owner_of(ledger, c.tokenId)?;
                IERC721::tokenURICall::abi_encode_returns(&(format!("ipfs://mnft/{}", c.tokenId),))
            }
            Nft::balanceOf(c) => {
                let count = ledger
                    .reported_count
                    .unwrap_or_else(|| U256::from(ledger.owned_by(c.owner).count()));
                IERC721::balanceOfCall::abi_encode_returns(&(count,))
            }
            Nft::ownerOf(c) => IERC721::ownerOfCall::abi_encode_returns(&(owner_of(ledger, c.tokenId)?,)),
            Nft::getApproved(c) => {
                owner_of(ledger, c.tokenId)?;
                let approved = ledger.approvals.get(&c.tokenId).copied().unwrap_or(Address::ZERO);
                IERC721::getApprovedCall::abi_encode_returns(&(approved,))
            }
            Nft::isApprovedForAll(c) => {
                let approved = ledger.operators.contains(&(c.owner, c.operator));
                IERC721::isApprovedForAllCall::abi_encode_returns(&(approved,))
            }
            Nft::approve(c) => {
                let owner = owner_of(ledger, c.tokenId)?;
                if sender != owner && !ledger.operators.contains(&(owner, sender)) {
                    return Err(custom(ERC721InvalidApprover { approver: sender }));
                }
                ledger.approvals.insert(c.tokenId, c.to);
                Vec::new()
            }
            Nft::setApprovalForAll(c) => {
                if c.approved {
                    ledger.operators.insert((sender, c.operator));
                } else {
                    ledger.operators.remove(&(sender, c.operator));
                }
                Vec::new()
            }
            Nft::transferFrom(c) => {
                move_token(ledger, sender, c.from, c.to, c.tokenId)?;
                Vec::new()
            }
            Nft::safeTransferFrom(c) => {
                move_token(ledger, sender, c.from, c.to, c.tokenId)?;
                Vec::new()
            }
        });
    }
    if let Ok(call) = IERC721Enumerable::IERC721EnumerableCalls::abi_decode(data, true) {
        return match call {
            Enumerable::totalSupply(_) => {
                let supply = ledger
                    .reported_count
                    .unwrap_or_else(|| U256::from(ledger.owners.len()));
                Ok(IERC721Enumerable::totalSupplyCall::abi_encode_returns(&(supply,)))
            }
            Enumerable::tokenByIndex(c) => position(c.index)
                .and_then(|i| ledger.owners.keys().nth(i))
                .map(|id| IERC721Enumerable::tokenByIndexCall::abi_encode_returns(&(*id,)))
                .ok_or_else(|| {
                    custom(ERC721OutOfBoundsIndex {
                        owner: Address::ZERO,
                        index: c.index,
                    })
                }),
            Enumerable::tokenOfOwnerByIndex(c) => position(c.index)
                .and_then(|i| ledger.owned_by(c.owner).nth(i))
                .map(|id| IERC721Enumerable::tokenOfOwnerByIndexCall::abi_encode_returns(&(*id,)))
                .ok_or_else(|| {
                    custom(ERC721OutOfBoundsIndex {
                        owner: c.owner,
                        index: c.index,
                    })
                }),
        };
    }
    if let Ok(IERC2981::IERC2981Calls::royaltyInfo(c)) = IERC2981::IERC2981Calls::abi_decode(data, true) {
        let amount = c.salePrice.saturating_mul(ledger.royalty_bps) / U256::from(10_000u64);
        return Ok(IERC2981::royaltyInfoCall::abi_encode_returns(&(
            ledger.royalty_receiver,
            amount,
        )));
    }
    let IERC721Burnable::IERC721BurnableCalls::burn(c) =
        decode::<IERC721Burnable::IERC721BurnableCalls>(data)?;
    require_authorized(ledger, sender, c.tokenId)?;
    ledger.owners.remove(&c.tokenId);
    ledger.approvals.remove(&c.tokenId);
    Ok(Vec::new())
}

impl ChainClient for SimulatedToken {
    fn call(&self, request: CallRequest) -> ClientFuture<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = if self.offline.load(Ordering::SeqCst) {
            Err(ClientError::Transport("connection refused".into()))
        } else {
            let mut scratch = self.ledger.lock().unwrap().clone();
            self.execute(&mut scratch, request.from.unwrap_or(Address::ZERO), &request.data)
        };
        Box::pin(async move { result })
    }

    fn send_transaction(&self, request: CallRequest, ctx: TxContext) -> ClientFuture<TxHash> {
        let result = if self.offline.load(Ordering::SeqCst) {
            Err(ClientError::Transport("connection refused".into()))
        } else {
            let mut ledger = self.ledger.lock().unwrap();
            let mut scratch = ledger.clone();
            self.execute(&mut scratch, ctx.from, &request.data).map(|_| {
                *ledger = scratch;
                let n = self.committed.fetch_add(1, Ordering::SeqCst) + 1;
                let mut hash = [0u8; 32];
                hash[24..].copy_from_slice(&n.to_be_bytes());
                TxHash::from(hash)
            })
        };
        Box::pin(async move { result })
    }
}
