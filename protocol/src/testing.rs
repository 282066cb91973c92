//! # In-Memory Chain Emulator
//!
//! [`InMemoryLedger`] implements [`LedgerRpc`] over a toy chain that
//! understands the BlobStore contracts' call data. Tests drive it directly:
//! broadcasts land in a mempool, [`mine`](InMemoryLedger::mine) seals them
//! into a block, and [`reorg_last_block`](InMemoryLedger::reorg_last_block)
//! pushes a block's transactions back into the mempool.
//!
//! Contract state is never stored. Every query replays the mined blocks
//! (and the mempool, for the pending view) from genesis, so a reorg needs
//! no undo log. Reverted transactions stay in their block with no effect.
//!
//! A reverting `eth_call` returns empty bytes, the way the nodes the
//! contracts were deployed against behave; the nonce search depends on it.
//! A reverting `eth_estimateGas` is a node error.
//!
//! `createWithNonce` resolves content the same owner already created under
//! the same flags to the existing live id, whatever the salt, and changes
//! nothing.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use alloy_primitives::FixedBytes;
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::abi::{self, BlobLog, BlobState, BlobStore, SolCall, SolEvent, SolInterface};
use crate::config::BLOB_STORE_ID_SIZE;
use crate::identifier::{keccak256, BlobFlags};
use crate::rpc::{
    CallRequest, LedgerRpc, LogEntry, LogFilter, PendingBlock, PendingTransaction, RpcError,
    RpcErrorObject,
};
use crate::types::{Address, BlockTag, Bytes, TxHash, B256, U256};

/// Account the emulator signs with when a call names no sender.
pub const DEFAULT_ACCOUNT: Address = Address::repeat_byte(0xaa);

const BASE_COST: u64 = 21_000;
const COST_PER_BYTE: u64 = 16;
const STORAGE_COST: u64 = 20_000;

type BlobId = FixedBytes<BLOB_STORE_ID_SIZE>;

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Tx {
    hash: TxHash,
    from: Address,
    to: Address,
    input: Vec<u8>,
}

#[derive(Debug, Default)]
struct Chain {
    /// `blocks[i]` is block `i + 1`.
    blocks: Vec<Vec<Tx>>,
    mempool: Vec<Tx>,
    accounts: Vec<Address>,
    /// Revisioned ids treated as already taken.
    reserved: HashSet<BlobId>,
    fail_estimation: bool,
    drop_broadcasts: bool,
    broadcasts: u64,
    calls: u64,
}

impl Chain {
    fn head(&self) -> u64 {
        self.blocks.len() as u64
    }

    /// World state as of `view`, plus the height the next call executes at.
    fn world(&self, view: BlockTag) -> (World, u64) {
        let head = self.head();
        let (upto, pending) = match view {
            BlockTag::Latest => (head, false),
            BlockTag::Pending => (head, true),
            BlockTag::Number(n) => (n.min(head), false),
        };

        let mut world = World::default();
        for (i, block) in self.blocks.iter().take(upto as usize).enumerate() {
            for tx in block {
                let _ = world.apply(tx, i as u64 + 1, true, &self.reserved);
            }
        }
        if pending {
            for tx in &self.mempool {
                let _ = world.apply(tx, head + 1, false, &self.reserved);
            }
        }
        (world, upto + 1)
    }

    fn sender(&self, call: &CallRequest) -> Option<Address> {
        call.from.or_else(|| self.accounts.first().copied())
    }

    fn as_tx(&self, call: &CallRequest) -> Tx {
        Tx {
            hash: TxHash::ZERO,
            from: self.sender(call).unwrap_or_default(),
            to: call.to,
            input: call.data.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Contract execution
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Revert(&'static str);

impl From<alloy_sol_types::Error> for Revert {
    fn from(_: alloy_sol_types::Error) -> Self {
        Revert("malformed call data")
    }
}

#[derive(Debug, Clone)]
struct HashedBlob {
    block: u64,
    bytes: Bytes,
}

#[derive(Debug, Clone)]
struct RevisionedBlob {
    owner: Option<Address>,
    flags: u8,
    revisions: Vec<u64>,
    retracted: bool,
    recipients: HashSet<Address>,
}

impl RevisionedBlob {
    fn has(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }

    fn live(&self) -> bool {
        !self.retracted
    }
}

/// What a create call is deduplicated on: the same content created under
/// the same flags by the same owner resolves to one id.
type CreationKey = (u8, Option<Address>, B256);

#[derive(Debug, Clone, Default)]
struct ContractState {
    hashed: HashMap<B256, HashedBlob>,
    revisioned: HashMap<BlobId, RevisionedBlob>,
    created: HashMap<CreationKey, BlobId>,
}

#[derive(Debug, Clone, Default)]
struct World {
    contracts: HashMap<Address, ContractState>,
    logs: Vec<(Address, LogEntry)>,
}

/// Where the current call executes.
struct Frame<'a> {
    tx: &'a Tx,
    block: u64,
    mined: bool,
    reserved: &'a HashSet<BlobId>,
}

impl Frame<'_> {
    fn log_block(&self) -> Option<u64> {
        self.mined.then_some(self.block)
    }
}

fn require(condition: bool, reason: &'static str) -> Result<(), Revert> {
    if condition {
        Ok(())
    } else {
        Err(Revert(reason))
    }
}

fn flags_prefix(flags: u8) -> FixedBytes<4> {
    FixedBytes::new([0, 0, 0, flags])
}

/// State-mutating calls that only the owner of a live blob may make.
enum OwnerOp {
    NewRevision(Bytes),
    UpdateLatest(Bytes),
    RetractLatest,
    Restart(Bytes),
    Retract,
    Transfer(Address),
    Disown,
    SetNotUpdatable,
    SetEnforceRevisions,
    SetNotRetractable,
    SetNotTransferable,
}

impl World {
    /// Executes `tx` atomically: on revert the world is left untouched.
    fn apply(
        &mut self,
        tx: &Tx,
        block: u64,
        mined: bool,
        reserved: &HashSet<BlobId>,
    ) -> Result<Vec<u8>, Revert> {
        let mut scratch = self.clone();
        let output = scratch.execute(tx, block, mined, reserved)?;
        *self = scratch;
        Ok(output)
    }

    fn execute(
        &mut self,
        tx: &Tx,
        block: u64,
        mined: bool,
        reserved: &HashSet<BlobId>,
    ) -> Result<Vec<u8>, Revert> {
        let frame = Frame {
            tx,
            block,
            mined,
            reserved,
        };

        // storeBlob and blobExists share selectors across both hash-keyed
        // contracts, so the log contract's decoder serves both.
        if let Ok(call) = BlobLog::BlobLogCalls::abi_decode(&tx.input, true) {
            return self.hashed_call(call, &frame);
        }
        if let Ok(BlobState::BlobStateCalls::getBlob(call)) =
            BlobState::BlobStateCalls::abi_decode(&tx.input, true)
        {
            let bytes = self
                .contract(tx.to)
                .hashed
                .get(&call.hash)
                .map(|b| b.bytes.clone())
                .unwrap_or_default();
            return Ok(BlobState::getBlobCall::abi_encode_returns(&(bytes,)));
        }

        use BlobStore::BlobStoreCalls as Call;
        let call = Call::abi_decode(&tx.input, true).map_err(|_| Revert("unknown function"))?;
        match call {
            Call::createWithNonce(c) => self.create_with_nonce(&frame, c.flagsNonce, c.contents),
            Call::createNewRevision(c) => {
                self.owner_op(&frame, c.blobId, OwnerOp::NewRevision(c.contents))
            }
            Call::updateLatestRevision(c) => {
                self.owner_op(&frame, c.blobId, OwnerOp::UpdateLatest(c.contents))
            }
            Call::retractLatestRevision(c) => {
                self.owner_op(&frame, c.blobId, OwnerOp::RetractLatest)
            }
            Call::restart(c) => self.owner_op(&frame, c.blobId, OwnerOp::Restart(c.contents)),
            Call::retract(c) => self.owner_op(&frame, c.blobId, OwnerOp::Retract),
            Call::transfer(c) => {
                self.owner_op(&frame, c.blobId, OwnerOp::Transfer(c.recipient))
            }
            Call::disown(c) => self.owner_op(&frame, c.blobId, OwnerOp::Disown),
            Call::setNotUpdatable(c) => self.owner_op(&frame, c.blobId, OwnerOp::SetNotUpdatable),
            Call::setEnforceRevisions(c) => {
                self.owner_op(&frame, c.blobId, OwnerOp::SetEnforceRevisions)
            }
            Call::setNotRetractable(c) => {
                self.owner_op(&frame, c.blobId, OwnerOp::SetNotRetractable)
            }
            Call::setNotTransferable(c) => {
                self.owner_op(&frame, c.blobId, OwnerOp::SetNotTransferable)
            }
            Call::transferEnable(c) => self.recipient_op(&frame, c.blobId, true),
            Call::transferDisable(c) => self.recipient_op(&frame, c.blobId, false),
            Call::getContractId(_) => {
                let id = FixedBytes::<12>::from_slice(&keccak256(tx.to)[..12]);
                Ok(BlobStore::getContractIdCall::abi_encode_returns(&(id,)))
            }
            getter => Ok(self.getter(&frame, getter)),
        }
    }

    fn contract(&mut self, address: Address) -> &mut ContractState {
        self.contracts.entry(address).or_default()
    }

    fn emit(&mut self, frame: &Frame<'_>, event: &impl SolEvent) {
        let log = event.encode_log_data();
        self.logs.push((
            frame.tx.to,
            LogEntry {
                data: log.data.to_vec(),
                topics: log.topics().to_vec(),
                block_number: frame.log_block(),
            },
        ));
    }

    fn emit_revision(&mut self, frame: &Frame<'_>, id: BlobId, revision: u64, contents: Bytes) {
        let event = BlobStore::Store {
            blobId: id,
            revisionId: U256::from(revision),
            contents,
        };
        self.emit(frame, &event);
    }

    fn hashed_call(
        &mut self,
        call: BlobLog::BlobLogCalls,
        frame: &Frame<'_>,
    ) -> Result<Vec<u8>, Revert> {
        let contract = self.contract(frame.tx.to);
        match call {
            BlobLog::BlobLogCalls::storeBlob(c) => {
                let hash = keccak256(&c.blob);
                require(!contract.hashed.contains_key(&hash), "blob already stored")?;
                contract.hashed.insert(
                    hash,
                    HashedBlob {
                        block: frame.block,
                        bytes: c.blob.clone(),
                    },
                );
                let event = BlobLog::Store {
                    hash,
                    contents: c.blob,
                };
                self.emit(frame, &event);
                Ok(Vec::new())
            }
            BlobLog::BlobLogCalls::blobExists(c) => {
                let exists = contract.hashed.contains_key(&c.hash);
                Ok(BlobLog::blobExistsCall::abi_encode_returns(&(exists,)))
            }
            BlobLog::BlobLogCalls::getBlobBlockNumber(c) => {
                let block = contract.hashed.get(&c.hash).map_or(0, |b| b.block);
                Ok(BlobLog::getBlobBlockNumberCall::abi_encode_returns(&(U256::from(block),)))
            }
        }
    }

    fn create_with_nonce(
        &mut self,
        frame: &Frame<'_>,
        salt: B256,
        contents: Bytes,
    ) -> Result<Vec<u8>, Revert> {
        let flags = salt[3];
        let owner = (flags & BlobFlags::ANONYMOUS == 0).then_some(frame.tx.from);
        let key = (flags, owner, keccak256(&contents));
        let contract = self.contract(frame.tx.to);

        let existing = contract
            .created
            .get(&key)
            .copied()
            .filter(|id| contract.revisioned.get(id).is_some_and(RevisionedBlob::live));
        if let Some(id) = existing {
            return Ok(BlobStore::createWithNonceCall::abi_encode_returns(&(id,)));
        }

        let id = BlobId::from_slice(&keccak256(salt)[..BLOB_STORE_ID_SIZE]);
        require(
            !contract.revisioned.contains_key(&id) && !frame.reserved.contains(&id),
            "blob id taken",
        )?;

        contract.revisioned.insert(
            id,
            RevisionedBlob {
                owner,
                flags,
                revisions: vec![frame.block],
                retracted: false,
                recipients: HashSet::new(),
            },
        );
        contract.created.insert(key, id);
        self.emit_revision(frame, id, 0, contents);
        Ok(BlobStore::createWithNonceCall::abi_encode_returns(&(id,)))
    }

    fn owner_op(&mut self, frame: &Frame<'_>, id: BlobId, op: OwnerOp) -> Result<Vec<u8>, Revert> {
        let sender = frame.tx.from;
        let block = frame.block;
        let entry = self
            .contract(frame.tx.to)
            .revisioned
            .get_mut(&id)
            .filter(|e| e.live())
            .ok_or(Revert("no such blob"))?;
        require(entry.owner == Some(sender), "not owner")?;

        let replaceable =
            entry.has(BlobFlags::UPDATABLE) && !entry.has(BlobFlags::ENFORCE_REVISIONS);
        let mut logged: Option<(u64, Bytes)> = None;
        let mut output = Vec::new();

        match op {
            OwnerOp::NewRevision(contents) => {
                require(entry.has(BlobFlags::UPDATABLE), "not updatable")?;
                entry.revisions.push(block);
                let revision = entry.revisions.len() as u64 - 1;
                output =
                    BlobStore::createNewRevisionCall::abi_encode_returns(&(U256::from(revision),));
                logged = Some((revision, contents));
            }
            OwnerOp::UpdateLatest(contents) => {
                require(replaceable, "revisions enforced")?;
                if let Some(last) = entry.revisions.last_mut() {
                    *last = block;
                }
                logged = Some((entry.revisions.len() as u64 - 1, contents));
            }
            OwnerOp::RetractLatest => {
                require(replaceable, "revisions enforced")?;
                require(entry.revisions.len() > 1, "only one revision")?;
                entry.revisions.pop();
            }
            OwnerOp::Restart(contents) => {
                require(replaceable, "revisions enforced")?;
                entry.revisions = vec![block];
                logged = Some((0, contents));
            }
            OwnerOp::Retract => {
                require(entry.has(BlobFlags::RETRACTABLE), "not retractable")?;
                entry.retracted = true;
                entry.revisions.clear();
                entry.owner = None;
            }
            OwnerOp::Transfer(recipient) => {
                require(entry.has(BlobFlags::TRANSFERABLE), "not transferable")?;
                require(entry.recipients.contains(&recipient), "recipient not enabled")?;
                entry.owner = Some(recipient);
                entry.recipients.clear();
            }
            OwnerOp::Disown => {
                require(entry.has(BlobFlags::TRANSFERABLE), "not transferable")?;
                entry.owner = None;
                entry.flags |= BlobFlags::ANONYMOUS;
            }
            OwnerOp::SetNotUpdatable => entry.flags &= !BlobFlags::UPDATABLE,
            OwnerOp::SetEnforceRevisions => {
                require(entry.has(BlobFlags::UPDATABLE), "not updatable")?;
                entry.flags |= BlobFlags::ENFORCE_REVISIONS;
            }
            OwnerOp::SetNotRetractable => entry.flags &= !BlobFlags::RETRACTABLE,
            OwnerOp::SetNotTransferable => entry.flags &= !BlobFlags::TRANSFERABLE,
        }

        if let Some((revision, contents)) = logged {
            self.emit_revision(frame, id, revision, contents);
        }
        Ok(output)
    }

    fn recipient_op(
        &mut self,
        frame: &Frame<'_>,
        id: BlobId,
        enable: bool,
    ) -> Result<Vec<u8>, Revert> {
        let sender = frame.tx.from;
        let entry = self
            .contract(frame.tx.to)
            .revisioned
            .get_mut(&id)
            .filter(|e| e.live())
            .ok_or(Revert("no such blob"))?;

        if enable {
            require(entry.has(BlobFlags::TRANSFERABLE), "not transferable")?;
            entry.recipients.insert(sender);
        } else {
            require(entry.recipients.remove(&sender), "transfer not enabled")?;
        }
        Ok(Vec::new())
    }

    /// Read-only revisioned-contract views. Unknown or retracted ids read as
    /// zero values.
    fn getter(&mut self, frame: &Frame<'_>, call: BlobStore::BlobStoreCalls) -> Vec<u8> {
        use BlobStore::BlobStoreCalls as Call;

        let id = match &call {
            Call::getExists(c) => c.blobId,
            Call::getInfo(c) => c.blobId,
            Call::getFlags(c) => c.blobId,
            Call::getUpdatable(c) => c.blobId,
            Call::getEnforceRevisions(c) => c.blobId,
            Call::getRetractable(c) => c.blobId,
            Call::getTransferable(c) => c.blobId,
            Call::getOwner(c) => c.blobId,
            Call::getRevisionCount(c) => c.blobId,
            Call::getRevisionBlockNumber(c) => c.blobId,
            Call::getAllRevisionBlockNumbers(c) => c.blobId,
            _ => return Vec::new(),
        };
        let entry = self
            .contract(frame.tx.to)
            .revisioned
            .get(&id)
            .filter(|e| e.live())
            .cloned();
        let flags = entry.as_ref().map_or(0, |e| e.flags);
        let has = |flag: u8| flags & flag != 0;
        let owner = entry.as_ref().and_then(|e| e.owner).unwrap_or_default();
        let revisions = entry.as_ref().map(|e| e.revisions.clone()).unwrap_or_default();
        let blocks: Vec<U256> = revisions.iter().copied().map(U256::from).collect();
        let count = U256::from(revisions.len());

        match call {
            Call::getExists(_) => {
                BlobStore::getExistsCall::abi_encode_returns(&(entry.is_some(),))
            }
            Call::getRevisionCount(_) => {
                BlobStore::getRevisionCountCall::abi_encode_returns(&(count,))
            }
            Call::getRevisionBlockNumber(c) => {
                let block = abi::to_u64(c.revisionId)
                    .ok()
                    .and_then(|i| usize::try_from(i).ok())
                    .and_then(|i| revisions.get(i).copied())
                    .unwrap_or(0);
                BlobStore::getRevisionBlockNumberCall::abi_encode_returns(&(U256::from(block),))
            }
            Call::getFlags(_) => {
                BlobStore::getFlagsCall::abi_encode_returns(&(flags_prefix(flags),))
            }
            Call::getUpdatable(_) => {
                BlobStore::getUpdatableCall::abi_encode_returns(&(has(BlobFlags::UPDATABLE),))
            }
            Call::getEnforceRevisions(_) => BlobStore::getEnforceRevisionsCall::abi_encode_returns(
                &(has(BlobFlags::ENFORCE_REVISIONS),),
            ),
            Call::getRetractable(_) => {
                BlobStore::getRetractableCall::abi_encode_returns(&(has(BlobFlags::RETRACTABLE),))
            }
            Call::getTransferable(_) => BlobStore::getTransferableCall::abi_encode_returns(
                &(has(BlobFlags::TRANSFERABLE),),
            ),
            Call::getOwner(_) => BlobStore::getOwnerCall::abi_encode_returns(&(owner,)),
            Call::getAllRevisionBlockNumbers(_) => {
                BlobStore::getAllRevisionBlockNumbersCall::abi_encode_returns(&(blocks,))
            }
            Call::getInfo(_) => BlobStore::getInfoCall::abi_encode_returns(&(
                flags_prefix(flags),
                owner,
                count,
                blocks,
            )),
            _ => Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// InMemoryLedger
// ---------------------------------------------------------------------------

/// Deterministic single-node chain for tests.
#[derive(Debug)]
pub struct InMemoryLedger {
    chain: Mutex<Chain>,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLedger {
    /// An empty chain (head 0) with [`DEFAULT_ACCOUNT`] unlocked.
    pub fn new() -> Self {
        Self::with_accounts(vec![DEFAULT_ACCOUNT])
    }

    /// An empty chain with the given unlocked accounts.
    pub fn with_accounts(accounts: Vec<Address>) -> Self {
        Self {
            chain: Mutex::new(Chain {
                accounts,
                ..Chain::default()
            }),
        }
    }

    /// Seals the mempool into a new block and returns its number.
    pub fn mine(&self) -> u64 {
        let mut chain = self.chain.lock();
        let txs = std::mem::take(&mut chain.mempool);
        chain.blocks.push(txs);
        chain.head()
    }

    /// Mines `n` blocks, the first of which takes the mempool.
    pub fn mine_blocks(&self, n: u64) -> u64 {
        let mut head = self.head();
        for _ in 0..n {
            head = self.mine();
        }
        head
    }

    /// Current head height.
    pub fn head(&self) -> u64 {
        self.chain.lock().head()
    }

    /// Unwinds the last block; its transactions return to the front of the
    /// mempool. Returns how many were returned.
    pub fn reorg_last_block(&self) -> usize {
        let mut chain = self.chain.lock();
        match chain.blocks.pop() {
            Some(mut txs) => {
                let n = txs.len();
                txs.append(&mut chain.mempool);
                chain.mempool = txs;
                n
            }
            None => 0,
        }
    }

    /// Unwinds the last block and discards its transactions.
    pub fn drop_last_block(&self) -> usize {
        self.chain.lock().blocks.pop().map_or(0, |txs| txs.len())
    }

    /// Makes every cost estimate fail with a node error.
    pub fn set_fail_estimation(&self, fail: bool) {
        self.chain.lock().fail_estimation = fail;
    }

    /// Accepts broadcasts but never lets them reach the mempool.
    pub fn set_drop_broadcasts(&self, drop: bool) {
        self.chain.lock().drop_broadcasts = drop;
    }

    /// Marks a revisioned-contract id as already taken, so the submitter
    /// has to move on to the next nonce candidate.
    pub fn reserve_blob_id(&self, id: &[u8]) {
        let mut raw = BlobId::ZERO;
        let n = id.len().min(BLOB_STORE_ID_SIZE);
        raw[..n].copy_from_slice(&id[..n]);
        self.chain.lock().reserved.insert(raw);
    }

    /// Transactions waiting in the mempool.
    pub fn mempool_len(&self) -> usize {
        self.chain.lock().mempool.len()
    }

    /// `eth_call` requests served so far.
    pub fn call_count(&self) -> u64 {
        self.chain.lock().calls
    }

    /// A handle that signs every call and transaction as `from`.
    pub fn signer(self: &Arc<Self>, from: Address) -> Signer {
        Signer {
            ledger: Arc::clone(self),
            from,
        }
    }

    fn node_error(method: &'static str, message: impl Into<String>) -> RpcError {
        RpcError::Node {
            method,
            code: RpcErrorObject::SERVER_ERROR,
            message: message.into(),
        }
    }
}

#[async_trait]
impl LedgerRpc for InMemoryLedger {
    async fn block_number(&self) -> Result<u64, RpcError> {
        Ok(self.head())
    }

    async fn call(&self, call: &CallRequest, view: BlockTag) -> Result<Vec<u8>, RpcError> {
        let mut chain = self.chain.lock();
        chain.calls += 1;
        let (mut world, block) = chain.world(view);
        let tx = chain.as_tx(call);
        Ok(world
            .apply(&tx, block, false, &chain.reserved)
            .unwrap_or_default())
    }

    async fn estimate_cost(&self, call: &CallRequest, view: BlockTag) -> Result<u64, RpcError> {
        let chain = self.chain.lock();
        if chain.fail_estimation {
            return Err(Self::node_error("eth_estimateGas", "gas estimation unavailable"));
        }
        let (mut world, block) = chain.world(view);
        let tx = chain.as_tx(call);
        world
            .apply(&tx, block, false, &chain.reserved)
            .map_err(|Revert(reason)| {
                Self::node_error("eth_estimateGas", format!("execution reverted: {reason}"))
            })?;
        Ok(BASE_COST + COST_PER_BYTE * call.data.len() as u64 + STORAGE_COST)
    }

    async fn send_transaction(&self, call: &CallRequest) -> Result<TxHash, RpcError> {
        let mut chain = self.chain.lock();
        let from = chain.sender(call).ok_or(RpcError::NoSender)?;
        chain.broadcasts += 1;

        let mut preimage = Vec::with_capacity(28 + call.data.len());
        preimage.extend_from_slice(from.as_slice());
        preimage.extend_from_slice(&chain.broadcasts.to_be_bytes());
        preimage.extend_from_slice(&call.data);
        let hash = keccak256(&preimage);

        if !chain.drop_broadcasts {
            chain.mempool.push(Tx {
                hash,
                from,
                to: call.to,
                input: call.data.clone(),
            });
        }
        Ok(hash)
    }

    async fn pending_block(&self) -> Result<PendingBlock, RpcError> {
        let chain = self.chain.lock();
        Ok(PendingBlock {
            number: Some(chain.head() + 1),
            transactions: chain
                .mempool
                .iter()
                .map(|tx| PendingTransaction {
                    hash: Some(tx.hash),
                    to: Some(tx.to),
                    input: tx.input.clone(),
                })
                .collect(),
        })
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>, RpcError> {
        let chain = self.chain.lock();
        let head = chain.head();
        let height = |tag: BlockTag| match tag {
            BlockTag::Latest => head,
            BlockTag::Pending => head + 1,
            BlockTag::Number(n) => n,
        };
        let (from, to) = (height(filter.from_block), height(filter.to_block));
        let view = if filter.to_block == BlockTag::Pending {
            BlockTag::Pending
        } else {
            BlockTag::Latest
        };

        let (world, _) = chain.world(view);
        Ok(world
            .logs
            .into_iter()
            .filter(|(address, entry)| {
                let at = entry.block_number.unwrap_or(head + 1);
                *address == filter.address
                    && (from..=to).contains(&at)
                    && filter.matches_topics(&entry.topics)
            })
            .map(|(_, entry)| entry)
            .collect())
    }

    async fn accounts(&self) -> Result<Vec<Address>, RpcError> {
        Ok(self.chain.lock().accounts.clone())
    }
}

/// [`InMemoryLedger`] view that acts as one account.
#[derive(Debug, Clone)]
pub struct Signer {
    ledger: Arc<InMemoryLedger>,
    from: Address,
}

impl Signer {
    fn sign(&self, call: &CallRequest) -> CallRequest {
        let mut call = call.clone();
        call.from = Some(self.from);
        call
    }
}

#[async_trait]
impl LedgerRpc for Signer {
    async fn block_number(&self) -> Result<u64, RpcError> {
        self.ledger.block_number().await
    }

    async fn call(&self, call: &CallRequest, view: BlockTag) -> Result<Vec<u8>, RpcError> {
        self.ledger.call(&self.sign(call), view).await
    }

    async fn estimate_cost(&self, call: &CallRequest, view: BlockTag) -> Result<u64, RpcError> {
        self.ledger.estimate_cost(&self.sign(call), view).await
    }

    async fn send_transaction(&self, call: &CallRequest) -> Result<TxHash, RpcError> {
        self.ledger.send_transaction(&self.sign(call)).await
    }

    async fn pending_block(&self) -> Result<PendingBlock, RpcError> {
        self.ledger.pending_block().await
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>, RpcError> {
        self.ledger.get_logs(filter).await
    }

    async fn accounts(&self) -> Result<Vec<Address>, RpcError> {
        Ok(vec![self.from])
    }
}
