// Network node - manages peer connections and drives local operations

use crate::config::NodeConfig;
use crate::consensus::{Miner, MiningOutcome};
use crate::core::{Address, Block, Clock, Secp256k1Verifier, Signer, SystemClock, Transaction, Verifier};
use crate::error::{LedgerError, Result};
use crate::ledger::{Admission, ReplaceOutcome, TransactionRecord};
use crate::network::gossip::log_handler_error;
use crate::network::{
    read_frame, Direction, Frame, Message, Notification, NodeState, PaymentNotice, PeerInfo, Priority,
    MAX_MESSAGE_BYTES,
};
use crate::storage::ChainStore;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::task::JoinHandle;

/// Lines buffered per peer before the peer counts as stuck
const OUTBOUND_QUEUE: usize = 256;

/// Poll interval while waiting for the first peer
const PEER_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Searches a funding block may lose to a moving tip before giving up
const FUNDING_ATTEMPTS: usize = 3;

/// What goes into a block about to be mined
enum BlockContent {
    /// The pending pool, plus a reward for this address when one is due
    Pending(Address),
    /// Exactly these transactions, unrewarded
    Exact(Vec<Transaction>),
}

/// Network node
#[derive(Clone)]
pub struct Node {
    config: Arc<NodeConfig>,
    state: Arc<RwLock<NodeState>>,
    verifier: Arc<dyn Verifier>,
    clock: Arc<dyn Clock>,
    miner: Miner,
    /// Held for the whole of a nonce search; later searches queue behind it
    mining_slot: Arc<Mutex<()>>,
}

impl Node {
    /// Create a node with secp256k1 verification and the system clock
    pub fn new(config: NodeConfig) -> Result<Self> {
        Self::with_capabilities(config, Arc::new(Secp256k1Verifier::new()), Arc::new(SystemClock))
    }

    /// Create a node with explicit crypto and clock capabilities
    pub fn with_capabilities(
        config: NodeConfig,
        verifier: Arc<dyn Verifier>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let difficulty = config.difficulty()?;
        let mut state = NodeState::new(&config, difficulty);

        if let Some(dir) = &config.data_dir {
            let store = ChainStore::new(dir)?;
            let stored = store.load_chain()?;
            match state.ledger.replace_with(stored) {
                ReplaceOutcome::Replaced { new_len, .. } => {
                    log::info!("Loaded {} blocks from {}", new_len, dir.display());
                }
                ReplaceOutcome::NotLonger => {
                    store.store_chain(state.ledger.blocks())?;
                }
                ReplaceOutcome::Invalid(e) => {
                    return Err(LedgerError::Storage(format!(
                        "Stored chain in {} is invalid: {}",
                        dir.display(),
                        e
                    )));
                }
            }
            state.attach_store(store);
        }

        Ok(Self {
            config: Arc::new(config),
            state: Arc::new(RwLock::new(state)),
            verifier,
            clock,
            miner: Miner::new(difficulty),
            mining_slot: Arc::new(Mutex::new(())),
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Bind, start serving, dial the bootstrap peers and launch the
    /// background tasks. Returns the bound address.
    pub async fn start(&self) -> Result<SocketAddr> {
        let listener = TcpListener::bind(self.config.listen)
            .await
            .map_err(|e| LedgerError::PeerIo(format!("Failed to bind {}: {}", self.config.listen, e)))?;
        let local = listener.local_addr()?;
        self.state.write().await.identity.port = local.port();

        log::info!("Node listening on {}", local);
        let node = self.clone();
        tokio::spawn(async move { node.listen(listener).await });

        for addr in &self.config.peers {
            if let Err(e) = self.connect(*addr).await {
                log::warn!("Bootstrap peer {} unavailable: {}", addr, e);
            }
        }

        self.spawn_sync();
        if let (Some(secs), Some(address)) = (self.config.mine_interval_secs, self.config.miner_address.clone()) {
            self.spawn_miner(Duration::from_secs(secs), address);
        }

        Ok(local)
    }

    /// Accept connections until the listener fails
    pub async fn listen(&self, listener: TcpListener) {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    log::info!("New connection from {}", addr);
                    self.attach(stream, addr, Direction::Inbound).await;
                }
                Err(e) => {
                    log::error!("Failed to accept connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }

    /// Dial a peer, then ask for its chain and introduce ourselves
    pub async fn connect(&self, addr: SocketAddr) -> Result<u64> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| LedgerError::PeerIo(format!("Failed to connect to {}: {}", addr, e)))?;
        log::info!("Connected to peer {}", addr);

        let id = self.attach(stream, addr, Direction::Outbound).await;

        let mut state = self.state.write().await;
        let identity = state.identity.clone();
        state.peers.send_to(id, &Message::GetChain)?;
        state.peers.send_to(id, &Message::PeerInfo { data: identity })?;
        Ok(id)
    }

    /// Register a connection and spawn its reader and writer tasks
    async fn attach(&self, stream: TcpStream, addr: SocketAddr, direction: Direction) -> u64 {
        let (reader, writer) = stream.into_split();
        let (outbound, queue) = mpsc::channel(OUTBOUND_QUEUE);

        let id = self.state.write().await.peers.register(addr, direction, outbound);

        self.spawn_writer(writer, queue, id, addr);
        let node = self.clone();
        tokio::spawn(async move { node.read_loop(reader, id, addr).await });
        id
    }

    /// Drain the queue into `writer`; a failed write drops the peer at once
    fn spawn_writer<W>(&self, writer: W, queue: mpsc::Receiver<String>, id: u64, addr: SocketAddr) -> JoinHandle<()>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let node = self.clone();
        tokio::spawn(async move {
            if let Err(e) = write_loop(writer, queue).await {
                log::warn!("Failed to write to peer {} ({}): {}", id, addr, e);
                node.state.write().await.peers.remove(id);
            }
        })
    }

    async fn read_loop(&self, reader: OwnedReadHalf, id: u64, addr: SocketAddr) {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            match read_frame(&mut reader, &mut buf, MAX_MESSAGE_BYTES).await {
                Ok(Frame::Line(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    self.handle_line(id, &line).await;
                }
                Ok(Frame::Oversized) => {
                    log::warn!(
                        "Peer {} ({}) sent a record over {} bytes, disconnecting",
                        id,
                        addr,
                        MAX_MESSAGE_BYTES
                    );
                    break;
                }
                Ok(Frame::Closed) => {
                    log::info!("Peer {} ({}) closed the connection", id, addr);
                    break;
                }
                Err(e) => {
                    log::warn!("Failed to read from peer {} ({}): {}", id, addr, e);
                    break;
                }
            }
        }
        self.state.write().await.peers.remove(id);
    }

    async fn handle_line(&self, origin: u64, line: &str) {
        let message = match Message::decode(line) {
            Ok(message) => message,
            Err(e) => {
                log::warn!("Discarding message from peer {}: {}", origin, e);
                return;
            }
        };

        let kind = message.message_type();
        log::debug!("Received {} from peer {}", kind, origin);

        let now = self.clock.now_ms();
        let mut state = self.state.write().await;
        if let Err(e) = state.handle_message(origin, message, self.verifier.as_ref(), now) {
            log_handler_error(origin, kind, &e);
        }
    }

    /// Admit a locally created transaction, gossip it and notify the recipient
    pub async fn submit_transaction(&self, tx: Transaction) -> Result<Admission> {
        let now = self.clock.now_ms();
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        if state.peers.is_empty() {
            return Err(LedgerError::NoPeers);
        }

        let admission = state.mempool.admit(tx.clone(), &state.ledger, self.verifier.as_ref())?;
        if admission == Admission::Duplicate {
            return Ok(admission);
        }

        state.recent.insert(tx.identity(), now);
        let report = state.peers.broadcast(&Message::NewTransaction { data: tx.clone() });
        log::info!(
            "Transaction {} -> {} ({} coins) sent to {} peers",
            tx.from.short(),
            tx.to.short(),
            tx.amount,
            report.delivered
        );

        if !tx.is_mint() {
            let notice = PaymentNotice {
                from: tx.from.clone(),
                amount: tx.amount,
                timestamp: tx.timestamp,
                confirmed: false,
                pending_balance: clamp(state.ledger.balance_of(&tx.to, Some(&state.mempool))),
                confirmed_balance: clamp(state.ledger.balance_of(&tx.to, None)),
            };
            state.peers.broadcast(&Message::DirectNotification {
                recipient_address: tx.to.clone(),
                data: Notification::PaymentReceived(notice),
            });
        }

        Ok(admission)
    }

    /// Build, sign and submit a transfer from `signer` to `to`
    pub async fn transfer(
        &self,
        signer: &(dyn Signer + Sync),
        to: Address,
        amount: u64,
    ) -> Result<Transaction> {
        let mut tx = Transaction::new(signer.address(), to, amount, self.clock.now_ms());
        tx.sign(signer);
        self.submit_transaction(tx.clone()).await?;
        Ok(tx)
    }

    /// Seal the pending pool into a block, rewarding `miner_address` when
    /// the reward policy says so. Waits for a search already in flight.
    /// Returns `None` when the search was cancelled or the tip moved
    /// underneath it.
    pub async fn mine_pending(&self, miner_address: Address) -> Result<Option<Block>> {
        self.mine_block(BlockContent::Pending(miner_address)).await
    }

    async fn mine_block(&self, content: BlockContent) -> Result<Option<Block>> {
        let _slot = self.mining_slot.lock().await;
        let now = self.clock.now_ms();
        let (mut candidate, cancel, transfers, rewarded) = {
            let mut guard = self.state.write().await;
            let state = &mut *guard;

            let (transactions, transfers, rewarded) = match content {
                BlockContent::Pending(miner_address) => {
                    let mut transactions = state.mempool.select_for_block(&state.ledger);
                    let transfers = transactions.iter().filter(|tx| !tx.is_mint()).count();
                    let rewarded = state.rewards.reward_due(transfers);
                    if rewarded {
                        transactions.push(Transaction::mint(miner_address, state.rewards.amount(), now));
                    }
                    (transactions, transfers, rewarded)
                }
                BlockContent::Exact(transactions) => (transactions, 0, false),
            };

            let tip = state.ledger.tip();
            let candidate = Block::candidate(tip.index + 1, tip.hash, now, transactions);
            let cancel = Arc::new(AtomicBool::new(false));
            state.mining = Some(cancel.clone());
            (candidate, cancel, transfers, rewarded)
        };

        log::info!(
            "Mining block {} with {} transactions",
            candidate.index,
            candidate.transactions.len()
        );

        let miner = self.miner.clone();
        let flag = cancel.clone();
        let search = tokio::task::spawn_blocking(move || {
            let result = miner.mine(&mut candidate, &flag);
            (candidate, result)
        })
        .await;

        let mut guard = self.state.write().await;
        let state = &mut *guard;
        state.mining = None;

        let (block, result) = search.map_err(|e| LedgerError::Mining(format!("Mining task failed: {}", e)))?;
        match result.outcome {
            MiningOutcome::Found { nonce, hash } => {
                log::info!(
                    "Block {} mined: nonce {}, hash {} ({} attempts, {:.1} KH/s)",
                    block.index,
                    nonce,
                    hash,
                    result.attempts,
                    result.hash_rate() / 1000.0
                );
            }
            MiningOutcome::Cancelled => {
                log::info!("Mining of block {} cancelled", block.index);
                return Ok(None);
            }
            MiningOutcome::Exhausted => {
                return Err(LedgerError::Mining("nonce space exhausted".to_string()));
            }
        }

        if let Err(e) = state.accept_block(block.clone()) {
            log::warn!("Mined block {} is stale: {}", block.index, e);
            return Ok(None);
        }
        state.rewards.record_block(transfers, rewarded);

        let report = state.peers.broadcast(&Message::NewBlock {
            data: block.clone(),
            priority: Some(Priority::High),
        });
        log::info!("Block {} broadcast to {} peers", block.index, report.delivered);

        Ok(Some(block))
    }

    /// One-time grant of `funding_amount` to a new address, sealed in a
    /// block of its own. Waits for a live peer first. Returns `None` if the
    /// address was already funded; on failure the address can be funded again.
    pub async fn fund_account(&self, address: Address) -> Result<Option<Block>> {
        {
            let mut state = self.state.write().await;
            if state.funded.contains(&address) || state.ledger.balance_of(&address, None) > 0 {
                log::info!("Account {} has already been funded", address.short());
                return Ok(None);
            }
            state.funded.insert(address.clone());
        }

        match self.seal_grant(&address).await {
            Ok(block) => {
                log::info!(
                    "Initial funding: {} coins given to {}",
                    self.config.funding_amount,
                    address.short()
                );
                Ok(Some(block))
            }
            Err(e) => {
                self.state.write().await.funded.remove(&address);
                Err(e)
            }
        }
    }

    async fn seal_grant(&self, address: &Address) -> Result<Block> {
        self.wait_for_peers().await;

        for attempt in 1..=FUNDING_ATTEMPTS {
            let grant = Transaction::mint(address.clone(), self.config.funding_amount, self.clock.now_ms());
            if let Some(block) = self.mine_block(BlockContent::Exact(vec![grant])).await? {
                return Ok(block);
            }
            log::info!(
                "Funding block for {} went stale ({}/{})",
                address.short(),
                attempt,
                FUNDING_ATTEMPTS
            );
        }
        Err(LedgerError::Mining(format!(
            "funding block for {} lost to the moving tip {} times",
            address.short(),
            FUNDING_ATTEMPTS
        )))
    }

    /// Resolve once at least one peer is connected
    pub async fn wait_for_peers(&self) {
        if self.peer_count().await > 0 {
            return;
        }
        log::info!("Waiting for at least one peer to connect...");
        while self.peer_count().await == 0 {
            tokio::time::sleep(PEER_POLL_INTERVAL).await;
        }
    }

    /// Broadcast GET_CHAIN to every peer now
    pub async fn request_chain(&self) {
        let report = self.state.write().await.peers.broadcast(&Message::GetChain);
        log::debug!("Requested chain from {} peers", report.delivered);
    }

    /// Periodic chain exchange and recent-cache expiry
    pub fn spawn_sync(&self) -> JoinHandle<()> {
        let node = self.clone();
        let period = Duration::from_secs(self.config.sync_interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                node.request_chain().await;

                let now = node.clock.now_ms();
                let expired = node.state.write().await.recent.prune(now);
                if expired > 0 {
                    log::debug!("Expired {} recent transactions", expired);
                }
            }
        })
    }

    /// Mine on a fixed interval
    pub fn spawn_miner(&self, period: Duration, miner_address: Address) -> JoinHandle<()> {
        let node = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let idle = node.state.read().await.mempool.is_empty();
                if idle && !node.config.mine_empty_blocks {
                    continue;
                }
                if let Err(e) = node.mine_pending(miner_address.clone()).await {
                    log::warn!("Periodic mining failed: {}", e);
                }
            }
        })
    }

    pub async fn balance(&self, address: &Address, include_pending: bool) -> i128 {
        let state = self.state.read().await;
        let pending = include_pending.then_some(&state.mempool);
        state.ledger.balance_of(address, pending)
    }

    pub async fn transactions_for(&self, address: &Address) -> Vec<TransactionRecord> {
        let state = self.state.read().await;
        state.ledger.transactions_for(address, &state.mempool)
    }

    pub async fn all_balances(&self) -> BTreeMap<Address, i128> {
        self.state.read().await.ledger.all_balances()
    }

    pub async fn pending(&self) -> Vec<Transaction> {
        self.state.read().await.mempool.pending().to_vec()
    }

    pub async fn chain(&self) -> Vec<Block> {
        self.state.read().await.ledger.blocks().to_vec()
    }

    pub async fn chain_len(&self) -> usize {
        self.state.read().await.ledger.len()
    }

    pub async fn peers(&self) -> Vec<PeerInfo> {
        self.state.read().await.peers.list()
    }

    pub async fn peer_count(&self) -> usize {
        self.state.read().await.peers.len()
    }

    /// Notifications received for `local_address`, oldest first
    pub async fn inbox(&self) -> Vec<Notification> {
        self.state.read().await.inbox.iter().cloned().collect()
    }

    /// Like `inbox`, but clears what it returns
    pub async fn take_inbox(&self) -> Vec<Notification> {
        self.state.write().await.take_inbox()
    }
}

/// Runs until the registry drops the sender or a write fails
async fn write_loop<W>(mut writer: W, mut queue: mpsc::Receiver<String>) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = queue.recv().await {
        writer.write_all(line.as_bytes()).await?;
    }
    writer.shutdown().await
}

fn clamp(balance: i128) -> i64 {
    i64::try_from(balance).unwrap_or(if balance < 0 { i64::MIN } else { i64::MAX })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::Difficulty;
    use crate::core::ManualClock;
    use crate::ledger::Ledger;
    use crate::ledger::chain::test_support::{difficulty, mine_into};
    use crate::wallet::KeyPair;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    const NOW: u64 = 1_700_000_100_000;

    fn test_config() -> NodeConfig {
        NodeConfig {
            listen: SocketAddr::from(([127, 0, 0, 1], 0)),
            difficulty: 1,
            ..NodeConfig::default()
        }
    }

    fn test_node() -> Node {
        Node::with_capabilities(
            test_config(),
            Arc::new(Secp256k1Verifier::new()),
            Arc::new(ManualClock::new(NOW)),
        )
        .unwrap()
    }

    /// Register a channel-backed peer so peer-gated operations can run
    async fn fake_peer(node: &Node) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(64);
        node.state
            .write()
            .await
            .peers
            .register(SocketAddr::from(([127, 0, 0, 1], 9)), Direction::Outbound, tx);
        rx
    }

    fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<Message> {
        let mut out = Vec::new();
        while let Ok(line) = rx.try_recv() {
            out.push(Message::decode(line.trim_end()).unwrap());
        }
        out
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let config = NodeConfig { difficulty: 0, ..test_config() };
        assert!(matches!(Node::new(config), Err(LedgerError::Config(_))));
    }

    #[tokio::test]
    async fn test_submit_requires_peer() {
        let node = test_node();
        let alice = KeyPair::generate();

        let result = node.transfer(&alice, Address::new("02bb"), 10).await;
        assert_eq!(result.err(), Some(LedgerError::NoPeers));
    }

    #[tokio::test]
    async fn test_funding_and_transfer_scenario() {
        let node = test_node();
        let mut peer = fake_peer(&node).await;
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();

        let funding = node.fund_account(alice.address.clone()).await.unwrap().unwrap();
        assert_eq!(funding.transactions.len(), 1);
        assert_eq!(node.balance(&alice.address, false).await, 500);

        // Second funding attempt is a no-op
        assert!(node.fund_account(alice.address.clone()).await.unwrap().is_none());
        assert_eq!(node.chain_len().await, 2);

        node.transfer(&alice, bob.address.clone(), 120).await.unwrap();
        assert_eq!(node.balance(&alice.address, true).await, 380);
        assert_eq!(node.balance(&alice.address, false).await, 500);

        let miner = KeyPair::generate();
        let block = node.mine_pending(miner.address.clone()).await.unwrap().unwrap();
        assert_eq!(block.transfer_count(), 1);

        assert_eq!(node.balance(&alice.address, false).await, 380);
        assert_eq!(node.balance(&bob.address, false).await, 120);
        assert_eq!(node.balance(&miner.address, false).await, 100);
        assert!(node.pending().await.is_empty());

        let sent = drain(&mut peer);
        let types: Vec<&str> = sent.iter().map(|m| m.message_type()).collect();
        assert_eq!(
            types,
            vec!["BLOCK", "TRANSACTION", "DIRECT_NOTIFICATION", "BLOCK"]
        );
        assert!(matches!(
            sent.last(),
            Some(Message::NewBlock { priority: Some(Priority::High), .. })
        ));
    }

    #[tokio::test]
    async fn test_funding_waits_for_search_in_flight() {
        let node = test_node();
        let _peer = fake_peer(&node).await;
        let alice = KeyPair::generate();
        let carol = Address::new("02cc");

        node.fund_account(alice.address.clone()).await.unwrap();
        node.transfer(&alice, Address::new("02bb"), 50).await.unwrap();

        let search = node.mining_slot.lock().await;
        let funder = node.clone();
        let recipient = carol.clone();
        let funding = tokio::spawn(async move { funder.fund_account(recipient).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!funding.is_finished());
        drop(search);

        let block = funding.await.unwrap().unwrap().unwrap();
        assert_eq!(block.transactions, vec![Transaction::mint(carol.clone(), 500, NOW)]);
        assert_eq!(node.balance(&carol, false).await, 500);

        // The pending transfer waits for a regular block
        assert_eq!(node.pending().await.len(), 1);
        assert!(node.fund_account(carol).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_longer_chain_cancels_search_in_flight() {
        let mut node = test_node();
        // Out of reach, so only cancellation can end the search
        node.miner = Miner::new(Difficulty::new(12).unwrap());

        let miner = node.clone();
        let search = tokio::spawn(async move { miner.mine_pending(Address::new("02ee")).await });
        while !node.state.read().await.is_mining() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let mut longer = Ledger::new(difficulty());
        mine_into(&mut longer, vec![Transaction::mint(Address::new("02aa"), 1, 1)]);
        mine_into(&mut longer, vec![Transaction::mint(Address::new("02aa"), 1, 2)]);
        let chain = Message::Chain { data: longer.blocks().to_vec() };
        node.state
            .write()
            .await
            .handle_message(7, chain, &Secp256k1Verifier::new(), NOW)
            .unwrap();

        let mined = tokio::time::timeout(Duration::from_secs(10), search)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(mined.is_none());
        assert_eq!(node.chain().await, longer.blocks());
        assert!(!node.state.read().await.is_mining());
    }

    struct BrokenPipe;

    impl AsyncWrite for BrokenPipe {
        fn poll_write(self: Pin<&mut Self>, _: &mut Context<'_>, _: &[u8]) -> Poll<std::io::Result<usize>> {
            Poll::Ready(Err(std::io::ErrorKind::BrokenPipe.into()))
        }

        fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_write_failure_removes_peer() {
        let node = test_node();
        let (outbound, queue) = mpsc::channel(4);
        let addr = SocketAddr::from(([127, 0, 0, 1], 9));
        let id = node.state.write().await.peers.register(addr, Direction::Outbound, outbound);

        let writer = node.spawn_writer(BrokenPipe, queue, id, addr);
        node.state.write().await.peers.send_to(id, &Message::GetChain).unwrap();
        writer.await.unwrap();

        assert_eq!(node.peer_count().await, 0);
    }

    #[tokio::test]
    async fn test_threshold_reward_policy() {
        let config = NodeConfig {
            reward: crate::config::RewardConfig {
                policy: crate::consensus::RewardPolicy::AfterTransactions { threshold: 2 },
                amount: 100,
            },
            ..test_config()
        };
        let node = Node::with_capabilities(
            config,
            Arc::new(Secp256k1Verifier::new()),
            Arc::new(ManualClock::new(NOW)),
        )
        .unwrap();
        let _peer = fake_peer(&node).await;
        let alice = KeyPair::generate();
        let miner = Address::new("02ee");

        node.fund_account(alice.address.clone()).await.unwrap();

        node.transfer(&alice, Address::new("02bb"), 1).await.unwrap();
        node.mine_pending(miner.clone()).await.unwrap();
        assert_eq!(node.balance(&miner, false).await, 0);

        node.transfer(&alice, Address::new("02cc"), 1).await.unwrap();
        node.mine_pending(miner.clone()).await.unwrap();
        assert_eq!(node.balance(&miner, false).await, 100);
    }

    #[tokio::test]
    async fn test_queries() {
        let node = test_node();
        let _peer = fake_peer(&node).await;
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();

        node.fund_account(alice.address.clone()).await.unwrap();
        node.transfer(&alice, bob.address.clone(), 50).await.unwrap();

        let history = node.transactions_for(&bob.address).await;
        assert_eq!(history.len(), 1);
        assert!(history[0].is_pending());

        let balances = node.all_balances().await;
        assert_eq!(balances.get(&alice.address), Some(&500));
        assert_eq!(balances.get(&bob.address), None);

        assert_eq!(node.peers().await.len(), 1);
    }

    #[tokio::test]
    async fn test_persisted_chain_is_reloaded() {
        let dir = std::env::temp_dir().join(format!("peer-ledger-test-{}", rand::random::<u64>()));
        let config = NodeConfig {
            data_dir: Some(dir.clone()),
            ..test_config()
        };

        {
            let node = Node::new(config.clone()).unwrap();
            let _peer = fake_peer(&node).await;
            node.fund_account(Address::new("02aa")).await.unwrap();
            assert_eq!(node.chain_len().await, 2);
        }

        let reopened = Node::new(config).unwrap();
        assert_eq!(reopened.chain_len().await, 2);
        assert_eq!(reopened.balance(&Address::new("02aa"), false).await, 500);

        let _ = std::fs::remove_dir_all(dir);
    }
}
