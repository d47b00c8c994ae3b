// CLI commands

use crate::config::NodeConfig;
use crate::consensus::{BlockValidator, Difficulty};
use crate::core::{Address, Block};
use crate::error::{LedgerError, Result};
use crate::network::Node;
use crate::wallet::KeyPair;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "peer-ledger")]
#[command(about = "Peer-replicated proof-of-work ledger", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a ledger node
    Node(NodeArgs),

    /// Print the canonical genesis block
    Genesis,

    /// Validate a JSON chain snapshot
    Validate {
        /// File holding a JSON array of blocks
        file: PathBuf,
        /// Required leading zero hex digits
        #[arg(short, long, default_value_t = 2)]
        difficulty: u32,
    },

    /// Generate a key pair; the public key is the address
    Keygen,
}

#[derive(clap::Args, Default)]
pub struct NodeArgs {
    /// JSON config file; flags below override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// P2P listen address
    #[arg(short, long)]
    pub listen: Option<SocketAddr>,

    /// Bootstrap peer (repeatable)
    #[arg(short, long = "peer")]
    pub peers: Vec<SocketAddr>,

    /// Node name announced to peers
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub difficulty: Option<u32>,

    /// Mine pending transactions every N seconds
    #[arg(long)]
    pub mine_interval: Option<u64>,

    /// Reward recipient for periodic mining
    #[arg(long)]
    pub miner_address: Option<String>,

    /// Address whose payment notifications this node shows
    #[arg(long)]
    pub local_address: Option<String>,

    /// Persist the chain in this directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Grant initial funding to this address once a peer is connected
    #[arg(long)]
    pub fund: Option<String>,
}

impl NodeArgs {
    /// Config file (or defaults) with command-line overrides applied
    pub fn into_config(self) -> Result<NodeConfig> {
        let mut config = match &self.config {
            Some(path) => NodeConfig::load(path)?,
            None => NodeConfig::default(),
        };

        if let Some(listen) = self.listen {
            config.listen = listen;
        }
        config.peers.extend(self.peers);
        if let Some(name) = self.name {
            config.name = name;
        }
        if let Some(difficulty) = self.difficulty {
            config.difficulty = difficulty;
        }
        if let Some(secs) = self.mine_interval {
            config.mine_interval_secs = Some(secs);
        }
        if let Some(address) = self.miner_address {
            config.miner_address = Some(Address::new(address));
        }
        if let Some(address) = self.local_address {
            config.local_address = Some(Address::new(address));
        }
        if let Some(dir) = self.data_dir {
            config.data_dir = Some(dir);
        }

        config.validate()?;
        Ok(config)
    }
}

/// CLI handler
pub struct CliHandler;

impl CliHandler {
    /// Handle CLI command
    pub async fn handle(cli: Cli) -> Result<()> {
        match cli.command {
            Commands::Node(args) => Self::run_node(args).await,
            Commands::Genesis => Self::genesis(),
            Commands::Validate { file, difficulty } => Self::validate(file, difficulty),
            Commands::Keygen => {
                let keypair = KeyPair::generate();
                println!("Address:     {}", keypair.address);
                println!("Private key: {}", keypair.secret_hex());
                Ok(())
            }
        }
    }

    async fn run_node(args: NodeArgs) -> Result<()> {
        let fund = args.fund.clone().map(Address::new);
        let config = args.into_config()?;
        let node = Node::new(config)?;
        let local = node.start().await?;
        println!("Node listening on {}", local);

        if let Some(address) = fund {
            let funder = node.clone();
            tokio::spawn(async move {
                if let Err(e) = funder.fund_account(address).await {
                    log::error!("Initial funding failed: {}", e);
                }
            });
        }

        tokio::signal::ctrl_c()
            .await
            .map_err(|e| LedgerError::PeerIo(format!("Failed to wait for shutdown signal: {}", e)))?;
        log::info!("Shutting down ({} blocks)", node.chain_len().await);
        Ok(())
    }

    fn genesis() -> Result<()> {
        let genesis = Block::genesis();
        let json = serde_json::to_string_pretty(&genesis)
            .map_err(|e| LedgerError::Storage(format!("Failed to encode genesis: {}", e)))?;
        println!("{}", json);
        Ok(())
    }

    fn validate(file: PathBuf, difficulty: u32) -> Result<()> {
        let text = std::fs::read_to_string(&file)
            .map_err(|e| LedgerError::Config(format!("Failed to read {}: {}", file.display(), e)))?;
        let chain: Vec<Block> = serde_json::from_str(&text)
            .map_err(|e| LedgerError::Config(format!("Failed to parse {}: {}", file.display(), e)))?;

        let difficulty = Difficulty::new(difficulty).map_err(LedgerError::Config)?;
        BlockValidator::new(difficulty).validate_chain(&chain)?;

        println!("✓ Chain is valid ({} blocks)", chain.len());
        Ok(())
    }
}
