//! TicketChain CLI application

use clap::{Parser, Subcommand};
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use ticketchain::{
    network::send_request, protocol::Request, server, LedgerError, LedgerNode, NodeConfig,
    ProofOfWork, Result,
};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "ticketchain-cli")]
#[command(about = "A minimal proof-of-work ledger for transfers and ticket ownership")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Node to send client commands to
    #[arg(long, default_value = ticketchain::DEFAULT_LISTEN_ADDR)]
    node: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 120)]
    timeout: u64,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a TicketChain node
    Start {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Address to listen on
        #[arg(short, long)]
        listen: Option<String>,

        /// Peer to register at startup (repeatable)
        #[arg(short, long = "peer")]
        peers: Vec<String>,

        /// Puzzle difficulty in leading hex zeros
        #[arg(long)]
        difficulty: Option<u32>,
    },
    /// Mine a block on the node
    Mine,
    /// Print the node's chain
    Chain,
    /// Validate the node's chain
    Validate,
    /// Issue a ticket
    Issue {
        #[arg(long)]
        tracker: String,
        #[arg(long)]
        company: String,
        #[arg(long)]
        origin: String,
        #[arg(long)]
        destination: String,
        /// Departure, formatted `YYYY-MM-DD HH:MM:SS`
        #[arg(long)]
        date: String,
        #[arg(long)]
        seat: String,
    },
    /// Buy a ticket from its current owner
    Buy {
        #[arg(long)]
        buyer: String,
        #[arg(long)]
        seller: String,
        #[arg(long)]
        amount: u64,
        #[arg(long)]
        tracker: String,
    },
    /// Register peers with the node
    Connect {
        #[arg(required = true)]
        nodes: Vec<String>,
    },
    /// Ask the node to adopt the longest valid peer chain
    Replace,
    /// List tickets currently owned by someone
    Tickets { owner: String },
    /// Solve the puzzle for a previous proof locally
    Solve {
        previous_proof: u64,
        #[arg(long, default_value_t = ticketchain::DEFAULT_DIFFICULTY)]
        difficulty: u32,
    },
    /// Show version information
    Version,
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

async fn run_client(cli: &Cli, request: Request) -> Result<()> {
    let response = send_request(&cli.node, &request, Duration::from_secs(cli.timeout)).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.debug { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    match &cli.command {
        Some(Commands::Start {
            config,
            listen,
            peers,
            difficulty,
        }) => {
            let mut node_config = match config {
                Some(path) => NodeConfig::from_toml_file(path)?,
                None => NodeConfig::default(),
            };
            if let Some(listen) = listen {
                node_config.listen_addr = listen.clone();
            }
            if let Some(difficulty) = difficulty {
                node_config.difficulty = *difficulty;
            }
            node_config.peers.extend(peers.iter().cloned());

            let listen_addr = node_config.listen_addr.clone();
            let node = Arc::new(LedgerNode::builder().with_config(node_config).build()?);
            info!("Starting TicketChain node {} on {}", node.id(), listen_addr);

            let addr = server::spawn(&listen_addr, Arc::clone(&node)).await?;
            info!("Node {} listening on {}", node.id(), addr);

            tokio::signal::ctrl_c().await?;
            info!("Shutting down node...");
        },
        Some(Commands::Mine) => run_client(&cli, Request::MineBlock).await?,
        Some(Commands::Chain) => run_client(&cli, Request::GetChain).await?,
        Some(Commands::Validate) => run_client(&cli, Request::IsValid).await?,
        Some(Commands::Issue {
            tracker,
            company,
            origin,
            destination,
            date,
            seat,
        }) => {
            let ticket = into_map(json!({
                "Tracker": tracker,
                "Company": company,
                "Origin": origin,
                "Destination": destination,
                "Date&hour": date,
                "Seat": seat,
            }));
            run_client(&cli, Request::IssueTicket { ticket }).await?
        },
        Some(Commands::Buy {
            buyer,
            seller,
            amount,
            tracker,
        }) => {
            let purchase = into_map(json!({
                "buyer": buyer,
                "seller": seller,
                "amount": amount,
                "tracker": tracker,
            }));
            run_client(&cli, Request::BuyTicket { purchase }).await?
        },
        Some(Commands::Connect { nodes }) => {
            let nodes = Some(nodes.clone());
            run_client(&cli, Request::ConnectNode { nodes }).await?
        },
        Some(Commands::Replace) => run_client(&cli, Request::ReplaceChain).await?,
        Some(Commands::Tickets { owner }) => {
            let owner = owner.clone();
            run_client(&cli, Request::GetTickets { owner }).await?
        },
        Some(Commands::Solve {
            previous_proof,
            difficulty,
        }) => {
            if *difficulty == 0 || *difficulty > 64 {
                return Err(LedgerError::config("difficulty must be between 1 and 64"));
            }
            let pow = ProofOfWork::with_difficulty(*difficulty);
            let proof = pow.solve(*previous_proof);
            println!("{}", proof);
        },
        Some(Commands::Version) | None => {
            println!("TicketChain Rust v{}", ticketchain::VERSION);
        },
    }

    Ok(())
}
