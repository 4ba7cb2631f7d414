use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use idec_node::store::Registration;
use idec_node::{init_logging, Node, NodeConfig};

#[derive(Parser, Debug)]
#[command(name = "idec-node")]
#[command(author, version, about = "IDEC echomail node", long_about = None)]
struct Args {
    /// Path to the TOML configuration; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured log filter, e.g. `debug` or `idec_sync=trace,info`
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the node over HTTP until interrupted
    Serve,
    /// Pull new messages from the configured uplink once
    Fetch,
    /// Manage points
    Point {
        #[command(subcommand)]
        action: PointCommand,
    },
}

#[derive(Subcommand, Debug)]
enum PointCommand {
    /// Register a point and print its authstr
    Add {
        /// Point username
        name: String,
    },
    /// List registered points
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => NodeConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => NodeConfig::default(),
    };
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    init_logging(&config.logging)?;

    let node = Node::open(config)?;

    match args.command {
        Command::Serve => {
            node.serve(shutdown_signal()).await?;
        }
        Command::Fetch => {
            let report = node.fetch().await?;
            println!("{} new messages", report.saved);
        }
        Command::Point {
            action: PointCommand::Add { name },
        } => match node.register_point(&name).await? {
            Registration::Created(authstr) => {
                println!("Username: {}", name);
                println!("Authstr: {}", authstr);
            }
            Registration::AlreadyExists => bail!("point {} already exists", name),
        },
        Command::Point {
            action: PointCommand::List,
        } => {
            for name in node.list_points().await? {
                println!("{}", name);
            }
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("interrupt received, shutting down");
    }
}
