//! # Docstore CLI Entry Point
//!
//! Sends single commands to a docstore cluster through the request executor
//! and prints the JSON result.
//!
//! ## Usage
//!
//! ```bash
//! # Print the database topology
//! docstore topology -u http://127.0.0.1:8080 -d northwind
//!
//! # Print the cluster membership
//! docstore cluster-topology -u http://127.0.0.1:8080
//!
//! # Seed with several nodes and spread reads round-robin
//! docstore databases -u http://127.0.0.1:8080 -u http://127.0.0.1:8081 --read-balance round-robin
//!
//! # Allocate an operation id, then wait for that operation
//! docstore next-operation-id -u http://127.0.0.1:8080 -d northwind
//! docstore wait-operation -u http://127.0.0.1:8080 -d northwind 42 --wait-timeout-ms 60000
//! ```
//!
//! ## URL Format
//!
//! All URLs must include the `http://` or `https://` prefix:
//! - ✅ `http://127.0.0.1:8080`
//! - ✅ `https://example.com:8080`
//! - ❌ `127.0.0.1:8080`

use anyhow::Result;
use argh::FromArgs;
use docstore_cli::{connect, connect_cluster, executor_config};
use docstore_client::RequestExecutor;

#[derive(FromArgs)]
/// docstore - cluster-aware document database client
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

/// Available CLI subcommands.
#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Topology(TopologyArgs),
    ClusterTopology(ClusterTopologyArgs),
    Databases(DatabasesArgs),
    NextOperationId(NextOperationIdArgs),
    WaitOperation(WaitOperationArgs),
}

#[derive(FromArgs)]
#[argh(subcommand, name = "topology")]
/// print the topology of a database
struct TopologyArgs {
    /// seed node url (repeatable)
    #[argh(option, short = 'u', long = "url")]
    urls: Vec<String>,

    /// database name
    #[argh(option, short = 'd')]
    database: String,

    /// read balance behavior: none, round-robin or fastest-node
    #[argh(option, long = "read-balance", default = "\"none\".into()")]
    read_balance: String,

    /// per-command timeout in milliseconds
    #[argh(option, long = "timeout-ms", default = "30000")]
    timeout_ms: u64,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "cluster-topology")]
/// print the cluster membership
struct ClusterTopologyArgs {
    /// seed node url (repeatable)
    #[argh(option, short = 'u', long = "url")]
    urls: Vec<String>,

    /// per-command timeout in milliseconds
    #[argh(option, long = "timeout-ms", default = "30000")]
    timeout_ms: u64,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "databases")]
/// list database names on the cluster
struct DatabasesArgs {
    /// seed node url (repeatable)
    #[argh(option, short = 'u', long = "url")]
    urls: Vec<String>,

    /// read balance behavior: none, round-robin or fastest-node
    #[argh(option, long = "read-balance", default = "\"none\".into()")]
    read_balance: String,

    /// per-command timeout in milliseconds
    #[argh(option, long = "timeout-ms", default = "30000")]
    timeout_ms: u64,

    /// index of the first name to return
    #[argh(option, default = "0")]
    start: usize,

    /// maximum number of names to return
    #[argh(option, long = "page-size", default = "25")]
    page_size: usize,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "next-operation-id")]
/// allocate a server operation id
struct NextOperationIdArgs {
    /// seed node url (repeatable)
    #[argh(option, short = 'u', long = "url")]
    urls: Vec<String>,

    /// database name
    #[argh(option, short = 'd')]
    database: String,

    /// read balance behavior: none, round-robin or fastest-node
    #[argh(option, long = "read-balance", default = "\"none\".into()")]
    read_balance: String,

    /// per-command timeout in milliseconds
    #[argh(option, long = "timeout-ms", default = "30000")]
    timeout_ms: u64,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "wait-operation")]
/// wait for a long-running operation and print its result
struct WaitOperationArgs {
    /// operation id
    #[argh(positional)]
    id: i64,

    /// seed node url (repeatable)
    #[argh(option, short = 'u', long = "url")]
    urls: Vec<String>,

    /// database name
    #[argh(option, short = 'd')]
    database: String,

    /// read balance behavior: none, round-robin or fastest-node
    #[argh(option, long = "read-balance", default = "\"none\".into()")]
    read_balance: String,

    /// per-poll timeout in milliseconds
    #[argh(option, long = "timeout-ms", default = "30000")]
    timeout_ms: u64,

    /// overall wait timeout in milliseconds, 0 waits forever
    #[argh(option, long = "wait-timeout-ms", default = "0")]
    wait_timeout_ms: u64,

    /// time between status polls in milliseconds
    #[argh(option, long = "poll-interval-ms", default = "500")]
    poll_interval_ms: u64,
}

fn executor(urls: Vec<String>, database: &str, read_balance: &str, timeout_ms: u64) -> Result<RequestExecutor> {
    let config = executor_config(read_balance, timeout_ms)?;
    connect(urls, database, config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    // Logs go to stderr so stdout stays pipeable JSON
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Topology(args) => {
            let executor = executor(args.urls, &args.database, &args.read_balance, args.timeout_ms)?;
            docstore_cli::topology(&executor).await?
        }
        Commands::ClusterTopology(args) => {
            let executor = connect_cluster(args.urls, executor_config("none", args.timeout_ms)?)?;
            docstore_cli::cluster_topology(&executor).await?
        }
        Commands::Databases(args) => {
            let config = executor_config(&args.read_balance, args.timeout_ms)?;
            let executor = connect_cluster(args.urls, config)?;
            docstore_cli::databases(&executor, args.start, args.page_size).await?
        }
        Commands::NextOperationId(args) => {
            let executor = executor(args.urls, &args.database, &args.read_balance, args.timeout_ms)?;
            docstore_cli::next_operation_id(&executor).await?
        }
        Commands::WaitOperation(args) => {
            let executor = executor(args.urls, &args.database, &args.read_balance, args.timeout_ms)?;
            docstore_cli::wait_operation(&executor, args.id, args.wait_timeout_ms, args.poll_interval_ms).await?
        }
    };

    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}
