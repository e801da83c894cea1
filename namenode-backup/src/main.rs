//! NameNode Backup - Main entry point
//!
//! Pulls the fsimage and/or edits from a NameNode, once, and exits.

use anyhow::Result;
use clap::{CommandFactory, Parser};
use namenode_backup::executor::request::DEFAULT_PORT;
use namenode_backup::{utils, BackupRequest, BackupRunner, Config};
use std::path::PathBuf;

const EXAMPLES: &str = "\
Examples:

  # Backup the fsimage file
  namenode-backup -s namenode.net -p 50070 -r 1 --getimage

  # Backup an edits range
  namenode-backup -s namenode.net -p 50070 -r 2 --getedits --startTxId 1 --endTxId 50";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, after_help = EXAMPLES)]
struct Args {
    /// The hostname of the NameNode
    #[arg(short = 's', long = "server")]
    server: Option<String>,

    /// The IP address of the NameNode
    #[arg(short = 'i', long = "ip")]
    ip: Option<String>,

    /// The NameNode web UI port
    #[arg(
        short = 'p',
        long = "port",
        default_value_t = DEFAULT_PORT,
        allow_negative_numbers = true
    )]
    port: i64,

    /// The Apache Hadoop release, 1 or 2. Decides how fsimage and edits are requested
    #[arg(short = 'r', long = "release")]
    release: String,

    /// Retrieve the latest fsimage from the NameNode
    #[arg(long = "getimage")]
    get_image: bool,

    /// Retrieve edits from the NameNode
    #[arg(long = "getedits")]
    get_edits: bool,

    /// First transaction id of the edits range (Hadoop 2 only)
    #[arg(long = "startTxId")]
    start_tx_id: Option<u64>,

    /// Last transaction id of the edits range (Hadoop 2 only)
    #[arg(long = "endTxId")]
    end_tx_id: Option<u64>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Backup directory (overrides config)
    #[arg(long, value_name = "DIR")]
    backup_dir: Option<PathBuf>,

    /// Directory holding local edit segments (overrides config)
    #[arg(long, value_name = "DIR")]
    edits_dir: Option<PathBuf>,

    /// Edit segment lookback window in seconds (overrides config)
    #[arg(long, value_name = "SECS", allow_negative_numbers = true)]
    lookback: Option<i64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

impl Args {
    fn request(&self) -> BackupRequest {
        BackupRequest {
            server: self.server.clone(),
            ip: self.ip.clone(),
            port: self.port,
            release: self.release.clone(),
            get_image: self.get_image,
            get_edits: self.get_edits,
            start_tx_id: self.start_tx_id,
            end_tx_id: self.end_tx_id,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Usage errors exit 1 like every other failure; --help/--version exit 0
    let args = Args::try_parse().unwrap_or_else(|e| {
        if e.use_stderr() {
            let _ = e.print();
            std::process::exit(1);
        }
        e.exit()
    });

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(dir) = &args.backup_dir {
        config.backup.dir = dir.clone();
    }
    if let Some(dir) = &args.edits_dir {
        config.edits.dir = dir.clone();
    }
    if let Some(secs) = args.lookback {
        config.edits.lookback_secs = secs;
    }

    // Initialize logging
    let log_level = args.log_level.as_deref().unwrap_or(&config.log.level);
    utils::logger::init(log_level)?;

    tracing::info!("Starting namenode-backup v{}", env!("CARGO_PKG_VERSION"));

    let mut runner = BackupRunner::from_config(config)?;
    match runner.run(&args.request()).await {
        Ok(report) => {
            print!("{report}");
            Ok(())
        }
        Err(e) => {
            if e.is_usage_error() {
                eprintln!("{}", Args::command().render_usage());
            }
            Err(e.into())
        }
    }
}
