//! # Tinder CLI (`tinder`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `tinder init` | Recreate the store from empty |
//! | `tinder collect` | Ingest one log file |
//! | `tinder serve` | Start the HTTP listener |
//!
//! ## Examples
//!
//! ```bash
//! # Fresh store, then ingest a log with the default `[${datetime}] ${msg}` format
//! tinder collect --init --db ./tinder.db --log ./app.log
//!
//! # Custom format and date layout, keeping only the extracted fields
//! tinder collect --log ./nginx.log \
//!     --fmt '${ip} - - [${datetime}] "${request}" ${status}' \
//!     --date '%d/%b/%Y:%H:%M:%S %z' --compact
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};

use tinder::config::{self, Config};
use tinder::ingest::{self, IngestOptions};
use tinder::store::EntryPolicy;
use tinder::{db, migrate, server, telemetry};

/// Tinder: ingest line-oriented log files into SQLite.
#[derive(Parser)]
#[command(name = "tinder", version)]
struct Cli {
    /// Path to an optional configuration file (TOML). Flags override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Delete the store and create an empty schema.
    Init {
        /// Store path.
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Ingest a log file in one exclusive transaction.
    ///
    /// Each line is matched against the format; matching lines become
    /// entries with one string row per extracted field. A failure anywhere
    /// rolls the whole run back.
    Collect(CollectArgs),

    /// Start the HTTP listener.
    Serve {
        /// Address to bind, e.g. `127.0.0.1:8080`.
        #[arg(long)]
        bind: Option<String>,
    },
}

#[derive(Args)]
struct CollectArgs {
    /// Recreate the store before collecting.
    #[arg(long)]
    init: bool,

    /// Store path.
    #[arg(long)]
    db: Option<PathBuf>,

    /// Log file to ingest.
    #[arg(long)]
    log: Option<PathBuf>,

    /// Log name; defaults to the log path.
    #[arg(long)]
    name: Option<String>,

    /// Line format with `${name}` placeholders; `${datetime}` sets the entry time.
    #[arg(long = "fmt")]
    format: Option<String>,

    /// strftime layout of the `datetime` field.
    #[arg(long = "date")]
    date_layout: Option<String>,

    /// Do not store the full line text.
    #[arg(long)]
    compact: bool,

    /// Do not warn about lines that do not match the format.
    #[arg(long)]
    relax: bool,

    /// Number of lines buffered between the reader and the writer.
    #[arg(long)]
    buffer: Option<usize>,
}

impl CollectArgs {
    fn apply(self, config: &mut Config) {
        if let Some(db) = self.db {
            config.db.path = db;
        }
        let collect = &mut config.collect;
        if let Some(log) = self.log {
            collect.log = Some(log);
        }
        if let Some(name) = self.name {
            collect.name = Some(name);
        }
        if let Some(format) = self.format {
            collect.format = format;
        }
        if let Some(layout) = self.date_layout {
            collect.date_layout = layout;
        }
        if let Some(buffer) = self.buffer {
            collect.buffer = buffer;
        }
        collect.compact |= self.compact;
        collect.relax |= self.relax;
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    telemetry::init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut cfg = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Init { db } => {
            if let Some(db) = db {
                cfg.db.path = db;
            }
            init_store(&cfg).await?;
            println!("Store initialized successfully.");
        }
        Commands::Collect(args) => {
            let init = args.init;
            args.apply(&mut cfg);
            cfg.validate()?;
            if init {
                init_store(&cfg).await?;
            }
            collect(&cfg).await?;
        }
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                cfg.server.bind = bind;
            }
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}

async fn init_store(cfg: &Config) -> Result<()> {
    migrate::reset_store(&cfg.db.path)?;
    let pool = db::connect(&cfg.db.path).await?;
    info!(path = %cfg.db.path.display(), "initializing store");
    migrate::run_migrations(&pool).await?;
    pool.close().await;
    Ok(())
}

async fn collect(cfg: &Config) -> Result<()> {
    let Some(log) = cfg.collect.log.clone() else {
        info!("no log file configured, nothing to collect");
        return Ok(());
    };

    info!(path = %cfg.db.path.display(), "opening store");
    let pool = db::connect(&cfg.db.path).await?;
    migrate::run_migrations(&pool).await?;

    let mut opts = IngestOptions::from_template(log, &cfg.collect.format)?;
    if let Some(name) = cfg.collect.log_name() {
        opts.log_name = name;
    }
    opts.entry = EntryPolicy {
        date_layout: cfg.collect.date_layout.clone(),
        compact: cfg.collect.compact,
    };
    opts.relax = cfg.collect.relax;
    opts.buffer = cfg.collect.buffer;

    let result = ingest::run_ingest(&pool, &opts).await;
    pool.close().await;
    let report = result?;

    println!("collect {}", opts.log_name);
    println!(
        "  log: {} ({})",
        report.log_id,
        if report.log_created { "created" } else { "existing" }
    );
    println!("  lines read: {}", report.lines_read);
    println!("  entries written: {}", report.entries_written);
    println!("  fields written: {}", report.fields_written);
    println!("  lines dropped: {}", report.lines_dropped);
    println!("  date fallbacks: {}", report.date_fallbacks);
    println!("ok");

    Ok(())
}
