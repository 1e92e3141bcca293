//! lsmstore Shell
//!
//! Interactive shell over a filesystem-backed tree, plus offline WAL
//! inspection.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use lsmstore::wal::WalReader;
use lsmstore::{Config, Tree};
use tracing_subscriber::{fmt, EnvFilter};

/// lsmstore Shell
#[derive(Parser, Debug)]
#[command(name = "lsmstore-shell")]
#[command(about = "Interactive shell for the lsmstore LSM engine")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./lsmstore_data")]
    data_dir: PathBuf,

    /// Memtable size in bytes above which it is flushed
    #[arg(short, long, default_value_t = 4 * 1024 * 1024)]
    memory_threshold: usize,

    /// Number of keys between two sparse index samples
    #[arg(short, long, default_value_t = 5)]
    sparse_distance: usize,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Read commands from stdin (the default)
    Shell,

    /// Print every entry of a WAL file
    DumpWal {
        /// Path to the .wal file
        path: PathBuf,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,lsmstore=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let result = match args.command {
        Some(Commands::DumpWal { ref path }) => dump_wal(path),
        Some(Commands::Shell) | None => run_shell(&args),
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        process::exit(1);
    }
}

fn run_shell(args: &Args) -> lsmstore::Result<()> {
    tracing::info!("lsmstore v{}", lsmstore::VERSION);
    tracing::info!("Data directory: {}", args.data_dir.display());

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .memory_threshold(args.memory_threshold)
        .sparse_key_distance(args.sparse_distance)
        .build();
    let tree = Tree::open(config)?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    prompt(&mut stdout)?;

    for line in stdin.lock().lines() {
        let line = line?;
        let mut parts = line.split_whitespace();

        match (parts.next(), parts.next(), parts.next()) {
            (None, _, _) => {}
            (Some("put"), Some(key), Some(value)) => match tree.put(key.to_string(), value.to_string()) {
                Ok(()) => writeln!(stdout, "OK")?,
                Err(e) => writeln!(stdout, "ERR {}", e)?,
            },
            (Some("get"), Some(key), None) => match tree.get(key.as_bytes()) {
                Ok(Some(value)) => writeln!(stdout, "{}", String::from_utf8_lossy(&value))?,
                Ok(None) => writeln!(stdout, "(nil)")?,
                Err(e) => writeln!(stdout, "ERR {}", e)?,
            },
            (Some("flush"), None, _) => {
                match tree.flush() {
                    Ok(()) => {
                        tree.wait_for_flushes();
                        writeln!(stdout, "OK")?
                    }
                    Err(e) => writeln!(stdout, "ERR {}", e)?,
                }
            }
            (Some("stats"), None, _) => match tree.stats() {
                Ok(stats) => writeln!(
                    stdout,
                    "active_size={} active_entries={} flushing={} failed={} runs={}",
                    stats.active_size, stats.active_entries, stats.flushing, stats.failed, stats.runs
                )?,
                Err(e) => writeln!(stdout, "ERR {}", e)?,
            },
            (Some("quit" | "exit"), None, _) => break,
            _ => writeln!(stdout, "usage: put <key> <value> | get <key> | flush | stats | quit")?,
        }

        prompt(&mut stdout)?;
    }

    tracing::info!("Waiting for background flushes...");
    tree.wait_for_flushes();
    Ok(())
}

fn dump_wal(path: &Path) -> lsmstore::Result<()> {
    let mut stdout = io::stdout();
    let mut count = 0usize;

    for entry in WalReader::open(path)?.entries() {
        let entry = entry?;
        writeln!(
            stdout,
            "{}\t{}",
            String::from_utf8_lossy(&entry.key),
            String::from_utf8_lossy(&entry.value)
        )?;
        count += 1;
    }

    tracing::info!(entries = count, "WAL dump complete");
    Ok(())
}

fn prompt(stdout: &mut io::Stdout) -> io::Result<()> {
    write!(stdout, "> ")?;
    stdout.flush()
}
