mod classify;
mod config;
mod db;
mod entity;
mod events;
mod geo;
mod index;
mod logging;
mod media;
mod scanner;
mod sidecar;
mod thumb;
mod txt;

use anyhow::Result;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::{mpsc, Arc};
use tracing::info;

use config::Config;
use db::{Database, Repo};
use events::EventBus;
use index::{IndexOptions, Indexer};
use scanner::{ScanUpdate, Scanner};

struct Args {
    config_path: Option<PathBuf>,
    directory: Option<PathBuf>,
    rescan: bool,
    workers: Option<usize>,
}

fn parse_args() -> Args {
    let argv: Vec<String> = std::env::args().collect();
    let mut args = Args {
        config_path: None,
        directory: None,
        rescan: false,
        workers: None,
    };

    let mut i = 1;
    while i < argv.len() {
        match argv[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("pixarc {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                if i + 1 < argv.len() {
                    args.config_path = Some(PathBuf::from(&argv[i + 1]));
                    i += 1;
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--rescan" | "-r" => {
                args.rescan = true;
            }
            "--workers" | "-w" => {
                if i + 1 < argv.len() {
                    match argv[i + 1].parse() {
                        Ok(n) => args.workers = Some(n),
                        Err(_) => {
                            eprintln!("Error: --workers requires a number");
                            std::process::exit(1);
                        }
                    }
                    i += 1;
                } else {
                    eprintln!("Error: --workers requires a number");
                    std::process::exit(1);
                }
            }
            arg if !arg.starts_with('-') && args.directory.is_none() => {
                args.directory = Some(PathBuf::from(arg));
            }
            _ => {
                eprintln!("Unknown argument: {}", argv[i]);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    args
}

fn print_help() {
    println!("pixarc - self-hosted photo library indexer");
    println!();
    println!("Usage: pixarc [OPTIONS] [DIRECTORY]");
    println!();
    println!("Arguments:");
    println!("  DIRECTORY            Directory to index (defaults to the configured originals path)");
    println!();
    println!("Options:");
    println!("  -c, --config PATH    Use an alternate config file");
    println!("  -r, --rescan         Re-index files even when they look unchanged");
    println!("  -w, --workers N      Number of indexing workers");
    println!("  -h, --help           Show this help");
    println!("  -V, --version        Show version");
}

fn main() -> Result<()> {
    let args = parse_args();

    let _log_guard = logging::init(None)?;

    let mut config = Config::load(args.config_path.as_ref())?;
    if let Some(workers) = args.workers {
        config.index.workers = workers;
    }

    let directory = args
        .directory
        .unwrap_or_else(|| config.library.originals_path.clone());

    let db = Arc::new(Database::open(&config.db_path)?);
    db.initialize()?;

    let bus = Arc::new(EventBus::new());

    // Log domain events as they happen; slow consumers never block the
    // pipeline, so this subscriber is free to lag.
    let events = bus.subscribe();
    std::thread::spawn(move || {
        for event in events {
            tracing::debug!("event {}: {}", event.topic, event.data);
        }
    });

    let repo = Repo::new(db, bus);

    let indexer = Arc::new(Indexer::new(config, repo));
    let scanner = Scanner::new(indexer.clone());

    let options = IndexOptions {
        rescan: args.rescan,
        ..IndexOptions::default()
    };

    info!("indexing {}", directory.display());

    let (tx, rx) = mpsc::channel();
    let cancel_flag = Arc::new(AtomicBool::new(false));

    let progress = std::thread::spawn(move || {
        for update in rx {
            match update {
                ScanUpdate::Started { total } => info!("found {total} files"),
                ScanUpdate::Progress { current, total, path } => {
                    info!("[{current}/{total}] {path}")
                }
                ScanUpdate::Completed { summary } => info!("scan completed: {summary}"),
                ScanUpdate::Cancelled => info!("scan cancelled"),
                ScanUpdate::Failed { error } => tracing::error!("scan failed: {error}"),
            }
        }
    });

    let summary = scanner.scan(&directory, &options, tx, cancel_flag)?;
    let _ = progress.join();

    println!(
        "indexed {} files: {summary} ({} photos, {} files total)",
        summary.total(),
        indexer.repo().count_photos()?,
        indexer.repo().count_files()?,
    );

    Ok(())
}
