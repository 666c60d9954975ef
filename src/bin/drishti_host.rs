//! Drishti host client
//!
//! Connects to the board and requests a snapshot every few seconds, saving
//! `<id>.jpg` and `<id>_bbox.jpg` for each reply.
//!
//! # Usage
//!
//! ```bash
//! # Default board address (10.0.40.40:12345), run forever
//! drishti-host
//!
//! # Local board, five requests, then exit
//! drishti-host --board 127.0.0.1 --count 5
//! ```

use clap::Parser;
use drishti::config::DrishtiConfig;
use drishti::error::Result;
use drishti::protocol::RequestPayload;
use drishti::session::HostSession;
use drishti::transport::Connection;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "drishti-host")]
#[command(about = "Request object-detection snapshots from a board")]
struct Args {
    /// Configuration file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Board IP address (overrides connection.board_ip)
    #[arg(short, long)]
    board: Option<String>,

    /// Board port (overrides connection.port)
    #[arg(short, long)]
    port: Option<u16>,

    /// Stop after this many requests (default: run until the link fails)
    #[arg(short = 'n', long)]
    count: Option<u64>,

    /// Directory for received images (overrides host.output_dir)
    #[arg(short, long)]
    output: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            log::info!("Using config: {}", path.display());
            DrishtiConfig::load(path)?
        }
        None => DrishtiConfig::default(),
    };
    if let Some(board) = args.board {
        config.connection.board_ip = board;
    }
    if let Some(port) = args.port {
        config.connection.port = port;
    }
    if let Some(output) = args.output {
        config.host.output_dir = output;
    }

    let addr = config.connection.board_addr();
    log::info!("Drishti host v{} connecting to {}", env!("CARGO_PKG_VERSION"), addr);

    let conn = match config.connection.connect_timeout() {
        Some(timeout) => Connection::connect_timeout(&addr, timeout)?,
        None => Connection::connect(&addr)?,
    };
    conn.set_timeouts(
        config.connection.read_timeout(),
        config.connection.write_timeout(),
    )?;
    std::fs::create_dir_all(&config.host.output_dir)?;

    let request = RequestPayload::new(config.host.want_image, config.host.want_bounding_box_image);
    let mut session = HostSession::new(conn, request, &config.host.output_dir, config.host.seed)
        .with_sleep_range(config.host.min_sleep_secs, config.host.max_sleep_secs);

    let result = session.run(args.count);
    session.connection().shutdown();

    match result {
        Ok(completed) => {
            log::info!("Host finished after {} requests", completed);
            Ok(())
        }
        Err(e) => {
            log::error!("Host session ended: {}", e);
            Err(e)
        }
    }
}
