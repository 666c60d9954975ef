//! Drishti board daemon
//!
//! Listens for one host, then answers snapshot requests until the
//! connection drops.
//!
//! # Usage
//!
//! ```bash
//! # Serve demo scenes from a directory
//! drishti-board ~/code/scenes
//!
//! # Explicit config and port
//! drishti-board --config drishti.toml --port 12345
//! ```

use clap::Parser;
use drishti::config::DrishtiConfig;
use drishti::detection::{BoxPainter, ClassLabels, DirectorySource, StaticDetector};
use drishti::error::Result;
use drishti::session::BoardSession;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "drishti-board")]
#[command(about = "Answer object-detection snapshot requests from a host")]
struct Args {
    /// Image file or directory of scenes (overrides board.image_path)
    image_path: Option<String>,

    /// Configuration file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listening port (overrides connection.port)
    #[arg(short, long)]
    port: Option<u16>,

    /// Write annotated images to results/ beside each source image
    #[arg(long)]
    save_results: bool,
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
    if let Some(image_path) = args.image_path {
        config.board.image_path = image_path;
    }
    if let Some(port) = args.port {
        config.connection.port = port;
    }
    config.board.save_results |= args.save_results;

    let labels = match &config.board.labels_path {
        Some(path) => ClassLabels::from_prototxt(path)?,
        None => ClassLabels::default(),
    };
    log::info!(
        "Drishti board v{} starting ({} class labels, images from {})",
        env!("CARGO_PKG_VERSION"),
        labels.len(),
        config.board.image_path
    );

    let mut session = BoardSession::new(
        StaticDetector::new(config.detector.detections.clone()),
        DirectorySource::new(&config.board.image_path),
        BoxPainter::default(),
        labels,
        config.board.seed,
    )
    .with_save_results(config.board.save_results);

    let listener = session.listen(&config.connection.bind_addr())?;
    let result = session.run(
        &listener,
        config.connection.read_timeout(),
        config.connection.write_timeout(),
    );

    if let Err(e) = &result {
        log::error!("Board session ended: {}", e);
    }
    result
}
