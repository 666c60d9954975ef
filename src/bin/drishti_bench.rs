//! Offline detection benchmark
//!
//! Runs the detector over every image under a path without any networking,
//! logs each box and the inference time, and writes annotated copies to a
//! `results/` directory beside the images.
//!
//! # Usage
//!
//! ```bash
//! drishti-bench ~/code/scenes --config drishti.toml
//! ```

use clap::Parser;
use drishti::config::DrishtiConfig;
use drishti::detection::source::{expand_home, list_images, load_frame};
use drishti::detection::{
    AnnotationRenderer, BoxPainter, ClassLabels, Detector, StaticDetector, process_detections,
    results,
};
use drishti::error::Result;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(name = "drishti-bench")]
#[command(about = "Run the detector over a directory of images and save annotated results")]
struct Args {
    /// Image file or directory
    path: String,

    /// Configuration file for detector and labels (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Skip writing annotated images
    #[arg(long)]
    no_save: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => DrishtiConfig::load(path)?,
        None => DrishtiConfig::default(),
    };
    let labels = match &config.board.labels_path {
        Some(path) => ClassLabels::from_prototxt(path)?,
        None => ClassLabels::default(),
    };

    let mut detector = StaticDetector::new(config.detector.detections.clone());
    let painter = BoxPainter::default();
    let images = list_images(&expand_home(Path::new(&args.path)))?;
    log::info!(
        "Benchmarking {} detector on {} images",
        detector.name(),
        images.len()
    );

    let mut total = Duration::ZERO;
    let mut processed = 0u32;
    for path in &images {
        let frame = match load_frame(path) {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };
        let (width, height) = frame.image.dimensions();

        let start = Instant::now();
        let detections = detector.infer(&frame.image)?;
        let elapsed = start.elapsed();
        total += elapsed;
        processed += 1;

        let boxes = process_detections(&detections, width, height, &labels);
        log::info!(
            "{} ({}x{}): {} boxes in {:.3} ms",
            path.display(),
            width,
            height,
            boxes.len(),
            elapsed.as_secs_f64() * 1000.0
        );
        for b in &boxes {
            log::info!(
                "RESULT: {}\t{}\t{}\t{}\t{}\t{}",
                b.label, b.x_min, b.y_min, b.x_max, b.y_max, b.confidence
            );
        }

        if !args.no_save {
            let annotated = painter.draw_boxes(&frame.image, &boxes);
            results::save_result(path, &annotated)?;
        }
    }

    if processed > 0 {
        log::info!(
            "Average inference time: {:.3} ms over {} images",
            total.as_secs_f64() * 1000.0 / processed as f64,
            processed
        );
    } else {
        log::warn!("No images could be processed");
    }
    Ok(())
}
