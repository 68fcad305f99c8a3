use anyhow::Result;
use clap::{Arg, Command};
use std::path::PathBuf;
use tracing::{error, info, warn};

mod assembler;
mod audio;
mod chunker;
mod config;
mod error;
mod formatter;
mod llm;
mod pipeline;
mod probe;
mod retry;
mod transcription;

use crate::config::Config;
use crate::pipeline::PipelineRunner;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lecture_scribe=info,warn".into()),
        )
        .init();

    let matches = Command::new("Lecture Scribe")
        .version("0.1.0")
        .about("Turns recorded lectures into polished Markdown notes")
        .arg(
            Arg::new("input-dir")
                .short('i')
                .long("input-dir")
                .value_name("DIR")
                .help("Directory containing videos to process")
                .required(true),
        )
        .arg(
            Arg::new("output-dir")
                .short('o')
                .long("output-dir")
                .value_name("DIR")
                .help("Output directory for generated notes"),
        )
        .arg(
            Arg::new("workers")
                .short('w')
                .long("workers")
                .value_name("NUM")
                .help("Number of files processed concurrently"),
        )
        .get_matches();

    let input_dir = PathBuf::from(matches.get_one::<String>("input-dir").unwrap());

    // Load configuration, then layer CLI flags on top
    let mut config = Config::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        Config::default()
    });

    if let Some(output_dir) = matches.get_one::<String>("output-dir") {
        config.output.base_dir = PathBuf::from(output_dir);
    }
    if let Some(workers) = matches.get_one::<String>("workers") {
        config.performance.max_workers = workers.parse()?;
    }

    config.validate()?;

    info!("🚀 Lecture Scribe starting");
    info!("{}", config.summary());

    if !input_dir.exists() {
        error!("Input directory does not exist: {}", input_dir.display());
        return Err(anyhow::anyhow!("input directory not found"));
    }

    let output_dir = config.output.base_dir.clone();
    let runner = PipelineRunner::new(config)?;
    let summary = runner.process_directory(&input_dir, &output_dir).await?;

    info!(
        "🎉 Processing completed in {:.2}s",
        summary.total_time.as_secs_f64()
    );
    info!("✅ Successful: {}", summary.successful);
    info!("❌ Failed: {}", summary.failed);

    for outcome in &summary.outcomes {
        match (&outcome.output_path, &outcome.failure) {
            (Some(path), _) => info!("  {} → {}", outcome.source.display(), path.display()),
            (None, Some(failure)) => info!(
                "  {} failed at {} stage: {}",
                outcome.source.display(),
                failure.stage,
                failure.reason
            ),
            (None, None) => {}
        }
    }

    if summary.failed > 0 {
        return Err(anyhow::anyhow!(
            "{} of {} files failed",
            summary.failed,
            summary.total
        ));
    }

    Ok(())
}
