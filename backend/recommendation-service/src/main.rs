use anyhow::Context;
use std::io::{self, Write};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use recommendation_service::{
    AppError, Config, CsvRatingSource, LogFormat, RecommendationPipeline,
};

const DEFAULT_LOG_FILTER: &str = "recommendation_service=info,user_cf=info";

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    // Logs go to stderr so stdout carries only the report
    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(io::stderr)
                    .with_line_number(true)
                    .with_file(true)
                    .with_target(true),
            )
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init(),
    }
}

fn run(config: &Config) -> anyhow::Result<()> {
    let source = CsvRatingSource::new(&config.ratings_path);
    let pipeline = RecommendationPipeline::new(source);

    let report = pipeline
        .run(&config.request())
        .context("Failed to compute recommendations")?;

    let rendered = report
        .render(config.output_format)
        .context("Failed to render report")?;

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", rendered).context("Failed to write report")?;

    Ok(())
}

fn main() {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration loading failed: {}", e);
            std::process::exit(e.exit_code());
        }
    };

    init_tracing(config.log_format);

    info!(
        "Starting recommendation-service v{}",
        env!("CARGO_PKG_VERSION")
    );
    info!(
        ratings_path = %config.ratings_path.display(),
        target = ?config.target,
        neighbor_count = config.neighbor_count,
        top_items = config.top_items,
        execution = ?config.execution,
        "Configuration loaded"
    );

    if let Err(err) = run(&config) {
        error!("Recommendation run failed: {:#}", err);
        let code = err
            .downcast_ref::<AppError>()
            .map(AppError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}
