use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufRead, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pview_core::constants::{CONFIG_PATH_ENV, PAGE_LENGTH_ENV};
use pview_core::{load_config, page_length_from_env_value, CoreConfig};

mod fixture;
mod runner;

use fixture::Fixture;
use runner::{Runner, RunnerOptions};

/// Patients generated when no fixture file is configured.
const GENERATED_PATIENTS: u32 = 950;

/// Main entry point for the PView session runner
///
/// Replays a script of UI events against a list session whose fetches are answered by an
/// in-process fixture, then prints the rendered list view as JSON.
///
/// # Environment Variables
/// - `PVIEW_CONFIG`: YAML configuration file (default: built-in defaults)
/// - `PVIEW_PAGE_LENGTH`: default page length override
/// - `PVIEW_FIXTURE`: JSON fixture file (default: generated patients)
/// - `PVIEW_SCRIPT`: script of `UiCommand` JSON lines (default: stdin)
/// - `PVIEW_MAX_JITTER_MS`: upper bound of the simulated fetch delay (default: 25)
/// - `PVIEW_SETTLE`: `false` to keep reading commands while fetches are in flight
///
/// # Returns
/// * `Ok(())` - If the script ran to the end
/// * `Err(anyhow::Error)` - If configuration, fixture or script could not be read
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("pview=info".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cfg = Arc::new(resolve_config(
        env_value(CONFIG_PATH_ENV).map(PathBuf::from),
        env_value(PAGE_LENGTH_ENV),
    )?);
    let fixture = match env_value("PVIEW_FIXTURE") {
        Some(path) => Fixture::load(&PathBuf::from(path))?,
        None => Fixture::generated(GENERATED_PATIENTS),
    };
    let options = runner_options(env_value("PVIEW_MAX_JITTER_MS"), env_value("PVIEW_SETTLE"))?;

    tracing::info!(
        page_window = cfg.page_window(),
        default_length = %cfg.default_length(),
        patients = fixture.patients.len(),
        settle = options.settle,
        "++ Starting PView session"
    );

    let script: Box<dyn AsyncBufRead + Unpin> = match env_value("PVIEW_SCRIPT") {
        Some(path) => {
            let file = tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("failed to open script {path}"))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let mut runner = Runner::new(cfg, fixture, options);
    let view = runner.run(script).await?;
    let stats = runner.stats();
    if stats.superseded > 0 {
        tracing::info!(superseded = stats.superseded, "stale fetch completions were dropped");
    }
    println!("{}", serde_json::to_string_pretty(&view)?);

    Ok(())
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Resolve the core configuration from an optional file and an optional page length override.
fn resolve_config(path: Option<PathBuf>, page_length: Option<String>) -> anyhow::Result<CoreConfig> {
    let cfg = load_config(path.as_deref())?;
    match page_length_from_env_value(page_length)? {
        Some(length) => Ok(cfg.with_default_length(length)?),
        None => Ok(cfg),
    }
}

fn runner_options(
    max_jitter_ms: Option<String>,
    settle: Option<String>,
) -> anyhow::Result<RunnerOptions> {
    let defaults = RunnerOptions::default();
    let max_jitter = match max_jitter_ms {
        Some(ms) => Duration::from_millis(
            ms.trim()
                .parse()
                .with_context(|| format!("PVIEW_MAX_JITTER_MS must be milliseconds, got '{ms}'"))?,
        ),
        None => defaults.max_jitter,
    };
    let settle = match settle.as_deref().map(str::trim) {
        Some("false") | Some("0") => false,
        Some("true") | Some("1") | None => true,
        Some(other) => anyhow::bail!("PVIEW_SETTLE must be true or false, got '{other}'"),
    };

    Ok(RunnerOptions { max_jitter, settle })
}
