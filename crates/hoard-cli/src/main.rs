mod commands;
mod input;
mod logging;
mod output;
mod progress;
mod prompt;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use clap::{CommandFactory, Parser};
use commands::{CleanArgs, Cli, Commands, ScanArgs, ScanCommand};
use dotenv::dotenv;
use hoard_core::config::load_configuration;
use hoard_core::{
    classify, AppConfig, DisposalMethod, SafeDeletionEngine, ScanPipeline, ScanState, Tier,
};
use progress::CliReporter;
use tracing::{info, warn};

fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = load_configuration().context("Error loading configuration")?;

    let args = Cli::parse();

    match args.command {
        Some(Commands::Scan(command)) => run_scan(&config, &command),
        Some(Commands::Clean(clean)) => run_clean(&config, &clean),
        Some(Commands::Classify { paths }) => {
            for path in &paths {
                output::print_classification(path, &classify(path));
            }
            Ok(())
        }
        Some(Commands::PrintConfig) => {
            let rendered =
                toml::to_string_pretty(&config).context("Error rendering configuration")?;
            println!("{}", rendered);
            Ok(())
        }
        None => {
            Cli::command().print_long_help()?;
            Ok(())
        }
    }
}

/// Runs one scan to its end, cancelling it once `--max-seconds` elapse.
fn scan_to_completion(config: &AppConfig, args: &ScanArgs) -> anyhow::Result<ScanPipeline> {
    let scan_config = input::build_scan_config(config, args)?;
    let root = scan_config.root.clone();

    let mut settings = config.pipeline.clone();
    settings.lossless |= args.lossless;

    let mut pipeline = ScanPipeline::new(settings, Arc::new(CliReporter::new()));
    pipeline
        .start(scan_config)
        .with_context(|| format!("Could not scan {}", root.display()))?;

    let deadline = args
        .max_seconds
        .map(|secs| Instant::now() + Duration::from_secs(secs));
    let state = pipeline.run_until_done(|p, _| {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            p.cancel();
        }
    });

    match state {
        ScanState::Failed(message) => {
            let err = pipeline
                .take_failure()
                .unwrap_or(hoard_core::Error::WorkerFailed(message));
            return Err(err).with_context(|| format!("Scan of {} failed", root.display()));
        }
        ScanState::Cancelled => warn!("Scan cancelled, results are partial"),
        _ => {}
    }
    if let Some(summary) = pipeline.summary() {
        if summary.dropped > 0 {
            warn!(
                "{} matching files were dropped while the display fell behind; rerun with --lossless to keep them",
                summary.dropped
            );
        }
    }
    Ok(pipeline)
}

fn run_scan(config: &AppConfig, command: &ScanCommand) -> anyhow::Result<()> {
    let options = input::build_view_options(config, &command.view)?;
    let pipeline = scan_to_completion(config, &command.scan)?;

    let rows = pipeline.results().view(&options);
    output::print_results(&rows, pipeline.results(), &options);

    if let Some(n) = command.view.reveal {
        match n.checked_sub(1).and_then(|i| rows.get(i)) {
            Some(row) => println!("{}", row.record.path().display()),
            None => bail!("There is no row {} to reveal", n),
        }
    }
    Ok(())
}

fn run_clean(config: &AppConfig, args: &CleanArgs) -> anyhow::Result<()> {
    let threshold_bytes = match &args.threshold_mb {
        Some(raw) => input::parse_megabytes(raw)?,
        None => input::megabytes_to_bytes(config.clean_threshold_mb)?,
    };
    let mut pipeline = scan_to_completion(config, &args.scan)?;

    let mut engine = SafeDeletionEngine::new(Arc::new(CliReporter::new()));
    if args.permanent {
        engine = engine.with_method(DisposalMethod::Permanent);
    }

    let plan = engine.plan(pipeline.results().records(), Tier::Safe, threshold_bytes);
    if plan.is_empty() {
        println!(
            "No {} files of at least {} found.",
            Tier::Safe,
            humansize::format_size(threshold_bytes, humansize::BINARY)
        );
        return Ok(());
    }
    output::print_plan(&plan);

    let question = format!(
        "{} {} files ({})?",
        match engine.method() {
            DisposalMethod::Trash => "Move to trash",
            DisposalMethod::Permanent => "PERMANENTLY delete",
        },
        plan.len(),
        plan.formatted_estimate()
    );
    if !args.yes && !prompt::prompt_confirm(&question, Some(false))? {
        info!("Deletion declined, nothing removed");
        return Ok(());
    }

    let outcome = engine
        .execute_and_reconcile(plan.confirm(), pipeline.results_mut())
        .context("Deletion failed")?;
    output::print_outcome(&outcome, engine.method());
    info!(
        "{} files remain in the result set",
        pipeline.results().len()
    );
    Ok(())
}
