mod args;
mod pickers;
mod view;

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use calcifer_core::{
    load_config_layered, validate_config, Config, DestinationPicker, InputFolderPicker,
    JobHandle, JobState, JobSupervisor, ProcessEngine,
};

use args::Args;
use pickers::{ArgDestinationPicker, ArgInputPicker};
use view::{Effect, ViewAction, ViewState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit code of a job stopped by Ctrl+C
const EXIT_CANCELLED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.json_logs);

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("Fatal error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(json: bool) {
    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()));

    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    info!("calcifer v{}", VERSION);

    let config = load(&args)?;
    info!("Engine program: {:?}", config.engine.program);
    info!("Staging directory: {:?}", config.jobs.staging_dir());

    let mut view = initial_view(&args, &config);
    let input_picker = ArgInputPicker::new(args.input.clone());
    let destination_picker = ArgDestinationPicker::new(args.output.clone());

    // Input folder
    let picked = input_picker.pick_input_folder().await;
    view.reduce(ViewAction::InputSelected(picked));
    let Some(input) = view.input.clone() else {
        return Ok(report_alert(&view));
    };
    info!(
        folder = ?input.path,
        images = input.image_count,
        preview = ?input.preview_image,
        "Input folder selected"
    );

    // Destination
    let Some(Effect::PickDestination {
        format,
        suggested_name,
    }) = view.reduce(ViewAction::GoPressed)
    else {
        return Ok(report_alert(&view));
    };
    let picked = destination_picker
        .pick_destination(&input, format, suggested_name.as_deref())
        .await;
    let Some(Effect::StartJob(params)) = view.reduce(ViewAction::DestinationSelected(picked))
    else {
        return Ok(report_alert(&view));
    };

    // Job
    eprintln!("{}", view.summary());
    let engine = Arc::new(ProcessEngine::new(config.engine.clone()));
    let supervisor = JobSupervisor::new(engine, config.jobs.clone());
    let handle = match supervisor.start(params).await {
        Ok(handle) => {
            view.reduce(ViewAction::JobStarted(Ok(handle.id())));
            handle
        }
        Err(e) => {
            view.reduce(ViewAction::JobStarted(Err(e)));
            return Ok(report_alert(&view));
        }
    };

    let state = follow(&supervisor, &mut view, handle).await;
    Ok(finish(&view, state))
}

fn load(args: &Args) -> Result<Config> {
    if let Some(path) = &args.config {
        info!("Loading configuration from {:?}", path);
    }
    let mut config =
        load_config_layered(args.config.as_deref()).with_context(|| match &args.config {
            Some(path) => format!("Failed to load config from {:?}", path),
            None => "Failed to load config from environment".to_string(),
        })?;

    if let Some(program) = &args.engine {
        config.engine.program = program.clone();
    }

    validate_config(&config).context("Configuration validation failed")?;
    Ok(config)
}

fn initial_view(args: &Args, config: &Config) -> ViewState {
    let defaults = config.defaults;
    let mut view = ViewState::default();
    for action in [
        ViewAction::FormatSelected(args.format.unwrap_or(defaults.format)),
        ViewAction::DetailSelected(args.detail.unwrap_or(defaults.detail)),
        ViewAction::SampleOrderingSelected(
            args.sample_ordering.unwrap_or(defaults.sample_ordering),
        ),
        ViewAction::FeatureSensitivitySelected(
            args.feature_sensitivity.unwrap_or(defaults.feature_sensitivity),
        ),
    ] {
        view.reduce(action);
    }
    view
}

/// Renders outcomes until the job settles.
///
/// The first Ctrl+C cancels the job. A second one stops waiting for the
/// engine to wind down.
async fn follow(
    supervisor: &JobSupervisor<ProcessEngine>,
    view: &mut ViewState,
    mut handle: JobHandle,
) -> JobState {
    let ctrl_c = signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut signals = true;

    loop {
        tokio::select! {
            outcome = handle.next_outcome() => {
                let Some(outcome) = outcome else { break };
                view.reduce(ViewAction::Outcome(outcome));
                render_progress(view);
            }

            result = &mut ctrl_c, if signals => {
                if let Err(e) = result {
                    warn!("Failed to install Ctrl+C handler: {}", e);
                    signals = false;
                    continue;
                }
                ctrl_c.set(signal::ctrl_c());

                match view.reduce(ViewAction::CancelPressed) {
                    Some(Effect::CancelJob(id)) => {
                        info!("Interrupted, cancelling job (press Ctrl+C again to quit)");
                        supervisor.cancel(&id).await;
                    }
                    Some(Effect::ForceExit) => {
                        warn!("Interrupted again, exiting without waiting for the engine");
                        return JobState::Cancelled;
                    }
                    _ => {}
                }
            }
        }
    }

    handle.state()
}

fn render_progress(view: &ViewState) {
    let mut stderr = std::io::stderr().lock();
    let _ = write!(stderr, "\rProcessing... {:>3}%", view.percent());
    let _ = stderr.flush();
}

fn finish(view: &ViewState, state: JobState) -> ExitCode {
    eprintln!();
    match state {
        JobState::Completed => {
            if let Some(path) = &view.completed {
                println!("{}", path.display());
            }
            ExitCode::SUCCESS
        }
        JobState::Cancelled => {
            eprintln!("Cancelled");
            ExitCode::from(EXIT_CANCELLED)
        }
        _ => report_alert(view),
    }
}

fn report_alert(view: &ViewState) -> ExitCode {
    if let Some(message) = &view.alert {
        eprintln!("Error: {}", message);
    }
    ExitCode::FAILURE
}
