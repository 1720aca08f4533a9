//! Pluct Transcribe CLI entry point

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pluct_transcribe::cli::{
    app::{load_merged_config, run_submit, SubmitOptions, EXIT_USAGE_ERROR},
    args::{Cli, Commands},
    config_cmd::handle_config_command,
    presenter::Presenter,
};
use pluct_transcribe::domain::config::AppConfig;
use pluct_transcribe::domain::transcription::ProcessingTier;
use pluct_transcribe::infrastructure::XdgConfigStore;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    // Diagnostics go through tracing; progress itself flows over the
    // job event stream rendered by the presenter.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let presenter = Presenter::new();

    // Handle subcommands
    if let Some(Commands::Config { action }) = cli.command {
        let store = XdgConfigStore::new();
        if let Err(e) = handle_config_command(action, &store, &presenter).await {
            presenter.error(&e.to_string());
            return ExitCode::from(1);
        }
        return ExitCode::SUCCESS;
    }

    let Some(url) = cli.url.clone() else {
        presenter.error("No video URL provided. Usage: pluct-transcribe <URL> [--tier <TIER>]");
        return ExitCode::from(EXIT_USAGE_ERROR);
    };

    // Build CLI config layer from args
    let cli_config = AppConfig {
        engine_url: cli.engine_url.clone(),
        user_jwt: None, // credential comes from env/file only
        tier: cli.tier.map(|t| ProcessingTier::from(t).as_str().to_string()),
        job_deadline_secs: cli.deadline,
        poll_interval_secs: cli.poll_interval,
        max_concurrent_jobs: None,
        replay_buffer: None,
    };

    let config = load_merged_config(cli_config).await;

    let options = SubmitOptions {
        url,
        tier: config.tier_or_default(),
        json: cli.json,
    };

    run_submit(options, config).await
}
