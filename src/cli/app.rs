//! Main app runner for submit-and-watch mode

use std::process::ExitCode;
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;

use crate::application::ports::ConfigStore;
use crate::application::{JobService, ServiceSettings, Subscription};
use crate::domain::config::AppConfig;
use crate::domain::job::{JobState, ProgressEvent};
use crate::domain::transcription::{ProcessingTier, VideoUrl};
use crate::infrastructure::{HttpBusinessEngine, XdgConfigStore};

use super::presenter::Presenter;

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;
pub const EXIT_TIMEOUT: u8 = 3;
pub const EXIT_CANCELLED: u8 = 130;

/// Options for a submit-and-watch run
#[derive(Debug, Clone)]
pub struct SubmitOptions {
    pub url: String,
    pub tier: ProcessingTier,
    pub json: bool,
}

/// Load config merged from defaults, file, environment, and CLI layer
/// (rightmost wins).
pub async fn load_merged_config(cli_layer: AppConfig) -> AppConfig {
    let store = XdgConfigStore::new();
    let file_layer = store.load().await.unwrap_or_else(|err| {
        eprintln!("Warning: ignoring config file: {}", err);
        AppConfig::empty()
    });

    AppConfig::defaults()
        .merge(file_layer)
        .merge(AppConfig::from_env())
        .merge(cli_layer)
}

/// Submit one URL and stream progress until the job is terminal
pub async fn run_submit(options: SubmitOptions, config: AppConfig) -> ExitCode {
    let mut presenter = Presenter::new();

    let url = match VideoUrl::parse(&options.url) {
        Ok(url) => url,
        Err(err) => {
            presenter.error(&err.to_string());
            return ExitCode::from(EXIT_USAGE_ERROR);
        }
    };

    let engine = Arc::new(HttpBusinessEngine::new(config.engine_url_or_default()));
    let service = Arc::new(JobService::new(engine, ServiceSettings::from_config(&config)));

    let job_id = match service.submit_job(url.clone(), options.tier) {
        Ok(id) => id,
        Err(err) => {
            presenter.error(&err.to_string());
            return ExitCode::from(EXIT_USAGE_ERROR);
        }
    };

    let Some(subscription) = service.subscribe(&job_id) else {
        presenter.error("Job vanished before it could be observed");
        return ExitCode::from(EXIT_ERROR);
    };

    // Ctrl-C cancels cooperatively; the terminal event closes the loop.
    {
        let service = Arc::clone(&service);
        let id = job_id.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                service.cancel_job(&id);
            }
        });
    }

    if !options.json {
        presenter.start_progress(url.as_str());
    }

    let terminal = watch_until_terminal(subscription, options.json, &presenter).await;

    let Some(terminal) = terminal else {
        presenter.finish_failure("event stream closed before a terminal state");
        return ExitCode::from(EXIT_ERROR);
    };

    let snapshot = service.snapshot(&job_id);
    if options.json {
        if let Some(job) = &snapshot {
            match serde_json::to_string(job) {
                Ok(line) => println!("{}", line),
                Err(err) => presenter.error(&format!("Failed to encode snapshot: {}", err)),
            }
        }
    }

    match terminal.state {
        JobState::Completed => {
            presenter.finish_success();
            if !options.json {
                match snapshot.as_ref().and_then(|job| job.result()) {
                    Some(result) => presenter.transcript(result),
                    None => presenter.warning("Completed but the final snapshot is gone"),
                }
            }
            ExitCode::from(EXIT_SUCCESS)
        }
        JobState::Failed => {
            let reason = snapshot
                .as_ref()
                .and_then(|job| job.failure())
                .map(|failure| failure.to_string())
                .unwrap_or_else(|| terminal.message.clone());
            presenter.finish_failure(&reason);
            ExitCode::from(EXIT_ERROR)
        }
        JobState::TimedOut => {
            presenter.finish_failure("job deadline exceeded before the engine finished");
            ExitCode::from(EXIT_TIMEOUT)
        }
        JobState::Cancelled => {
            presenter.finish_failure("job cancelled");
            ExitCode::from(EXIT_CANCELLED)
        }
        // non-terminal states cannot be returned by watch_until_terminal
        _ => ExitCode::from(EXIT_ERROR),
    }
}

/// Drain replayed history, then the live feed, until a terminal event
async fn watch_until_terminal(
    subscription: Subscription,
    json: bool,
    presenter: &Presenter,
) -> Option<ProgressEvent> {
    let Subscription { replay, mut receiver } = subscription;

    for event in replay {
        render(&event, json, presenter);
        if event.is_terminal() {
            return Some(event);
        }
    }

    loop {
        match receiver.recv().await {
            Ok(event) => {
                render(&event, json, presenter);
                if event.is_terminal() {
                    return Some(event);
                }
            }
            // missed events are superseded by newer ones; keep draining
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => return None,
        }
    }
}

fn render(event: &ProgressEvent, json: bool, presenter: &Presenter) {
    if json {
        if let Ok(line) = serde_json::to_string(event) {
            println!("{}", line);
        }
    } else {
        presenter.render_event(event);
    }
}
