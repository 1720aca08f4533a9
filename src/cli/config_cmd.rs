//! Config command handler

use crate::application::ports::ConfigStore;
use crate::domain::config::AppConfig;
use crate::domain::error::ConfigError;
use crate::domain::transcription::ProcessingTier;

use super::args::{is_valid_config_key, ConfigAction, VALID_CONFIG_KEYS};
use super::presenter::Presenter;

/// Handle config subcommand
pub async fn handle_config_command<S: ConfigStore>(
    action: ConfigAction,
    store: &S,
    presenter: &Presenter,
) -> Result<(), ConfigError> {
    match action {
        ConfigAction::Init => handle_init(store, presenter).await,
        ConfigAction::Set { key, value } => handle_set(store, presenter, &key, &value).await,
        ConfigAction::Get { key } => handle_get(store, presenter, &key).await,
        ConfigAction::Show => handle_show(store, presenter).await,
        ConfigAction::Path => handle_path(store, presenter),
    }
}

async fn handle_init<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    store.init().await?;
    presenter.success(&format!(
        "Config file created at: {}",
        store.path().display()
    ));
    Ok(())
}

async fn handle_set<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    if !is_valid_config_key(key) {
        return Err(ConfigError::ValidationError {
            key: key.to_string(),
            message: format!("Unknown key. Valid keys: {}", VALID_CONFIG_KEYS.join(", ")),
        });
    }

    let mut config = store.load().await?;
    apply_config_value(&mut config, key, value)?;
    store.save(&config).await?;

    let shown = if key == "user_jwt" {
        redact(value)
    } else {
        value.to_string()
    };
    presenter.success(&format!("{} = {}", key, shown));
    Ok(())
}

async fn handle_get<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
) -> Result<(), ConfigError> {
    if !is_valid_config_key(key) {
        return Err(ConfigError::ValidationError {
            key: key.to_string(),
            message: format!("Unknown key. Valid keys: {}", VALID_CONFIG_KEYS.join(", ")),
        });
    }

    let config = store.load().await?;
    match read_config_value(&config, key) {
        Some(value) => presenter.output(&value),
        None => presenter.info(&format!("{} is not set", key)),
    }
    Ok(())
}

async fn handle_show<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    let config = AppConfig::defaults().merge(store.load().await?);
    for key in VALID_CONFIG_KEYS {
        let value = read_config_value(&config, key).unwrap_or_else(|| "(not set)".to_string());
        presenter.output(&format!("{} = {}", key, value));
    }
    Ok(())
}

fn handle_path<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    presenter.output(&store.path().to_string_lossy());
    Ok(())
}

fn apply_config_value(config: &mut AppConfig, key: &str, value: &str) -> Result<(), ConfigError> {
    match key {
        "engine_url" => {
            if !value.starts_with("http://") && !value.starts_with("https://") {
                return Err(ConfigError::ValidationError {
                    key: key.to_string(),
                    message: "Value must be an http(s) URL".to_string(),
                });
            }
            config.engine_url = Some(value.to_string());
        }
        "user_jwt" => config.user_jwt = Some(value.to_string()),
        "tier" => {
            let tier: ProcessingTier =
                value.parse().map_err(|_| ConfigError::ValidationError {
                    key: key.to_string(),
                    message: "Value must be 'quick-scan' or 'ai-analysis'".to_string(),
                })?;
            config.tier = Some(tier.as_str().to_string());
        }
        "job_deadline_secs" => config.job_deadline_secs = Some(parse_number(key, value)?),
        "poll_interval_secs" => config.poll_interval_secs = Some(parse_number(key, value)?),
        "max_concurrent_jobs" => {
            config.max_concurrent_jobs = Some(parse_number::<usize>(key, value)?)
        }
        "replay_buffer" => config.replay_buffer = Some(parse_number::<usize>(key, value)?),
        _ => unreachable!("key validated above"),
    }
    Ok(())
}

fn read_config_value(config: &AppConfig, key: &str) -> Option<String> {
    match key {
        "engine_url" => config.engine_url.clone(),
        "user_jwt" => config.user_jwt.as_deref().map(redact),
        "tier" => config.tier.clone(),
        "job_deadline_secs" => config.job_deadline_secs.map(|v| v.to_string()),
        "poll_interval_secs" => config.poll_interval_secs.map(|v| v.to_string()),
        "max_concurrent_jobs" => config.max_concurrent_jobs.map(|v| v.to_string()),
        "replay_buffer" => config.replay_buffer.map(|v| v.to_string()),
        _ => None,
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::ValidationError {
        key: key.to_string(),
        message: "Value must be a positive number".to_string(),
    })
}

/// Show only enough of a credential to recognize it
fn redact(value: impl AsRef<str>) -> String {
    let value = value.as_ref();
    if value.len() <= 8 {
        "********".to_string()
    } else {
        format!("{}...", &value[..8])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_rejects_bad_engine_url() {
        let mut config = AppConfig::empty();
        assert!(apply_config_value(&mut config, "engine_url", "ftp://x").is_err());
        assert!(apply_config_value(&mut config, "engine_url", "https://x.example.com").is_ok());
    }

    #[test]
    fn apply_parses_tier() {
        let mut config = AppConfig::empty();
        apply_config_value(&mut config, "tier", "AI_ANALYSIS").unwrap();
        assert_eq!(config.tier.as_deref(), Some("ai-analysis"));
        assert!(apply_config_value(&mut config, "tier", "warp").is_err());
    }

    #[test]
    fn apply_parses_numbers() {
        let mut config = AppConfig::empty();
        apply_config_value(&mut config, "poll_interval_secs", "5").unwrap();
        assert_eq!(config.poll_interval_secs, Some(5));
        assert!(apply_config_value(&mut config, "poll_interval_secs", "soon").is_err());
    }

    #[test]
    fn jwt_is_redacted_on_read() {
        let config = AppConfig {
            user_jwt: Some("eyJhbGciOiJIUzI1NiJ9.payload.sig".to_string()),
            ..AppConfig::empty()
        };
        let shown = read_config_value(&config, "user_jwt").unwrap();
        assert!(shown.starts_with("eyJhbGci"));
        assert!(!shown.contains("payload"));
    }
}
