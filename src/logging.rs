//! Process-wide tracing setup shared by both service binaries
//!
//! Each service writes to its own file (`<service>.<log_file>`) under
//! `log_dir`. Text mode also echoes to stdout; JSON mode is file only.

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::AppConfig;

/// Dependencies that are chatty at `info`
const QUIET_TARGETS: &[&str] = &["sqlx=warn", "hyper=warn", "reqwest=warn"];

/// Map the `rotation` config value; anything unrecognised never rotates.
pub fn rotation(value: &str) -> Rotation {
    match value.to_ascii_lowercase().as_str() {
        "minutely" => Rotation::MINUTELY,
        "hourly" => Rotation::HOURLY,
        "daily" => Rotation::DAILY,
        _ => Rotation::NEVER,
    }
}

pub fn log_file_name(config: &AppConfig, service: &str) -> String {
    format!("{}.{}", service, config.log_file)
}

/// Filter used when `RUST_LOG` is unset
pub fn default_directives(config: &AppConfig) -> String {
    let mut directives = vec![config.log_level.as_str()];
    directives.extend_from_slice(QUIET_TARGETS);
    directives.join(",")
}

/// Install the global subscriber. Keep the returned guard alive for the
/// lifetime of the process or buffered file output is lost.
pub fn init_logging(config: &AppConfig, service: &str) -> WorkerGuard {
    let file_appender = RollingFileAppender::new(
        rotation(&config.rotation),
        &config.log_dir,
        log_file_name(config, service),
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(config)));
    let registry = tracing_subscriber::registry().with(filter);

    if config.use_json {
        let file_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(false)
            .with_writer(non_blocking)
            .with_ansi(false);
        registry.with(file_layer).init();
    } else {
        let file_layer = fmt::layer()
            .with_target(false)
            .with_writer(non_blocking)
            .with_ansi(false);
        let stdout_layer = fmt::layer().with_target(false).with_ansi(true);
        registry.with(file_layer).with(stdout_layer).init();
    }

    info!(
        service,
        log_dir = %config.log_dir,
        rotation = %config.rotation,
        json = config.use_json,
        "Logging initialized"
    );
    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_values() {
        assert_eq!(rotation("hourly"), Rotation::HOURLY);
        assert_eq!(rotation("Daily"), Rotation::DAILY);
        assert_eq!(rotation("minutely"), Rotation::MINUTELY);
        assert_eq!(rotation("never"), Rotation::NEVER);
        assert_eq!(rotation("weekly"), Rotation::NEVER);
    }

    #[test]
    fn test_file_name_and_filter() {
        let config = AppConfig::from_yaml(include_str!("../config/dev.yaml")).unwrap();

        assert_eq!(
            log_file_name(&config, "account-service"),
            format!("account-service.{}", config.log_file)
        );

        let directives = default_directives(&config);
        assert!(directives.starts_with(&config.log_level));
        assert!(directives.contains("sqlx=warn"));
        // must parse as a filter
        assert!(EnvFilter::try_new(&directives).is_ok());
    }
}
