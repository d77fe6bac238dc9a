use crate::utils::error::{DxError, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// HTTP client crates stay at `warn` so registry debugging is not drowned in connection logs.
const QUIET_DEPENDENCIES: &[&str] = &["reqwest", "hyper", "hyper_util"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Compact human-readable lines for interactive runs.
    #[default]
    Compact,
    /// JSON lines, for scheduled export and sync jobs whose output is collected.
    Json,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogSettings {
    pub verbose: bool,
    pub format: LogFormat,
}

impl LogSettings {
    pub fn new(verbose: bool, json: bool) -> Self {
        Self {
            verbose,
            format: if json { LogFormat::Json } else { LogFormat::Compact },
        }
    }

    /// Filter used when `RUST_LOG` is unset.
    pub fn default_directives(&self) -> String {
        let own = if self.verbose { "intact_dx=debug" } else { "intact_dx=info" };
        let mut directives = vec![own.to_string(), "info".to_string()];
        if self.verbose {
            directives.extend(QUIET_DEPENDENCIES.iter().map(|c| format!("{}=warn", c)));
        }
        directives.join(",")
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.default_directives()))
    }
}

/// Installs the global subscriber; fails if one is already set.
pub fn init_logger(settings: LogSettings) -> Result<()> {
    let registry = tracing_subscriber::registry().with(settings.filter());
    let installed = match settings.format {
        LogFormat::Compact => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .compact(),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false)
                    .json(),
            )
            .try_init(),
    };
    installed.map_err(|e| DxError::ConfigError {
        message: format!("logger already initialised: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives() {
        assert_eq!(LogSettings::new(false, false).default_directives(), "intact_dx=info,info");
        let verbose = LogSettings::new(true, true);
        assert_eq!(verbose.format, LogFormat::Json);
        assert_eq!(
            verbose.default_directives(),
            "intact_dx=debug,info,reqwest=warn,hyper=warn,hyper_util=warn"
        );
    }

    #[test]
    fn test_second_init_is_an_error() {
        let settings = LogSettings::default();
        // The first call may lose to another test; the second always finds a subscriber.
        let _ = init_logger(settings);
        assert!(matches!(init_logger(settings), Err(DxError::ConfigError { .. })));
    }
}
