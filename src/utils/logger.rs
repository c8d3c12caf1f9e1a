use crate::config::toml_config::LoggingConfig;
use crate::utils::error::{AggregatorError, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn default_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if config.verbose {
            EnvFilter::new("list_aggregator=debug,info")
        } else {
            EnvFilter::new(format!("list_aggregator={}", config.level))
        }
    })
}

/// 初始化全域 tracing subscriber
///
/// Returns an error instead of panicking when the host already installed one.
pub fn init_logger(config: &LoggingConfig) -> Result<()> {
    let filter = default_filter(config);

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let result = if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.compact())
            .try_init()
    };

    result.map_err(|e| AggregatorError::ConfigError {
        message: format!("Failed to install logger: {}", e),
    })
}
