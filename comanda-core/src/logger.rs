//! Tracing setup
//!
//! Console output is always on; a daily rolling file is added when the
//! configured log directory exists. `RUST_LOG` overrides the default
//! level, which otherwise follows the runtime environment.

use std::path::Path;

use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Default level per environment: quiet where it counts, chatty elsewhere
fn default_level(environment: &str) -> &'static str {
    match environment {
        "production" | "staging" => "info",
        _ => "debug",
    }
}

/// Initialize tracing from the loaded configuration
pub fn init_logger(config: &Config) {
    init_logger_with_file(
        Some(default_level(&config.environment)),
        config.log_dir.as_deref(),
    );
}

/// Initialize tracing with an explicit level and optional file output
pub fn init_logger_with_file(log_level: Option<&str>, log_dir: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.unwrap_or("info")));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false);

    match log_dir.map(Path::new).filter(|dir| dir.exists()) {
        Some(dir) => builder
            .with_writer(tracing_appender::rolling::daily(dir, "comanda"))
            .init(),
        None => builder.init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_follows_environment() {
        assert_eq!(default_level("production"), "info");
        assert_eq!(default_level("staging"), "info");
        assert_eq!(default_level("development"), "debug");
    }
}
