//! Logging utilities and configuration for bizlens.
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! the application. [`setup::init_logging`] is a convenience for binaries and
//! tests that want the usual `fmt` + `EnvFilter` stack.

use tracing::Level;

/// Controls how chatty the analyzer is while loading and querying.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Base log level for bizlens components
    pub base_level: Level,
    /// Whether to log load/normalization steps and query executions
    pub log_data_operations: bool,
    /// Whether to log one event per column during normalization
    pub log_column_details: bool,
    /// Maximum length for logged cell values (to prevent huge logs)
    pub max_field_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            base_level: Level::INFO,
            log_data_operations: true,
            log_column_details: false,
            max_field_length: 256,
        }
    }
}

impl LogConfig {
    /// Creates a verbose configuration suitable for debugging.
    pub fn verbose() -> Self {
        Self {
            base_level: Level::DEBUG,
            log_data_operations: true,
            log_column_details: true,
            max_field_length: 1024,
        }
    }

    /// Creates a minimal configuration for production with lowest overhead.
    pub fn production() -> Self {
        Self {
            base_level: Level::WARN,
            log_data_operations: false,
            log_column_details: false,
            max_field_length: 128,
        }
    }
}

/// Macro for performance-sensitive debug logging.
///
/// Arguments are only evaluated if the configured level admits debug events.
#[macro_export]
macro_rules! perf_debug {
    ($config:expr, $($arg:tt)*) => {
        if $config.base_level >= tracing::Level::DEBUG {
            tracing::debug!($($arg)*);
        }
    };
}

/// Macro for conditional per-column logging.
#[macro_export]
macro_rules! log_column_detail {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_column_details {
            tracing::debug!($($arg)*);
        }
    };
}

/// Macro for conditional data operation logging.
#[macro_export]
macro_rules! log_data_op {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_data_operations {
            tracing::info!($($arg)*);
        }
    };
}

/// Truncates a string to the maximum field length if needed.
pub fn truncate_field(value: &str, max_length: usize) -> String {
    if value.len() <= max_length {
        return value.to_string();
    }
    let mut end = max_length;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    let truncated = &value[..end];
    format!("{truncated}...(truncated)")
}

/// Installing a `tracing-subscriber` stack in binaries and tests.
pub mod setup {
    use tracing::Level;
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    /// Verbosity of a console subscriber.
    #[derive(Debug, Clone, Copy)]
    pub struct LoggingConfig {
        /// Level for every other crate
        pub level: Level,
        /// Level for events emitted by bizlens
        pub crate_level: Level,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: Level::INFO,
                crate_level: Level::DEBUG,
            }
        }
    }

    impl LoggingConfig {
        /// Debug output from everything.
        pub fn development() -> Self {
            Self {
                level: Level::DEBUG,
                crate_level: Level::DEBUG,
            }
        }

        pub fn with_crate_level(mut self, level: Level) -> Self {
            self.crate_level = level;
            self
        }

        /// The `EnvFilter` directives this config stands for.
        pub fn directives(&self) -> String {
            format!(
                "{},bizlens={}",
                self.level.as_str().to_lowercase(),
                self.crate_level.as_str().to_lowercase()
            )
        }
    }

    /// Installs a global `fmt` subscriber. `RUST_LOG` wins over the config when set.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use bizlens::logging::setup::{init_logging, LoggingConfig};
    /// use tracing::Level;
    ///
    /// init_logging(LoggingConfig::default().with_crate_level(Level::WARN)).unwrap();
    /// ```
    pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.directives()));
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()?;
        Ok(())
    }
}
