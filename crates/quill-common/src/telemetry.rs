//! Tracing setup for quill front ends.
//!
//! Native builds log to stderr through a compact `tracing-subscriber` fmt layer,
//! browser builds log to the devtools console through `tracing-wasm`.
//!
//! # Usage
//!
//! ```ignore
//! use quill_common::telemetry::{self, TelemetryConfig};
//!
//! telemetry::init(TelemetryConfig::from_env("quill-cli"));
//! tracing::info!("ready");
//! ```

use tracing::Level;

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Name attached to the startup log line (e.g. "quill-cli", "quill-js")
    pub service_name: String,
    /// Console log level (default: INFO, DEBUG in debug builds)
    pub console_level: Level,
}

impl TelemetryConfig {
    /// `RUST_LOG` still wins over `console_level` on native builds.
    pub fn from_env(service_name: impl Into<String>) -> Self {
        let console_level = if cfg!(debug_assertions) {
            Level::DEBUG
        } else {
            Level::INFO
        };

        Self {
            service_name: service_name.into(),
            console_level,
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.console_level = level;
        self
    }
}

/// Install the global subscriber.
///
/// Safe to call more than once; later calls leave the first subscriber in place.
#[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
pub fn init(config: TelemetryConfig) {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(config.console_level.as_str().to_lowercase())
    });

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact();

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(service = %config.service_name, "telemetry initialized");
    }
}

#[cfg(all(target_family = "wasm", target_os = "unknown"))]
pub fn init(config: TelemetryConfig) {
    use tracing::subscriber::set_global_default;
    use tracing_subscriber::Registry;
    use tracing_subscriber::layer::SubscriberExt;

    let wasm_layer = tracing_wasm::WASMLayer::new(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(config.console_level)
            .build(),
    );

    let reg = Registry::default().with(wasm_layer);

    if set_global_default(reg).is_ok() {
        tracing::debug!(service = %config.service_name, "telemetry initialized");
    }
}
