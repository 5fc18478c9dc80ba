//! Console logging setup.

use std::sync::Once;

/// Logger configuration.
///
/// `filter` follows the `env_logger` filter syntax (e.g. "info", "jjy_pulse::sequencer=trace").
/// When absent, `RUST_LOG` is used, then `info`.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
	pub filter: Option<String>,
	pub write_style: env_logger::WriteStyle
}

impl Default for LoggingConfig {
	fn default() -> Self {
		LoggingConfig {
			filter: None,
			write_style: env_logger::WriteStyle::Auto
		}
	}
}

static INIT: Once = Once::new();

/// Initialize the global logger. Later calls are ignored.
pub fn init_logging(config: LoggingConfig) {
	INIT.call_once(|| {
		let mut builder = env_logger::Builder::new();

		match config.filter.or_else(|| std::env::var("RUST_LOG").ok()) {
			Some(filter) => { builder.parse_filters(&filter); },
			None => { builder.filter_level(log::LevelFilter::Info); }
		}

		// Transmission timing is judged against wall-clock milliseconds
		builder.format_timestamp_millis();
		builder.write_style(config.write_style);
		builder.init();

		log::debug!("logging initialized");
	});
}
