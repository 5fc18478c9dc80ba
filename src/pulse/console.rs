//! Dry-run output that only logs.

use time::Nanoseconds;

use super::PulseOutput;
use crate::config::PulseConfig;
use crate::error::DeviceError;

/// Logs carrier transitions instead of driving hardware. Never fails.
#[derive(Debug)]
pub struct LogPulse {
	config: PulseConfig,
	emitting: bool
}

impl LogPulse {
	pub fn new(config: &PulseConfig) -> LogPulse {
		log::info!(
			"Dry run: {} Hz carrier at {}% duty on {} will only be logged",
			config.frequency, config.duty, config.pin
		);
		LogPulse { config: *config, emitting: false }
	}

	pub fn is_emitting(&self) -> bool {
		self.emitting
	}
}

impl PulseOutput for LogPulse {
	fn emit(&mut self, mark: Nanoseconds) -> Result<(), DeviceError> {
		if !self.emitting {
			log::debug!("carrier on ({} ms, {} Hz)", mark.as_millis(), self.config.frequency);
			self.emitting = true;
		}
		Ok(())
	}

	fn silence(&mut self) -> Result<(), DeviceError> {
		if self.emitting {
			log::debug!("carrier off");
			self.emitting = false;
		}
		Ok(())
	}
}
