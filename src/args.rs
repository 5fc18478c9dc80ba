//! Command line arguments.

use std::num::NonZero;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use time::{Seconds, UtcOffset};

use crate::config::{leap_schedule, parse_utc_offset, Pin, PulseConfig, TransmitterConfig};
use crate::error::ConfigError;
use crate::logging::LoggingConfig;

/// Where the carrier goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DeviceKind {
	/// Linux hardware PWM through sysfs
	Pwm,
	/// Default audio output, radiating at a subharmonic of the carrier
	Audio,
	/// Log carrier transitions only
	Log
}

/// Transmit the JJY time code, one frame per minute, until stopped.
#[derive(Debug, Parser)]
#[command(name = "jjy-pulse", version, about)]
pub struct Arguments {
	/// Output device
	#[arg(long, value_enum, default_value = "pwm", env = "JJY_DEVICE")]
	pub device: DeviceKind,

	/// PWM chip and channel, as in /sys/class/pwm/pwmchipCHIP/pwmCHANNEL
	#[arg(long, value_name = "CHIP:CHANNEL", default_value = "0:0", env = "JJY_PIN")]
	pub pin: Pin,

	/// Carrier frequency in Hz (60000 for JJY60, 40000 for JJY40)
	#[arg(long, value_name = "HZ", default_value_t = 60000)]
	pub frequency: u32,

	/// Carrier duty cycle in percent
	#[arg(long, value_name = "PERCENT", default_value_t = 50)]
	pub duty: u8,

	/// Offset from UTC of the transmitted civil time
	#[arg(
		short = 'z', long, value_name = "±HH:MM", default_value = "+09:00",
		value_parser = parse_utc_offset, allow_hyphen_values = true, env = "JJY_UTC_OFFSET"
	)]
	pub utc_offset: UtcOffset,

	/// Set the summer time bit
	#[arg(long)]
	pub summer_time: bool,

	/// Announce an inserted leap second before TIME (repeatable)
	#[arg(long = "leap-second", value_name = "TIME")]
	pub leap_seconds: Vec<String>,

	/// Announce a removed leap second before TIME (repeatable)
	#[arg(long = "negative-leap-second", value_name = "TIME")]
	pub negative_leap_seconds: Vec<String>,

	/// Do not include the built-in list of past leap seconds
	#[arg(long)]
	pub no_builtin_leap_seconds: bool,

	/// Seconds before each minute to wake up and prepare the frame
	#[arg(long, value_name = "SECONDS", default_value_t = 1)]
	pub lead: i64,

	/// Number of minutes to transmit [default: until interrupted]
	#[arg(short = 'n', long)]
	pub count: Option<NonZero<usize>>,

	/// Give up after this many consecutive failed frames
	#[arg(long, value_name = "N")]
	pub max_failures: Option<NonZero<usize>>,

	/// Log filter, e.g. "debug" or "jjy_pulse::sequencer=trace" [default: $RUST_LOG, then info]
	#[arg(long, value_name = "FILTER")]
	pub log_level: Option<String>
}

impl Arguments {
	pub fn transmitter_config(&self) -> Result<TransmitterConfig, ConfigError> {
		let schedule = leap_schedule(
			!self.no_builtin_leap_seconds,
			&self.leap_seconds,
			&self.negative_leap_seconds,
			self.utc_offset
		)?;
		let config = TransmitterConfig {
			zone: self.utc_offset,
			summer_time: self.summer_time,
			leap_seconds: Arc::new(schedule),
			lead: Seconds(1),
			count: None
		};
		Ok(config.with_lead(self.lead)?.with_count(self.count))
	}

	pub fn pulse_config(&self) -> Result<PulseConfig, ConfigError> {
		PulseConfig::new(self.pin, self.frequency, self.duty)
	}

	pub fn logging_config(&self) -> LoggingConfig {
		LoggingConfig { filter: self.log_level.clone(), ..Default::default() }
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::CommandFactory;
	use timecode::leap::{LeapDirective, LeapSecond};

	fn parse(args: &[&str]) -> Result<Arguments, clap::Error> {
		Arguments::try_parse_from(std::iter::once("jjy-pulse").chain(args.iter().copied()))
	}

	#[test]
	fn command_test() {
		Arguments::command().debug_assert();
	}

	#[test]
	fn defaults_test() {
		let args = parse(&[]).unwrap();
		assert_eq!(args.device, DeviceKind::Pwm);
		assert_eq!(args.pulse_config().unwrap(), PulseConfig::default());
		assert_eq!(args.count, None);
		assert_eq!(args.max_failures, None);

		let config = args.transmitter_config().unwrap();
		assert_eq!(config.zone, UtcOffset::JST);
		assert!(!config.summer_time);
		assert_eq!(config.lead, Seconds(1));
		assert_eq!(config.leap_seconds.entries().len(), 27);
		assert_eq!(args.logging_config().filter, None);
	}

	#[test]
	fn arguments_parse_test() {
		let args = parse(&[
			"--device", "audio",
			"--pin", "1:2",
			"--frequency", "40000",
			"--duty", "25",
			"-z", "-05:00",
			"--summer-time",
			"--no-builtin-leap-seconds",
			"--leap-second", "2017-01-01T09:00+09:00",
			"--negative-leap-second", "2030-07-01 00:00:00Z",
			"--lead", "3",
			"-n", "4",
			"--max-failures", "2",
			"--log-level", "debug"
		]).unwrap();

		assert_eq!(args.device, DeviceKind::Audio);
		assert_eq!(args.pulse_config().unwrap(), PulseConfig::new(Pin { chip: 1, channel: 2 }, 40000, 25).unwrap());
		assert_eq!(args.count, NonZero::new(4));
		assert_eq!(args.max_failures, NonZero::new(2));
		assert_eq!(args.logging_config().filter.as_deref(), Some("debug"));

		let config = args.transmitter_config().unwrap();
		assert_eq!(config.zone, UtcOffset::new(-5 * 3600).unwrap());
		assert!(config.summer_time);
		assert_eq!(config.lead, Seconds(3));
		assert_eq!(config.count, NonZero::new(4));
		assert_eq!(config.leap_seconds.entries(), [LeapSecond::insert(1483228800), LeapSecond::remove(1909094400)]);
		assert_eq!(config.leap_seconds.directive(1909094400 - 60), LeapDirective::Remove);
	}

	#[test]
	fn invalid_test() {
		assert!(parse(&["--device", "radio"]).is_err());
		assert!(parse(&["--pin", "18"]).is_err());
		assert!(parse(&["-z", "JST"]).is_err());
		assert!(parse(&["-n", "0"]).is_err());
		assert!(parse(&["--duty", "300"]).is_err());

		// Parsed, but rejected when building the configuration
		assert_eq!(parse(&["--duty", "0"]).unwrap().pulse_config(), Err(ConfigError::Duty(0)));
		assert_eq!(parse(&["--lead", "60"]).unwrap().transmitter_config().err(), Some(ConfigError::Lead(60)));
		assert!(matches!(
			parse(&["--leap-second", "yesterday"]).unwrap().transmitter_config(),
			Err(ConfigError::Time(_))
		));
	}
}
