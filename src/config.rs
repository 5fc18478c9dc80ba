//! Validated transmitter and pulse output configuration.
//!
//! Everything here is checked once, before the scheduler is started, so that no configuration
//! problem can surface in the middle of a transmission.

use std::fmt;
use std::num::NonZero;
use std::str::FromStr;
use std::sync::Arc;
use time::{parse_offset, parse_timestamp_in, Nanoseconds, Seconds, TimeSpec, UtcOffset, NANOS_PER_SECOND};
use timecode::{jjy::TimeCodeInput, leap::{LeapSecond, LeapSecondSchedule}, TimeCodeError};

use crate::error::ConfigError;

/// What to transmit, and when.
#[derive(Clone, Debug)]
pub struct TransmitterConfig {
	/// Civil time zone the frames are encoded in.
	pub zone: UtcOffset,
	pub summer_time: bool,
	pub leap_seconds: Arc<LeapSecondSchedule>,
	/// How long before each minute boundary the worker wakes up to prepare the frame.
	pub lead: Seconds,
	/// Stop after this many frames. Runs until stopped if `None`.
	pub count: Option<NonZero<usize>>
}

impl Default for TransmitterConfig {
	/// Japan Standard Time, no summer time, the built-in leap seconds, one second lead.
	fn default() -> Self {
		TransmitterConfig {
			zone: UtcOffset::JST,
			summer_time: false,
			leap_seconds: Arc::new(LeapSecondSchedule::builtin()),
			lead: Seconds(1),
			count: None
		}
	}
}

impl TransmitterConfig {
	/// Set the wake-up lead time, in whole seconds.
	///
	/// # Errors
	///
	/// Returns [`ConfigError::Lead`] unless `lead` is in [0, 59].
	pub fn with_lead(mut self, lead: i64) -> Result<TransmitterConfig, ConfigError> {
		if !(0..60).contains(&lead) {
			return Err(ConfigError::Lead(lead));
		}
		self.lead = Seconds(lead);
		Ok(self)
	}

	pub fn with_count(mut self, count: Option<NonZero<usize>>) -> TransmitterConfig {
		self.count = count;
		self
	}

	/// The time code input for the minute starting at `minute`.
	pub fn input(&self, minute: TimeSpec) -> Result<TimeCodeInput, TimeCodeError> {
		TimeCodeInput::new(minute.sec, self.zone, self.summer_time, &self.leap_seconds)
	}
}

/// Parse a `±HH:MM` offset (or `Z`).
pub fn parse_utc_offset(s: &str) -> Result<UtcOffset, ConfigError> {
	parse_offset(s.as_bytes()).map_err(ConfigError::Offset)
}

/// Build the leap second schedule from command line style inputs.
///
/// Times without an explicit offset are read as civil time in `zone`.
pub fn leap_schedule(
	builtin: bool,
	insert: &[String],
	remove: &[String],
	zone: UtcOffset
) -> Result<LeapSecondSchedule, ConfigError> {
	let parse = |s: &String| parse_timestamp_in(s.as_bytes(), zone).map_err(ConfigError::Time);
	let mut extra = Vec::with_capacity(insert.len() + remove.len());
	for s in insert {
		extra.push(LeapSecond::insert(parse(s)?.sec));
	}
	for s in remove {
		extra.push(LeapSecond::remove(parse(s)?.sec));
	}
	let base = if builtin { LeapSecondSchedule::builtin() } else { LeapSecondSchedule::empty() };
	Ok(base.extend(extra)?)
}

/// A PWM output, as numbered by the kernel: `pwmchip<chip>/pwm<channel>`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pin {
	pub chip: u32,
	pub channel: u32
}

impl FromStr for Pin {
	type Err = ConfigError;

	/// Parse `CHIP:CHANNEL`, e.g. `0:0`.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let err = || ConfigError::Pin(s.to_string());
		let (chip, channel) = s.split_once(':').ok_or_else(err)?;
		Ok(Pin {
			chip: chip.trim().parse().map_err(|_| err())?,
			channel: channel.trim().parse().map_err(|_| err())?
		})
	}
}

impl fmt::Display for Pin {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.chip, self.channel)
	}
}

/// How the carrier is generated while a mark is on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PulseConfig {
	pub pin: Pin,
	/// Carrier frequency in Hz.
	pub frequency: u32,
	/// Duty cycle in percent.
	pub duty: u8
}

impl Default for PulseConfig {
	/// 60 kHz at 50% duty on `0:0`.
	fn default() -> Self {
		PulseConfig { pin: Pin::default(), frequency: 60000, duty: 50 }
	}
}

impl PulseConfig {
	/// # Errors
	///
	/// Returns [`ConfigError::Frequency`] unless 1 Hz <= `frequency` <= 1 GHz, and
	/// [`ConfigError::Duty`] unless 1 <= `duty` <= 100.
	pub fn new(pin: Pin, frequency: u32, duty: u8) -> Result<PulseConfig, ConfigError> {
		if frequency == 0 || frequency as i64 > NANOS_PER_SECOND {
			return Err(ConfigError::Frequency(frequency));
		}
		if duty == 0 || duty > 100 {
			return Err(ConfigError::Duty(duty));
		}
		Ok(PulseConfig { pin, frequency, duty })
	}

	/// Carrier period, rounded to the nearest nanosecond.
	pub fn period(&self) -> Nanoseconds {
		let f = self.frequency as i64;
		Nanoseconds((NANOS_PER_SECOND + f / 2) / f)
	}

	/// Time the carrier is high in each period.
	pub fn duty_cycle(&self) -> Nanoseconds {
		Nanoseconds(self.period().0 * self.duty as i64 / 100)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use timecode::leap::{LeapDirective, ScheduleError};

	#[test]
	fn pin_test() {
		assert_eq!("0:0".parse::<Pin>(), Ok(Pin { chip: 0, channel: 0 }));
		assert_eq!("2:1".parse::<Pin>(), Ok(Pin { chip: 2, channel: 1 }));
		assert_eq!("18".parse::<Pin>(), Err(ConfigError::Pin("18".into())));
		assert_eq!("a:1".parse::<Pin>(), Err(ConfigError::Pin("a:1".into())));
		assert_eq!(Pin { chip: 2, channel: 1 }.to_string(), "2:1");
	}

	#[test]
	fn pulse_config_test() {
		let c = PulseConfig::default();
		assert_eq!(c.period(), Nanoseconds(16667));
		assert_eq!(c.duty_cycle(), Nanoseconds(8333));

		let c = PulseConfig::new(Pin::default(), 40000, 25).unwrap();
		assert_eq!(c.period(), Nanoseconds(25000));
		assert_eq!(c.duty_cycle(), Nanoseconds(6250));

		assert_eq!(PulseConfig::new(Pin::default(), 0, 50), Err(ConfigError::Frequency(0)));
		assert_eq!(PulseConfig::new(Pin::default(), 60000, 0), Err(ConfigError::Duty(0)));
		assert_eq!(PulseConfig::new(Pin::default(), 60000, 101), Err(ConfigError::Duty(101)));
	}

	#[test]
	fn lead_test() {
		assert_eq!(TransmitterConfig::default().lead, Seconds(1));
		assert_eq!(TransmitterConfig::default().with_lead(0).unwrap().lead, Seconds(0));
		assert!(matches!(TransmitterConfig::default().with_lead(60), Err(ConfigError::Lead(60))));
		assert!(matches!(TransmitterConfig::default().with_lead(-1), Err(ConfigError::Lead(-1))));
	}

	#[test]
	fn leap_schedule_test() {
		let s = leap_schedule(false, &["2017-01-01T09:00".into()], &[], UtcOffset::JST).unwrap();
		assert_eq!(s.entries(), [LeapSecond::insert(1483228800)]);

		let s = leap_schedule(true, &[], &["2030-07-01 00:00:00Z".into()], UtcOffset::JST).unwrap();
		assert_eq!(s.entries().len(), 28);
		assert_eq!(s.directive(1909094400 - 86400), LeapDirective::Remove);

		assert_eq!(
			leap_schedule(true, &["2017-01-01T09:00".into()], &[], UtcOffset::JST),
			Err(ConfigError::LeapSchedule(ScheduleError::Duplicate(1483228800)))
		);
		assert!(matches!(
			leap_schedule(false, &["2017-13-01".into()], &[], UtcOffset::JST),
			Err(ConfigError::Time(_))
		));
	}

	#[test]
	fn input_test() {
		let config = TransmitterConfig::default();
		let input = config.input(TimeSpec::from_secs(1718429820)).unwrap();
		assert_eq!((input.hour, input.minute, input.weekday), (14, 37, 6));
		assert_eq!(parse_utc_offset("+09:00"), Ok(UtcOffset::JST));
		assert!(parse_utc_offset("JST").is_err());
	}
}
