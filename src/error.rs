//! Error types used across modules.
//!
//! Device and clock failures are kept apart so the scheduler can tell transient problems (one
//! frame is lost) from fatal ones (transmission stops). See individual error types for details.

use std::io;
use thiserror::Error;
use time::{time::TimeSpec, Nanoseconds, ParseError};
use timecode::{leap::ScheduleError, TimeCodeError};

/// The error type for pulse output devices.
#[derive(Debug, Error)]
pub enum DeviceError {
	/// Writing to the device failed. The device may recover.
	#[error("Device I/O error: {0}")]
	Io(#[from] io::Error),
	/// The device is gone (unplugged, unexported, driver unloaded). Never recovers.
	#[error("Device disconnected: {0}")]
	Disconnected(String),
	/// The audio stream reported an error.
	#[error("Audio stream error: {0}")]
	Stream(String)
}

impl DeviceError {
	/// Whether the device can no longer be used at all.
	pub fn is_fatal(&self) -> bool {
		matches!(self, DeviceError::Disconnected(_))
	}
}

/// The error type for reading the wall clock or waiting on it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClockError {
	#[error("Failed to read the system clock")]
	Unavailable,
	/// Sleeping towards the deadline failed with the given OS error number.
	#[error("Failed to sleep until {deadline:?}: errno {errno}")]
	Sleep { deadline: TimeSpec, errno: i32 }
}

/// The error type for invalid configuration, reported before anything is transmitted.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
	#[error("Invalid leap second schedule: {0}")]
	LeapSchedule(ScheduleError),
	#[error("Invalid time: {0}")]
	Time(ParseError),
	#[error("Invalid UTC offset: {0}")]
	Offset(ParseError),
	#[error("Invalid pin {0:?}, expected CHIP:CHANNEL")]
	Pin(String),
	#[error("Carrier frequency must be between 1 Hz and 1 GHz, got {0}")]
	Frequency(u32),
	#[error("Duty cycle must be between 1 and 100 percent, got {0}")]
	Duty(u8),
	#[error("Lead time must be between 0 and 59 seconds, got {0}")]
	Lead(i64)
}

impl From<ScheduleError> for ConfigError {
	fn from(value: ScheduleError) -> Self {
		ConfigError::LeapSchedule(value)
	}
}

/// The error type for playing one frame. The frame is abandoned, later minutes may still play.
#[derive(Debug, Error)]
pub enum PlaybackError {
	#[error("Pulse output failed at second {second}: {source}")]
	Device { second: usize, source: DeviceError },
	/// The symbol's second was already over when the worker got to it.
	#[error("Second {second} started {} ms late", .by.as_millis())]
	Late { second: usize, by: Nanoseconds },
	#[error(transparent)]
	Clock(#[from] ClockError)
}

impl PlaybackError {
	/// Whether transmission has to stop after this error.
	pub fn is_fatal(&self) -> bool {
		match self {
			PlaybackError::Device { source, .. } => source.is_fatal(),
			PlaybackError::Late { .. } => false,
			PlaybackError::Clock(_) => true,
		}
	}
}

/// The error type for failures that stop the scheduler.
#[derive(Debug, Error)]
pub enum FatalSchedulingError {
	/// The next wake-up could not be armed.
	#[error("Cannot schedule the next frame: {0}")]
	Clock(#[from] ClockError),
	/// The pulse output is unusable.
	#[error("Pulse output lost: {0}")]
	Device(DeviceError),
	/// The minute to encode cannot be represented.
	#[error("Cannot encode minute: {0}")]
	Encode(TimeCodeError)
}
