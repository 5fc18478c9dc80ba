//! Pulse outputs: the carrier that is switched on for each mark.
//!
//! A [`PulseOutput`] only knows how to turn the carrier on and off. Timing is entirely up to the
//! caller, see [`crate::sequencer`].

use time::Nanoseconds;

use crate::error::DeviceError;

pub mod audio;
pub mod console;
pub mod pwm;

pub use audio::AudioPulse;
pub use console::LogPulse;
pub use pwm::SysfsPwm;

/// A carrier that can be switched on and off.
pub trait PulseOutput: Send + 'static {
	/// Switch the carrier on. `mark` is how long the caller intends to keep it on.
	fn emit(&mut self, mark: Nanoseconds) -> Result<(), DeviceError>;

	/// Switch the carrier off. Calling this while already silent is a no-op.
	fn silence(&mut self) -> Result<(), DeviceError>;
}

impl<P: PulseOutput + ?Sized> PulseOutput for Box<P> {
	fn emit(&mut self, mark: Nanoseconds) -> Result<(), DeviceError> {
		(**self).emit(mark)
	}

	fn silence(&mut self) -> Result<(), DeviceError> {
		(**self).silence()
	}
}
