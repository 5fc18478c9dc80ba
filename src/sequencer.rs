//! Real-time playback of one frame.
//!
//! Symbol `i` of a frame starting at `start` is switched on at `start + i` seconds and off again
//! after its mark. Every deadline is derived from `start`, so timing errors of one symbol never
//! carry over to the next.

use time::{Nanoseconds, Seconds, TimeSpec};
use timecode::Frame;

use crate::clock::{wait_until, Clock, StopToken};
use crate::error::{DeviceError, PlaybackError};
use crate::pulse::PulseOutput;

/// A symbol that starts this late is not played. Its second is already over.
pub const LATE_LIMIT: Seconds = Seconds(1);

/// How a frame ended, when it did not fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Playback {
	Completed,
	/// Stopped through the [`StopToken`] before the last symbol. The output is silent.
	Cancelled
}

/// Keeps track of whether the carrier is on, and switches it off when dropped.
struct Emission<'a, P: PulseOutput + ?Sized> {
	pulse: &'a mut P,
	on: bool
}

impl<'a, P: PulseOutput + ?Sized> Emission<'a, P> {
	fn new(pulse: &'a mut P) -> Self {
		Emission { pulse, on: false }
	}

	fn emit(&mut self, mark: Nanoseconds) -> Result<(), DeviceError> {
		self.on = true;
		self.pulse.emit(mark)
	}

	fn silence(&mut self) -> Result<(), DeviceError> {
		self.pulse.silence()?;
		self.on = false;
		Ok(())
	}
}

impl<P: PulseOutput + ?Sized> Drop for Emission<'_, P> {
	fn drop(&mut self) {
		if self.on {
			if let Err(e) = self.pulse.silence() {
				log::warn!("Failed to silence output: {}", e);
			}
		}
	}
}

/// Plays frames against a clock.
#[derive(Clone, Debug)]
pub struct FrameSequencer<C> {
	clock: C
}

impl<C: Clock> FrameSequencer<C> {
	pub fn new(clock: C) -> FrameSequencer<C> {
		FrameSequencer { clock }
	}

	pub fn clock(&self) -> &C {
		&self.clock
	}

	/// Play `frame` with second 0 at `start`.
	///
	/// Blocks until the last mark is over, `stop` is set, or an error occurs. The output is silent
	/// whenever this returns.
	///
	/// # Errors
	///
	/// [`PlaybackError::Device`] if the output fails, [`PlaybackError::Late`] if a symbol could not
	/// be started within its second, and [`PlaybackError::Clock`] if the clock fails. The rest of the
	/// frame is abandoned.
	pub fn play<P: PulseOutput + ?Sized>(
		&self,
		frame: &Frame,
		start: TimeSpec,
		pulse: &mut P,
		stop: &StopToken
	) -> Result<Playback, PlaybackError> {
		let mut out = Emission::new(pulse);
		let late_limit = Nanoseconds::from(LATE_LIMIT);

		for (second, symbol) in frame.iter().enumerate() {
			let at = start + Seconds(second as i64);
			let Some(now) = wait_until(&self.clock, at, stop)? else {
				return Ok(Playback::Cancelled);
			};
			let late = now - at;
			if late >= late_limit {
				return Err(PlaybackError::Late { second, by: late });
			}

			let mark = symbol.mark();
			log::trace!("second {:2}: {} ({} ms, {} us late)", second, symbol, mark.as_millis(), late.0 / 1000);
			out.emit(mark).map_err(|source| PlaybackError::Device { second, source })?;

			let reached = wait_until(&self.clock, at + mark, stop)?;
			out.silence().map_err(|source| PlaybackError::Device { second, source })?;
			if reached.is_none() {
				return Ok(Playback::Cancelled);
			}
		}

		Ok(Playback::Completed)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::ClockError;
	use crate::test_utils::{FakePulse, PulseEvent, SimClock};
	use timecode::{jjy, leap::LeapSecondSchedule, Symbol};
	use time::UtcOffset;

	// Sat, Jun 15 2024. 14:37 JST
	const MINUTE: i64 = 1718429820;

	fn frame() -> Frame {
		let input = jjy::TimeCodeInput::new(MINUTE, UtcOffset::JST, false, &LeapSecondSchedule::empty()).unwrap();
		jjy::build(&input)
	}

	#[test]
	fn play_test() {
		let clock = SimClock::with_jitter(TimeSpec::from_secs(MINUTE - 1), &[0, 4, 11, -2, 30, 1]);
		let mut pulse = FakePulse::new(clock.clone());
		let sequencer = FrameSequencer::new(clock.clone());
		let start = TimeSpec::from_secs(MINUTE);
		let frame = frame();

		assert_eq!(sequencer.play(&frame, start, &mut pulse, &StopToken::new()).unwrap(), Playback::Completed);

		let records = pulse.records();
		assert_eq!(records.len(), 120);
		for (i, pair) in records.chunks(2).enumerate() {
			let at = start + Seconds(i as i64);
			let mark = frame[i].mark();
			assert_eq!(pair[0].event, PulseEvent::Emit(mark), "second {}", i);
			assert_eq!(pair[1].event, PulseEvent::Silence, "second {}", i);
			// On time within the clock's jitter, never early
			assert!(pair[0].at >= at && pair[0].at - at <= Nanoseconds::from_millis(30), "second {}", i);
			assert!(pair[1].at >= at + mark && pair[1].at - (at + mark) <= Nanoseconds::from_millis(30));
		}
		assert!(!pulse.is_emitting());
	}

	#[test]
	fn short_marker_test() {
		// The last symbol returns right after its mark, leaving the rest of the second free
		let clock = SimClock::new(TimeSpec::from_secs(MINUTE));
		let mut pulse = FakePulse::new(clock.clone());
		let start = TimeSpec::from_secs(MINUTE);
		FrameSequencer::new(clock.clone()).play(&frame(), start, &mut pulse, &StopToken::new()).unwrap();
		assert_eq!(frame()[59], Symbol::ShortMarker);
		assert_eq!(clock.now().unwrap(), start + Seconds(59) + Nanoseconds::from_millis(200));
	}

	#[test]
	fn cancel_test() {
		let clock = SimClock::new(TimeSpec::from_secs(MINUTE));
		let mut pulse = FakePulse::new(clock.clone());
		let stop = StopToken::new();
		let hook_stop = stop.clone();
		pulse.on_emit(move |n| {
			if n == 10 {
				hook_stop.stop();
			}
			Ok(())
		});

		let result = FrameSequencer::new(clock.clone()).play(&frame(), TimeSpec::from_secs(MINUTE), &mut pulse, &stop);
		assert_eq!(result.unwrap(), Playback::Cancelled);
		assert_eq!(pulse.emits(), 10);
		assert!(!pulse.is_emitting());
		// Cut short in the middle of the mark of second 9
		let last = pulse.records().last().copied().unwrap();
		assert_eq!(last.event, PulseEvent::Silence);
		assert!(last.at < TimeSpec::from_secs(MINUTE + 10));
	}

	#[test]
	fn device_error_test() {
		let clock = SimClock::new(TimeSpec::from_secs(MINUTE));
		let mut pulse = FakePulse::new(clock.clone());
		pulse.on_emit(|n| if n == 5 { Err(DeviceError::Stream("underrun".into())) } else { Ok(()) });

		let result = FrameSequencer::new(clock.clone()).play(&frame(), TimeSpec::from_secs(MINUTE), &mut pulse, &StopToken::new());
		assert!(matches!(result, Err(PlaybackError::Device { second: 4, source: DeviceError::Stream(_) })));
		// Failed emission is followed by a best-effort silence, and nothing else
		assert!(!pulse.is_emitting());
		assert_eq!(pulse.emits(), 5);
		assert_eq!(clock.now().unwrap(), TimeSpec::from_secs(MINUTE + 4));
	}

	#[test]
	fn late_test() {
		// The clock jumps ahead by two seconds while second 3 is on
		let clock = SimClock::new(TimeSpec::from_secs(MINUTE));
		let mut pulse = FakePulse::new(clock.clone());
		let hook_clock = clock.clone();
		pulse.on_emit(move |n| {
			if n == 4 {
				hook_clock.advance(Seconds(2));
			}
			Ok(())
		});

		let result = FrameSequencer::new(clock.clone()).play(&frame(), TimeSpec::from_secs(MINUTE), &mut pulse, &StopToken::new());
		assert!(matches!(result, Err(PlaybackError::Late { second: 4, .. })));
		assert!(!pulse.is_emitting());
	}

	#[test]
	fn clock_error_test() {
		let clock = SimClock::new(TimeSpec::from_secs(MINUTE));
		let mut pulse = FakePulse::new(clock.clone());
		let hook_clock = clock.clone();
		pulse.on_emit(move |n| {
			if n == 2 {
				hook_clock.fail();
			}
			Ok(())
		});

		let result = FrameSequencer::new(clock.clone()).play(&frame(), TimeSpec::from_secs(MINUTE), &mut pulse, &StopToken::new());
		assert!(matches!(result, Err(PlaybackError::Clock(ClockError::Unavailable))));
		// The guard still switched the carrier off
		assert!(!pulse.is_emitting());
	}
}
