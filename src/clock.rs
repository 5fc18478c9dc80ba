//! Wall clock access and cancellable waits.
//!
//! All timing in this crate is expressed as absolute [`TimeSpec`] deadlines on the wall clock.
//! Waiting towards a deadline never accumulates error: early wake-ups sleep again, late wake-ups
//! are reported to the caller with the actual time.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use time::{Nanoseconds, Seconds, TimeSpec};

use crate::error::ClockError;

/// Longest single sleep while waiting, so a stop request is noticed within this period.
pub const POLL_INTERVAL: Seconds = Seconds(1);

/// Source of wall-clock time.
pub trait Clock: Send + 'static {
	/// The current wall-clock instant.
	fn now(&self) -> Result<TimeSpec, ClockError>;

	/// Block until roughly `deadline`. May return early or late.
	fn sleep_until(&self, deadline: TimeSpec) -> Result<(), ClockError>;
}

/// The host's `CLOCK_REALTIME`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now(&self) -> Result<TimeSpec, ClockError> {
		time::now().ok_or(ClockError::Unavailable)
	}

	fn sleep_until(&self, deadline: TimeSpec) -> Result<(), ClockError> {
		time::sleep_until(deadline).map_err(|errno| ClockError::Sleep { deadline, errno })
	}
}

/// Shared cancellation flag.
///
/// Cloning yields a handle to the same flag. Once stopped, a token stays stopped.
#[derive(Clone, Debug, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
	pub fn new() -> StopToken {
		StopToken::default()
	}

	pub fn stop(&self) {
		self.0.store(true, Ordering::Release);
	}

	pub fn is_stopped(&self) -> bool {
		self.0.load(Ordering::Acquire)
	}
}

/// Wait until `deadline`, checking `stop` at least every [`POLL_INTERVAL`].
///
/// Returns the time actually reached (at or after `deadline`), or `None` if `stop` was set first.
/// The token is checked before the clock, so a stopped token wins even when the deadline has
/// already passed.
pub fn wait_until<C: Clock + ?Sized>(clock: &C, deadline: TimeSpec, stop: &StopToken)
	-> Result<Option<TimeSpec>, ClockError>
{
	let poll = Nanoseconds::from(POLL_INTERVAL);
	loop {
		if stop.is_stopped() {
			return Ok(None);
		}
		let now = clock.now()?;
		if now >= deadline {
			return Ok(Some(now));
		}
		clock.sleep_until(if deadline - now > poll { now + poll } else { deadline })?;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_utils::SimClock;

	#[test]
	fn system_clock_test() {
		let clock = SystemClock;
		let start = clock.now().unwrap();
		let deadline = start + Nanoseconds::from_millis(20);
		assert!(wait_until(&clock, deadline, &StopToken::new()).unwrap().unwrap() >= deadline);
	}

	#[test]
	fn wait_until_test() {
		let clock = SimClock::new(TimeSpec::from_secs(1000));
		let stop = StopToken::new();
		let reached = wait_until(&clock, TimeSpec::from_secs(1010), &stop).unwrap().unwrap();
		assert!(reached >= TimeSpec::from_secs(1010));
		// Never sleeps past the poll interval in one go
		assert!(clock.longest_sleep() <= Nanoseconds::from(POLL_INTERVAL));

		// Deadline in the past: returns immediately without sleeping
		let sleeps = clock.sleeps();
		assert_eq!(wait_until(&clock, TimeSpec::from_secs(5), &stop).unwrap(), Some(clock.now().unwrap()));
		assert_eq!(clock.sleeps(), sleeps);
	}

	#[test]
	fn early_wakeup_test() {
		// Every other wake-up comes 3 ms early
		let clock = SimClock::with_jitter(TimeSpec::from_secs(0), &[-3, 0]);
		let reached = wait_until(&clock, TimeSpec::from_secs(2), &StopToken::new()).unwrap().unwrap();
		assert!(reached >= TimeSpec::from_secs(2));
	}

	#[test]
	fn stopped_test() {
		let clock = SimClock::new(TimeSpec::from_secs(0));
		let stop = StopToken::new();
		let other = stop.clone();
		other.stop();
		assert!(stop.is_stopped());
		assert_eq!(wait_until(&clock, TimeSpec::from_secs(0), &stop).unwrap(), None);
		assert_eq!(clock.sleeps(), 0);
	}

	#[test]
	fn clock_failure_test() {
		let clock = SimClock::new(TimeSpec::from_secs(0));
		clock.fail();
		assert_eq!(wait_until(&clock, TimeSpec::from_secs(1), &StopToken::new()), Err(ClockError::Unavailable));
	}
}
