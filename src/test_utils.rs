//! Shared test doubles: a simulated clock and a recording pulse output.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use time::{Nanoseconds, Seconds, TimeSpec};

use crate::clock::Clock;
use crate::error::{ClockError, DeviceError};
use crate::pulse::PulseOutput;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
	m.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Default)]
struct SimState {
	now: TimeSpec,
	sleeps: usize,
	longest: Nanoseconds,
	held: bool
}

struct SimInner {
	state: Mutex<SimState>,
	released: Condvar,
	/// Added to every deadline on wake-up, cycled through in order. Negative values wake early.
	jitter: Vec<Nanoseconds>,
	next_jitter: AtomicUsize,
	failed: AtomicBool,
	parked: AtomicBool
}

/// Simulated wall clock. Sleeping jumps straight to the deadline plus the next jitter value.
///
/// Clones share the same time.
#[derive(Clone)]
pub struct SimClock(Arc<SimInner>);

impl SimClock {
	pub fn new(start: TimeSpec) -> SimClock {
		SimClock::with_jitter(start, &[0])
	}

	/// Jitter values are in milliseconds.
	pub fn with_jitter(start: TimeSpec, jitter_ms: &[i64]) -> SimClock {
		SimClock(Arc::new(SimInner {
			state: Mutex::new(SimState { now: start, ..Default::default() }),
			released: Condvar::new(),
			jitter: jitter_ms.iter().map(|&ms| Nanoseconds::from_millis(ms)).collect(),
			next_jitter: AtomicUsize::new(0),
			failed: AtomicBool::new(false),
			parked: AtomicBool::new(false)
		}))
	}

	/// Current simulated time, even after [`SimClock::fail`].
	pub fn current(&self) -> TimeSpec {
		lock(&self.0.state).now
	}

	/// Jump forward, as after a host suspend.
	pub fn advance(&self, by: Seconds) {
		lock(&self.0.state).now += by;
	}

	/// Make every later `now()` fail.
	pub fn fail(&self) {
		self.0.failed.store(true, Ordering::SeqCst);
	}

	/// Block sleepers until [`SimClock::release`].
	pub fn hold(&self) {
		lock(&self.0.state).held = true;
	}

	pub fn release(&self) {
		lock(&self.0.state).held = false;
		self.0.released.notify_all();
	}

	/// Whether a thread is blocked in `sleep_until` by [`SimClock::hold`].
	pub fn parked(&self) -> bool {
		self.0.parked.load(Ordering::SeqCst)
	}

	pub fn sleeps(&self) -> usize {
		lock(&self.0.state).sleeps
	}

	/// Longest span requested by a single `sleep_until`.
	pub fn longest_sleep(&self) -> Nanoseconds {
		lock(&self.0.state).longest
	}
}

impl Clock for SimClock {
	fn now(&self) -> Result<TimeSpec, ClockError> {
		if self.0.failed.load(Ordering::SeqCst) {
			return Err(ClockError::Unavailable);
		}
		Ok(self.current())
	}

	fn sleep_until(&self, deadline: TimeSpec) -> Result<(), ClockError> {
		let mut state = lock(&self.0.state);
		while state.held {
			self.0.parked.store(true, Ordering::SeqCst);
			state = self.0.released.wait(state).unwrap_or_else(|e| e.into_inner());
		}
		self.0.parked.store(false, Ordering::SeqCst);

		let span = deadline - state.now;
		state.longest = state.longest.max(span);
		state.sleeps += 1;
		let i = self.0.next_jitter.fetch_add(1, Ordering::SeqCst);
		let jitter = self.0.jitter[i % self.0.jitter.len()];
		state.now = state.now.max(deadline + jitter);
		drop(state);

		// Let the controlling thread observe intermediate states
		thread::yield_now();
		Ok(())
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PulseEvent {
	Emit(Nanoseconds),
	Silence
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Record {
	pub at: TimeSpec,
	pub event: PulseEvent
}

type EmitHook = Box<dyn FnMut(usize) -> Result<(), DeviceError> + Send>;

#[derive(Default)]
struct FakeState {
	records: Vec<Record>,
	emits: usize,
	hook: Option<EmitHook>
}

/// Pulse output that records every call with the simulated time it happened at.
///
/// Clones share the same records, so a test can keep one while the scheduler owns another.
#[derive(Clone)]
pub struct FakePulse {
	clock: SimClock,
	state: Arc<Mutex<FakeState>>
}

impl FakePulse {
	pub fn new(clock: SimClock) -> FakePulse {
		FakePulse { clock, state: Arc::default() }
	}

	/// Run `hook` on every emit with the 1-based emit count. An error fails that emit.
	pub fn on_emit(&self, hook: impl FnMut(usize) -> Result<(), DeviceError> + Send + 'static) {
		lock(&self.state).hook = Some(Box::new(hook));
	}

	pub fn records(&self) -> Vec<Record> {
		lock(&self.state).records.clone()
	}

	/// Number of emit calls, failed ones included.
	pub fn emits(&self) -> usize {
		lock(&self.state).emits
	}

	pub fn is_emitting(&self) -> bool {
		matches!(lock(&self.state).records.last(), Some(Record { event: PulseEvent::Emit(_), .. }))
	}
}

impl PulseOutput for FakePulse {
	fn emit(&mut self, mark: Nanoseconds) -> Result<(), DeviceError> {
		let mut state = lock(&self.state);
		state.emits += 1;
		let n = state.emits;
		if let Some(hook) = state.hook.as_mut() {
			hook(n)?;
		}
		let at = self.clock.current();
		state.records.push(Record { at, event: PulseEvent::Emit(mark) });
		Ok(())
	}

	fn silence(&mut self) -> Result<(), DeviceError> {
		let at = self.clock.current();
		lock(&self.state).records.push(Record { at, event: PulseEvent::Silence });
		Ok(())
	}
}
