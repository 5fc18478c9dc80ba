//! Minute scheduling.
//!
//! A [`MinuteScheduler`] owns the pulse output and drives one worker thread that wakes up a lead
//! time before every minute boundary, builds the frame for that minute and plays it aligned to the
//! boundary. Targets advance by exactly 60 seconds from the first one, so frames stay on a fixed
//! grid no matter how long playback or wake-ups take.
//!
//! The controlling side observes progress through a bounded channel of [`SchedulerEvent`]s and may
//! stop the worker from any thread. Events that do not fit in the channel are dropped, so a
//! receiver that is never drained costs at most [`EVENT_BACKLOG`] events.

use std::mem;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use time::{Nanoseconds, Seconds, TimeSpec};
use timecode::{jjy, Frame};

use crate::clock::{wait_until, Clock, StopToken};
use crate::config::TransmitterConfig;
use crate::error::{DeviceError, FatalSchedulingError, PlaybackError};
use crate::pulse::PulseOutput;
use crate::sequencer::{FrameSequencer, Playback, LATE_LIMIT};

const MINUTE: Seconds = Seconds(60);

/// Events kept for a receiver that falls behind. Later events are dropped until it catches up.
pub const EVENT_BACKLOG: usize = 64;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
	m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Where the scheduler is in its cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
	Stopped,
	/// Waiting for `wake`, to transmit the minute starting at `target`.
	Scheduled { wake: TimeSpec, target: TimeSpec },
	/// Playing the frame for the minute starting at `minute`.
	Running { minute: TimeSpec }
}

/// Progress reports sent by the worker.
///
/// Every run ends with exactly one [`SchedulerEvent::Stopped`], sent after the output was
/// silenced, unless the receiver let the channel fill up.
#[derive(Debug)]
pub enum SchedulerEvent {
	/// Wake-up armed for the minute starting at `target`.
	Armed { wake: TimeSpec, target: TimeSpec },
	FrameStarted { minute: TimeSpec, frame: Frame },
	FrameCompleted { minute: TimeSpec },
	/// The frame was abandoned. The next minute is still transmitted.
	FrameFailed { minute: TimeSpec, error: PlaybackError },
	/// The worker fell behind and skipped `minutes` frames. `next` is the next target.
	Skipped { minutes: i64, next: TimeSpec },
	/// The configured number of frames was transmitted.
	Finished { frames: usize },
	Fatal(FatalSchedulingError),
	Stopped
}

/// Who currently holds the pulse output.
enum Control<P> {
	Idle(P),
	Active(JoinHandle<P>),
	/// The worker panicked, or could not be spawned, and took the output with it.
	Lost
}

/// Transmits one frame per minute on a worker thread.
///
/// All methods take `&self` and may be called from any thread.
pub struct MinuteScheduler<P: PulseOutput, C: Clock + Clone> {
	config: Arc<TransmitterConfig>,
	clock: C,
	events: SyncSender<SchedulerEvent>,
	state: Arc<Mutex<SchedulerState>>,
	token: Mutex<StopToken>,
	control: Mutex<Control<P>>
}

impl<P: PulseOutput, C: Clock + Clone> MinuteScheduler<P, C> {
	/// Create a stopped scheduler and the receiving end of its event channel.
	pub fn new(config: TransmitterConfig, pulse: P, clock: C) -> (Self, Receiver<SchedulerEvent>) {
		let (events, rx) = sync_channel(EVENT_BACKLOG);
		let scheduler = MinuteScheduler {
			config: Arc::new(config),
			clock,
			events,
			state: Arc::new(Mutex::new(SchedulerState::Stopped)),
			token: Mutex::new(StopToken::new()),
			control: Mutex::new(Control::Idle(pulse))
		};
		(scheduler, rx)
	}

	pub fn state(&self) -> SchedulerState {
		*lock(&self.state)
	}

	/// Start transmitting from the next minute whose wake-up has not passed yet.
	///
	/// Does nothing unless the scheduler is [`SchedulerState::Stopped`].
	///
	/// # Errors
	///
	/// [`FatalSchedulingError::Clock`] if the clock cannot be read (the scheduler stays stopped and
	/// may be started again), and [`FatalSchedulingError::Device`] if the pulse output was lost to a
	/// crashed worker.
	pub fn start(&self) -> Result<(), FatalSchedulingError> {
		let mut control = lock(&self.control);
		if self.state() != SchedulerState::Stopped {
			return Ok(());
		}

		let pulse = match mem::replace(&mut *control, Control::Lost) {
			Control::Idle(pulse) => pulse,
			// Stopped on its own, and about to return the output
			Control::Active(worker) => worker.join().map_err(|_| lost())?,
			Control::Lost => return Err(lost())
		};
		let now = match self.clock.now() {
			Ok(now) => now,
			Err(e) => {
				*control = Control::Idle(pulse);
				return Err(e.into());
			}
		};

		let lead = Seconds(-self.config.lead.0);
		let mut target = now.next_minute();
		if target + lead < now {
			target += MINUTE;
		}

		let stop = StopToken::new();
		*lock(&self.token) = stop.clone();
		*lock(&self.state) = SchedulerState::Scheduled { wake: target + lead, target };

		let worker = Worker {
			config: Arc::clone(&self.config),
			sequencer: FrameSequencer::new(self.clock.clone()),
			events: self.events.clone(),
			state: Arc::clone(&self.state),
			stop
		};
		let spawned = thread::Builder::new()
			.name("jjy-worker".into())
			.spawn(move || {
				let mut pulse = pulse;
				worker.run(&mut pulse, target);
				pulse
			});
		match spawned {
			Ok(handle) => {
				*control = Control::Active(handle);
				Ok(())
			},
			Err(e) => {
				*lock(&self.state) = SchedulerState::Stopped;
				Err(FatalSchedulingError::Device(DeviceError::Io(e)))
			}
		}
	}

	/// Ask the worker to stop without waiting for it.
	pub fn cancel(&self) {
		lock(&self.token).stop();
	}

	/// Stop the worker and wait until it has silenced the output.
	///
	/// Safe to call repeatedly, and when not started.
	pub fn stop(&self) {
		let mut control = lock(&self.control);
		self.cancel();
		match mem::replace(&mut *control, Control::Lost) {
			Control::Active(worker) => match worker.join() {
				Ok(pulse) => *control = Control::Idle(pulse),
				Err(_) => {
					log::error!("Worker thread panicked, pulse output lost");
					*lock(&self.state) = SchedulerState::Stopped;
				}
			},
			other => *control = other
		}
	}
}

impl<P: PulseOutput, C: Clock + Clone> Drop for MinuteScheduler<P, C> {
	fn drop(&mut self) {
		self.stop();
	}
}

fn lost() -> FatalSchedulingError {
	FatalSchedulingError::Device(DeviceError::Disconnected("pulse output lost with the worker thread".into()))
}

/// Everything the worker thread needs.
struct Worker<C> {
	config: Arc<TransmitterConfig>,
	sequencer: FrameSequencer<C>,
	events: SyncSender<SchedulerEvent>,
	state: Arc<Mutex<SchedulerState>>,
	stop: StopToken
}

impl<C: Clock> Worker<C> {
	fn set_state(&self, state: SchedulerState) {
		*lock(&self.state) = state;
	}

	/// Never blocks the worker. Nobody listening is fine.
	fn send(&self, event: SchedulerEvent) {
		if let Err(TrySendError::Full(event)) = self.events.try_send(event) {
			log::debug!("event channel full, dropping {:?}", event);
		}
	}

	fn run<P: PulseOutput>(self, pulse: &mut P, first: TimeSpec) {
		if let Err(e) = self.transmit(pulse, first) {
			log::error!("Transmission stopped: {}", e);
			self.send(SchedulerEvent::Fatal(e));
		}
		if let Err(e) = pulse.silence() {
			log::warn!("Failed to silence output: {}", e);
		}
		self.set_state(SchedulerState::Stopped);
		log::info!("Transmitter stopped");
		self.send(SchedulerEvent::Stopped);
	}

	/// The worker loop. Returns when stopped, finished, or on a fatal error.
	fn transmit<P: PulseOutput>(&self, pulse: &mut P, mut target: TimeSpec) -> Result<(), FatalSchedulingError> {
		let clock = self.sequencer.clock();
		let lead = Seconds(-self.config.lead.0);
		let late_limit = Nanoseconds::from(LATE_LIMIT);
		let minute = Nanoseconds::from(MINUTE);
		let mut frames = 0;

		loop {
			let wake = target + lead;
			self.set_state(SchedulerState::Scheduled { wake, target });
			log::debug!("next frame at {}, waking at {}", target.sec, wake.sec);
			self.send(SchedulerEvent::Armed { wake, target });

			let Some(now) = wait_until(clock, wake, &self.stop)? else {
				return Ok(());
			};
			let behind = now - target;
			if behind >= late_limit {
				let missed = behind.0 / minute.0 + 1;
				target += Seconds(MINUTE.0 * missed);
				log::warn!("Woke up {} ms behind schedule, skipping {} minute(s)", behind.as_millis(), missed);
				self.send(SchedulerEvent::Skipped { minutes: missed, next: target });
				continue;
			}

			self.set_state(SchedulerState::Running { minute: target });
			let input = self.config.input(target).map_err(FatalSchedulingError::Encode)?;
			let frame = jjy::build(&input);
			log::info!("Transmitting {}", input);
			log::debug!("frame {}", frame);
			self.send(SchedulerEvent::FrameStarted { minute: target, frame });

			match self.sequencer.play(&frame, target, pulse, &self.stop) {
				Ok(Playback::Completed) => self.send(SchedulerEvent::FrameCompleted { minute: target }),
				Ok(Playback::Cancelled) => {
					log::info!("Transmission of {} cancelled", input);
					return Ok(());
				},
				Err(PlaybackError::Device { source, .. }) if source.is_fatal() => {
					return Err(FatalSchedulingError::Device(source));
				},
				Err(PlaybackError::Clock(e)) => return Err(e.into()),
				Err(error) => {
					log::warn!("Frame for {} failed: {}", input, error);
					self.send(SchedulerEvent::FrameFailed { minute: target, error });
				}
			}

			frames += 1;
			if self.config.count.is_some_and(|n| frames >= n.get()) {
				log::info!("Transmitted {} frame(s)", frames);
				self.send(SchedulerEvent::Finished { frames });
				return Ok(());
			}
			target += MINUTE;
		}
	}
}
