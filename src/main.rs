//! Transmit the [JJY] longwave time code.
//!
//! Every minute the code for the coming minute is built and played as 60 one-second symbols: the
//! carrier is switched on at the start of each second and off again after 0.2 s (marker), 0.5 s
//! (binary 1) or 0.8 s (binary 0). Radio-controlled clocks placed near the output pick the signal
//! up and set themselves.
//!
//! The carrier comes from one of three outputs:
//! - `pwm`: a Linux hardware PWM channel driven through sysfs. With a wire or ferrite antenna on the
//!   pin this reaches clocks within a few metres.
//! - `audio`: the default sound card, playing a subharmonic of the carrier. The stray RF emitted
//!   by the audio hardware is enough for a clock placed right next to it.
//! - `log`: no output, transitions are only logged.
//!
//! # Command Line Arguments
//!
//! General form: `jjy-pulse [options...]`
//!
//! | Short form | Long form                | Argument          | Default      | Description                          |
//! | ---------- | ------------------------ | ----------------- | ------------ | ------------------------------------ |
//! |            | `--device`               | `pwm`/`audio`/`log` | `pwm`        | Output device                        |
//! |            | `--pin`                  | `CHIP:CHANNEL`    | `0:0`        | PWM channel                          |
//! |            | `--frequency`            | Hz                | 60000        | Carrier frequency                    |
//! |            | `--duty`                 | Percent           | 50           | Carrier duty cycle                   |
//! | `-z`       | `--utc-offset`           | `±HH:MM`          | `+09:00`     | Zone of the transmitted time         |
//! |            | `--summer-time`          |                   | off          | Set the summer time bit              |
//! |            | `--leap-second`          | [Date time string]|              | Announce an inserted leap second     |
//! |            | `--negative-leap-second` | [Date time string]|              | Announce a removed leap second       |
//! |            | `--no-builtin-leap-seconds` |                |              | Drop the built-in leap second list   |
//! |            | `--lead`                 | Seconds           | 1            | Wake-up time before each minute      |
//! | `-n`       | `--count`                | Integer > 0       | Unlimited    | Number of minutes to transmit        |
//! |            | `--max-failures`         | Integer > 0       | Unlimited    | Consecutive failed frames to give up |
//! |            | `--log-level`            | Log filter        | `info`       | See `env_logger`                     |
//!
//! Leap second times are read in the zone given by `-z` unless they carry their own offset, and
//! name the instant right after the leap second, e.g. `2017-01-01T09:00` in Japan.
//!
//! SIGINT and SIGTERM stop the transmission at the next symbol, leaving the output silent.
//!
//! [JJY]: https://en.wikipedia.org/wiki/JJY
//! [date time string]: time::parse::parse_timestamp_in
//!
//! # Examples
//!
//! Transmit on PWM channel 0 of chip 0 until interrupted
//! ```sh
//! jjy-pulse
//! ```
//!
//! Transmit JJY40 for 10 minutes through the sound card
//! ```sh
//! jjy-pulse --device audio --frequency 40000 -n 10
//! ```

use std::error::Error;
use std::num::NonZero;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use clap::Parser;

use args::{Arguments, DeviceKind};
use clock::SystemClock;
use pulse::{AudioPulse, LogPulse, PulseOutput, SysfsPwm};
use scheduler::{MinuteScheduler, SchedulerEvent};

mod args;
mod clock;
mod config;
mod error;
mod logging;
mod pulse;
mod scheduler;
mod sequencer;
#[cfg(test)]
mod test_utils;

/// How often the main thread checks for signals while waiting for events.
const SIGNAL_POLL: Duration = Duration::from_millis(200);

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_signal(_signal: libc::c_int) {
	INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Route SIGINT and SIGTERM to [`INTERRUPTED`].
fn install_signal_handlers() {
	let handler = on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
	for signal in [libc::SIGINT, libc::SIGTERM] {
		// SAFETY: the handler only stores to an atomic, which is async-signal-safe
		if unsafe { libc::signal(signal, handler) } == libc::SIG_ERR {
			log::warn!("Failed to install handler for signal {}", signal);
		}
	}
}

/// Why the transmission ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Outcome {
	Finished,
	Interrupted,
	Failed
}

impl From<Outcome> for ExitCode {
	fn from(value: Outcome) -> Self {
		match value {
			Outcome::Finished | Outcome::Interrupted => ExitCode::SUCCESS,
			Outcome::Failed => ExitCode::FAILURE
		}
	}
}

/// Follow scheduler events until the transmission ends, is interrupted, or fails too often.
fn supervise(events: &Receiver<SchedulerEvent>, interrupted: &AtomicBool, max_failures: Option<NonZero<usize>>) -> Outcome {
	let mut failures = 0;
	loop {
		if interrupted.load(Ordering::SeqCst) {
			log::info!("Interrupted");
			return Outcome::Interrupted;
		}
		match events.recv_timeout(SIGNAL_POLL) {
			Ok(SchedulerEvent::FrameCompleted { .. }) => failures = 0,
			Ok(SchedulerEvent::FrameFailed { .. }) => {
				failures += 1;
				if max_failures.is_some_and(|max| failures >= max.get()) {
					log::error!("Giving up after {} consecutive failed frames", failures);
					return Outcome::Failed;
				}
			},
			// Logged by the worker
			Ok(SchedulerEvent::Fatal(_)) => return Outcome::Failed,
			Ok(SchedulerEvent::Finished { .. } | SchedulerEvent::Stopped) => return Outcome::Finished,
			Ok(_) | Err(RecvTimeoutError::Timeout) => (),
			Err(RecvTimeoutError::Disconnected) => return Outcome::Failed
		}
	}
}

/// Open the output, start the scheduler and wait for it to end.
///
/// # Errors
///
/// Configuration errors, failures to open the output device, and failure to read the clock when
/// starting. Errors during the transmission are reported through the returned exit code.
fn run(args: &Arguments) -> Result<ExitCode, Box<dyn Error>> {
	let config = args.transmitter_config()?;
	let pulse_config = args.pulse_config()?;

	let pulse: Box<dyn PulseOutput> = match args.device {
		DeviceKind::Pwm => Box::new(SysfsPwm::open(&pulse_config)?),
		DeviceKind::Audio => Box::new(AudioPulse::open(&pulse_config)?),
		DeviceKind::Log => Box::new(LogPulse::new(&pulse_config))
	};
	install_signal_handlers();

	log::info!(
		"Transmitting UTC{}{}, {} leap second(s) known",
		config.zone,
		if config.summer_time { " with summer time" } else { "" },
		config.leap_seconds.entries().len()
	);
	let (scheduler, events) = MinuteScheduler::new(config, pulse, SystemClock);
	scheduler.start()?;
	let outcome = supervise(&events, &INTERRUPTED, args.max_failures);
	scheduler.stop();

	Ok(outcome.into())
}

/// Main program entry point.
///
/// Parses input arguments and transmits until done. See [`crate`] documentation for details.
fn main() -> ExitCode {
	let args = Arguments::parse();
	logging::init_logging(args.logging_config());

	run(&args)
		.inspect_err(|e| log::error!("{}", e))
		.unwrap_or(ExitCode::FAILURE)
}
