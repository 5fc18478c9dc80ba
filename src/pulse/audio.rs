//! Carrier generation on the default audio output.
//!
//! Sound cards cannot produce a 40/60 kHz carrier, but a tone at a subharmonic of it leaks enough
//! RF at the harmonics for a nearby receiver. The tone is the highest integer subharmonic of the
//! configured carrier that fits below the Nyquist frequency (20 kHz for both 40 and 60 kHz at 48
//! kHz sampling).
//!
//! `cpal` streams are not `Send`, so the stream lives on its own thread for as long as the
//! [`AudioPulse`] exists. The handle only flips atomics that the audio callback reads.

use std::f32::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::sync_channel;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::Sample;
use time::Nanoseconds;

use super::PulseOutput;
use crate::config::PulseConfig;
use crate::error::DeviceError;

/// Output sample rate, in Hz.
pub const SAMPLE_RATE: u32 = 48000;

/// The highest `carrier / n` (integer `n >= 1`) strictly below `sample_rate / 2`.
pub fn subharmonic(carrier: u32, sample_rate: u32) -> f32 {
	let nyquist = sample_rate as f32 / 2.0;
	let n = (carrier as f32 / nyquist).floor() as u32 + 1;
	carrier as f32 / n as f32
}

/// State shared with the audio thread and callback.
#[derive(Default)]
struct Shared {
	emitting: AtomicBool,
	alive: AtomicBool,
	shutdown: AtomicBool,
	failure: Mutex<Option<String>>
}

/// Audio output carrying the tone during marks.
pub struct AudioPulse {
	shared: Arc<Shared>,
	thread: Option<JoinHandle<()>>
}

impl AudioPulse {
	/// Open the default output device and start a silent stream.
	pub fn open(config: &PulseConfig) -> Result<AudioPulse, DeviceError> {
		let tone = subharmonic(config.frequency, SAMPLE_RATE);
		let shared = Arc::new(Shared::default());
		let (ready_tx, ready_rx) = sync_channel::<Result<(), DeviceError>>(1);

		let thread_shared = Arc::clone(&shared);
		let thread = thread::Builder::new()
			.name("jjy-audio".into())
			.spawn(move || {
				let stream = match build_stream(tone, &thread_shared) {
					Ok(s) => s,
					Err(e) => {
						let _ = ready_tx.send(Err(e));
						return;
					}
				};
				thread_shared.alive.store(true, Ordering::Release);
				let _ = ready_tx.send(Ok(()));
				while !thread_shared.shutdown.load(Ordering::Acquire) {
					thread::park_timeout(Duration::from_millis(100));
				}
				drop(stream);
			})?;

		match ready_rx.recv() {
			Ok(Ok(())) => {
				log::info!("Audio output ready: {:.0} Hz tone for a {} Hz carrier", tone, config.frequency);
				Ok(AudioPulse { shared, thread: Some(thread) })
			},
			Ok(Err(e)) => {
				let _ = thread.join();
				Err(e)
			},
			Err(_) => Err(DeviceError::Stream("audio thread exited during setup".into()))
		}
	}
}

/// Build and start the output stream. Runs on the audio thread.
fn build_stream(tone: f32, shared: &Arc<Shared>) -> Result<cpal::Stream, DeviceError> {
	let host = cpal::default_host();
	let device = host.default_output_device()
		.ok_or_else(|| DeviceError::Disconnected("no default audio output device".into()))?;
	let config = cpal::StreamConfig {
		channels: 1,
		sample_rate: cpal::SampleRate(SAMPLE_RATE),
		buffer_size: cpal::BufferSize::Fixed(1024),
	};

	let step = TAU * tone / SAMPLE_RATE as f32;
	let mut phase = 0f32;
	let callback_shared = Arc::clone(shared);
	let error_shared = Arc::clone(shared);
	let stream = device.build_output_stream(
		&config,
		move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
			if callback_shared.emitting.load(Ordering::Relaxed) {
				for v in data.iter_mut() {
					*v = phase.sin();
					phase = (phase + step) % TAU;
				}
			} else {
				data.iter_mut().for_each(|v| *v = f32::EQUILIBRIUM);
				phase = 0.0;
			}
		},
		move |error: cpal::StreamError| {
			log::error!("Audio stream error: {}", error);
			match error {
				cpal::StreamError::DeviceNotAvailable => error_shared.alive.store(false, Ordering::Release),
				e => {
					if let Ok(mut failure) = error_shared.failure.lock() {
						*failure = Some(e.to_string());
					}
				}
			}
		},
		None
	).map_err(|e| DeviceError::Stream(e.to_string()))?;
	stream.play().map_err(|e| DeviceError::Stream(e.to_string()))?;
	Ok(stream)
}

impl PulseOutput for AudioPulse {
	fn emit(&mut self, _mark: Nanoseconds) -> Result<(), DeviceError> {
		if !self.shared.alive.load(Ordering::Acquire) {
			return Err(DeviceError::Disconnected("audio output device".into()));
		}
		if let Some(e) = self.shared.failure.lock().ok().and_then(|mut f| f.take()) {
			return Err(DeviceError::Stream(e));
		}
		self.shared.emitting.store(true, Ordering::Relaxed);
		Ok(())
	}

	fn silence(&mut self) -> Result<(), DeviceError> {
		self.shared.emitting.store(false, Ordering::Relaxed);
		Ok(())
	}
}

impl Drop for AudioPulse {
	fn drop(&mut self) {
		self.shared.emitting.store(false, Ordering::Relaxed);
		self.shared.shutdown.store(true, Ordering::Release);
		if let Some(thread) = self.thread.take() {
			thread.thread().unpark();
			let _ = thread.join();
		}
	}
}
