//! Linux hardware PWM through sysfs.
//!
//! The channel is exported if needed, configured once with the carrier period and duty cycle,
//! and then only its `enable` attribute is toggled for each mark. See the kernel's
//! `Documentation/ABI/testing/sysfs-class-pwm` for the attribute semantics.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use time::Nanoseconds;

use super::PulseOutput;
use crate::config::PulseConfig;
use crate::error::DeviceError;

/// Where the kernel exposes PWM chips.
pub const SYSFS_ROOT: &str = "/sys/class/pwm";

/// One hardware PWM channel.
#[derive(Debug)]
pub struct SysfsPwm {
	channel: PathBuf,
	enabled: bool
}

/// Map write failures on vanished sysfs nodes to [`DeviceError::Disconnected`].
fn device_error(e: io::Error, path: &Path) -> DeviceError {
	match e.raw_os_error() {
		Some(libc::ENODEV) | Some(libc::ENOENT) => DeviceError::Disconnected(path.display().to_string()),
		_ if e.kind() == io::ErrorKind::NotFound => DeviceError::Disconnected(path.display().to_string()),
		_ => DeviceError::Io(e)
	}
}

fn write_attr(dir: &Path, attr: &str, value: impl ToString) -> Result<(), DeviceError> {
	let path = dir.join(attr);
	fs::write(&path, value.to_string()).map_err(|e| device_error(e, &path))
}

impl SysfsPwm {
	/// Open the channel named by `config.pin` under [`SYSFS_ROOT`].
	pub fn open(config: &PulseConfig) -> Result<SysfsPwm, DeviceError> {
		SysfsPwm::open_in(Path::new(SYSFS_ROOT), config)
	}

	/// Open the channel named by `config.pin` under `root`, export it if needed, and program the
	/// carrier. The channel is left disabled.
	///
	/// # Errors
	///
	/// Returns [`DeviceError::Disconnected`] if the chip does not exist or the channel does not
	/// appear after exporting it.
	pub fn open_in(root: &Path, config: &PulseConfig) -> Result<SysfsPwm, DeviceError> {
		let chip = root.join(format!("pwmchip{}", config.pin.chip));
		if !chip.is_dir() {
			return Err(DeviceError::Disconnected(chip.display().to_string()));
		}
		let channel = chip.join(format!("pwm{}", config.pin.channel));
		if !channel.is_dir() {
			log::debug!("exporting {}", channel.display());
			write_attr(&chip, "export", config.pin.channel)?;
			if !channel.is_dir() {
				return Err(DeviceError::Disconnected(channel.display().to_string()));
			}
		}

		let Nanoseconds(period) = config.period();
		let Nanoseconds(duty) = config.duty_cycle();
		write_attr(&channel, "enable", 0)?;
		// The duty cycle may never exceed the period, so clear it before changing the period
		write_attr(&channel, "duty_cycle", 0)?;
		write_attr(&channel, "period", period)?;
		write_attr(&channel, "duty_cycle", duty)?;
		log::info!(
			"PWM {} ready: {} Hz (period {} ns, duty {} ns)",
			channel.display(), config.frequency, period, duty
		);

		Ok(SysfsPwm { channel, enabled: false })
	}
}

impl PulseOutput for SysfsPwm {
	fn emit(&mut self, _mark: Nanoseconds) -> Result<(), DeviceError> {
		if !self.enabled {
			write_attr(&self.channel, "enable", 1)?;
			self.enabled = true;
		}
		Ok(())
	}

	fn silence(&mut self) -> Result<(), DeviceError> {
		if self.enabled {
			write_attr(&self.channel, "enable", 0)?;
			self.enabled = false;
		}
		Ok(())
	}
}

impl Drop for SysfsPwm {
	fn drop(&mut self) {
		if let Err(e) = write_attr(&self.channel, "enable", 0) {
			log::warn!("Failed to disable {}: {}", self.channel.display(), e);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::Pin;
	use tempfile::TempDir;

	fn read(dir: &Path, attr: &str) -> String {
		fs::read_to_string(dir.join(attr)).unwrap()
	}

	fn sysfs(chip: u32, channel: Option<u32>) -> TempDir {
		let root = tempfile::tempdir().unwrap();
		let chip = root.path().join(format!("pwmchip{}", chip));
		fs::create_dir(&chip).unwrap();
		if let Some(c) = channel {
			fs::create_dir(chip.join(format!("pwm{}", c))).unwrap();
		}
		root
	}

	#[test]
	fn open_test() {
		let root = sysfs(0, Some(1));
		let config = PulseConfig::new(Pin { chip: 0, channel: 1 }, 60000, 50).unwrap();
		let pwm = SysfsPwm::open_in(root.path(), &config).unwrap();
		let channel = root.path().join("pwmchip0/pwm1");
		assert_eq!(read(&channel, "period"), "16667");
		assert_eq!(read(&channel, "duty_cycle"), "8333");
		assert_eq!(read(&channel, "enable"), "0");
		drop(pwm);
	}

	#[test]
	fn emit_silence_test() {
		let root = sysfs(0, Some(0));
		let mut pwm = SysfsPwm::open_in(root.path(), &PulseConfig::default()).unwrap();
		let channel = root.path().join("pwmchip0/pwm0");

		pwm.emit(Nanoseconds::from_millis(500)).unwrap();
		assert_eq!(read(&channel, "enable"), "1");
		pwm.silence().unwrap();
		assert_eq!(read(&channel, "enable"), "0");
		pwm.silence().unwrap();

		// Dropping while emitting switches the carrier off
		pwm.emit(Nanoseconds::from_millis(200)).unwrap();
		drop(pwm);
		assert_eq!(read(&channel, "enable"), "0");
	}

	#[test]
	fn missing_device_test() {
		let root = sysfs(0, None);
		let config = PulseConfig::new(Pin { chip: 1, channel: 0 }, 60000, 50).unwrap();
		assert!(matches!(SysfsPwm::open_in(root.path(), &config), Err(DeviceError::Disconnected(_))));

		// Exporting a channel the kernel never creates
		let config = PulseConfig::new(Pin { chip: 0, channel: 3 }, 60000, 50).unwrap();
		assert!(matches!(SysfsPwm::open_in(root.path(), &config), Err(DeviceError::Disconnected(_))));
		assert_eq!(read(&root.path().join("pwmchip0"), "export"), "3");
	}

	#[test]
	fn disconnect_test() {
		let root = sysfs(0, Some(0));
		let mut pwm = SysfsPwm::open_in(root.path(), &PulseConfig::default()).unwrap();
		fs::remove_dir_all(root.path().join("pwmchip0")).unwrap();
		let e = pwm.emit(Nanoseconds::from_millis(800)).unwrap_err();
		assert!(e.is_fatal(), "{}", e);
	}
}
