//! Fixed UTC offsets for civil time.
//!
//! Time codes are defined against one civil time zone (JJY against Japan Standard Time, UTC+9).
//! Rather than reading the host's local zone, callers name the offset explicitly with a
//! [`UtcOffset`] and convert instants to calendar dates through it.
//!
//! # Examples
//!
//! ```
//! # use time::zone::UtcOffset;
//! // 2017-01-01 00:00:00 UTC is 09:00 in Japan
//! let date = UtcOffset::JST.date(1483228800).unwrap();
//! assert_eq!((date.year(), date.mon, date.day, date.hour), (2017, 1, 1, 9));
//! ```

use core::fmt;
use crate::time::{Tm, SECONDS_PER_DAY};

/// A fixed offset from UTC, in seconds. Positive offsets are east of Greenwich.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct UtcOffset(i32);

impl UtcOffset {
	/// Coordinated Universal Time.
	pub const UTC: UtcOffset = UtcOffset(0);
	/// Japan Standard Time, UTC+09:00.
	pub const JST: UtcOffset = UtcOffset(9 * 3600);

	/// Create an offset of `seconds` east of UTC.
	///
	/// Returns `None` unless the offset is strictly less than a day in either direction.
	pub const fn new(seconds: i32) -> Option<UtcOffset> {
		if (seconds as i64).abs() < SECONDS_PER_DAY {
			Some(UtcOffset(seconds))
		} else {
			None
		}
	}

	/// The offset in seconds east of UTC.
	#[inline(always)]
	pub const fn seconds(&self) -> i32 {
		self.0
	}

	/// Civil calendar date in this zone for the Unix timestamp `time`.
	///
	/// Returns `None` if the local time falls outside [1970, 2155].
	pub fn date(&self, time: i64) -> Option<Tm> {
		time.checked_add(self.0 as i64).and_then(Tm::new)
	}
}

impl fmt::Display for UtcOffset {
	/// Formats as `+HH:MM` / `-HH:MM`.
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let sign = if self.0 < 0 { '-' } else { '+' };
		let abs = self.0.unsigned_abs();
		write!(f, "{}{:02}:{:02}", sign, abs / 3600, (abs % 3600) / 60)
	}
}

#[cfg(test)]
mod tests {
	extern crate std;
	use std::string::ToString;
	use super::*;

	#[test]
	fn offset_range_test() {
		assert_eq!(UtcOffset::new(32400), Some(UtcOffset::JST));
		assert_eq!(UtcOffset::new(-86399).map(|o| o.seconds()), Some(-86399));
		assert_eq!(UtcOffset::new(86400), None);
		assert_eq!(UtcOffset::new(i32::MIN), None);
	}

	#[test]
	fn offset_date_test() {
		// 2024-06-15 05:37:00 UTC => 14:37 JST
		let d = UtcOffset::JST.date(1718429820).unwrap();
		assert_eq!((d.hour, d.min, d.wday, d.yday), (14, 37, 6, 167));

		// 2016-12-31 20:00:00 UTC is already New Year's Day in Japan
		let d = UtcOffset::JST.date(1483214400).unwrap();
		assert_eq!((d.year(), d.yday, d.wday), (2017, 1, 0));
		let d = UtcOffset::UTC.date(1483214400).unwrap();
		assert_eq!((d.year(), d.yday, d.wday), (2016, 366, 6));

		assert!(UtcOffset::new(-3600).unwrap().date(0).is_none());
		assert!(UtcOffset::JST.date(i64::MAX).is_none());
	}

	#[test]
	fn offset_display_test() {
		assert_eq!(UtcOffset::JST.to_string(), "+09:00");
		assert_eq!(UtcOffset::new(-19800).unwrap().to_string(), "-05:30");
		assert_eq!(UtcOffset::UTC.to_string(), "+00:00");
	}
}
