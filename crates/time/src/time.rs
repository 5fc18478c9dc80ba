//! Unix timestamps with nanosecond granularity, wall-clock access, and calendar conversion.
//!
//! Everything here is expressed in terms of [`TimeSpec`]: the wall clock is read with [`now`],
//! absolute deadlines are waited for with [`sleep_until`], and calendar dates are produced by
//! [`Tm::new`]. The calendar functions do not rely on libc's `gmtime`, so they are thread safe and
//! available without the `now` feature.
//!
//! # Examples
//!
//! ```
//! # use time::time::{Seconds, TimeSpec, Tm};
//! // Sat, Jun 15 2024. 14:37:12 UTC
//! let t = TimeSpec { sec: 1718462232, nsec: 250000000 };
//! assert_eq!(t.start_of_minute(), TimeSpec { sec: 1718462220, nsec: 0 });
//! assert_eq!(t.start_of_minute() + Seconds(60), TimeSpec { sec: 1718462280, nsec: 0 });
//!
//! let date = Tm::new(t.sec).unwrap();
//! assert_eq!((date.hour, date.min, date.wday), (14, 37, 6));
//! ```

use core::ops::{Add, AddAssign, Sub};
#[cfg(feature = "now")]
use core::mem::MaybeUninit;
#[cfg(feature = "now")]
use libc::{timespec, clock_gettime, CLOCK_REALTIME};

/// Nanoseconds per second.
pub const NANOS_PER_SECOND: i64 = 1000000000;

/// Helper type to support math on [`TimeSpec`]s. Represents seconds.
///
/// # Examples
///
/// ```
/// # use time::time::{Seconds, TimeSpec};
/// let c = TimeSpec { sec: 1735732800, nsec: 123456789 };
/// assert_eq!(c + Seconds(10), TimeSpec { sec: c.sec + 10, nsec: c.nsec });
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Seconds(pub i64);

/// Helper type to support math on [`TimeSpec`]s. Represents nanoseconds.
///
/// Adding nanoseconds to a [`TimeSpec`] will roll over seconds if needed. Subtracting two
/// [`TimeSpec`]s yields the (possibly negative) distance between them in nanoseconds.
///
/// # Examples
///
/// ```
/// # use time::time::{Nanoseconds, TimeSpec};
/// let mut c = TimeSpec { sec: 1735732800, nsec: 999999999 };
/// assert_eq!(c + Nanoseconds(10), TimeSpec { sec: c.sec + 1, nsec: 9 });
/// assert_eq!((c + Nanoseconds(10)) - c, Nanoseconds(10));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Nanoseconds(pub i64);

impl Nanoseconds {
	/// Convert milliseconds into nanoseconds.
	#[inline(always)]
	pub const fn from_millis(ms: i64) -> Nanoseconds {
		Nanoseconds(ms * 1000000)
	}

	/// Whole milliseconds, truncated towards zero.
	#[inline(always)]
	pub const fn as_millis(self) -> i64 {
		self.0 / 1000000
	}
}

impl From<Seconds> for Nanoseconds {
	fn from(value: Seconds) -> Self {
		Nanoseconds(value.0 * NANOS_PER_SECOND)
	}
}

/// Unix time with nanosecond granularity.
///
/// `nsec` is kept in the range [0-999999999], which makes the derived ordering the chronological
/// ordering. Supports addition with [`Seconds`] and [`Nanoseconds`]; subtraction of two instants
/// yields [`Nanoseconds`].
///
/// # Examples
///
/// ```
/// # use time::time::{Seconds, Nanoseconds, TimeSpec};
/// let c = TimeSpec { sec: 1735732800, nsec: 999999999 };
/// assert_eq!(c + Seconds(10) + Nanoseconds(10), TimeSpec { sec: c.sec + 11, nsec: 9 });
/// assert!(c < c + Nanoseconds(1));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeSpec {
	/// Seconds since the Unix epoch
	pub sec: i64,
	/// Nanoseconds since the beginning of `sec`, ranging [0-999999999]
	pub nsec: i64
}

impl TimeSpec {
	/// An instant on a whole second.
	#[inline(always)]
	pub const fn from_secs(sec: i64) -> TimeSpec {
		TimeSpec { sec, nsec: 0 }
	}

	/// The instant at which the minute containing `self` started.
	///
	/// # Examples
	///
	/// ```
	/// # use time::time::TimeSpec;
	/// assert_eq!(TimeSpec { sec: 119, nsec: 5 }.start_of_minute(), TimeSpec::from_secs(60));
	/// assert_eq!(TimeSpec::from_secs(120).start_of_minute(), TimeSpec::from_secs(120));
	/// ```
	pub fn start_of_minute(&self) -> TimeSpec {
		TimeSpec::from_secs(self.sec - self.sec.rem_euclid(60))
	}

	/// The first minute boundary strictly after `self`.
	pub fn next_minute(&self) -> TimeSpec {
		self.start_of_minute() + Seconds(60)
	}
}

#[cfg_attr(docsrs, doc(cfg(feature = "now")))]
#[cfg(feature = "now")]
impl From<timespec> for TimeSpec {
	/// Convert from `libc::timespec` to [`TimeSpec`] for better math ergonomics
	fn from(value: timespec) -> Self {
		TimeSpec {
			sec: value.tv_sec as i64,
			nsec: value.tv_nsec as i64
		}
	}
}

#[cfg(feature = "now")]
impl From<TimeSpec> for timespec {
	fn from(value: TimeSpec) -> Self {
		timespec {
			tv_sec: value.sec as libc::time_t,
			tv_nsec: value.nsec as _
		}
	}
}

impl Add<Seconds> for TimeSpec {
	type Output = Self;

	/// Add `rhs` seconds to `self`.
	fn add(mut self, rhs: Seconds) -> Self::Output {
		self.sec += rhs.0;
		self
	}
}

impl AddAssign<Seconds> for TimeSpec {
	/// Add `rhs` seconds to `self`.
	fn add_assign(&mut self, rhs: Seconds) {
		*self = *self + rhs;
	}
}

impl Add<Nanoseconds> for TimeSpec {
	type Output = Self;

	/// Add `rhs` nanoseconds to `self`, rolling over seconds as needed to ensure `nsec` stays in
	/// the range of [0-999999999].
	fn add(mut self, rhs: Nanoseconds) -> Self::Output {
		self.nsec += rhs.0;
		self.sec += self.nsec.div_euclid(NANOS_PER_SECOND);
		self.nsec = self.nsec.rem_euclid(NANOS_PER_SECOND);
		self
	}
}

impl AddAssign<Nanoseconds> for TimeSpec {
	fn add_assign(&mut self, rhs: Nanoseconds) {
		*self = *self + rhs;
	}
}

impl Sub for TimeSpec {
	type Output = Nanoseconds;

	/// The signed distance from `rhs` to `self`.
	fn sub(self, rhs: TimeSpec) -> Self::Output {
		Nanoseconds((self.sec - rhs.sec) * NANOS_PER_SECOND + (self.nsec - rhs.nsec))
	}
}

/// Get the current time as a Unix timestamp with nanosecond granularity.
///
/// This function will return `None` if `libc::clock_gettime` fails.
///
/// This function is thread safe.
///
/// # Examples
///
/// ```
/// # use time::time::now;
/// let c = now().expect("Failed to get current time");
/// assert!(c.sec > 0);
/// ```
#[cfg_attr(docsrs, doc(cfg(feature = "now")))]
#[cfg(feature = "now")]
pub fn now() -> Option<TimeSpec> {
	let mut time = MaybeUninit::<timespec>::uninit();
	// Safety:
	// - clock_gettime does not read time, only writes
	// - if clock_gettime returns zero, time is successfully initialized
	unsafe {
		match clock_gettime(CLOCK_REALTIME, time.as_mut_ptr()) {
			0 => Some(time.assume_init().into()),
			_ => None
		}
	}
}

/// Block the calling thread until the wall clock reaches `deadline`.
///
/// The deadline is absolute on `CLOCK_REALTIME`, so a thread sleeping towards it is not affected by
/// how long it took to get here, and repeated sleeps towards a fixed grid of deadlines never drift.
/// Interrupted sleeps resume towards the same deadline. Returns immediately if `deadline` has
/// already passed.
///
/// # Errors
///
/// Returns the error number reported by `clock_nanosleep` (e.g. `EINVAL`).
///
/// # Examples
///
/// ```
/// # use time::time::{now, sleep_until, Nanoseconds};
/// let deadline = now().unwrap() + Nanoseconds::from_millis(5);
/// sleep_until(deadline).unwrap();
/// assert!(now().unwrap() >= deadline);
/// ```
#[cfg_attr(docsrs, doc(cfg(feature = "now")))]
#[cfg(all(feature = "now", any(target_os = "linux", target_os = "android", target_os = "freebsd")))]
pub fn sleep_until(deadline: TimeSpec) -> Result<(), i32> {
	let request: timespec = deadline.into();
	loop {
		// Safety: request is a valid timespec, and the remaining time is not requested (null) since
		// TIMER_ABSTIME sleeps ignore it.
		match unsafe {
			libc::clock_nanosleep(CLOCK_REALTIME, libc::TIMER_ABSTIME, &request, core::ptr::null_mut())
		} {
			0 => return Ok(()),
			libc::EINTR => continue,
			e => return Err(e)
		}
	}
}

/// Block the calling thread until the wall clock reaches `deadline`.
///
/// Platforms without an absolute `clock_nanosleep` sleep relative to the current time and re-check
/// the clock after every wake-up until the deadline has passed.
///
/// # Errors
///
/// Returns `EINVAL` if the current time cannot be read.
#[cfg_attr(docsrs, doc(cfg(feature = "now")))]
#[cfg(all(feature = "now", not(any(target_os = "linux", target_os = "android", target_os = "freebsd"))))]
pub fn sleep_until(deadline: TimeSpec) -> Result<(), i32> {
	loop {
		let current = now().ok_or(libc::EINVAL)?;
		if current >= deadline {
			return Ok(());
		}
		let Nanoseconds(remaining) = deadline - current;
		let request = timespec {
			tv_sec: (remaining / NANOS_PER_SECOND) as libc::time_t,
			tv_nsec: (remaining % NANOS_PER_SECOND) as _
		};
		// Safety: request is a valid relative timespec. Early returns (EINTR) are handled by looping.
		unsafe {
			libc::nanosleep(&request, core::ptr::null_mut());
		}
	}
}

/// Check whether a given `year` is a leap year.
///
/// Year must be the absolute Gregorian calendar year (i.e. 2024), not the abbreviated format year
/// as in [`Tm::year`][Tm#structfield.year] (i.e. 124).
///
/// # Examples
///
/// ```
/// # use time::time::isleapyear;
/// assert_eq!(isleapyear(1900), false);
/// assert_eq!(isleapyear(2000), true);
/// assert_eq!(isleapyear(2023), false);
/// assert_eq!(isleapyear(2024), true);
/// ```
#[inline(always)]
pub fn isleapyear(year: u16) -> bool {
	let l = if year%100 != 0 { 3 } else { 15 };
	(year & l) == 0
}

/// Seconds per minute.
const SECONDS_PER_MINUTE: i64 = 60;
/// Seconds per hour.
const SECONDS_PER_HOUR: i64 = SECONDS_PER_MINUTE * 60;
/// Seconds per day.
pub const SECONDS_PER_DAY: i64 = SECONDS_PER_HOUR * 24;
/// Days per non-leap year.
const DAYS_PER_NON_LEAP_YEAR: i64 = 365;
/// Days per leap year.
const DAYS_PER_LEAP_YEAR: i64 = DAYS_PER_NON_LEAP_YEAR + 1;
/// Leap years occur every 4 years...
const YEARS_PER_LEAP_YEAR_1: i64 = 4;
/// ... except every 100, unless it's the end of the era.
const YEARS_PER_LEAP_YEAR_2: i64 = 100;
/// Number of years per era.
const YEARS_PER_ERA: i64 = 400;
/// Number of days every 4 years.
const DAYS_PER_LEAP_YEAR_1: i64 = YEARS_PER_LEAP_YEAR_1 * DAYS_PER_NON_LEAP_YEAR;
/// Number of days every 100 years.
const DAYS_PER_LEAP_YEAR_2: i64 = YEARS_PER_LEAP_YEAR_2 * DAYS_PER_NON_LEAP_YEAR
                                + YEARS_PER_LEAP_YEAR_2 / YEARS_PER_LEAP_YEAR_1 - 1;
/// Number of days every era (400 years), excluding the last leap day.
const DAYS_PER_LEAP_YEAR_3: i64 = YEARS_PER_ERA * DAYS_PER_NON_LEAP_YEAR
                                + (YEARS_PER_ERA / YEARS_PER_LEAP_YEAR_2)
                                * (YEARS_PER_LEAP_YEAR_2 / YEARS_PER_LEAP_YEAR_1 - 1);
/// Number of days every era (400 years).
const DAYS_PER_ERA: i64 = DAYS_PER_LEAP_YEAR_3 + 1;
/// Days from January 1 to February 28, inclusive.
const DAYS_FROM_JAN_TO_FEB: i64 = 31 + 28;
/// Days per week.
const DAYS_PER_WEEK: i64 = 7;
/// Days from March 1, 0000 to January 1, 1970.
const DAYS_FROM_JAN_1970_TO_MARCH_0000: i64 = (1970 / YEARS_PER_ERA) * DAYS_PER_ERA
                                            + (1970 % YEARS_PER_ERA) * DAYS_PER_NON_LEAP_YEAR
                                            + (1970 % YEARS_PER_ERA) / YEARS_PER_LEAP_YEAR_1
                                            - (1970 % YEARS_PER_ERA) / YEARS_PER_LEAP_YEAR_2
                                            - DAYS_FROM_JAN_TO_FEB;
/// Years to add to [`Tm::year`][Tm#structfield.year] to get absolute Gregorian calendar year.
pub const YEAR_ADJUST: i64 = 1900;

/// Gregorian calendar date, equivalent to [`libc::tm`] with some small incompatibilities.
///
/// Key differences:
/// - `mon` is [0, 11] in [`libc::tm`] but [1, 12] in [`Tm`].
/// - `yday` is [0, 365] in [`libc::tm`] but [1, 366] in [`Tm`].
///
/// `wday` already counts from Sunday, which is the numbering most time codes transmit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tm {
	/// Seconds, ranged [0, 59]
	pub sec: u8,
	/// Minutes, ranged [0, 59]
	pub min: u8,
	/// Hours, ranged [0, 23]
	pub hour: u8,
	/// Day of the month, ranged [1, 31]
	pub day: u8,
	/// Month of the year, ranged [1, 12]
	pub mon: u8,
	/// Years since 1900, ranged [0, 255] => [1900, 2155]
	pub year: u8,
	/// Day of the week, ranged [0, 6] => [Sunday, Saturday]
	pub wday: u8,
	/// Day of the year, ranged [1, 366]
	pub yday: u16
}

impl Tm {
	/// Convert a Unix timestamp into a calendar date.
	///
	/// This function only supports timestamps from the Unix epoch (Jan 1, 1970) through the end of
	/// 2155, the last year [`Tm::year`][Tm#structfield.year] can hold. Other inputs result in `None`.
	pub fn new(unixtimestamp: i64) -> Option<Tm> {
		// The Gregorian calendar repeats every 400 years, with internal repetition every 100 and 4
		// years. Rotating the year to Mar-Feb puts the leap day last, which makes the conversion
		// branchless; the year is rotated back to Jan-Dec at the end.
		//
		// http://howardhinnant.github.io/date_algorithms.html#civil_from_days
		if unixtimestamp < 0 { return None }
		let days = unixtimestamp / SECONDS_PER_DAY;
		let rem = unixtimestamp % SECONDS_PER_DAY;
		let hr = rem / SECONDS_PER_HOUR;
		let remrem = rem % SECONDS_PER_HOUR;
		let z = days + DAYS_FROM_JAN_1970_TO_MARCH_0000;
		let era = z / DAYS_PER_ERA;
		let doe = z % DAYS_PER_ERA;
		let yoe = (doe
			       - doe / DAYS_PER_LEAP_YEAR_1
			       + doe / DAYS_PER_LEAP_YEAR_2
			       - doe / DAYS_PER_LEAP_YEAR_3
			      ) / DAYS_PER_NON_LEAP_YEAR;
		let y = yoe + era * YEARS_PER_ERA - YEAR_ADJUST;
		let leap = yoe / YEARS_PER_LEAP_YEAR_1 - yoe / YEARS_PER_LEAP_YEAR_2;
		let pyoe = if yoe == 0 { -4 } else { yoe-1 };
		let leapadj = leap - pyoe / YEARS_PER_LEAP_YEAR_1 + pyoe / YEARS_PER_LEAP_YEAR_2;
		let doy = doe - (DAYS_PER_NON_LEAP_YEAR * yoe + leap);
		let mp = (5 * doy + 2) / 153;
		let d = doy - (153 * mp + 2) / 5 + 1;
		let rotate = |l, r| if mp < 10 { l } else { r };
		let m = rotate(mp + 3, mp - 9);
		let y = rotate(y, y + 1);
		if y > u8::MAX as i64 { return None }
		let yadj = rotate(0, if leapadj == 0 { DAYS_PER_NON_LEAP_YEAR } else { DAYS_PER_LEAP_YEAR });

		Some(Tm {
			sec: (remrem % SECONDS_PER_MINUTE) as u8,
			min: (remrem / SECONDS_PER_MINUTE) as u8,
			hour: hr as u8,
			day: d as u8,
			mon: m as u8,
			year: y as u8,
			wday: ((days + 4) % DAYS_PER_WEEK) as u8, // Jan 1, 1970 was a Thursday
			yday: (doy + leapadj + DAYS_FROM_JAN_TO_FEB - yadj + 1) as u16
		})
	}

	/// Get the absolute Gregorian calendar year.
	#[inline(always)]
	pub fn year(&self) -> u16 {
		self.year as u16 + YEAR_ADJUST as u16
	}
}

/// Get the Unix timestamp for 00:00:00 UTC on a given year, month, and day.
///
/// `y` must be the absolute Gregorian calendar year, `m` the 1-indexed month starting at January,
/// and `d` the day of the month.
///
/// # Examples
///
/// ```
/// # use time::time::timestamp_from_ymd;
/// assert_eq!(timestamp_from_ymd(2024, 2, 29), 1709164800);
/// assert_eq!(timestamp_from_ymd(2017, 1, 1), 1483228800);
/// ```
pub fn timestamp_from_ymd(y: u16, m: u8, d: u8) -> i64 {
	// http://howardhinnant.github.io/date_algorithms.html#days_from_civil
	let y = if m < 3 { y as i64 - 1 } else { y as i64 };
	let era = y / YEARS_PER_ERA;
	let yoe = y - era * YEARS_PER_ERA;
	let m2 = if m > 2 { m as i64 - 3 } else { m as i64 + 9 };
	let doy = (153 * m2 + 2) / 5 + d as i64 - 1;
	let doe = yoe * DAYS_PER_NON_LEAP_YEAR
			+ yoe / YEARS_PER_LEAP_YEAR_1
			- yoe / YEARS_PER_LEAP_YEAR_2
			+ doy;
	SECONDS_PER_DAY * (era * DAYS_PER_ERA + doe - DAYS_FROM_JAN_1970_TO_MARCH_0000)
}

/// The number of days in a given month.
///
/// `y` must be the absolute Gregorian calendar year, and `m` the 1-indexed month starting at
/// January.
pub fn days_per_month(y: u16, m: u8) -> u8 {
	// Details: https://www.youtube.com/watch?v=J9KijLyP-yg&t=1470s
	if m == 2 {
		if isleapyear(y) { 29 } else { 28 }
	} else {
		30 | (m ^ (m >> 3))
	}
}
