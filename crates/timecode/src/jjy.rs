//! Build JJY frames.
//!
//! See [JJY documentation](https://www.nict.go.jp/en/sts/jjy_signal.html) for details. This module
//! implements the time-related part of the JJY time code. The alternate layout used during minutes
//! 15 and 45 (call sign announcement and service interruption bits) is not produced: those minutes
//! are encoded like every other minute.
//!
//! Frame layout, by second:
//!
//! | Second  | Content                                      |
//! |---------|----------------------------------------------|
//! | 0       | Marker                                       |
//! | 1-8     | Minute (40, 20, 10, 0, 8, 4, 2, 1)           |
//! | 9       | Marker                                       |
//! | 10-18   | Hour (0, 0, 20, 10, 0, 8, 4, 2, 1)           |
//! | 19      | Marker                                       |
//! | 20-28   | Day of year (0, 0, 200, 100, 0, 80, 40, 20, 10) |
//! | 29      | Marker                                       |
//! | 30-33   | Day of year (8, 4, 2, 1)                     |
//! | 34-35   | 0                                            |
//! | 36      | PA1, parity of the hour bits                 |
//! | 37      | PA2, parity of the minute bits               |
//! | 38      | SU1, always 0                                |
//! | 39      | Marker                                       |
//! | 40      | SU2, summer time                             |
//! | 41-48   | Year (80, 40, 20, 10, 8, 4, 2, 1)            |
//! | 49      | Marker                                       |
//! | 50-52   | Weekday (4, 2, 1), Sunday is 0               |
//! | 53-54   | Leap second insertion pending (both bits)    |
//! | 55-58   | 0                                            |
//! | 59      | Short marker                                 |

use crate::{bcd::{self, Field}, leap::{LeapDirective, LeapSecondSchedule}, Frame, Symbol, TimeCodeError, FRAME_LEN, MARKER_SECONDS};
use core::fmt;
use time::{time::Tm, zone::UtcOffset};

/// Second carrying the hour parity bit.
pub const PA1: usize = 36;
/// Second carrying the minute parity bit.
pub const PA2: usize = 37;
/// Second of the spare bit, transmitted as 0.
pub const SU1: usize = 38;
/// Second carrying the summer time flag.
pub const SU2: usize = 40;
/// Seconds carrying the leap second warning.
pub const LS: [usize; 2] = [53, 54];

/// Everything a frame encodes, in civil time of the transmitting zone.
///
/// # Examples
/// ```
/// # use timecode::{jjy::TimeCodeInput, leap::{LeapDirective, LeapSecondSchedule}};
/// # use time::zone::UtcOffset;
/// // Saturday, July 4, 2020. 11:36:58 JST
/// let m = TimeCodeInput::new(1593830218, UtcOffset::JST, false, &LeapSecondSchedule::builtin()).unwrap();
/// assert_eq!((m.hour, m.minute), (11, 36));
/// assert_eq!((m.month, m.day, m.yday), (7, 4, 186));
/// assert_eq!(m.year, 2020);
/// assert_eq!(m.weekday, 6);
/// assert_eq!(m.leap, LeapDirective::None);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeCodeInput {
	/// Gregorian year. Only the last two digits are transmitted.
	pub year: u16,
	/// Month, ranged [1, 12]. Not transmitted.
	pub month: u8,
	/// Day of the month, ranged [1, 31]. Not transmitted.
	pub day: u8,
	/// Day of the year, ranged [1, 366].
	pub yday: u16,
	/// Day of the week, ranged [0, 6], where 0=Sunday, 6=Saturday.
	pub weekday: u8,
	/// Hour, ranged [0, 23].
	pub hour: u8,
	/// Minute, ranged [0, 59].
	pub minute: u8,
	pub summer_time: bool,
	pub leap: LeapDirective
}

impl fmt::Display for TimeCodeInput {
	/// Formats as `YYYY-MM-DD HH:MM`.
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:04}-{:02}-{:02} {:02}:{:02}", self.year, self.month, self.day, self.hour, self.minute)
	}
}

impl TimeCodeInput {
	/// Input for the minute containing Unix time `time`, as seen in `zone`.
	///
	/// Seconds are dropped: the frame describes the minute that starts on the boundary at or before
	/// `time`, and the leap second directive is evaluated at that boundary.
	///
	/// # Errors
	///
	/// Returns [`TimeCodeError::UnsupportedTime`] if the civil time in `zone` is before the Unix
	/// epoch or after 2155.
	pub fn new(time: i64, zone: UtcOffset, summer_time: bool, schedule: &LeapSecondSchedule) -> Result<TimeCodeInput, TimeCodeError> {
		let minute = time - time.rem_euclid(60);
		let date = zone.date(minute).ok_or(TimeCodeError::UnsupportedTime(time))?;
		Ok(TimeCodeInput::from_date(&date, summer_time, schedule.directive(minute)))
	}

	/// Input from an already computed calendar date.
	pub fn from_date(date: &Tm, summer_time: bool, leap: LeapDirective) -> TimeCodeInput {
		TimeCodeInput {
			year: date.year(),
			month: date.mon,
			day: date.day,
			yday: date.yday,
			weekday: date.wday,
			hour: date.hour,
			minute: date.min,
			summer_time,
			leap
		}
	}
}

/// Place `value` in `symbols` and return the parity of the bits written.
fn place(symbols: &mut [Symbol; FRAME_LEN], field: &Field, value: u16) -> bool {
	bcd::parity(field.encode(value).map(|(second, bit)| {
		symbols[second] = Symbol::bit(bit);
		bit
	}))
}

/// Compute the frame for `input`.
///
/// Total for in-range inputs. A [`LeapDirective::Remove`] is transmitted like
/// [`LeapDirective::None`]: JJY only defines a warning for inserted seconds.
///
/// # Examples
/// ```
/// # use timecode::{jjy::{self, TimeCodeInput}, leap::LeapDirective, Symbol};
/// let frame = jjy::build(&TimeCodeInput {
/// 	year: 2016, month: 12, day: 15, yday: 350, weekday: 4, hour: 9, minute: 0,
/// 	summer_time: false, leap: LeapDirective::Insert
/// });
/// assert_eq!((frame[53], frame[54]), (Symbol::Bit1, Symbol::Bit1));
/// ```
pub fn build(input: &TimeCodeInput) -> Frame {
	let mut symbols = [Symbol::Bit0; FRAME_LEN];
	for second in MARKER_SECONDS {
		symbols[second] = Symbol::Marker;
	}
	symbols[FRAME_LEN - 1] = Symbol::ShortMarker;

	let pa2 = place(&mut symbols, &bcd::MINUTE, input.minute as u16);
	let pa1 = place(&mut symbols, &bcd::HOUR, input.hour as u16);
	place(&mut symbols, &bcd::DAY_OF_YEAR, input.yday);
	place(&mut symbols, &bcd::YEAR, input.year % 100);
	place(&mut symbols, &bcd::WEEKDAY, input.weekday as u16);

	symbols[PA1] = Symbol::bit(pa1);
	symbols[PA2] = Symbol::bit(pa2);
	symbols[SU1] = Symbol::Bit0;
	symbols[SU2] = Symbol::bit(input.summer_time);
	let insert = input.leap == LeapDirective::Insert;
	for second in LS {
		symbols[second] = Symbol::bit(insert);
	}

	Frame(symbols)
}
