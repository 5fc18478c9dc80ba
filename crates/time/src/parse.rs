//! Parse date time strings like `YYYY-MM-DD HH:mm:ss` and UTC offsets like `+09:00`.
//!
//! [`parse_timestamp_in`] reads a date time string into a Unix timestamp, interpreting it in a
//! given zone unless the string carries its own offset. [`parse_offset`] reads a bare offset.
//!
//! # Examples
//! ```
//! # use time::{parse::{parse_offset, parse_timestamp, parse_timestamp_in}, time::TimeSpec, zone::UtcOffset};
//! assert_eq!(
//! 	parse_timestamp(b"2017-01-01T00:00Z"),
//! 	Ok(TimeSpec { sec: 1483228800, nsec: 0 })
//! );
//! assert_eq!(
//! 	parse_timestamp_in(b"2017-01-01 09:00", UtcOffset::JST),
//! 	Ok(TimeSpec { sec: 1483228800, nsec: 0 })
//! );
//! assert_eq!(parse_offset(b"+09:00"), Ok(UtcOffset::JST));
//! ```

use core::{error, fmt};
use crate::time::{days_per_month, timestamp_from_ymd, TimeSpec};
use crate::zone::UtcOffset;

/// Error type for parsing date time strings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParseError {
	/// Expected a year, but it was missing or malformed.
	MissingYear,
	/// Expected a month, but it was missing or malformed.
	MissingMonth,
	/// The supplied month was outside of [1, 12].
	MonthOutOfRange,
	/// Expected a day, but it was missing or malformed.
	MissingDay,
	/// The supplied day was outside of [1, 28|29|30|31] depending on the month & year.
	DayOutOfRange,
	/// Expected hours, but it was missing or malformed.
	MissingHours,
	/// The supplied hour was outside of [0, 23].
	HoursOutOfRange,
	/// Hour was supplied but minutes were missing.
	MissingMinutes,
	/// The supplied minutes were outside of [0, 59].
	MinutesOutOfRange,
	/// Expected seconds, but it was missing or malformed.
	MissingSeconds,
	/// The supplied seconds were outside of [0, 59].
	SecondsOutOfRange,
	/// Expected a UTC offset sign (`+`, `-`) or `Z`.
	MissingOffset,
	/// Found unexpected bytes after a valid date time string.
	UnexpectedInput
}

impl fmt::Display for ParseError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ParseError::MissingYear => write!(f, "Year missing or malformed"),
			ParseError::MissingMonth => write!(f, "Month missing or malformed"),
			ParseError::MonthOutOfRange => write!(f, "Month out of range"),
			ParseError::MissingDay => write!(f, "Day missing or malformed"),
			ParseError::DayOutOfRange => write!(f, "Day out of range"),
			ParseError::MissingHours => write!(f, "Hours missing or malformed"),
			ParseError::HoursOutOfRange => write!(f, "Hours out of range"),
			ParseError::MissingMinutes => write!(f, "Minutes missing or malformed"),
			ParseError::MinutesOutOfRange => write!(f, "Minutes out of range"),
			ParseError::MissingSeconds => write!(f, "Seconds missing or malformed"),
			ParseError::SecondsOutOfRange => write!(f, "Seconds out of range"),
			ParseError::MissingOffset => write!(f, "UTC offset missing or malformed"),
			ParseError::UnexpectedInput => write!(f, "Unexpected input at end of date time string"),
		}
	}
}

impl error::Error for ParseError {}

/// Parse a fixed-length, unsigned integer.
///
/// `N` must be less than 5 to ensure the parsed value fits into a u16 with no possible overflow.
fn parse_num<const N: usize>(bytes: &[u8], e: ParseError) -> Result<(&[u8], u16), ParseError> {
	const { assert!(N < 5); }

	if bytes.len() < N {
		return Err(e);
	}

	let mut r: u16 = 0;
	for &b in &bytes[..N] {
		r = match b {
			v @ b'0'..=b'9' => r * 10 + (v - b'0') as u16,
			_ => return Err(e)
		};
	}

	Ok((&bytes[N..], r))
}

/// Parse `:`-prefixed two digit field, checking it against `max`.
fn parse_field(bytes: &[u8], missing: ParseError, range: ParseError, max: u16)
	-> Result<(&[u8], u16), ParseError>
{
	let (bytes, v) = match bytes.split_first() {
		Some((b':', b)) => parse_num::<2>(b, missing)?,
		_ => return Err(missing),
	};
	if v > max {
		return Err(range);
	}
	Ok((bytes, v))
}

/// Parse a UTC offset at the start of `bytes`: `Z`, `+HH:mm`, `-HH:mm`, `+HHmm` or `-HHmm`.
///
/// Returns the remaining input and the offset.
fn parse_offset_prefix(bytes: &[u8]) -> Result<(&[u8], UtcOffset), ParseError> {
	let (neg, bytes) = match bytes.split_first() {
		Some((b'Z', b)) => return Ok((b, UtcOffset::UTC)),
		Some((b'+', b)) => (false, b),
		Some((b'-', b)) => (true, b),
		_ => return Err(ParseError::MissingOffset),
	};
	let (bytes, hours) = parse_num::<2>(bytes, ParseError::MissingHours)?;
	if hours > 23 {
		return Err(ParseError::HoursOutOfRange);
	}
	let (bytes, minutes) = match bytes.first() {
		Some(b':') => parse_field(bytes, ParseError::MissingMinutes, ParseError::MinutesOutOfRange, 59)?,
		Some(_) => {
			let (bytes, m) = parse_num::<2>(bytes, ParseError::MissingMinutes)?;
			if m > 59 {
				return Err(ParseError::MinutesOutOfRange);
			}
			(bytes, m)
		},
		None => return Err(ParseError::MissingMinutes),
	};

	let seconds = hours as i32 * 3600 + minutes as i32 * 60;
	// Cannot fail, |seconds| <= 23:59
	let offset = UtcOffset::new(if neg { -seconds } else { seconds }).unwrap_or_default();
	Ok((bytes, offset))
}

/// Parse a UTC offset such as `+09:00`, `-0530`, or `Z`.
///
/// # Errors
///
/// Returns [`ParseError`] if the offset is malformed or followed by anything else.
///
/// # Examples
/// ```
/// # use time::{parse::{parse_offset, ParseError}, zone::UtcOffset};
/// assert_eq!(parse_offset(b"-05:30").map(|o| o.seconds()), Ok(-19800));
/// assert_eq!(parse_offset(b"0900"), Err(ParseError::MissingOffset));
/// ```
pub fn parse_offset(bytes: &[u8]) -> Result<UtcOffset, ParseError> {
	match parse_offset_prefix(bytes)? {
		(rest, offset) if rest.is_empty() => Ok(offset),
		_ => Err(ParseError::UnexpectedInput)
	}
}

/// Parse a date time string into a Unix timestamp, assuming UTC when no offset is given.
///
/// See [`parse_timestamp_in`] for the accepted formats.
pub fn parse_timestamp(bytes: &[u8]) -> Result<TimeSpec, ParseError> {
	parse_timestamp_in(bytes, UtcOffset::UTC)
}

/// Parse a date time string into a Unix timestamp.
///
/// Strings without an explicit offset are civil time in `zone`. Accepted formats:
/// - `YYYY-MM-DD`
/// - `YYYY-MM-DDTHH:mm` or `YYYY-MM-DD HH:mm`
/// - `YYYY-MM-DDTHH:mm:ss` or `YYYY-MM-DD HH:mm:ss`
/// - Each of the prior bullets followed by `Z`, `+HH:mm`, or `-HH:mm`, optionally separated from
///   the time by a space
///
/// # Errors
///
/// Returns [`ParseError`] if the input was malformed or invalid in any way. This includes cases
/// where a valid timestamp was read but additional characters remain in `bytes`.
///
/// # Examples
/// ```
/// # use time::{parse::parse_timestamp_in, time::TimeSpec, zone::UtcOffset};
/// assert_eq!(
/// 	parse_timestamp_in(b"2024-06-15 14:37", UtcOffset::JST),
/// 	Ok(TimeSpec { sec: 1718429820, nsec: 0 })
/// );
/// assert_eq!(
/// 	parse_timestamp_in(b"2024-06-15 14:37 +00:00", UtcOffset::JST),
/// 	Ok(TimeSpec { sec: 1718462220, nsec: 0 })
/// );
/// ```
pub fn parse_timestamp_in(bytes: &[u8], zone: UtcOffset) -> Result<TimeSpec, ParseError> {
	let (bytes, year) = parse_num::<4>(bytes, ParseError::MissingYear)?;

	let (bytes, month) = match bytes.split_first() {
		Some((b'-', b)) => parse_num::<2>(b, ParseError::MissingMonth)?,
		_ => return Err(ParseError::MissingMonth),
	};
	if month == 0 || month > 12 {
		return Err(ParseError::MonthOutOfRange);
	}

	let (bytes, day) = match bytes.split_first() {
		Some((b'-', b)) => parse_num::<2>(b, ParseError::MissingDay)?,
		_ => return Err(ParseError::MissingDay),
	};
	if day == 0 || day > days_per_month(year, month as u8) as u16 {
		return Err(ParseError::DayOutOfRange);
	}
	let mut sec = timestamp_from_ymd(year, month as u8, day as u8);

	let bytes = match bytes.split_first() {
		None => return Ok(TimeSpec::from_secs(sec - zone.seconds() as i64)),
		Some((b'T' | b' ', b)) => {
			let (b, hours) = parse_num::<2>(b, ParseError::MissingHours)?;
			if hours > 23 {
				return Err(ParseError::HoursOutOfRange);
			}
			let (b, minutes) = parse_field(b, ParseError::MissingMinutes, ParseError::MinutesOutOfRange, 59)?;
			sec += hours as i64 * 3600 + minutes as i64 * 60;
			b
		},
		_ => return Err(ParseError::UnexpectedInput),
	};

	let bytes = match bytes.first() {
		Some(b':') => {
			let (b, seconds) = parse_field(bytes, ParseError::MissingSeconds, ParseError::SecondsOutOfRange, 59)?;
			sec += seconds as i64;
			b
		},
		_ => bytes,
	};

	let bytes = match bytes.split_first() {
		Some((b' ', b)) => b,
		_ => bytes
	};
	let (bytes, offset) = if bytes.is_empty() {
		(bytes, zone)
	} else {
		parse_offset_prefix(bytes)?
	};
	if !bytes.is_empty() {
		return Err(ParseError::UnexpectedInput);
	}

	Ok(TimeSpec::from_secs(sec - offset.seconds() as i64))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parse_timestamp_test() {
		assert_eq!(parse_timestamp(b"2025-02-18"), Ok(TimeSpec::from_secs(1739836800)));
		assert_eq!(parse_timestamp(b"2025-02-18T12:30"), Ok(TimeSpec::from_secs(1739881800)));
		assert_eq!(parse_timestamp(b"2025-02-18 12:30:45"), Ok(TimeSpec::from_secs(1739881845)));
		assert_eq!(parse_timestamp(b"2025-02-18T12:30:45Z"), Ok(TimeSpec::from_secs(1739881845)));
		assert_eq!(parse_timestamp(b"2025-02-18T12:30:45+01:00"), Ok(TimeSpec::from_secs(1739878245)));
		assert_eq!(parse_timestamp(b"2025-02-18 12:30:45 -01:00"), Ok(TimeSpec::from_secs(1739885445)));
		assert_eq!(parse_timestamp(b"2025-02-18 12:30 -0130"), Ok(TimeSpec::from_secs(1739887200)));

		assert_eq!(parse_timestamp(b""), Err(ParseError::MissingYear));
		assert_eq!(parse_timestamp(b"2025"), Err(ParseError::MissingMonth));
		assert_eq!(parse_timestamp(b"2025-13-01"), Err(ParseError::MonthOutOfRange));
		assert_eq!(parse_timestamp(b"2025-02-29"), Err(ParseError::DayOutOfRange));
		assert_eq!(parse_timestamp(b"2025-02-18T12"), Err(ParseError::MissingMinutes));
		assert_eq!(parse_timestamp(b"2025-02-18T24:00"), Err(ParseError::HoursOutOfRange));
		assert_eq!(parse_timestamp(b"2025-02-18T12:60"), Err(ParseError::MinutesOutOfRange));
		assert_eq!(parse_timestamp(b"2025-02-18T12:30:60"), Err(ParseError::SecondsOutOfRange));
		assert_eq!(parse_timestamp(b"2025-02-18T12:30:45+"), Err(ParseError::MissingHours));
		assert_eq!(parse_timestamp(b"2025-02-18T12:30:45+01"), Err(ParseError::MissingMinutes));
		assert_eq!(parse_timestamp(b"2025-02-18T12:30:45Zx"), Err(ParseError::UnexpectedInput));
		assert_eq!(parse_timestamp(b"2025-02-18x"), Err(ParseError::UnexpectedInput));
	}

	#[test]
	fn parse_timestamp_in_zone_test() {
		// The leap second at the end of 2016 took effect at 09:00 on New Year's Day in Japan
		assert_eq!(
			parse_timestamp_in(b"2017-01-01T09:00:00", UtcOffset::JST),
			Ok(TimeSpec::from_secs(1483228800))
		);
		assert_eq!(parse_timestamp_in(b"2017-01-01", UtcOffset::JST), Ok(TimeSpec::from_secs(1483196400)));
		// An explicit offset wins over the zone
		assert_eq!(
			parse_timestamp_in(b"2017-01-01T00:00:00Z", UtcOffset::JST),
			Ok(TimeSpec::from_secs(1483228800))
		);
	}

	#[test]
	fn parse_offset_test() {
		assert_eq!(parse_offset(b"Z"), Ok(UtcOffset::UTC));
		assert_eq!(parse_offset(b"+09:00"), Ok(UtcOffset::JST));
		assert_eq!(parse_offset(b"+0900"), Ok(UtcOffset::JST));
		assert_eq!(parse_offset(b"-05:30").map(|o| o.seconds()), Ok(-19800));
		assert_eq!(parse_offset(b"+24:00"), Err(ParseError::HoursOutOfRange));
		assert_eq!(parse_offset(b"+09:60"), Err(ParseError::MinutesOutOfRange));
		assert_eq!(parse_offset(b"+09"), Err(ParseError::MissingMinutes));
		assert_eq!(parse_offset(b"JST"), Err(ParseError::MissingOffset));
		assert_eq!(parse_offset(b"+09:00 "), Err(ParseError::UnexpectedInput));
	}
}
