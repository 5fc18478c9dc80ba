//! Encode JJY time code frames.
//!
//! A [`Frame`] is the 60 [`Symbol`]s transmitted during one minute, one per second. Frames are
//! plain values: [`jjy::build`] computes one from a [`jjy::TimeCodeInput`] without any I/O or
//! timing, and a separate player decides when each symbol goes on air.
//!
//! This crate is `no_std` (with `alloc` for the leap second schedule).
//!
//! # Examples
//! ```
//! # use timecode::{jjy::{self, TimeCodeInput}, leap::LeapSecondSchedule, Symbol};
//! # use time::zone::UtcOffset;
//! // Sat, Jun 15 2024. 14:37 JST
//! let input = TimeCodeInput::new(1718429820, UtcOffset::JST, false, &LeapSecondSchedule::empty())
//! 	.expect("time after the Unix epoch");
//! let frame = jjy::build(&input);
//!
//! assert_eq!(frame[0], Symbol::Marker);
//! assert_eq!(frame[59], Symbol::ShortMarker);
//! assert_eq!(frame.to_string(), "M01100111M000100100M000100110M011100010M000100100M110000000m");
//! ```

#![no_std]

extern crate alloc;

use core::{error, fmt, ops::Index, slice};
use time::Nanoseconds;

pub mod bcd;
pub mod leap;
pub mod jjy;

/// Number of symbols (seconds) in a frame.
pub const FRAME_LEN: usize = 60;

/// Seconds that carry a position marker. The last one is always a [`Symbol::ShortMarker`].
pub const MARKER_SECONDS: [usize; 7] = [0, 9, 19, 29, 39, 49, 59];

/// One second of output.
///
/// Each symbol starts with a mark (carrier on) at the top of its second, followed by silence for
/// the rest of the second. The mark length carries the value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Symbol {
	/// Position marker: 200 ms mark, 800 ms silence.
	Marker,
	/// Final marker of a frame: 200 ms mark and no trailing silence of its own. The next frame
	/// starts on its own schedule.
	ShortMarker,
	/// Binary 0: 800 ms mark, 200 ms silence.
	Bit0,
	/// Binary 1: 500 ms mark, 500 ms silence.
	Bit1
}

impl Symbol {
	/// The data symbol for `value`.
	#[inline(always)]
	pub const fn bit(value: bool) -> Symbol {
		if value { Symbol::Bit1 } else { Symbol::Bit0 }
	}

	/// How long the carrier is on at the start of the second.
	pub const fn mark(self) -> Nanoseconds {
		match self {
			Symbol::Marker | Symbol::ShortMarker => Nanoseconds::from_millis(200),
			Symbol::Bit1 => Nanoseconds::from_millis(500),
			Symbol::Bit0 => Nanoseconds::from_millis(800),
		}
	}

	/// How long the carrier stays off after the mark, completing the second.
	///
	/// `None` for [`Symbol::ShortMarker`], which leaves its trailing silence to whoever schedules
	/// the next frame.
	pub const fn silence(self) -> Option<Nanoseconds> {
		match self {
			Symbol::ShortMarker => None,
			s => Some(Nanoseconds(1000000000 - s.mark().0)),
		}
	}

	/// Whether this is a position marker (short or not).
	#[inline(always)]
	pub const fn is_marker(self) -> bool {
		matches!(self, Symbol::Marker | Symbol::ShortMarker)
	}

	/// The binary value carried, if this is a data symbol.
	pub const fn value(self) -> Option<bool> {
		match self {
			Symbol::Bit0 => Some(false),
			Symbol::Bit1 => Some(true),
			_ => None
		}
	}
}

impl fmt::Display for Symbol {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Symbol::Marker => "M",
			Symbol::ShortMarker => "m",
			Symbol::Bit0 => "0",
			Symbol::Bit1 => "1",
		})
	}
}

/// The 60 symbols of one minute, index 0 being the symbol transmitted at second 0.
///
/// Frames can only be made by [`jjy::build`], which guarantees that markers appear exactly at
/// [`MARKER_SECONDS`] and that the last symbol is a [`Symbol::ShortMarker`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Frame([Symbol; FRAME_LEN]);

impl Frame {
	/// All symbols, in transmission order.
	#[inline(always)]
	pub fn symbols(&self) -> &[Symbol; FRAME_LEN] {
		&self.0
	}

	/// Iterate over symbols in transmission order.
	pub fn iter(&self) -> slice::Iter<'_, Symbol> {
		self.0.iter()
	}

	/// The data bit at `second`, or `None` for a marker (or an out of range second).
	pub fn bit(&self, second: usize) -> Option<bool> {
		self.0.get(second).and_then(|s| s.value())
	}
}

impl Index<usize> for Frame {
	type Output = Symbol;

	fn index(&self, second: usize) -> &Symbol {
		&self.0[second]
	}
}

impl<'a> IntoIterator for &'a Frame {
	type Item = &'a Symbol;
	type IntoIter = slice::Iter<'a, Symbol>;

	fn into_iter(self) -> Self::IntoIter {
		self.0.iter()
	}
}

impl fmt::Display for Frame {
	/// One character per second: `M` marker, `m` short marker, `0`/`1` data.
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.iter().try_for_each(|s| fmt::Display::fmt(s, f))
	}
}

/// The error type for building time code input.
#[derive(Clone, Copy, PartialEq)]
pub enum TimeCodeError {
	/// The minute to encode falls before the Unix epoch (Jan 1, 1970) or after 2155 in the
	/// configured zone. The unsupported time is provided in the payload.
	UnsupportedTime(i64)
}

impl fmt::Display for TimeCodeError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TimeCodeError::UnsupportedTime(x) => write!(f, "Unsupported time: {}", x),
		}
	}
}

impl fmt::Debug for TimeCodeError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(self, f)
	}
}

impl error::Error for TimeCodeError {}
