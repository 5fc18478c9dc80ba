//! Weighted binary coded decimal fields.
//!
//! JJY spreads each numeric field over a fixed set of seconds, each second carrying one weight.
//! Values are encoded greedily: walking the weights from most to least significant, a bit is set
//! whenever the weight still fits into what remains of the value. With the weight tables below,
//! this yields plain BCD (e.g. tens of minutes 40/20/10, units 8/4/2/1). The filler weights (16 in
//! the minute and hour fields, 160 in the day of year field) sit on seconds that the format
//! always transmits as 0, and greedy encoding never reaches them for in-range values.

use crate::Frame;

/// A numeric field: the seconds it occupies and the weight each one carries, most significant
/// first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Field {
	pub name: &'static str,
	pub layout: &'static [(usize, u16)],
	/// The largest value that round-trips through this field.
	pub max: u16
}

/// Minute of the hour, 0-59.
pub const MINUTE: Field = Field {
	name: "minute",
	layout: &[(1, 40), (2, 20), (3, 10), (4, 16), (5, 8), (6, 4), (7, 2), (8, 1)],
	max: 59
};

/// Hour of the day, 0-23.
pub const HOUR: Field = Field {
	name: "hour",
	layout: &[(10, 80), (11, 40), (12, 20), (13, 10), (14, 16), (15, 8), (16, 4), (17, 2), (18, 1)],
	max: 23
};

/// Day of the year, 1-366. Split around the marker at second 29.
pub const DAY_OF_YEAR: Field = Field {
	name: "day of year",
	layout: &[
		(20, 800), (21, 400), (22, 200), (23, 100), (24, 160), (25, 80), (26, 40), (27, 20), (28, 10),
		(30, 8), (31, 4), (32, 2), (33, 1)
	],
	max: 366
};

/// Last two digits of the year, 0-99.
pub const YEAR: Field = Field {
	name: "year",
	layout: &[(41, 80), (42, 40), (43, 20), (44, 10), (45, 8), (46, 4), (47, 2), (48, 1)],
	max: 99
};

/// Day of the week, 0-6 with Sunday as 0.
pub const WEEKDAY: Field = Field {
	name: "weekday",
	layout: &[(50, 4), (51, 2), (52, 1)],
	max: 6
};

impl Field {
	/// Greedily encode `value`, yielding `(second, bit)` for every second of the field.
	///
	/// # Examples
	///
	/// ```
	/// # use timecode::bcd::MINUTE;
	/// let bits: Vec<bool> = MINUTE.encode(37).map(|(_, b)| b).collect();
	/// assert_eq!(bits, [false, true, true, false, false, true, true, true]);
	/// ```
	pub fn encode(&self, value: u16) -> impl Iterator<Item = (usize, bool)> + '_ {
		self.layout.iter().scan(value, |remaining, &(second, weight)| {
			let set = *remaining >= weight;
			if set {
				*remaining -= weight;
			}
			Some((second, set))
		})
	}

	/// Sum the weights of the seconds set in `frame`. Markers count as 0.
	pub fn decode(&self, frame: &Frame) -> u16 {
		self.layout.iter()
			.filter(|&&(second, _)| frame.bit(second) == Some(true))
			.map(|&(_, weight)| weight)
			.sum()
	}

	/// Even parity over the field's bits in `frame`: `true` iff an odd number of them are set.
	pub fn parity(&self, frame: &Frame) -> bool {
		parity(self.layout.iter().map(|&(second, _)| frame.bit(second) == Some(true)))
	}
}

/// Even parity: `true` iff an odd number of `bits` are set, so that the bits plus the parity bit
/// contain an even number of ones.
pub fn parity(bits: impl IntoIterator<Item = bool>) -> bool {
	bits.into_iter().fold(false, |p, b| p ^ b)
}
