//! Leap second announcements.
//!
//! JJY warns receivers of an upcoming leap second during the month before it happens. A
//! [`LeapSecondSchedule`] holds the known leap second instants, and
//! [`LeapSecondSchedule::directive`] decides what a given minute should announce.
//!
//! # Examples
//!
//! ```
//! # use timecode::leap::{LeapDirective, LeapSecondSchedule};
//! let schedule = LeapSecondSchedule::builtin();
//! // Dec 15, 2016: a second is inserted at the end of the year
//! assert_eq!(schedule.directive(1481760000), LeapDirective::Insert);
//! // Feb 1, 2017: nothing pending
//! assert_eq!(schedule.directive(1485907200), LeapDirective::None);
//! ```

use alloc::{boxed::Box, vec::Vec};
use core::{error, fmt};
use time::time::SECONDS_PER_DAY;

/// How far ahead of a leap second the announcement starts, in seconds.
pub const ANNOUNCE_WINDOW: i64 = 31 * SECONDS_PER_DAY;

/// What a frame announces about the next leap second.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LeapDirective {
	/// No leap second within the announcement window.
	#[default]
	None,
	/// A second will be inserted.
	Insert,
	/// A second will be removed.
	Remove
}

/// Whether a scheduled leap second adds or removes a second.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LeapKind {
	Insert,
	Remove
}

/// A leap second taking effect at `at` (Unix time of the first second after the adjustment).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LeapSecond {
	pub at: i64,
	pub kind: LeapKind
}

impl LeapSecond {
	#[inline(always)]
	pub const fn insert(at: i64) -> LeapSecond {
		LeapSecond { at, kind: LeapKind::Insert }
	}

	#[inline(always)]
	pub const fn remove(at: i64) -> LeapSecond {
		LeapSecond { at, kind: LeapKind::Remove }
	}
}

/// Every leap second announced by the IERS so far. All of them were insertions.
const BUILTIN: [i64; 27] = [
	78796800,   94694400,   126230400,  157766400,  189302400,  220924800,  252460800,
	283996800,  315532800,  362793600,  394329600,  425865600,  489024000,  567993600,
	631152000,  662688000,  709948800,  741484800,  773020800,  820454400,  867715200,
	915148800,  1136073600, 1230768000, 1341100800, 1435708800, 1483228800
];

/// The error type for building a [`LeapSecondSchedule`].
#[derive(Clone, Copy, PartialEq)]
pub enum ScheduleError {
	/// The leap second instant is before the Unix epoch.
	BeforeEpoch(i64),
	/// More than one entry at the same instant.
	Duplicate(i64)
}

impl fmt::Display for ScheduleError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ScheduleError::BeforeEpoch(x) => write!(f, "Leap second before the Unix epoch: {}", x),
			ScheduleError::Duplicate(x) => write!(f, "Duplicate leap second: {}", x),
		}
	}
}

impl fmt::Debug for ScheduleError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(self, f)
	}
}

impl error::Error for ScheduleError {}

/// A read-only, chronologically sorted list of leap seconds.
///
/// Construction validates the entries once; afterwards the schedule can be shared freely between
/// threads.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LeapSecondSchedule(Box<[LeapSecond]>);

impl LeapSecondSchedule {
	/// Build a schedule from `entries` in any order.
	///
	/// # Errors
	///
	/// Fails on entries before the Unix epoch, and on two entries sharing an instant.
	pub fn new(entries: impl IntoIterator<Item = LeapSecond>) -> Result<LeapSecondSchedule, ScheduleError> {
		let mut entries: Vec<LeapSecond> = entries.into_iter().collect();
		if let Some(e) = entries.iter().find(|e| e.at < 0) {
			return Err(ScheduleError::BeforeEpoch(e.at));
		}
		entries.sort_unstable_by_key(|e| e.at);
		if let Some(w) = entries.windows(2).find(|w| w[0].at == w[1].at) {
			return Err(ScheduleError::Duplicate(w[0].at));
		}
		Ok(LeapSecondSchedule(entries.into_boxed_slice()))
	}

	/// A schedule with no leap seconds: every frame announces [`LeapDirective::None`].
	pub fn empty() -> LeapSecondSchedule {
		LeapSecondSchedule::default()
	}

	/// The historical IERS leap seconds.
	pub fn builtin() -> LeapSecondSchedule {
		LeapSecondSchedule(BUILTIN.iter().map(|&at| LeapSecond::insert(at)).collect())
	}

	/// This schedule with `extra` entries merged in.
	pub fn extend(&self, extra: impl IntoIterator<Item = LeapSecond>) -> Result<LeapSecondSchedule, ScheduleError> {
		LeapSecondSchedule::new(self.0.iter().copied().chain(extra))
	}

	/// All entries, oldest first.
	#[inline(always)]
	pub fn entries(&self) -> &[LeapSecond] {
		&self.0
	}

	/// The first leap second strictly after `now`.
	pub fn next_after(&self, now: i64) -> Option<LeapSecond> {
		let i = self.0.partition_point(|e| e.at <= now);
		self.0.get(i).copied()
	}

	/// What a frame for the minute starting at `now` announces.
	///
	/// A leap second is announced iff it takes effect after `now` but no more than
	/// [`ANNOUNCE_WINDOW`] later. An insertion anywhere in the window wins over removals.
	pub fn directive(&self, now: i64) -> LeapDirective {
		let start = self.0.partition_point(|e| e.at <= now);
		self.0[start..].iter()
			.take_while(|e| e.at - now <= ANNOUNCE_WINDOW)
			.fold(LeapDirective::None, |directive, e| match (directive, e.kind) {
				(LeapDirective::Insert, _) | (_, LeapKind::Insert) => LeapDirective::Insert,
				_ => LeapDirective::Remove
			})
	}
}
