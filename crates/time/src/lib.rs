//! Wall-clock and civil calendar utilities for time code transmission.
//!
//! This crate is divided into three parts: [`time`] deals with Unix timestamps ([`TimeSpec`]),
//! reading the wall clock and sleeping towards absolute deadlines, and converting timestamps to UTC
//! calendar time; [`zone`] applies a fixed UTC offset to get civil calendar time in a named zone;
//! [`parse`] reads date time strings and offsets from configuration.
//!
//! The crate is `no_std`. The `now` feature links `libc` and enables [`time::now`] and
//! [`time::sleep_until`].
//!
//! # Examples
//!
//! Conversion from Unix time to Japan Standard Time.
//! ```
//! # use time::{time::Tm, zone::UtcOffset};
//! let date = UtcOffset::JST.date(1718429820).unwrap();
//! assert_eq!(date, Tm {
//! 	sec: 0,
//! 	min: 37,
//! 	hour: 14,
//! 	day: 15,
//! 	mon: 6,
//! 	year: 124,
//! 	wday: 6,
//! 	yday: 167
//! });
//! ```

#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod time;
pub mod zone;
pub mod parse;

pub use time::*;
pub use zone::*;
pub use parse::*;
