//! Microsecond-resolution absolute time (spec §3.1).

use std::fmt;
use std::ops::{Add, Sub};

use codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// Microseconds since the Unix epoch.
#[derive(
	Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Encode, Decode, Serialize, Deserialize,
)]
pub struct TimePoint(pub i64);

/// Microseconds in one second, used throughout the scheduling and slot-clock
/// logic (spec §4.8).
pub const MICROSECONDS_PER_SECOND: i64 = 1_000_000;

impl TimePoint {
	pub const EPOCH: TimePoint = TimePoint(0);

	pub fn from_unix_seconds(seconds: i64) -> Self {
		TimePoint(seconds * MICROSECONDS_PER_SECOND)
	}

	pub fn seconds_since(&self, other: TimePoint) -> i64 {
		(self.0 - other.0) / MICROSECONDS_PER_SECOND
	}

	pub fn add_seconds(&self, seconds: i64) -> TimePoint {
		TimePoint(self.0 + seconds * MICROSECONDS_PER_SECOND)
	}
}

impl Add<i64> for TimePoint {
	type Output = TimePoint;
	fn add(self, rhs_micros: i64) -> TimePoint {
		TimePoint(self.0 + rhs_micros)
	}
}

impl Sub for TimePoint {
	type Output = i64;
	fn sub(self, rhs: TimePoint) -> i64 {
		self.0 - rhs.0
	}
}

impl fmt::Display for TimePoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}us", self.0)
	}
}
