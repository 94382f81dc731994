use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{DialogError, Result};

const MILLIS_PER_SECOND: u64 = 1_000;
const MILLIS_PER_MINUTE: u64 = 60 * MILLIS_PER_SECOND;
const MILLIS_PER_HOUR: u64 = 60 * MILLIS_PER_MINUTE;

/// A point on a video's timeline with millisecond precision.
///
/// Rendered as `HH:MM:SS.mmm`. Ordering is numeric, which matches the
/// ordering of the zero-padded text form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// Convert a fractional-seconds string such as `"125.400000"` into a
    /// timestamp offset from zero. Digits past the millisecond are dropped.
    pub fn from_seconds(text: &str) -> Result<Self> {
        let malformed = || DialogError::MalformedSeconds(text.to_string());
        let trimmed = text.trim();

        let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(malformed());
        }
        if !whole.bytes().all(|b| b.is_ascii_digit())
            || !fraction.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(malformed());
        }

        let seconds: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| malformed())?
        };

        let millis = fraction
            .bytes()
            .chain(std::iter::repeat(b'0'))
            .take(3)
            .fold(0u64, |acc, b| acc * 10 + u64::from(b - b'0'));

        seconds
            .checked_mul(MILLIS_PER_SECOND)
            .and_then(|ms| ms.checked_add(millis))
            .map(Self)
            .ok_or_else(malformed)
    }

    /// Absolute distance between two timestamps, in either order.
    pub fn abs_diff(self, other: Timestamp) -> Duration {
        Duration::from_millis(self.0.abs_diff(other.0))
    }

    /// Whether the distance between `self` and `other` is strictly greater
    /// than `threshold`. Symmetric in its two timestamps.
    pub fn gap_exceeds(self, other: Timestamp, threshold: Duration) -> bool {
        self.abs_diff(other) > threshold
    }

    /// Time elapsed since `earlier`, or zero if `earlier` is later.
    pub fn saturating_since(self, earlier: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

impl FromStr for Timestamp {
    type Err = DialogError;

    fn from_str(s: &str) -> Result<Self> {
        let malformed = || DialogError::MalformedTimestamp(s.to_string());
        let bytes = s.as_bytes();
        if bytes.len() != 12 || bytes[2] != b':' || bytes[5] != b':' || bytes[8] != b'.' {
            return Err(malformed());
        }

        let field = |range: std::ops::Range<usize>| -> Result<u64> {
            let digits = &bytes[range];
            if !digits.iter().all(u8::is_ascii_digit) {
                return Err(malformed());
            }
            Ok(digits
                .iter()
                .fold(0u64, |acc, b| acc * 10 + u64::from(b - b'0')))
        };

        let hours = field(0..2)?;
        let minutes = field(3..5)?;
        let seconds = field(6..8)?;
        let millis = field(9..12)?;

        if minutes >= 60 || seconds >= 60 {
            return Err(malformed());
        }

        Ok(Self(
            hours * MILLIS_PER_HOUR
                + minutes * MILLIS_PER_MINUTE
                + seconds * MILLIS_PER_SECOND
                + millis,
        ))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = self.0 / MILLIS_PER_HOUR;
        let minutes = (self.0 % MILLIS_PER_HOUR) / MILLIS_PER_MINUTE;
        let seconds = (self.0 % MILLIS_PER_MINUTE) / MILLIS_PER_SECOND;
        let millis = self.0 % MILLIS_PER_SECOND;
        write!(f, "{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
    }
}
