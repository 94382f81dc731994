use std::time::Duration;

use crate::error::{DialogError, Result};

use super::Interval;

/// Merge raw cue intervals into sorted, disjoint, non-empty spans.
///
/// Input order does not matter. Two intervals are merged when they overlap
/// or when the gap between them is no larger than `threshold`. Spans that
/// end up covering no time are dropped, so the result may be empty.
pub fn consolidate(intervals: &[Interval], threshold: Duration) -> Result<Vec<Interval>> {
    let mut sorted = intervals.to_vec();
    // Stable: equal starts keep their input order.
    sorted.sort_by_key(|interval| interval.start);

    let mut remaining = sorted.into_iter();
    let mut pending = remaining.next().ok_or(DialogError::NoIntervals)?;
    let mut combined = Vec::new();

    for cur in remaining {
        let overlaps = cur.start < pending.end;
        if overlaps || !pending.end.gap_exceeds(cur.start, threshold) {
            if cur.end >= pending.end {
                pending = Interval {
                    end: cur.end,
                    ..pending
                };
            }
        } else {
            finalize(&mut combined, pending);
            pending = cur;
        }
    }
    finalize(&mut combined, pending);

    Ok(combined)
}

fn finalize(combined: &mut Vec<Interval>, interval: Interval) {
    if !interval.is_empty() {
        combined.push(interval);
    }
}
