use super::Interval;

/// Remove excluded ranges (usually skipped chapters) from dialog intervals.
///
/// Each exclusion is applied to the whole working set in turn. An interval
/// whose start lies strictly inside an exclusion loses its front, and one
/// whose end lies strictly inside an exclusion loses its back. Both checks
/// read the interval as it was before the exclusion was applied. Intervals
/// left with no duration are dropped; the rest keep their order.
///
/// An exclusion lying entirely inside an interval, or sharing both of its
/// boundaries, leaves it untouched since neither boundary is strictly inside.
pub fn subtract(intervals: &[Interval], exclusions: &[Interval]) -> Vec<Interval> {
    exclusions
        .iter()
        .fold(intervals.to_vec(), |working, exclusion| {
            working
                .into_iter()
                .filter_map(|cur| trim_against(cur, exclusion))
                .collect()
        })
}

fn trim_against(cur: Interval, exclusion: &Interval) -> Option<Interval> {
    let straddles = |point| exclusion.start < point && point < exclusion.end;

    let start = if straddles(cur.start) {
        exclusion.end
    } else {
        cur.start
    };
    let end = if straddles(cur.end) {
        exclusion.start
    } else {
        cur.end
    };

    let trimmed = Interval { start, end, ..cur };
    (!trimmed.is_empty()).then_some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialog::total_duration;

    fn ivl(start: &str, end: &str) -> Interval {
        Interval::parse(start, end).unwrap()
    }

    fn chapter(start: &str, end: &str) -> Interval {
        ivl(start, end).with_title("Opening")
    }

    #[test]
    fn test_no_exclusions_is_identity() {
        let intervals = vec![
            ivl("00:00:00.000", "00:00:10.000"),
            ivl("00:00:20.000", "00:00:30.000"),
        ];
        assert_eq!(subtract(&intervals, &[]), intervals);
    }

    #[test]
    fn test_exclusion_inside_interval_is_ignored() {
        let intervals = vec![ivl("00:00:00.000", "00:00:10.000")];
        let out = subtract(&intervals, &[chapter("00:00:04.000", "00:00:06.000")]);
        assert_eq!(out, intervals);
    }

    #[test]
    fn test_exclusion_over_start_truncates_front() {
        let intervals = vec![ivl("00:00:05.000", "00:00:10.000")];
        let out = subtract(&intervals, &[chapter("00:00:00.000", "00:00:07.000")]);
        assert_eq!(out, vec![ivl("00:00:07.000", "00:00:10.000")]);
    }

    #[test]
    fn test_exclusion_over_end_truncates_back() {
        let intervals = vec![ivl("00:00:05.000", "00:00:10.000")];
        let out = subtract(&intervals, &[chapter("00:00:08.000", "00:00:20.000")]);
        assert_eq!(out, vec![ivl("00:00:05.000", "00:00:08.000")]);
    }

    #[test]
    fn test_exclusion_strictly_covering_interval_drops_it() {
        let intervals = vec![
            ivl("00:00:05.000", "00:00:10.000"),
            ivl("00:01:00.000", "00:01:05.000"),
        ];
        let out = subtract(&intervals, &[chapter("00:00:04.000", "00:00:11.000")]);
        assert_eq!(out, vec![ivl("00:01:00.000", "00:01:05.000")]);
    }

    #[test]
    fn test_exclusion_sharing_both_boundaries_is_ignored() {
        let intervals = vec![ivl("00:00:05.000", "00:00:10.000")];
        let out = subtract(&intervals, &[chapter("00:00:05.000", "00:00:10.000")]);
        assert_eq!(out, intervals);
    }

    #[test]
    fn test_touching_exclusion_is_ignored() {
        let intervals = vec![ivl("00:00:05.000", "00:00:10.000")];
        let out = subtract(
            &intervals,
            &[
                chapter("00:00:00.000", "00:00:05.000"),
                chapter("00:00:10.000", "00:00:15.000"),
            ],
        );
        assert_eq!(out, intervals);
    }

    #[test]
    fn test_one_exclusion_trims_neighbours_on_both_sides() {
        let intervals = vec![
            ivl("00:00:00.000", "00:00:10.000"),
            ivl("00:00:20.000", "00:00:30.000"),
        ];
        let out = subtract(&intervals, &[chapter("00:00:08.000", "00:00:22.000")]);
        assert_eq!(
            out,
            vec![
                ivl("00:00:00.000", "00:00:08.000"),
                ivl("00:00:22.000", "00:00:30.000"),
            ]
        );
    }

    #[test]
    fn test_exclusions_compound_across_passes() {
        let intervals = vec![ivl("00:00:05.000", "00:00:20.000")];
        let out = subtract(
            &intervals,
            &[
                chapter("00:00:00.000", "00:00:08.000"),
                chapter("00:00:07.000", "00:00:10.000"),
                chapter("00:00:18.000", "00:00:25.000"),
            ],
        );
        assert_eq!(out, vec![ivl("00:00:10.000", "00:00:18.000")]);
    }

    #[test]
    fn test_truncation_to_zero_length_is_dropped() {
        let intervals = vec![ivl("00:00:05.000", "00:00:10.000")];
        let out = subtract(
            &intervals,
            &[
                chapter("00:00:00.000", "00:00:07.000"),
                chapter("00:00:06.000", "00:00:12.000"),
            ],
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_never_grows_or_reorders() {
        let intervals = vec![
            ivl("00:00:00.000", "00:00:10.000"),
            ivl("00:00:12.000", "00:00:14.000"),
            ivl("00:00:20.000", "00:00:30.000"),
            ivl("00:01:00.000", "00:01:30.000"),
        ];
        let exclusion_sets = vec![
            vec![chapter("00:00:05.000", "00:00:21.000")],
            vec![
                chapter("00:00:13.000", "00:00:25.000"),
                chapter("00:01:10.000", "00:02:00.000"),
            ],
            vec![chapter("00:00:00.000", "00:10:00.000")],
            vec![chapter("00:00:02.000", "00:00:03.000")],
        ];

        for exclusions in exclusion_sets {
            let out = subtract(&intervals, &exclusions);
            assert!(out.len() <= intervals.len());
            assert!(total_duration(&out) <= total_duration(&intervals));
            for pair in out.windows(2) {
                assert!(pair[0].end <= pair[1].start);
            }
        }
    }

    #[test]
    fn test_dialog_interval_keeps_its_title() {
        let intervals = vec![ivl("00:00:05.000", "00:00:10.000")];
        let out = subtract(&intervals, &[chapter("00:00:00.000", "00:00:07.000")]);
        assert_eq!(out[0].title, None);
    }
}
