use std::str::FromStr;

use chrono::{NaiveDateTime, NaiveTime, TimeDelta};
use thiserror::Error;

use crate::model::*;

// ── Availability Sweep ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SweepError {
    #[error("invalid reservation interval #{index}: {reason}")]
    Validation { index: usize, reason: &'static str },
    #[error("load overflow while summing party sizes")]
    Arithmetic,
}

/// How the load per sub-interval is computed. Both produce identical output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SweepStrategy {
    /// Rescan every interval for every candidate sub-interval. O(n²).
    Direct,
    /// Carry a running total across sorted start/end events. O(n log n).
    #[default]
    RunningSum,
}

impl FromStr for SweepStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "direct" => Ok(SweepStrategy::Direct),
            "running" | "running_sum" => Ok(SweepStrategy::RunningSum),
            other => Err(format!("unknown sweep strategy: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepPolicy {
    /// A sub-interval is blocked once concurrent guests reach this number.
    pub threshold: u32,
    /// Merge blocked sub-intervals that touch end-to-start into one window.
    pub merge_adjacent: bool,
    pub strategy: SweepStrategy,
}

impl Default for SweepPolicy {
    fn default() -> Self {
        Self {
            threshold: 30,
            merge_adjacent: false,
            strategy: SweepStrategy::default(),
        }
    }
}

/// Derive blocked windows from a snapshot of reservation intervals.
///
/// Every gap between consecutive event points whose load reaches the
/// threshold becomes one window, unless `merge_adjacent` is set. Spans that
/// cross midnight are split so every window lies on a single date.
pub fn blocked_windows(
    intervals: &[ReservationInterval],
    policy: &SweepPolicy,
) -> Result<Vec<BlockedWindow>, SweepError> {
    let spans = match policy.strategy {
        SweepStrategy::Direct => saturated_spans_direct(intervals, policy.threshold)?,
        SweepStrategy::RunningSum => saturated_spans_running(intervals, policy.threshold)?,
    };
    let spans = if policy.merge_adjacent {
        merge_touching(&spans)
    } else {
        spans
    };
    Ok(spans.iter().flat_map(split_at_midnight).collect())
}

fn validate_intervals(intervals: &[ReservationInterval]) -> Result<(), SweepError> {
    for (index, iv) in intervals.iter().enumerate() {
        if iv.end <= iv.start {
            return Err(SweepError::Validation {
                index,
                reason: "end must be after start",
            });
        }
        if iv.party_size == 0 {
            return Err(SweepError::Validation {
                index,
                reason: "party size must be positive",
            });
        }
    }
    Ok(())
}

/// Event-point sweep in its direct form: dedup and sort all endpoints, then
/// sum the party sizes covering each consecutive pair.
pub fn saturated_spans_direct(
    intervals: &[ReservationInterval],
    threshold: u32,
) -> Result<Vec<Span>, SweepError> {
    validate_intervals(intervals)?;

    let mut points: Vec<NaiveDateTime> = intervals
        .iter()
        .flat_map(|iv| [iv.start, iv.end])
        .collect();
    points.sort_unstable();
    points.dedup();

    let mut result = Vec::new();
    for pair in points.windows(2) {
        let candidate = Span::new(pair[0], pair[1]);
        let mut load: u64 = 0;
        for iv in intervals.iter().filter(|iv| iv.covers(&candidate)) {
            load = load
                .checked_add(u64::from(iv.party_size))
                .ok_or(SweepError::Arithmetic)?;
        }
        if load >= u64::from(threshold) {
            result.push(candidate);
        }
    }
    Ok(result)
}

/// Sweep-line variant: +party at each start, -party at each end. All events
/// sharing a timestamp are applied before the following gap is judged, so the
/// emitted spans match `saturated_spans_direct` exactly.
pub fn saturated_spans_running(
    intervals: &[ReservationInterval],
    threshold: u32,
) -> Result<Vec<Span>, SweepError> {
    validate_intervals(intervals)?;

    let mut events: Vec<(NaiveDateTime, i64)> = Vec::with_capacity(intervals.len() * 2);
    for iv in intervals {
        let party = i64::from(iv.party_size);
        events.push((iv.start, party));
        events.push((iv.end, -party));
    }
    events.sort_unstable_by_key(|e| e.0);

    let threshold = i64::from(threshold);
    let mut result = Vec::new();
    let mut load: i64 = 0;
    let mut i = 0;
    while i < events.len() {
        let time = events[i].0;
        while i < events.len() && events[i].0 == time {
            load = load.checked_add(events[i].1).ok_or(SweepError::Arithmetic)?;
            i += 1;
        }
        if let Some(&(next, _)) = events.get(i)
            && load >= threshold {
                result.push(Span::new(time, next));
            }
    }
    Ok(result)
}

/// Merge sorted spans that overlap or touch into disjoint spans.
pub fn merge_touching(sorted: &[Span]) -> Vec<Span> {
    let mut merged: Vec<Span> = Vec::new();
    for &span in sorted {
        if let Some(last) = merged.last_mut()
            && span.start <= last.end {
                last.end = last.end.max(span.end);
                continue;
            }
        merged.push(span);
    }
    merged
}

/// Last representable instant of a day; closes a window cut at midnight.
pub fn end_of_day() -> NaiveTime {
    NaiveTime::MIN - TimeDelta::nanoseconds(1)
}

/// Cut a span into per-date windows. Pieces that would be empty or inverted
/// (a leap-second start past `end_of_day`) are dropped.
pub fn split_at_midnight(span: &Span) -> Vec<BlockedWindow> {
    let mut out = Vec::new();
    let mut push = |window: BlockedWindow| {
        if window.start_time < window.end_time {
            out.push(window);
        }
    };
    let mut cursor = span.start;
    loop {
        let date = cursor.date();
        let next_midnight = date.succ_opt().map(|d| d.and_time(NaiveTime::MIN));
        match next_midnight {
            Some(midnight) if midnight <= span.end => {
                push(BlockedWindow {
                    date,
                    start_time: cursor.time(),
                    end_time: end_of_day(),
                });
                if midnight == span.end {
                    break;
                }
                cursor = midnight;
            }
            _ => {
                push(BlockedWindow {
                    date,
                    start_time: cursor.time(),
                    end_time: span.end.time(),
                });
                break;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 27).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        day().and_time(t(h, m))
    }

    fn booking(h: u32, m: u32, party: u32) -> ReservationInterval {
        ReservationInterval::from_booking(day(), t(h, m), TimeDelta::minutes(90), party)
    }

    fn window(start: NaiveTime, end: NaiveTime) -> BlockedWindow {
        BlockedWindow {
            date: day(),
            start_time: start,
            end_time: end,
        }
    }

    fn both(intervals: &[ReservationInterval], threshold: u32) -> Vec<Span> {
        let direct = saturated_spans_direct(intervals, threshold).unwrap();
        let running = saturated_spans_running(intervals, threshold).unwrap();
        assert_eq!(direct, running);
        direct
    }

    // ── scenarios ─────────────────────────────────────────

    #[test]
    fn two_overlapping_parties_block_the_overlap() {
        let intervals = [booking(18, 0, 20), booking(18, 30, 15)];
        assert_eq!(both(&intervals, 30), vec![Span::new(at(18, 30), at(19, 30))]);
        let windows = blocked_windows(&intervals, &SweepPolicy::default()).unwrap();
        assert_eq!(windows, vec![window(t(18, 30), t(19, 30))]);
    }

    #[test]
    fn single_large_party_blocks_its_whole_span() {
        let windows = blocked_windows(&[booking(12, 0, 35)], &SweepPolicy::default()).unwrap();
        assert_eq!(windows, vec![window(t(12, 0), t(13, 30))]);
    }

    #[test]
    fn single_small_party_blocks_nothing() {
        let windows = blocked_windows(&[booking(12, 0, 10)], &SweepPolicy::default()).unwrap();
        assert!(windows.is_empty());
    }

    #[test]
    fn no_reservations_no_windows() {
        assert!(both(&[], 30).is_empty());
        assert!(blocked_windows(&[], &SweepPolicy::default()).unwrap().is_empty());
    }

    #[test]
    fn identical_starts_sum_into_one_window() {
        let intervals = [booking(19, 0, 10), booking(19, 0, 10), booking(19, 0, 12)];
        let windows = blocked_windows(&intervals, &SweepPolicy::default()).unwrap();
        assert_eq!(windows, vec![window(t(19, 0), t(20, 30))]);
    }

    #[test]
    fn load_exactly_at_threshold_is_blocked() {
        let intervals = [booking(18, 0, 15), booking(18, 0, 15)];
        assert_eq!(both(&intervals, 30), vec![Span::new(at(18, 0), at(19, 30))]);
        assert!(both(&intervals, 31).is_empty());
    }

    // ── adjacency ─────────────────────────────────────────

    #[test]
    fn contiguous_gaps_stay_separate_by_default() {
        // 30 from 18:00-19:30, 30 more from 18:30-20:00, 30 from 19:00-20:30:
        // every gap between 18:00 and 20:30 is at or above 30.
        let intervals = [booking(18, 0, 30), booking(18, 30, 30), booking(19, 0, 30)];
        let windows = blocked_windows(&intervals, &SweepPolicy::default()).unwrap();
        assert_eq!(
            windows,
            vec![
                window(t(18, 0), t(18, 30)),
                window(t(18, 30), t(19, 0)),
                window(t(19, 0), t(19, 30)),
                window(t(19, 30), t(20, 0)),
                window(t(20, 0), t(20, 30)),
            ]
        );
    }

    #[test]
    fn merge_adjacent_collapses_contiguous_gaps() {
        let intervals = [booking(18, 0, 30), booking(18, 30, 30), booking(19, 0, 30)];
        let policy = SweepPolicy {
            merge_adjacent: true,
            ..SweepPolicy::default()
        };
        let windows = blocked_windows(&intervals, &policy).unwrap();
        assert_eq!(windows, vec![window(t(18, 0), t(20, 30))]);
    }

    #[test]
    fn merge_touching_keeps_gaps() {
        let spans = vec![
            Span::new(at(10, 0), at(11, 0)),
            Span::new(at(11, 0), at(12, 0)),
            Span::new(at(13, 0), at(14, 0)),
        ];
        assert_eq!(
            merge_touching(&spans),
            vec![Span::new(at(10, 0), at(12, 0)), Span::new(at(13, 0), at(14, 0))]
        );
    }

    // ── midnight ──────────────────────────────────────────

    #[test]
    fn late_booking_splits_at_midnight() {
        let windows = blocked_windows(&[booking(23, 0, 40)], &SweepPolicy::default()).unwrap();
        let next = day().succ_opt().unwrap();
        assert_eq!(
            windows,
            vec![
                window(t(23, 0), end_of_day()),
                BlockedWindow {
                    date: next,
                    start_time: t(0, 0),
                    end_time: t(0, 30),
                },
            ]
        );
        for w in &windows {
            assert!(w.start_time < w.end_time);
        }
    }

    #[test]
    fn span_ending_exactly_at_midnight_stays_on_one_date() {
        let span = Span::new(at(22, 30), day().succ_opt().unwrap().and_time(NaiveTime::MIN));
        assert_eq!(split_at_midnight(&span), vec![window(t(22, 30), end_of_day())]);
    }

    #[test]
    fn leap_second_booking_yields_only_forward_windows() {
        let leap = NaiveTime::from_hms_milli_opt(23, 59, 59, 1_500).unwrap();
        let big = ReservationInterval::from_booking(day(), leap, TimeDelta::minutes(90), 40);
        let windows = blocked_windows(&[big], &SweepPolicy::default()).unwrap();
        assert!(!windows.is_empty());
        for w in &windows {
            assert!(w.start_time < w.end_time, "inverted window {w:?}");
            let _ = w.span();
        }
    }

    // ── validation ────────────────────────────────────────

    #[test]
    fn rejects_inverted_interval() {
        let bad = ReservationInterval::new(at(19, 0), at(18, 0), 4);
        let err = saturated_spans_direct(&[booking(12, 0, 2), bad], 30).unwrap_err();
        assert_eq!(
            err,
            SweepError::Validation {
                index: 1,
                reason: "end must be after start"
            }
        );
        assert!(saturated_spans_running(&[bad], 30).is_err());
    }

    #[test]
    fn rejects_zero_party() {
        let err = blocked_windows(&[booking(12, 0, 0)], &SweepPolicy::default()).unwrap_err();
        assert!(matches!(err, SweepError::Validation { index: 0, .. }));
    }

    #[test]
    fn strategy_parses_from_config_strings() {
        assert_eq!("direct".parse::<SweepStrategy>(), Ok(SweepStrategy::Direct));
        assert_eq!("Running".parse::<SweepStrategy>(), Ok(SweepStrategy::RunningSum));
        assert!("fastest".parse::<SweepStrategy>().is_err());
    }

    // ── properties over random snapshots ─────────────────

    fn random_snapshot(rng: &mut StdRng) -> Vec<ReservationInterval> {
        let n = rng.gen_range(0..40);
        (0..n)
            .map(|_| {
                let h = rng.gen_range(11..22);
                let m = [0, 15, 30, 45][rng.gen_range(0..4)];
                booking(h, m, rng.gen_range(1..=12))
            })
            .collect()
    }

    fn load_over(intervals: &[ReservationInterval], span: &Span) -> u64 {
        intervals
            .iter()
            .filter(|iv| iv.covers(span))
            .map(|iv| u64::from(iv.party_size))
            .sum()
    }

    #[test]
    fn direct_and_running_agree() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let snapshot = random_snapshot(&mut rng);
            let threshold = rng.gen_range(1..60);
            both(&snapshot, threshold);
        }
    }

    #[test]
    fn emitted_spans_meet_threshold_and_never_overlap() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let snapshot = random_snapshot(&mut rng);
            let spans = both(&snapshot, 30);
            for s in &spans {
                assert!(load_over(&snapshot, s) >= 30);
            }
            for pair in spans.windows(2) {
                assert!(pair[0].end <= pair[1].start, "{pair:?}");
            }
        }
    }

    #[test]
    fn skipped_gaps_are_below_threshold() {
        let mut rng = StdRng::seed_from_u64(13);
        for _ in 0..100 {
            let snapshot = random_snapshot(&mut rng);
            let spans = both(&snapshot, 30);
            let mut points: Vec<_> = snapshot.iter().flat_map(|iv| [iv.start, iv.end]).collect();
            points.sort_unstable();
            points.dedup();
            for pair in points.windows(2) {
                let gap = Span::new(pair[0], pair[1]);
                if !spans.contains(&gap) {
                    assert!(load_over(&snapshot, &gap) < 30);
                }
            }
        }
    }

    #[test]
    fn adding_a_reservation_never_unblocks_time() {
        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..100 {
            let mut snapshot = random_snapshot(&mut rng);
            let before = merge_touching(&both(&snapshot, 30));
            snapshot.push(booking(rng.gen_range(11..22), 0, rng.gen_range(1..=12)));
            let after = merge_touching(&both(&snapshot, 30));
            for b in &before {
                assert!(
                    after.iter().any(|a| a.start <= b.start && b.end <= a.end),
                    "{b:?} lost after insert"
                );
            }
        }
    }

    #[test]
    fn sweep_is_deterministic_regardless_of_input_order() {
        let mut rng = StdRng::seed_from_u64(19);
        let snapshot = random_snapshot(&mut rng);
        let first = blocked_windows(&snapshot, &SweepPolicy::default()).unwrap();
        let mut reversed = snapshot.clone();
        reversed.reverse();
        assert_eq!(first, blocked_windows(&snapshot, &SweepPolicy::default()).unwrap());
        assert_eq!(first, blocked_windows(&reversed, &SweepPolicy::default()).unwrap());
    }
}
