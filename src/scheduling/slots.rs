//! Slot generation for one (date, service) pair.
//!
//! The generator is a pure function of its inputs: the day's configuration,
//! the service duration, and the windows already taken by blocks and live
//! appointments. Callers decide what "now" means (the slot route drops past
//! slots for today and refuses past dates outright).

use super::{overlaps, DayConfig, MinuteWindow};

/// A bookable slot. `start_min` is the tiled offer time; `end_min` is the
/// end of the occupied interval, i.e. start + service duration (not the
/// tiling granularity).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub start_min: i32,
    pub end_min: i32,
}

/// Generate the bookable slots for a day.
///
/// Fail-closed: an unconfigured date, a disabled day or a day with no
/// ranges all yield no slots. Candidates are tiled at `slot_size_min`
/// granularity inside each range (in stored order), must fit the full
/// service duration inside their range, and are dropped when their
/// occupied interval overlaps any block window or any busy window.
pub fn generate_slots(
    day: &DayConfig,
    duration_min: i32,
    blocks: &[MinuteWindow],
    busy: &[MinuteWindow],
) -> Vec<Slot> {
    let avail = match day {
        DayConfig::Unconfigured => return Vec::new(),
        DayConfig::Configured(a) => a,
    };
    if !avail.enabled || avail.slot_size_min <= 0 || duration_min <= 0 {
        return Vec::new();
    }

    let mut out = Vec::new();
    for range in &avail.ranges {
        let mut curr = range.start_min;
        while curr + duration_min <= range.end_min {
            let candidate = MinuteWindow::new(curr, curr + duration_min);
            let blocked = blocks.iter().any(|b| overlaps(candidate, *b))
                || busy.iter().any(|a| overlaps(candidate, *a));
            if !blocked {
                out.push(Slot {
                    start_min: candidate.start_min,
                    end_min: candidate.end_min,
                });
            }
            curr += avail.slot_size_min;
        }
    }

    // Ranges are stored non-overlapping, but nothing forces them to be
    // sorted; the booking UI expects chronological order.
    out.sort_by_key(|s| s.start_min);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduling::{format_hhmm, parse_hhmm, DayAvailability};

    fn window(start: &str, end: &str) -> MinuteWindow {
        MinuteWindow::new(parse_hhmm(start).unwrap(), parse_hhmm(end).unwrap())
    }

    fn day(slot_size_min: i32, ranges: &[(&str, &str)]) -> DayConfig {
        DayConfig::Configured(DayAvailability {
            enabled: true,
            slot_size_min,
            ranges: ranges.iter().map(|(s, e)| window(s, e)).collect(),
        })
    }

    fn starts(slots: &[Slot]) -> Vec<String> {
        slots.iter().map(|s| format_hhmm(s.start_min)).collect()
    }

    #[test]
    fn test_unconfigured_day_is_closed() {
        assert!(generate_slots(&DayConfig::Unconfigured, 45, &[], &[]).is_empty());
    }

    #[test]
    fn test_disabled_day_is_closed() {
        let d = DayConfig::Configured(DayAvailability {
            enabled: false,
            slot_size_min: 45,
            ranges: vec![window("10:00", "13:00")],
        });
        assert!(generate_slots(&d, 45, &[], &[]).is_empty());
    }

    #[test]
    fn test_zero_ranges_yield_nothing() {
        assert!(generate_slots(&day(45, &[]), 45, &[], &[]).is_empty());
    }

    #[test]
    fn test_exact_tiling() {
        // 10:00-13:00 tiles exactly into four 45-minute slots.
        let slots = generate_slots(&day(45, &[("10:00", "13:00")]), 45, &[], &[]);
        assert_eq!(starts(&slots), vec!["10:00", "10:45", "11:30", "12:15"]);
        assert_eq!(format_hhmm(slots[3].end_min), "13:00");
    }

    #[test]
    fn test_service_longer_than_slot_size() {
        // Candidates are still offered at 45-minute tiled starts, but each
        // must fit the full 60 minutes inside the range: 12:15 + 60 > 13:00.
        let slots = generate_slots(&day(45, &[("10:00", "13:00")]), 60, &[], &[]);
        assert_eq!(starts(&slots), vec!["10:00", "10:45", "11:30"]);
        assert_eq!(format_hhmm(slots[2].end_min), "12:30");
    }

    #[test]
    fn test_trailing_partial_slot_discarded() {
        // 10:00-11:10 at 30-minute tiling: 10:40 would run past the range.
        let slots = generate_slots(&day(30, &[("10:00", "11:10")]), 30, &[], &[]);
        assert_eq!(starts(&slots), vec!["10:00", "10:30"]);
    }

    #[test]
    fn test_full_day_block_closes_everything() {
        let block = window("00:00", "23:59");
        let slots = generate_slots(&day(45, &[("10:00", "13:00")]), 45, &[block], &[]);
        assert!(slots.is_empty());
    }

    #[test]
    fn test_partial_block_removes_covered_slots() {
        // A 11:00-12:00 block kills the 10:45 and 11:30 candidates.
        let block = window("11:00", "12:00");
        let slots = generate_slots(&day(45, &[("10:00", "13:00")]), 45, &[block], &[]);
        assert_eq!(starts(&slots), vec!["10:00", "12:15"]);
    }

    #[test]
    fn test_busy_appointment_excludes_overlaps() {
        let busy = window("10:45", "11:30");
        let slots = generate_slots(&day(45, &[("10:00", "13:00")]), 45, &[], &[busy]);
        assert_eq!(starts(&slots), vec!["10:00", "11:30", "12:15"]);
    }

    #[test]
    fn test_cancelled_holder_frees_the_slot() {
        // Callers only pass PENDING/CONFIRMED/FINISHED windows as busy, so a
        // cancelled appointment simply never shows up here.
        let all = generate_slots(&day(45, &[("10:00", "13:00")]), 45, &[], &[]);
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_two_ranges_in_chronological_order() {
        let slots = generate_slots(
            &day(45, &[("14:45", "16:15"), ("10:00", "11:30")]),
            45,
            &[],
            &[],
        );
        assert_eq!(starts(&slots), vec!["10:00", "10:45", "14:45", "15:30"]);
    }
}
