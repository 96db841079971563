//! Pure scheduling engine: slot generation, occupancy checks and the
//! appointment status state machine. Nothing in here touches the database
//! or the wall clock; handlers load rows, convert them to minute windows
//! and apply policy (e.g. hiding past slots) on top.

pub mod slots;
pub mod transitions;

use crate::models::AppointmentStatus;

/// Half-open interval in minutes since midnight: `[start_min, end_min)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinuteWindow {
    pub start_min: i32,
    pub end_min: i32,
}

impl MinuteWindow {
    pub fn new(start_min: i32, end_min: i32) -> Self {
        MinuteWindow { start_min, end_min }
    }
}

/// Per-day slot configuration as the generator sees it.
#[derive(Debug, Clone)]
pub struct DayAvailability {
    pub enabled: bool,
    pub slot_size_min: i32,
    pub ranges: Vec<MinuteWindow>,
}

/// A date with no explicit record is closed. Keeping the two cases apart
/// stops callers confusing "explicitly disabled" with "never configured".
#[derive(Debug, Clone)]
pub enum DayConfig {
    Unconfigured,
    Configured(DayAvailability),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("time must be HH:MM, got {0:?}")]
    BadTime(String),
    #[error("range start {0} must be before end {1}")]
    EmptyRange(String, String),
    #[error("ranges {0} and {1} overlap")]
    OverlappingRanges(String, String),
    #[error("slot_size_min must be a positive integer, got {0}")]
    BadSlotSize(i32),
    #[error("cannot move appointment from {from:?} to {to:?}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },
}

/// Parse a wire time of day ("HH:MM") into minutes since midnight.
pub fn parse_hhmm(s: &str) -> Result<i32, ScheduleError> {
    let bad = || ScheduleError::BadTime(s.to_string());
    let (h, m) = s.split_once(':').ok_or_else(bad)?;
    let h: i32 = h.parse().map_err(|_| bad())?;
    let m: i32 = m.parse().map_err(|_| bad())?;
    if !(0..24).contains(&h) || !(0..60).contains(&m) {
        return Err(bad());
    }
    Ok(h * 60 + m)
}

pub fn format_hhmm(total_min: i32) -> String {
    format!("{:02}:{:02}", total_min / 60, total_min % 60)
}

/// Half-open interval overlap: (StartA < EndB) and (EndA > StartB).
pub fn overlaps(a: MinuteWindow, b: MinuteWindow) -> bool {
    a.start_min.max(b.start_min) < a.end_min.min(b.end_min)
}

/// Write-time validation for an availability day. Overlapping ranges are
/// rejected rather than merged so the caller sees the ambiguity.
pub fn validate_day(slot_size_min: i32, ranges: &[MinuteWindow]) -> Result<(), ScheduleError> {
    if slot_size_min <= 0 {
        return Err(ScheduleError::BadSlotSize(slot_size_min));
    }
    for r in ranges {
        if r.start_min >= r.end_min {
            return Err(ScheduleError::EmptyRange(
                format_hhmm(r.start_min),
                format_hhmm(r.end_min),
            ));
        }
    }
    for (i, a) in ranges.iter().enumerate() {
        for b in &ranges[i + 1..] {
            if overlaps(*a, *b) {
                return Err(ScheduleError::OverlappingRanges(
                    format!("{}-{}", format_hhmm(a.start_min), format_hhmm(a.end_min)),
                    format!("{}-{}", format_hhmm(b.start_min), format_hhmm(b.end_min)),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hhmm() {
        assert_eq!(parse_hhmm("10:00"), Ok(600));
        assert_eq!(parse_hhmm("00:05"), Ok(5));
        assert_eq!(parse_hhmm("23:59"), Ok(1439));
        assert!(parse_hhmm("24:00").is_err());
        assert!(parse_hhmm("10:60").is_err());
        assert!(parse_hhmm("1000").is_err());
        assert!(parse_hhmm("aa:bb").is_err());
    }

    #[test]
    fn test_format_hhmm_roundtrip() {
        assert_eq!(format_hhmm(600), "10:00");
        assert_eq!(format_hhmm(645), "10:45");
        assert_eq!(format_hhmm(5), "00:05");
    }

    #[test]
    fn test_overlaps_half_open() {
        // Touching intervals do not overlap.
        assert!(!overlaps(MinuteWindow::new(600, 645), MinuteWindow::new(645, 690)));
        assert!(overlaps(MinuteWindow::new(600, 646), MinuteWindow::new(645, 690)));
        assert!(overlaps(MinuteWindow::new(600, 700), MinuteWindow::new(630, 640)));
    }

    #[test]
    fn test_validate_day_rejects_bad_slot_size() {
        assert_eq!(validate_day(0, &[]), Err(ScheduleError::BadSlotSize(0)));
        assert_eq!(validate_day(-45, &[]), Err(ScheduleError::BadSlotSize(-45)));
    }

    #[test]
    fn test_validate_day_rejects_empty_and_overlapping_ranges() {
        assert!(validate_day(45, &[MinuteWindow::new(600, 600)]).is_err());
        assert!(validate_day(45, &[MinuteWindow::new(700, 600)]).is_err());
        let overlapping = [MinuteWindow::new(600, 780), MinuteWindow::new(720, 900)];
        assert!(matches!(
            validate_day(45, &overlapping),
            Err(ScheduleError::OverlappingRanges(_, _))
        ));
        // Back-to-back ranges are fine.
        let touching = [MinuteWindow::new(600, 780), MinuteWindow::new(780, 900)];
        assert!(validate_day(45, &touching).is_ok());
    }
}
