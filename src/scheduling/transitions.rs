//! Appointment status state machine.
//!
//! PENDING and CONFIRMED are live states; FINISHED, CANCELLED and NO_SHOW
//! are terminal. Attempts to move a terminal appointment are rejected, not
//! silently ignored.

use super::ScheduleError;
use crate::models::AppointmentStatus;

pub fn is_terminal(status: AppointmentStatus) -> bool {
    matches!(
        status,
        AppointmentStatus::Finished | AppointmentStatus::Cancelled | AppointmentStatus::NoShow
    )
}

/// Statuses whose time windows occupy the calendar. Cancelled and no-show
/// appointments release their slot.
pub fn occupies_slot(status: AppointmentStatus) -> bool {
    matches!(
        status,
        AppointmentStatus::Pending | AppointmentStatus::Confirmed | AppointmentStatus::Finished
    )
}

pub fn validate_transition(
    from: AppointmentStatus,
    to: AppointmentStatus,
) -> Result<(), ScheduleError> {
    if is_terminal(from) {
        return Err(ScheduleError::InvalidTransition { from, to });
    }
    match to {
        AppointmentStatus::Confirmed
        | AppointmentStatus::Finished
        | AppointmentStatus::Cancelled
        | AppointmentStatus::NoShow => Ok(()),
        // Nothing goes back to PENDING once created.
        AppointmentStatus::Pending => Err(ScheduleError::InvalidTransition { from, to }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppointmentStatus::*;

    #[test]
    fn test_live_states_can_move_forward() {
        for from in [Pending, Confirmed] {
            for to in [Confirmed, Finished, Cancelled, NoShow] {
                assert!(validate_transition(from, to).is_ok(), "{from:?} -> {to:?}");
            }
        }
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        for from in [Finished, Cancelled, NoShow] {
            for to in [Pending, Confirmed, Finished, Cancelled, NoShow] {
                assert!(validate_transition(from, to).is_err(), "{from:?} -> {to:?}");
            }
        }
    }

    #[test]
    fn test_cancelled_to_finished_is_rejected() {
        assert!(matches!(
            validate_transition(Cancelled, Finished),
            Err(ScheduleError::InvalidTransition { from: Cancelled, to: Finished })
        ));
    }

    #[test]
    fn test_nothing_returns_to_pending() {
        assert!(validate_transition(Confirmed, Pending).is_err());
    }

    #[test]
    fn test_occupancy_matches_live_and_finished() {
        assert!(occupies_slot(Pending));
        assert!(occupies_slot(Confirmed));
        assert!(occupies_slot(Finished));
        assert!(!occupies_slot(Cancelled));
        assert!(!occupies_slot(NoShow));
    }
}
