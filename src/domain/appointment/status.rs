//! Appointment status state machine.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// Lifecycle status of an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    /// Slot reserved, waiting for the payment settlement.
    Pending,

    /// Payment settled; the slot is booked.
    Confirmed,

    /// Terminal. The slot has been released.
    Cancelled,

    /// Terminal. The slot's end time has passed.
    Completed,
}

impl AppointmentStatus {
    /// Pending and confirmed appointments hold their slot.
    pub fn is_active(&self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Confirmed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(AppointmentStatus::Pending),
            "confirmed" => Some(AppointmentStatus::Confirmed),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            "completed" => Some(AppointmentStatus::Completed),
            _ => None,
        }
    }

    pub const ALL: [AppointmentStatus; 4] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Cancelled,
        AppointmentStatus::Completed,
    ];
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StateMachine for AppointmentStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, target),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Completed)
                | (Confirmed, Cancelled)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use AppointmentStatus::*;
        match self {
            Pending => vec![Confirmed, Cancelled],
            Confirmed => vec![Completed, Cancelled],
            Cancelled | Completed => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn pending_can_transition_to_confirmed() {
        assert!(AppointmentStatus::Pending.can_transition_to(&AppointmentStatus::Confirmed));
    }

    #[test]
    fn pending_cannot_jump_to_completed() {
        assert!(!AppointmentStatus::Pending.can_transition_to(&AppointmentStatus::Completed));
    }

    #[test]
    fn confirmed_can_be_cancelled() {
        assert!(AppointmentStatus::Confirmed.can_transition_to(&AppointmentStatus::Cancelled));
    }

    #[test]
    fn cancelled_and_completed_are_terminal() {
        assert!(AppointmentStatus::Cancelled.is_terminal());
        assert!(AppointmentStatus::Completed.is_terminal());
        assert!(!AppointmentStatus::Pending.is_terminal());
    }

    #[test]
    fn only_pending_and_confirmed_are_active() {
        let active: Vec<_> = AppointmentStatus::ALL.iter().filter(|s| s.is_active()).collect();
        assert_eq!(active, vec![&AppointmentStatus::Pending, &AppointmentStatus::Confirmed]);
    }

    #[test]
    fn parse_roundtrips_as_str() {
        for status in AppointmentStatus::ALL {
            assert_eq!(AppointmentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(AppointmentStatus::parse("booked"), None);
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&AppointmentStatus::Confirmed).unwrap();
        assert_eq!(json, "\"confirmed\"");
    }

    fn any_status() -> impl Strategy<Value = AppointmentStatus> {
        prop::sample::select(AppointmentStatus::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn table_and_transition_list_agree(from in any_status(), to in any_status()) {
            prop_assert_eq!(
                from.can_transition_to(&to),
                from.valid_transitions().contains(&to)
            );
        }

        #[test]
        fn no_transition_leaves_a_terminal_state(from in any_status(), to in any_status()) {
            if from.is_terminal() {
                prop_assert!(from.transition_to(to).is_err());
            }
        }

        #[test]
        fn nothing_returns_to_pending(from in any_status()) {
            prop_assert!(!from.can_transition_to(&AppointmentStatus::Pending));
        }
    }
}
