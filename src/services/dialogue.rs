use std::sync::Arc;

use serde::{Deserialize, Serialize};
use teloxide::dispatching::dialogue::{Dialogue, ErasedStorage, InMemStorage, Storage};

use crate::services::bonus::BonusKind;

/// Per-chat conversation state. Exactly one flow can be active at a time;
/// `Idle` means menu dispatch or registration continuation (the registration
/// cursor itself lives in `users.registration_step`, not here).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum DialogueState {
    #[default]
    Idle,

    // Appointment flow
    ConfirmingAppointment,
    ChoosingEditField,
    Editing(EditTarget),

    // Admin decision flow
    AwaitingDecisionDate {
        request_id: i64,
    },
    AwaitingDecisionTime {
        request_id: i64,
        date: String,
    },
    AwaitingComment {
        request_id: i64,
    },

    // Bonus flow
    AwaitingBonusPhone {
        kind: BonusKind,
    },
    AwaitingBonusAmount {
        kind: BonusKind,
        target: i64,
        full_name: String,
    },

    // One-shots
    AddingPromotion,
    AwaitingTeethPhoto,
}

/// What the user is editing before submitting an appointment request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EditTarget {
    Single(ProfileField),
    All { current: ProfileField },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileField {
    Phone,
    Birthdate,
    Email,
    Gender,
    FullName,
}

impl ProfileField {
    pub fn column(&self) -> &'static str {
        match self {
            ProfileField::Phone => "phone",
            ProfileField::Birthdate => "birthdate",
            ProfileField::Email => "email",
            ProfileField::Gender => "gender",
            ProfileField::FullName => "full_name",
        }
    }

    /// Next field in the edit-all cycle: phone → birthdate → email → gender → full name.
    pub fn next_in_cycle(&self) -> Option<ProfileField> {
        match self {
            ProfileField::Phone => Some(ProfileField::Birthdate),
            ProfileField::Birthdate => Some(ProfileField::Email),
            ProfileField::Email => Some(ProfileField::Gender),
            ProfileField::Gender => Some(ProfileField::FullName),
            ProfileField::FullName => None,
        }
    }
}

pub type BotDialogue = Dialogue<DialogueState, ErasedStorage<DialogueState>>;

pub struct DialogueService;

impl DialogueService {
    /// Dialogue storage. Sessions are ephemeral and do not survive restarts,
    /// so in-memory storage is enough.
    pub fn storage() -> Arc<ErasedStorage<DialogueState>> {
        InMemStorage::<DialogueState>::new().erase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_all_cycle_order() {
        let mut field = ProfileField::Phone;
        let mut order = vec![field];
        while let Some(next) = field.next_in_cycle() {
            order.push(next);
            field = next;
        }
        assert_eq!(
            order,
            vec![
                ProfileField::Phone,
                ProfileField::Birthdate,
                ProfileField::Email,
                ProfileField::Gender,
                ProfileField::FullName,
            ]
        );
    }

    #[test]
    fn state_round_trips_through_serde() {
        let state = DialogueState::AwaitingDecisionTime {
            request_id: 7,
            date: "15.03.2025".to_string(),
        };
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(serde_json::from_str::<DialogueState>(&json).unwrap(), state);
    }
}
