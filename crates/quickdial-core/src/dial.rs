//! Confirmation flow around placing a call.
//!
//! The core never dials. It tells the caller either to place the call now
//! (with the normalized number) or to show a confirmation prompt first.

use crate::contact::Contact;

/// What the caller has to do after a contact is tapped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TapOutcome {
    /// Confirmation is off: dial this number right away.
    PlaceCall { number: String },
    /// Confirmation is on: the contact is now pending.
    AwaitingConfirmation { contact: Contact },
}

/// Confirmation state derived from the selected contact.
///
/// Idle → Pending on a tap while confirm-before-call is on.
/// Pending → Idle on confirm or dismiss.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ConfirmFlow {
    #[default]
    Idle,
    Pending(Contact),
}

impl ConfirmFlow {
    pub fn from_selected(selected: Option<Contact>) -> Self {
        match selected {
            Some(contact) => Self::Pending(contact),
            None => Self::Idle,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }
}

/// `tel:` URI for a platform call capability.
pub fn tel_uri(number: &str) -> String {
    format!("tel:{number}")
}
