//! Contacts and the fixed slots that hold them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

/// Number of quick-dial slots.
pub const SLOT_COUNT: usize = 4;

/// One of the fixed, positionally addressed contact slots (0..=3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Slot(u8);

impl Slot {
    /// Every slot in ascending order.
    pub const ALL: [Slot; SLOT_COUNT] = [Slot(0), Slot(1), Slot(2), Slot(3)];

    /// Returns `None` when `index` is outside 0..=3.
    pub fn new(index: i64) -> Option<Self> {
        if (0..SLOT_COUNT as i64).contains(&index) {
            Some(Self(index as u8))
        } else {
            None
        }
    }

    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

impl TryFrom<i64> for Slot {
    type Error = String;

    fn try_from(index: i64) -> Result<Self, Self::Error> {
        Self::new(index).ok_or_else(|| format!("slot index out of range: {index}"))
    }
}

impl From<Slot> for i64 {
    fn from(slot: Slot) -> Self {
        i64::from(slot.0)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Strip hyphens from a phone number as typed by the user.
pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(|c| *c != '-').collect()
}

/// A saved quick-dial contact. Immutable; edits replace the whole value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    id: Slot,
    name: String,
    phone_number: String,
}

impl Contact {
    /// Build a contact for `slot`. The phone number is normalized.
    pub fn new(slot: Slot, name: impl Into<String>, phone_number: &str) -> Self {
        Self {
            id: slot,
            name: name.into(),
            phone_number: normalize_phone(phone_number),
        }
    }

    /// Rebuild a contact from persisted fields, taken as-is.
    pub fn from_stored(id: Slot, name: String, phone_number: String) -> Self {
        Self {
            id,
            name,
            phone_number,
        }
    }

    /// The slot this contact occupies.
    pub fn id(&self) -> Slot {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }
}

/// Unvalidated form input for a contact.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContactDraft {
    pub name: String,
    pub phone_number: String,
}

impl ContactDraft {
    pub fn new(name: impl Into<String>, phone_number: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone_number: phone_number.into(),
        }
    }

    /// Check the draft and turn it into a contact for `slot`.
    ///
    /// Accepts digits and hyphens in the phone number; hyphens are dropped.
    pub fn validate(&self, slot: Slot) -> Result<Contact, ValidationError> {
        self.check()?;
        Ok(Contact::new(slot, self.name.clone(), self.phone_number.trim()))
    }

    /// Field checks only, independent of the target slot.
    pub fn check(&self) -> Result<(), ValidationError> {
        let name_blank = self.name.trim().is_empty();
        let phone_blank = self.phone_number.trim().is_empty();
        match (name_blank, phone_blank) {
            (true, true) => return Err(ValidationError::MissingFields),
            (true, false) => return Err(ValidationError::BlankName),
            (false, true) => return Err(ValidationError::BlankPhone),
            (false, false) => {}
        }

        let phone = self.phone_number.trim();
        if let Some(bad) = phone.chars().find(|c| !c.is_ascii_digit() && *c != '-') {
            return Err(ValidationError::InvalidPhoneCharacter(bad));
        }
        if normalize_phone(phone).is_empty() {
            return Err(ValidationError::BlankPhone);
        }
        Ok(())
    }
}

/// The four rows the presentation layer renders: a contact or an empty slot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SlotView {
    rows: [Option<Contact>; SLOT_COUNT],
}

impl SlotView {
    /// Place each contact at its own slot.
    pub fn from_contacts(contacts: &[Contact]) -> Self {
        let mut rows: [Option<Contact>; SLOT_COUNT] = Default::default();
        for contact in contacts {
            rows[contact.id().index()] = Some(contact.clone());
        }
        Self { rows }
    }

    pub fn get(&self, slot: Slot) -> Option<&Contact> {
        self.rows[slot.index()].as_ref()
    }

    /// Lowest empty slot, if any.
    pub fn first_free(&self) -> Option<Slot> {
        Slot::ALL.into_iter().find(|slot| self.rows[slot.index()].is_none())
    }

    pub fn occupied(&self) -> usize {
        self.rows.iter().filter(|row| row.is_some()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Slot, Option<&Contact>)> + '_ {
        Slot::ALL.into_iter().map(|slot| (slot, self.get(slot)))
    }
}
