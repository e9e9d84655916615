//! Key scheme for contact slots and the confirm-before-call flag.
//!
//! Slot `i` is stored as three keys: `contact_name_i` (text),
//! `contact_phone_i` (text) and `contact_id_i` (int). The flag lives under
//! `show_dialog` (bool) and defaults to `true` when unset.

use quickdial_core::{normalize_phone, Contact, Slot};
use tracing::warn;

use crate::preferences::{PreferenceEdit, Preferences};

pub const SHOW_DIALOG: &str = "show_dialog";

/// Value of the confirm flag when it has never been written.
pub const CONFIRM_DEFAULT: bool = true;

pub fn name_key(slot: Slot) -> String {
    format!("contact_name_{slot}")
}

pub fn phone_key(slot: Slot) -> String {
    format!("contact_phone_{slot}")
}

pub fn id_key(slot: Slot) -> String {
    format!("contact_id_{slot}")
}

/// Stage all three keys of `slot`. The stored id is always the slot index
/// and the stored phone number never contains hyphens.
pub fn stage_contact(edit: &mut PreferenceEdit, slot: Slot, contact: &Contact) {
    edit.set(name_key(slot), contact.name())
        .set(phone_key(slot), normalize_phone(contact.phone_number()))
        .set(id_key(slot), i64::from(slot));
}

/// Stage removal of all three keys of `slot`.
pub fn stage_clear(edit: &mut PreferenceEdit, slot: Slot) {
    edit.remove(name_key(slot))
        .remove(phone_key(slot))
        .remove(id_key(slot));
}

/// Decode one slot. A slot missing any of its keys is absent.
pub fn contact_at(prefs: &Preferences, slot: Slot) -> Option<Contact> {
    let name = prefs.get_text(&name_key(slot));
    let phone = prefs.get_text(&phone_key(slot));
    let id = prefs.get_int(&id_key(slot));

    match (name, phone, id) {
        (Some(name), Some(phone), Some(id)) => {
            if i64::from(slot) != id {
                warn!(%slot, stored_id = id, "contact id does not match its slot, using slot");
            }
            Some(Contact::from_stored(slot, name.to_string(), phone.to_string()))
        }
        (None, None, None) => None,
        _ => {
            warn!(%slot, "skipping partially stored contact slot");
            None
        }
    }
}

/// Present contacts in ascending slot order.
pub fn contacts_from(prefs: &Preferences) -> Vec<Contact> {
    Slot::ALL
        .into_iter()
        .filter_map(|slot| contact_at(prefs, slot))
        .collect()
}

pub fn confirm_from(prefs: &Preferences) -> bool {
    prefs.get_bool(SHOW_DIALOG).unwrap_or(CONFIRM_DEFAULT)
}
