//! # quickdial-core
//!
//! Domain types shared by the quick-dial store and session layers.
//!
//! A quick-dial book holds at most [`SLOT_COUNT`] contacts, each pinned to a
//! fixed [`Slot`]. A slot is either fully populated or empty. Phone numbers
//! are kept digits-only at rest; hyphens typed by the user are stripped by
//! [`normalize_phone`] before anything is persisted.

pub mod config;
pub mod contact;
pub mod dial;
pub mod errors;

pub use config::{load_config, load_config_from_path, QuickDialConfig};
pub use contact::{normalize_phone, Contact, ContactDraft, Slot, SlotView, SLOT_COUNT};
pub use dial::{tel_uri, ConfirmFlow, TapOutcome};
pub use errors::{ConfigError, ValidationError};
