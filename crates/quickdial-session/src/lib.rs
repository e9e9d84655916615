//! # quickdial-session
//!
//! [`SessionState`] turns the push-based [`quickdial_store::ContactStore`]
//! streams into cached values a synchronous render loop can read, and owns
//! the transient "contact pending confirmation" selection.

pub mod session;

pub use session::{PendingWrite, SessionState};
