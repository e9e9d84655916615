pub mod contacts;
pub mod database;
pub mod error;
pub mod keys;
pub mod preferences;
pub mod row_helpers;
pub mod schema;

pub use contacts::ContactStore;
pub use database::Database;
pub use error::StoreError;
pub use preferences::{PrefValue, PreferenceEdit, PreferenceStore, Preferences};
