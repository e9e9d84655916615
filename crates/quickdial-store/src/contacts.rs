//! Async, observable store for the four contact slots and the confirm flag.
//!
//! The latest committed [`Preferences`] snapshot sits in a `watch` channel.
//! Every observer gets the current value on attach and then one value per
//! successful write. Writes run on the blocking pool, one at a time, and are
//! published only after the SQLite transaction commits. Commit and publish
//! happen in the same blocking task, so dropping a write future after it
//! started cannot leave a committed change unpublished.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use quickdial_core::{Contact, QuickDialConfig, Slot};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info, instrument};

use crate::database::Database;
use crate::error::StoreError;
use crate::keys;
use crate::preferences::{PreferenceEdit, PreferenceStore, Preferences};

pub struct ContactStore {
    prefs: PreferenceStore,
    state: Arc<watch::Sender<Preferences>>,
    write_lock: Arc<Mutex<()>>,
}

impl ContactStore {
    /// Wrap an open database, loading the current snapshot.
    pub fn new(db: Database) -> Result<Self, StoreError> {
        let prefs = PreferenceStore::new(db);
        let initial = prefs.load()?;
        info!(
            contacts = keys::contacts_from(&initial).len(),
            "contact store ready"
        );
        let (state, _) = watch::channel(initial);
        Ok(Self {
            prefs,
            state: Arc::new(state),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::new(Database::open(path)?)
    }

    pub fn open_with_config(config: &QuickDialConfig) -> Result<Self, StoreError> {
        Self::open(&config.database_path())
    }

    /// Store backed by an in-memory database (for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::new(Database::in_memory()?)
    }

    /// Present contacts in ascending slot order; empty slots are omitted.
    pub fn observe_contacts(&self) -> impl Stream<Item = Vec<Contact>> + Send + 'static {
        WatchStream::new(self.state.subscribe()).map(|prefs| keys::contacts_from(&prefs))
    }

    /// The confirm-before-call flag, `true` until first set.
    pub fn observe_confirm_preference(&self) -> impl Stream<Item = bool> + Send + 'static {
        WatchStream::new(self.state.subscribe()).map(|prefs| keys::confirm_from(&prefs))
    }

    /// Latest committed contacts.
    pub fn contacts(&self) -> Vec<Contact> {
        keys::contacts_from(&self.state.borrow())
    }

    /// Latest committed confirm flag.
    pub fn confirm_before_call(&self) -> bool {
        keys::confirm_from(&self.state.borrow())
    }

    /// Full latest snapshot, including keys this store does not interpret.
    pub fn snapshot(&self) -> Preferences {
        self.state.borrow().clone()
    }

    /// Number of live observers.
    pub fn subscriber_count(&self) -> usize {
        self.state.receiver_count()
    }

    #[instrument(skip(self))]
    pub async fn set_confirm_preference(&self, value: bool) -> Result<(), StoreError> {
        self.commit(move |edit| {
            edit.set(keys::SHOW_DIALOG, value);
        })
        .await
    }

    /// Write all three fields of `index` in one transaction.
    ///
    /// An index outside 0..=3 is ignored.
    #[instrument(skip(self, contact))]
    pub async fn save_contact(&self, index: i64, contact: Contact) -> Result<(), StoreError> {
        let Some(slot) = Slot::new(index) else {
            debug!(index, "slot out of range, ignoring save");
            return Ok(());
        };
        if contact.id() != slot {
            debug!(%slot, contact_id = %contact.id(), "re-keying contact to target slot");
        }
        self.commit(move |edit| keys::stage_contact(edit, slot, &contact))
            .await
    }

    /// Remove all three fields of `index` in one transaction.
    ///
    /// Clearing an empty slot succeeds; an index outside 0..=3 is ignored.
    #[instrument(skip(self))]
    pub async fn delete_contact(&self, index: i64) -> Result<(), StoreError> {
        let Some(slot) = Slot::new(index) else {
            debug!(index, "slot out of range, ignoring delete");
            return Ok(());
        };
        self.commit(move |edit| keys::stage_clear(edit, slot)).await
    }

    async fn commit<F>(&self, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut PreferenceEdit) + Send + 'static,
    {
        let prefs = self.prefs.clone();
        let state = Arc::clone(&self.state);
        let write_lock = Arc::clone(&self.write_lock);
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let _guard = write_lock.lock();
            let snapshot = prefs.edit(f)?;
            let _ = state.send_replace(snapshot);
            Ok(())
        })
        .await?
    }
}
