//! Session-scoped view of the contact store.
//!
//! A forwarding task mirrors the store's streams into session-owned `watch`
//! channels, so readers always get the last known value without awaiting.
//! Until the store's first emission the cached values are an empty list and
//! `true`. Dropping the session stops the task and releases its store
//! subscriptions.

use std::sync::Arc;

use quickdial_core::{
    normalize_phone, Contact, ContactDraft, ConfirmFlow, Slot, SlotView, TapOutcome,
    ValidationError,
};
use quickdial_store::keys::CONFIRM_DEFAULT;
use quickdial_store::{ContactStore, StoreError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::{Stream, StreamExt};
use tracing::debug;

/// Handle to a write running in the background.
///
/// The UI may drop it; a top-level caller can await it to see the store's
/// error unchanged.
pub type PendingWrite = JoinHandle<Result<(), StoreError>>;

pub struct SessionState {
    store: Arc<ContactStore>,
    contacts: watch::Receiver<Vec<Contact>>,
    confirm: watch::Receiver<bool>,
    selected: watch::Sender<Option<Contact>>,
    forwarder: JoinHandle<()>,
}

impl SessionState {
    /// Attach to `store`. Must be called from within a tokio runtime.
    pub fn new(store: Arc<ContactStore>) -> Self {
        let (contacts_tx, contacts) = watch::channel(Vec::new());
        let (confirm_tx, confirm) = watch::channel(CONFIRM_DEFAULT);
        let (selected, _) = watch::channel(None);

        let forwarder = tokio::spawn(forward(
            store.observe_contacts(),
            store.observe_confirm_preference(),
            contacts_tx,
            confirm_tx,
        ));

        Self {
            store,
            contacts,
            confirm,
            selected,
            forwarder,
        }
    }

    pub fn store(&self) -> &Arc<ContactStore> {
        &self.store
    }

    // ── Observable values ───────────────────────────────────────────────

    pub fn contacts(&self) -> Vec<Contact> {
        self.contacts.borrow().clone()
    }

    pub fn confirm_before_call(&self) -> bool {
        *self.confirm.borrow()
    }

    pub fn selected_contact(&self) -> Option<Contact> {
        self.selected.borrow().clone()
    }

    pub fn confirm_flow(&self) -> ConfirmFlow {
        ConfirmFlow::from_selected(self.selected_contact())
    }

    /// All four rows, filled or empty.
    pub fn slot_view(&self) -> SlotView {
        SlotView::from_contacts(&self.contacts.borrow())
    }

    pub fn subscribe_contacts(&self) -> watch::Receiver<Vec<Contact>> {
        self.contacts.clone()
    }

    pub fn subscribe_confirm(&self) -> watch::Receiver<bool> {
        self.confirm.clone()
    }

    pub fn subscribe_selected(&self) -> watch::Receiver<Option<Contact>> {
        self.selected.subscribe()
    }

    // ── Persistent writes ───────────────────────────────────────────────

    pub fn set_confirm_preference(&self, value: bool) -> PendingWrite {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move { store.set_confirm_preference(value).await })
    }

    /// Validate the form input and save it to `index`.
    ///
    /// Blank fields are rejected here and nothing is written. The phone
    /// number is stored without hyphens. An index outside 0..=3 is a no-op.
    pub fn save_contact(
        &self,
        index: i64,
        name: &str,
        phone_number: &str,
    ) -> Result<PendingWrite, ValidationError> {
        let draft = ContactDraft::new(name, phone_number);
        draft.check()?;
        let Some(slot) = Slot::new(index) else {
            debug!(index, "slot out of range, ignoring save");
            return Ok(tokio::spawn(async { Ok(()) }));
        };
        let contact = draft.validate(slot)?;

        let store = Arc::clone(&self.store);
        Ok(tokio::spawn(async move {
            store.save_contact(index, contact).await
        }))
    }

    pub fn delete_contact(&self, index: i64) -> PendingWrite {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move { store.delete_contact(index).await })
    }

    // ── Confirmation flow ───────────────────────────────────────────────

    pub fn select(&self, contact: Contact) {
        let _ = self.selected.send_replace(Some(contact));
    }

    /// Dismiss the pending confirmation.
    pub fn clear_selection(&self) {
        let _ = self.selected.send_replace(None);
    }

    /// Handle a tap on `contact`.
    ///
    /// With confirm-before-call on, the contact becomes pending and the
    /// caller shows a prompt. Otherwise the caller dials straight away.
    pub fn tap(&self, contact: &Contact) -> TapOutcome {
        if self.confirm_before_call() {
            self.select(contact.clone());
            TapOutcome::AwaitingConfirmation {
                contact: contact.clone(),
            }
        } else {
            TapOutcome::PlaceCall {
                number: normalize_phone(contact.phone_number()),
            }
        }
    }

    /// Confirm the pending call: returns the number to dial and goes idle.
    pub fn confirm_call(&self) -> Option<String> {
        self.selected
            .send_replace(None)
            .map(|contact| normalize_phone(contact.phone_number()))
    }
}

impl Drop for SessionState {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

async fn forward<C, F>(
    contacts_in: C,
    confirm_in: F,
    contacts_out: watch::Sender<Vec<Contact>>,
    confirm_out: watch::Sender<bool>,
) where
    C: Stream<Item = Vec<Contact>>,
    F: Stream<Item = bool>,
{
    tokio::pin!(contacts_in);
    tokio::pin!(confirm_in);
    loop {
        tokio::select! {
            Some(list) = contacts_in.next() => {
                let _ = contacts_out.send_replace(list);
            }
            Some(flag) = confirm_in.next() => {
                let _ = confirm_out.send_replace(flag);
            }
            else => break,
        }
    }
    debug!("session forwarder stopped");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use quickdial_store::Database;

    use super::*;

    fn slot(i: i64) -> Slot {
        Slot::new(i).unwrap()
    }

    fn session() -> SessionState {
        SessionState::new(Arc::new(ContactStore::in_memory().unwrap()))
    }

    async fn wait_until<T>(rx: &mut watch::Receiver<T>, pred: impl FnMut(&T) -> bool) {
        tokio::time::timeout(Duration::from_secs(1), rx.wait_for(pred))
            .await
            .expect("value never arrived")
            .map(|_| ())
            .expect("channel closed");
    }

    async fn confirm_set_to(session: &SessionState, value: bool) {
        session.set_confirm_preference(value).await.unwrap().unwrap();
        wait_until(&mut session.subscribe_confirm(), |v| *v == value).await;
    }

    #[tokio::test]
    async fn mirrors_existing_store_contents() {
        let store = Arc::new(ContactStore::in_memory().unwrap());
        store
            .save_contact(1, Contact::new(slot(1), "Taro", "1"))
            .await
            .unwrap();
        store.set_confirm_preference(false).await.unwrap();

        let session = SessionState::new(store);
        wait_until(&mut session.subscribe_contacts(), |c| c.len() == 1).await;
        wait_until(&mut session.subscribe_confirm(), |v| !*v).await;
        assert_eq!(session.contacts()[0].name(), "Taro");
        assert_eq!(session.selected_contact(), None);
    }

    #[tokio::test]
    async fn save_normalizes_phone_and_updates_contacts() {
        let session = session();
        session
            .save_contact(0, "Taro", "090-1234-5678")
            .unwrap()
            .await
            .unwrap()
            .unwrap();

        wait_until(&mut session.subscribe_contacts(), |c| !c.is_empty()).await;
        let contacts = session.contacts();
        assert_eq!(contacts[0].name(), "Taro");
        assert_eq!(contacts[0].phone_number(), "09012345678");
        assert_eq!(
            session.store().snapshot().get_text("contact_phone_0"),
            Some("09012345678")
        );
    }

    #[tokio::test]
    async fn blank_fields_are_rejected_without_writing() {
        let session = session();
        assert_eq!(
            session.save_contact(0, "", "0901234").err(),
            Some(ValidationError::BlankName)
        );
        assert_eq!(
            session.save_contact(0, "Taro", "  ").err(),
            Some(ValidationError::BlankPhone)
        );
        assert_eq!(
            session.save_contact(0, "", "").err(),
            Some(ValidationError::MissingFields)
        );
        assert!(session.store().snapshot().is_empty());
    }

    #[tokio::test]
    async fn out_of_range_save_is_a_no_op() {
        let session = session();
        session
            .save_contact(4, "Taro", "1")
            .unwrap()
            .await
            .unwrap()
            .unwrap();
        session.delete_contact(-1).await.unwrap().unwrap();
        assert!(session.store().snapshot().is_empty());
    }

    #[tokio::test]
    async fn delete_clears_slot() {
        let session = session();
        session.save_contact(2, "Taro", "1").unwrap().await.unwrap().unwrap();
        session.save_contact(3, "Jiro", "2").unwrap().await.unwrap().unwrap();
        wait_until(&mut session.subscribe_contacts(), |c| c.len() == 2).await;

        session.delete_contact(2).await.unwrap().unwrap();
        wait_until(&mut session.subscribe_contacts(), |c| c.len() == 1).await;
        assert_eq!(session.contacts()[0].id(), slot(3));

        let view = session.slot_view();
        assert!(view.get(slot(2)).is_none());
        assert_eq!(view.first_free(), Some(slot(0)));
    }

    #[tokio::test]
    async fn tap_without_confirmation_calls_directly() {
        let session = session();
        confirm_set_to(&session, false).await;

        let contact = Contact::new(slot(0), "Taro", "090-1234-5678");
        assert_eq!(
            session.tap(&contact),
            TapOutcome::PlaceCall {
                number: "09012345678".into()
            }
        );
        assert_eq!(session.selected_contact(), None);
        assert_eq!(session.confirm_flow(), ConfirmFlow::Idle);

        let hyphenated = Contact::from_stored(slot(1), "Jiro".into(), "03-1111-2222".into());
        assert_eq!(
            session.tap(&hyphenated),
            TapOutcome::PlaceCall {
                number: "0311112222".into()
            }
        );
    }

    #[tokio::test]
    async fn tap_with_confirmation_waits_for_confirm() {
        let session = session();
        confirm_set_to(&session, true).await;

        let contact = Contact::new(slot(1), "Hanako", "03-1111-2222");
        assert_eq!(
            session.tap(&contact),
            TapOutcome::AwaitingConfirmation {
                contact: contact.clone()
            }
        );
        assert_eq!(session.selected_contact(), Some(contact.clone()));

        // Unrelated writes leave the pending selection alone.
        session.save_contact(3, "Jiro", "2").unwrap().await.unwrap().unwrap();
        assert_eq!(session.confirm_flow(), ConfirmFlow::Pending(contact));

        assert_eq!(session.confirm_call(), Some("0311112222".to_string()));
        assert_eq!(session.selected_contact(), None);
        assert_eq!(session.confirm_call(), None);
    }

    #[tokio::test]
    async fn dismiss_returns_to_idle() {
        let session = session();
        let contact = Contact::new(slot(0), "Taro", "1");
        session.select(contact);
        let mut selected = session.subscribe_selected();
        assert!(selected.borrow().is_some());

        session.clear_selection();
        wait_until(&mut selected, Option::is_none).await;
        assert_eq!(session.confirm_flow(), ConfirmFlow::Idle);
    }

    #[tokio::test]
    async fn store_failure_surfaces_through_pending_write() {
        let db = Database::in_memory().unwrap();
        let store = Arc::new(ContactStore::new(db.clone()).unwrap());
        db.with_conn(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER fail_all BEFORE INSERT ON preferences
                 BEGIN SELECT RAISE(ABORT, 'read-only'); END;",
            )?;
            Ok(())
        })
        .unwrap();

        let session = SessionState::new(store);
        let result = session.set_confirm_preference(false).await.unwrap();
        assert!(matches!(result, Err(StoreError::Database(_))));
        assert!(session.store().confirm_before_call());
    }

    #[tokio::test]
    async fn drop_releases_store_subscriptions() {
        let store = Arc::new(ContactStore::in_memory().unwrap());
        let session = SessionState::new(Arc::clone(&store));
        wait_until(&mut session.subscribe_confirm(), |v| *v).await;
        assert_eq!(store.subscriber_count(), 2);

        drop(session);
        for _ in 0..100 {
            if store.subscriber_count() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(store.subscriber_count(), 0);
    }
}
