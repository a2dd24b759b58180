//! The session collection and the active-session pointer.
//!
//! Every public mutation writes the whole collection back to history before
//! returning, so whatever a caller can observe is already durable.

use tracing::{debug, info};

use crate::error::SessionError;
use crate::state::{Message, Session, SessionId};
use crate::store::{History, KeyValueStore};

pub struct SessionStore<S> {
    history: History<S>,
    sessions: Vec<Session>,
    active: Option<SessionId>,
}

impl<S: KeyValueStore> SessionStore<S> {
    /// Load the persisted collection; the first session becomes active.
    pub fn open(history: History<S>) -> Self {
        let sessions = history.load();
        let active = sessions.first().map(|s| s.id().clone());
        info!(sessions = sessions.len(), "session history loaded");
        Self {
            history,
            sessions,
            active,
        }
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn get(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id() == id)
    }

    /// The active id, only if it still resolves to a session.
    pub fn active_id(&self) -> Option<&SessionId> {
        self.active_session().map(|s| s.id())
    }

    pub fn active_session(&self) -> Option<&Session> {
        self.active.as_ref().and_then(|id| self.get(id))
    }

    /// Create a session at the front of the collection and make it active.
    pub fn create_session(&mut self) -> &Session {
        let mut id = SessionId::generate();
        while self.get(&id).is_some() {
            id = SessionId::generate();
        }
        info!(session = %id, "session created");

        self.sessions.insert(0, Session::new(id.clone()));
        self.active = Some(id);
        self.persist();
        &self.sessions[0]
    }

    pub fn select_session(&mut self, id: &SessionId) -> Result<&Session, SessionError> {
        let index = self
            .position(id)
            .ok_or_else(|| SessionError::NotFound(id.clone()))?;
        self.active = Some(id.clone());
        debug!(session = %id, "session selected");
        Ok(&self.sessions[index])
    }

    /// Remove a session. Returns `false` if no session had that id.
    ///
    /// Removing the active session activates the new first session, or
    /// leaves no session active when the collection is empty.
    pub fn delete_session(&mut self, id: &SessionId) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        self.sessions.remove(index);

        if self.active.as_ref() == Some(id) {
            self.active = self.sessions.first().map(|s| s.id().clone());
        }
        info!(session = %id, remaining = self.sessions.len(), "session deleted");
        self.persist();
        true
    }

    pub fn append_message(&mut self, id: &SessionId, message: Message) -> Result<(), SessionError> {
        let index = self
            .position(id)
            .ok_or_else(|| SessionError::NotFound(id.clone()))?;
        self.sessions[index].push(message);
        self.persist();
        Ok(())
    }

    /// The active session id, repairing a dangling pointer or creating a
    /// session when the collection is empty.
    pub fn ensure_active(&mut self) -> SessionId {
        if let Some(id) = self.active_id() {
            return id.clone();
        }
        if let Some(first) = self.sessions.first() {
            let id = first.id().clone();
            self.active = Some(id.clone());
            return id;
        }
        self.create_session().id().clone()
    }

    fn position(&self, id: &SessionId) -> Option<usize> {
        self.sessions.iter().position(|s| s.id() == id)
    }

    fn persist(&self) {
        self.history.save(&self.sessions);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Role, DEFAULT_TITLE};
    use crate::store::tests::FailingStore;
    use crate::store::MemoryStore;

    fn empty_store() -> SessionStore<MemoryStore> {
        SessionStore::open(History::new(MemoryStore::new()))
    }

    fn persisted(store: &SessionStore<MemoryStore>) -> Vec<Session> {
        store.history.load()
    }

    #[test]
    fn test_create_session_prepends_and_activates() {
        let mut store = empty_store();
        let first = store.create_session().id().clone();
        let second = store.create_session().id().clone();

        assert_ne!(first, second);
        let ids: Vec<_> = store.sessions().iter().map(|s| s.id().clone()).collect();
        assert_eq!(ids, vec![second.clone(), first]);
        assert_eq!(store.active_id(), Some(&second));
        assert_eq!(persisted(&store), store.sessions());
    }

    #[test]
    fn test_new_session_has_system_message_and_default_title() {
        let mut store = empty_store();
        let session = store.create_session();
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].role, Role::System);
        assert_eq!(session.title(), DEFAULT_TITLE);
    }

    #[test]
    fn test_append_order_matches_call_order() {
        let mut store = empty_store();
        let id = store.create_session().id().clone();
        let texts = ["one", "two", "three", "four"];
        for text in texts {
            store.append_message(&id, Message::user(text)).unwrap();
        }

        let session = store.get(&id).unwrap();
        let appended: Vec<_> = session.messages()[1..].iter().map(|m| m.text.as_str()).collect();
        assert_eq!(appended, texts);
        assert_eq!(session.title(), "one");
        assert_eq!(persisted(&store), store.sessions());
    }

    #[test]
    fn test_append_to_unknown_session_fails() {
        let mut store = empty_store();
        let err = store
            .append_message(&SessionId::from("chat_missing"), Message::user("hi"))
            .unwrap_err();
        assert!(matches!(err, SessionError::NotFound(_)));
    }

    #[test]
    fn test_select_session() {
        let mut store = empty_store();
        let first = store.create_session().id().clone();
        store.create_session();

        let selected = store.select_session(&first).unwrap();
        assert_eq!(selected.id(), &first);
        assert_eq!(store.active_id(), Some(&first));

        assert!(store.select_session(&SessionId::from("chat_missing")).is_err());
        assert_eq!(store.active_id(), Some(&first));
    }

    #[test]
    fn test_delete_active_selects_new_first() {
        let mut store = empty_store();
        let a = store.create_session().id().clone();
        let b = store.create_session().id().clone();
        let c = store.create_session().id().clone();
        // order is now [c, b, a]; make b active and delete it
        store.select_session(&b).unwrap();

        assert!(store.delete_session(&b));
        assert_eq!(store.active_id(), Some(&c));
        assert_eq!(store.sessions().len(), 2);
        assert!(store.get(&a).is_some());
        assert_eq!(persisted(&store), store.sessions());
    }

    #[test]
    fn test_delete_inactive_keeps_active() {
        let mut store = empty_store();
        let a = store.create_session().id().clone();
        let b = store.create_session().id().clone();

        assert!(store.delete_session(&a));
        assert_eq!(store.active_id(), Some(&b));
    }

    #[test]
    fn test_delete_last_then_lazily_create() {
        let mut store = empty_store();
        let only = store.create_session().id().clone();

        assert!(store.delete_session(&only));
        assert!(store.sessions().is_empty());
        assert_eq!(store.active_id(), None);

        let fresh = store.ensure_active();
        assert_ne!(fresh, only);
        assert_eq!(store.sessions().len(), 1);
        assert_eq!(store.active_id(), Some(&fresh));
    }

    #[test]
    fn test_delete_unknown_is_noop() {
        let mut store = empty_store();
        store.create_session();
        assert!(!store.delete_session(&SessionId::from("chat_missing")));
        assert_eq!(store.sessions().len(), 1);
    }

    #[test]
    fn test_open_activates_first_persisted_session() {
        let history = History::new(MemoryStore::new());
        let mut older = Session::new(SessionId::from("chat_1"));
        older.push(Message::user("older"));
        let newer = Session::new(SessionId::from("chat_2"));
        history.save(&[newer.clone(), older]);

        let store = SessionStore::open(history);
        assert_eq!(store.active_id(), Some(newer.id()));
        assert_eq!(store.sessions().len(), 2);
    }

    #[test]
    fn test_ensure_active_reuses_existing() {
        let mut store = empty_store();
        let id = store.create_session().id().clone();
        assert_eq!(store.ensure_active(), id);
        assert_eq!(store.sessions().len(), 1);
    }

    #[test]
    fn test_write_failures_do_not_break_the_store() {
        let mut store = SessionStore::open(History::new(FailingStore::default()));
        let id = store.create_session().id().clone();
        store.append_message(&id, Message::user("still works")).unwrap();
        assert_eq!(store.get(&id).unwrap().messages().len(), 2);
    }
}
