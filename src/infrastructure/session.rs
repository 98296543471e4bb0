use std::sync::RwLock;

use secrecy::SecretString;
use tokio::sync::watch;

use crate::core::ports::SessionHandler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    /// An auth failure was reported; the host should log out
    Invalidated,
    Anonymous,
}

/// In-memory session: the bearer token plus a status observers can watch
#[derive(Debug)]
pub struct SessionStore {
    token: RwLock<Option<SecretString>>,
    status: watch::Sender<SessionStatus>,
}

impl SessionStore {
    pub fn new(token: Option<SecretString>) -> Self {
        let initial = if token.is_some() {
            SessionStatus::Active
        } else {
            SessionStatus::Anonymous
        };
        let (status, _) = watch::channel(initial);
        Self {
            token: RwLock::new(token),
            status,
        }
    }

    pub fn anonymous() -> Self {
        Self::new(None)
    }

    pub fn token(&self) -> Option<SecretString> {
        match self.token.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Log in with a fresh token
    pub fn set_token(&self, token: SecretString) {
        self.store(Some(token));
        self.status.send_replace(SessionStatus::Active);
    }

    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    fn store(&self, token: Option<SecretString>) {
        match self.token.write() {
            Ok(mut guard) => *guard = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::anonymous()
    }
}

impl SessionHandler for SessionStore {
    fn session_token(&self) -> Option<SecretString> {
        self.token()
    }

    fn on_session_invalid(&self) {
        if self.status() == SessionStatus::Invalidated {
            return;
        }
        log::warn!("Session invalidated, clearing token");
        self.store(None);
        self.status.send_replace(SessionStatus::Invalidated);
    }
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn test_new_session_status() {
        assert_eq!(SessionStore::anonymous().status(), SessionStatus::Anonymous);

        let store = SessionStore::new(Some(SecretString::from("abc")));
        assert_eq!(store.status(), SessionStatus::Active);
        assert_eq!(
            store.session_token().map(|t| t.expose_secret().to_string()),
            Some("abc".to_string())
        );
    }

    #[test]
    fn test_invalidation_clears_token_and_notifies() {
        let store = SessionStore::new(Some(SecretString::from("abc")));
        let mut rx = store.subscribe();

        store.on_session_invalid();

        assert!(store.token().is_none());
        assert!(rx.has_changed().unwrap_or(false));
        assert_eq!(*rx.borrow_and_update(), SessionStatus::Invalidated);
    }

    #[test]
    fn test_set_token_reactivates() {
        let store = SessionStore::new(Some(SecretString::from("old")));
        store.on_session_invalid();

        store.set_token(SecretString::from("new"));

        assert_eq!(store.status(), SessionStatus::Active);
        assert_eq!(
            store.token().map(|t| t.expose_secret().to_string()),
            Some("new".to_string())
        );
    }
}
