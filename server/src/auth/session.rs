use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::{auth::csrf, models::RowId};

/// Contents of the session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub csrf_token: String,
    #[serde(default)]
    pub user_id: Option<RowId>,
}

impl SessionData {
    /// A fresh anonymous session with a new CSRF token.
    #[must_use]
    pub fn new() -> Self {
        Self {
            csrf_token: csrf::generate_token(),
            user_id: None,
        }
    }
}

impl Default for SessionData {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct SessionInner {
    data: SessionData,
    modified: bool,
}

/// # Request-scoped session handle
///
/// Created by the session middleware for every request and shared with the handler through
/// request extensions. Changes made by the handler are written back to the cookie once the
/// response is produced.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<Mutex<SessionInner>>,
}

impl Session {
    /// Wraps the data decoded from the request cookie, or starts a new session if there was
    /// none. A new session is marked modified so that its cookie gets issued.
    #[must_use]
    pub fn load(existing: Option<SessionData>) -> Self {
        let (data, modified) = match existing {
            Some(data) => (data, false),
            None => (SessionData::new(), true),
        };
        Self {
            inner: Arc::new(Mutex::new(SessionInner { data, modified })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn csrf_token(&self) -> String {
        self.lock().data.csrf_token.clone()
    }

    #[must_use]
    pub fn user_id(&self) -> Option<RowId> {
        self.lock().data.user_id
    }

    /// Binds the session to `user_id` and issues a new CSRF token, so a token obtained before
    /// login is useless afterwards.
    pub fn set_user(&self, user_id: RowId) {
        let mut inner = self.lock();
        inner.data.user_id = Some(user_id);
        inner.data.csrf_token = csrf::generate_token();
        inner.modified = true;
    }

    /// Removes the authenticated identity, returning the previous one. The CSRF token is kept.
    pub fn clear_user(&self) -> Option<RowId> {
        let mut inner = self.lock();
        let previous = inner.data.user_id.take();
        if previous.is_some() {
            inner.modified = true;
        }
        previous
    }

    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.lock().modified
    }

    #[must_use]
    pub fn data(&self) -> SessionData {
        self.lock().data.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::{Session, SessionData};

    #[test]
    fn test_new_session_is_modified() {
        let session = Session::load(None);
        assert!(session.is_modified());
        assert!(session.user_id().is_none());
        assert!(!session.csrf_token().is_empty());
    }

    #[test]
    fn test_existing_session_tracks_changes() {
        let data = SessionData {
            csrf_token: "token".to_string(),
            user_id: None,
        };
        let session = Session::load(Some(data));
        assert!(!session.is_modified());

        // clearing an anonymous session changes nothing
        assert_eq!(session.clear_user(), None);
        assert!(!session.is_modified());

        session.set_user(7);
        assert!(session.is_modified());
        assert_eq!(session.user_id(), Some(7));
        let rotated = session.csrf_token();
        assert_ne!(rotated, "token");

        // logout keeps the token issued at login
        assert_eq!(session.clone().clear_user(), Some(7));
        assert_eq!(session.user_id(), None);
        assert_eq!(session.csrf_token(), rotated);
    }

    #[test]
    fn test_cookie_payload_shape() {
        let data = SessionData {
            csrf_token: "abc".to_string(),
            user_id: Some(3),
        };
        assert_eq!(
            serde_json::to_string(&data).unwrap(),
            r#"{"csrfToken":"abc","userId":3}"#
        );
    }
}
