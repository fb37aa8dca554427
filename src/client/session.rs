//! Session state and session events
//!
//! The [`Session`] holds the current token pair in memory and publishes every
//! change on a `tokio::sync::broadcast` channel. Views subscribe to it instead
//! of polling; a [`SessionEvent::LoggedOut`] with
//! [`LogoutReason::SessionExpired`] is the signal to send the user to the
//! login screen.
//!
//! ```text
//! ApiClient ──login/refresh/clear──▶ Session ──broadcast──▶ header badge
//!                                                      ──▶ login redirect
//! ```

use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use tokio::sync::broadcast;

/// Access and refresh tokens issued by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Why the session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoutReason {
    /// The user logged out
    UserRequested,
    /// The refresh token was rejected
    SessionExpired,
}

/// Session lifecycle notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    LoggedIn,
    TokenRefreshed,
    LoggedOut { reason: LogoutReason },
}

/// In-memory session shared by every request of one application root
pub struct Session {
    tokens: RwLock<Option<TokenPair>>,
    events: broadcast::Sender<SessionEvent>,
}

impl Session {
    /// Create an anonymous session
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            tokens: RwLock::new(None),
            events,
        }
    }

    /// Create a session from previously stored tokens
    pub fn with_tokens(tokens: TokenPair) -> Self {
        let session = Self::new();
        session.write(Some(tokens));
        session
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().map(|t| t.access)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read().map(|t| t.refresh)
    }

    pub fn tokens(&self) -> Option<TokenPair> {
        self.read()
    }

    pub(crate) fn login(&self, tokens: TokenPair) {
        self.write(Some(tokens));
        tracing::info!("Session established");
        self.publish(SessionEvent::LoggedIn);
    }

    pub(crate) fn refreshed(&self, tokens: TokenPair) {
        self.write(Some(tokens));
        tracing::debug!("Access token refreshed");
        self.publish(SessionEvent::TokenRefreshed);
    }

    /// Drop credentials and notify subscribers
    pub fn clear(&self, reason: LogoutReason) {
        let had_tokens = self.read().is_some();
        self.write(None);
        if had_tokens {
            tracing::info!(?reason, "Session cleared");
            self.publish(SessionEvent::LoggedOut { reason });
        }
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn read(&self) -> Option<TokenPair> {
        match self.tokens.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn write(&self, tokens: Option<TokenPair>) {
        match self.tokens.write() {
            Ok(mut guard) => *guard = tokens,
            Err(poisoned) => *poisoned.into_inner() = tokens,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(access: &str) -> TokenPair {
        TokenPair {
            access: access.to_string(),
            refresh: "r".to_string(),
        }
    }

    #[tokio::test]
    async fn test_events_are_published() {
        let session = Session::new();
        let mut rx = session.subscribe();

        session.login(pair("a1"));
        session.refreshed(pair("a2"));
        session.clear(LogoutReason::SessionExpired);

        assert_eq!(rx.recv().await.unwrap(), SessionEvent::LoggedIn);
        assert_eq!(rx.recv().await.unwrap(), SessionEvent::TokenRefreshed);
        assert_eq!(
            rx.recv().await.unwrap(),
            SessionEvent::LoggedOut {
                reason: LogoutReason::SessionExpired
            }
        );
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_clearing_anonymous_session_is_silent() {
        let session = Session::new();
        let mut rx = session.subscribe();
        session.clear(LogoutReason::UserRequested);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_value(SessionEvent::LoggedOut {
            reason: LogoutReason::SessionExpired,
        })
        .unwrap();
        assert_eq!(json["event"], "logged_out");
        assert_eq!(json["reason"], "session_expired");
    }
}
