//! Session value type
//!
//! A `Session` is passed into every fetch and handed back, possibly with a
//! fresh token. It is never shared behind a lock; renewal builds a new value.

use std::fmt;

/// Default attempt budget for a single fetch
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Token plus attempt budget for one harvest run
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: Option<String>,
    max_attempts: u32,
}

impl Session {
    /// Create an unauthenticated session
    pub fn new(max_attempts: u32) -> Self {
        Self {
            token: None,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Return a copy of this session carrying `token`
    #[must_use]
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            max_attempts: self.max_attempts,
        }
    }

    /// Return a copy of this session with the token dropped
    #[must_use]
    pub fn without_token(&self) -> Self {
        Self {
            token: None,
            max_attempts: self.max_attempts,
        }
    }

    /// The current bearer token, if one has been obtained
    pub fn current_token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Attempt budget per fetch
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether a token is attached
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

// Keep tokens out of logs
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token.as_ref().map(|_| "****"))
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

#[cfg(test)]
mod type_tests {
    use super::*;

    #[test]
    fn test_session_starts_unauthenticated() {
        let session = Session::new(3);
        assert!(session.current_token().is_none());
        assert!(!session.is_authenticated());
        assert_eq!(session.max_attempts(), 3);
    }

    #[test]
    fn test_with_token_leaves_original_untouched() {
        let original = Session::new(5);
        let renewed = original.with_token("t1");

        assert_eq!(original.current_token(), None);
        assert_eq!(renewed.current_token(), Some("t1"));
        assert_eq!(renewed.max_attempts(), 5);
    }

    #[test]
    fn test_without_token() {
        let session = Session::new(2).with_token("stale").without_token();
        assert!(!session.is_authenticated());
        assert_eq!(session.max_attempts(), 2);
    }

    #[test]
    fn test_zero_attempts_clamped() {
        assert_eq!(Session::new(0).max_attempts(), 1);
    }

    #[test]
    fn test_debug_masks_token() {
        let session = Session::default().with_token("secret-token");
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("****"));
    }
}
