//! Transient user-facing status messages.
//!
//! At most one notification is active at a time: issuing a new one replaces
//! whatever is showing. Notifications expire after a fixed delay measured
//! with the injected [`Clock`], and can be dismissed explicitly.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::clock::Clock;

pub const DEFAULT_DISMISS_AFTER: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

impl Level {
    pub fn label(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "sucesso",
            Self::Warning => "aviso",
            Self::Error => "erro",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub level: Level,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

pub struct Notifier {
    clock: Arc<dyn Clock>,
    dismiss_after: Duration,
    current: Option<Notification>,
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("dismiss_after", &self.dismiss_after)
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

impl Notifier {
    pub fn new(clock: Arc<dyn Clock>, dismiss_after: Duration) -> Self {
        Self {
            clock,
            dismiss_after,
            current: None,
        }
    }

    /// Show `message`, clearing any notification already on screen.
    pub fn notify(&mut self, message: impl Into<String>, level: Level) -> &Notification {
        let message = message.into();
        match level {
            Level::Error => tracing::error!(%message, "notification"),
            Level::Warning => tracing::warn!(%message, "notification"),
            Level::Info | Level::Success => {
                tracing::info!(%message, level = level.label(), "notification")
            }
        }

        let issued_at = self.clock.now();
        let expires_at = chrono::Duration::from_std(self.dismiss_after)
            .ok()
            .and_then(|delay| issued_at.checked_add_signed(delay))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.current.insert(Notification {
            message,
            level,
            issued_at,
            expires_at,
        })
    }

    pub fn info(&mut self, message: impl Into<String>) -> &Notification {
        self.notify(message, Level::Info)
    }

    pub fn success(&mut self, message: impl Into<String>) -> &Notification {
        self.notify(message, Level::Success)
    }

    pub fn warning(&mut self, message: impl Into<String>) -> &Notification {
        self.notify(message, Level::Warning)
    }

    pub fn error(&mut self, message: impl Into<String>) -> &Notification {
        self.notify(message, Level::Error)
    }

    /// The active notification, unless it has already expired.
    pub fn current(&self) -> Option<&Notification> {
        let now = self.clock.now();
        self.current.as_ref().filter(|n| n.expires_at > now)
    }

    /// Manual close action.
    pub fn dismiss(&mut self) -> Option<Notification> {
        self.current.take()
    }

    /// Drop an expired notification. Returns true when something was removed.
    pub fn tick(&mut self) -> bool {
        if self.current.is_some() && self.current().is_none() {
            self.current = None;
            return true;
        }
        false
    }
}
