//! Toast Notifications
//!
//! Transient user-facing messages. Errors from the board never propagate
//! to callers; they end up here.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Local};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Toast {
    pub message: String,
    pub severity: Severity,
    pub at: DateTime<Local>,
}

impl Toast {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Info,
            at: Local::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Error,
            at: Local::now(),
        }
    }
}

/// Surface that shows toasts to the user
pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);
}

/// Bounded toast queue; the oldest toast is dropped when full
pub struct ToastQueue {
    toasts: Mutex<VecDeque<Toast>>,
    capacity: usize,
}

impl ToastQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            toasts: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Take every queued toast, oldest first
    pub fn drain(&self) -> Vec<Toast> {
        self.toasts
            .lock()
            .map(|mut t| t.drain(..).collect())
            .unwrap_or_default()
    }

    /// Copy of the queued toasts without removing them
    pub fn snapshot(&self) -> Vec<Toast> {
        self.toasts
            .lock()
            .map(|t| t.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl Notifier for ToastQueue {
    fn notify(&self, toast: Toast) {
        match toast.severity {
            Severity::Info => log::info!("[toast] {}", toast.message),
            Severity::Error => log::error!("[toast] {}", toast.message),
        }
        if self.capacity == 0 {
            return;
        }
        if let Ok(mut toasts) = self.toasts.lock() {
            if toasts.len() == self.capacity {
                toasts.pop_front();
            }
            toasts.push_back(toast);
        }
    }
}
