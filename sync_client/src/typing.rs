use std::time::{Duration, Instant};

/// Shows a user as typing from their last edit until `timeout` passes
/// without another one.
#[derive(Debug, Clone)]
pub struct TypingIndicator {
    timeout: Duration,
    last_edit: Option<Instant>,
}

impl TypingIndicator {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            last_edit: None,
        }
    }

    pub fn touch(&mut self, now: Instant) { self.last_edit = Some(now); }

    pub fn is_typing(&self) -> bool { self.last_edit.is_some() }

    /// Clears the indicator once it timed out. Returns whether it changed, in
    /// which case the others have to be told.
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.last_edit {
            Some(last_edit) if now.saturating_duration_since(last_edit) >= self.timeout => {
                self.last_edit = None;
                true
            }
            _ => false,
        }
    }

    pub fn reset(&mut self) { self.last_edit = None; }
}
