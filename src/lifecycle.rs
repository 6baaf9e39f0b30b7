// Host lifecycle signals

/// Notifications the host application delivers to the item manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The application is about to become inactive and may be suspended
    WillResignActive,
    /// The application returned to the foreground
    DidBecomeActive,
    /// The process is about to exit
    WillTerminate,
}

impl LifecycleEvent {
    /// Whether in-memory state must be flushed to disk on this event
    pub fn requires_save(self) -> bool {
        matches!(self, LifecycleEvent::WillResignActive | LifecycleEvent::WillTerminate)
    }
}

impl std::fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleEvent::WillResignActive => write!(f, "will-resign-active"),
            LifecycleEvent::DidBecomeActive => write!(f, "did-become-active"),
            LifecycleEvent::WillTerminate => write!(f, "will-terminate"),
        }
    }
}
