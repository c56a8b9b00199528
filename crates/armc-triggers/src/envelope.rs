//! Outcome of one poll, independent of how it is put on the wire.

/// Seconds the engine should wait before polling again when more matches are
/// already queued.
pub const POLL_AGAIN_SECS: u64 = 1;

#[derive(Debug, Clone, PartialEq)]
pub enum TriggerResponse<T> {
    /// A match: hand `body` to the engine and store `state`.
    Triggered {
        body: T,
        state: String,
        retry_after: Option<u64>,
    },
    /// Nothing to report yet.
    Wait { state: String },
}

impl<T> TriggerResponse<T> {
    pub fn triggered(body: T, state: impl Into<String>) -> Self {
        Self::Triggered {
            body,
            state: state.into(),
            retry_after: None,
        }
    }

    pub fn wait(state: impl Into<String>) -> Self {
        Self::Wait {
            state: state.into(),
        }
    }

    /// Ask the engine to come back after `secs` (triggered responses only).
    pub fn poll_again_in(self, secs: u64) -> Self {
        match self {
            Self::Triggered { body, state, .. } => Self::Triggered {
                body,
                state,
                retry_after: Some(secs),
            },
            wait => wait,
        }
    }

    pub fn state(&self) -> &str {
        match self {
            Self::Triggered { state, .. } | Self::Wait { state } => state,
        }
    }

    pub fn is_triggered(&self) -> bool {
        matches!(self, Self::Triggered { .. })
    }

    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::Triggered { retry_after, .. } => *retry_after,
            Self::Wait { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_again_only_applies_to_triggered() {
        let t = TriggerResponse::triggered(1, "s1").poll_again_in(POLL_AGAIN_SECS);
        assert_eq!(t.retry_after(), Some(1));
        assert_eq!(t.state(), "s1");
        let w: TriggerResponse<i32> = TriggerResponse::wait("s2").poll_again_in(5);
        assert_eq!(w.retry_after(), None);
        assert!(!w.is_triggered());
    }
}
