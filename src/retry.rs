use std::time::Duration;

/// Delay before retry `attempt` (1-based): 500ms, 1s, 2s, ... capped at 32s.
pub fn backoff(attempt: u8) -> Duration {
    Duration::from_millis(500u64 << attempt.saturating_sub(1).min(6))
}
