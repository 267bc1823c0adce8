use std::time::Duration;

/// Stepped linear backoff: `(attempts / 10 + 1) * base`. The interval
/// grows by one base unit every ten attempts and never decreases.
pub fn interval_for_attempt(attempts: u32, base: Duration) -> Duration {
    base * (attempts / 10 + 1)
}
