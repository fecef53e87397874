use std::future::Future;
use std::time::Duration;

/// How often and how long to poll the host page for a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl PollPolicy {
    pub const fn new(max_attempts: u32, interval: Duration) -> Self {
        Self { max_attempts, interval }
    }

    /// Same attempt budget without sleeping between attempts
    pub const fn without_delay(self) -> Self {
        Self { max_attempts: self.max_attempts, interval: Duration::ZERO }
    }
}

/// Result of polling the host page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome<T> {
    /// The check produced a value on attempt number `attempts`
    Ready { value: T, attempts: u32 },
    /// The attempt budget ran out
    TimedOut { attempts: u32 },
}

impl<T> WaitOutcome<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, WaitOutcome::Ready { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            WaitOutcome::Ready { attempts, .. } | WaitOutcome::TimedOut { attempts } => *attempts,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            WaitOutcome::Ready { value, .. } => Some(value),
            WaitOutcome::TimedOut { .. } => None,
        }
    }
}

/// Poll `check` until it yields `Some`, sleeping `interval` after every miss.
///
/// The host page gives no completion signal, so readiness is only ever observed by polling.
pub async fn wait_until<T, F, Fut>(mut check: F, policy: PollPolicy) -> WaitOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Option<T>>,
{
    for attempt in 1..=policy.max_attempts {
        if let Some(value) = check(attempt).await {
            return WaitOutcome::Ready { value, attempts: attempt };
        }

        if attempt < policy.max_attempts && !policy.interval.is_zero() {
            tokio::time::sleep(policy.interval).await;
        }
    }

    WaitOutcome::TimedOut { attempts: policy.max_attempts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_ready_on_third_attempt() {
        let calls = AtomicU32::new(0);
        let outcome = wait_until(
            |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { (attempt == 3).then_some("ok") }
            },
            PollPolicy::new(5, Duration::ZERO),
        )
        .await;

        assert_eq!(outcome, WaitOutcome::Ready { value: "ok", attempts: 3 });
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_times_out_after_budget() {
        let outcome: WaitOutcome<()> = wait_until(|_| async { None }, PollPolicy::new(4, Duration::ZERO)).await;
        assert_eq!(outcome, WaitOutcome::TimedOut { attempts: 4 });
        assert!(!outcome.is_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleeps_between_attempts() {
        let start = tokio::time::Instant::now();
        let outcome: WaitOutcome<()> =
            wait_until(|_| async { None }, PollPolicy::new(3, Duration::from_millis(1000))).await;

        assert_eq!(outcome.attempts(), 3);
        assert!(start.elapsed() >= Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn test_zero_attempts_never_checks() {
        let outcome: WaitOutcome<u8> = wait_until(|_| async { Some(1) }, PollPolicy::new(0, Duration::ZERO)).await;
        assert_eq!(outcome, WaitOutcome::TimedOut { attempts: 0 });
    }
}
