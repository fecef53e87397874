use crate::error::{AutofillError, Result};
use log::{info, warn};
use rand::Rng;
use std::future::Future;

/// Where in the credential list a rotation starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartOffset {
    /// Uniformly random, spreading load across keys over repeated invocations
    #[default]
    Random,
    /// Fixed index (wrapped into range)
    Fixed(usize),
}

/// One failed credential attempt
#[derive(Debug)]
pub struct AttemptFailure {
    /// Index of the credential in the caller's list
    pub index: usize,
    pub error: AutofillError,
}

/// Successful rotation: the value plus every failure seen before it
#[derive(Debug)]
pub struct Rotation<T> {
    pub value: T,
    /// Index of the credential that succeeded
    pub index: usize,
    pub failures: Vec<AttemptFailure>,
}

/// Tries one call per credential, sequentially, until one succeeds.
///
/// Every per-key failure is treated the same way, rate limits included: log it and move on.
/// Attempts never overlap and there is no delay between them.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyRotationClient {
    offset: StartOffset,
}

impl KeyRotationClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_offset(offset: StartOffset) -> Self {
        Self { offset }
    }

    fn start_index(&self, len: usize) -> usize {
        match self.offset {
            StartOffset::Random => rand::thread_rng().gen_range(0..len),
            StartOffset::Fixed(index) => index % len,
        }
    }

    /// Run `call` with each credential in rotated order until one succeeds
    pub async fn invoke<T, F, Fut>(&self, credentials: &[String], mut call: F) -> Result<Rotation<T>>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if credentials.is_empty() {
            return Err(AutofillError::NoCredentials);
        }

        let start = self.start_index(credentials.len());
        let mut failures: Vec<AttemptFailure> = Vec::new();

        for step in 0..credentials.len() {
            let index = (start + step) % credentials.len();
            let key = &credentials[index];

            info!("Attempting with key index {} ({})", index, mask_key(key));

            match call(key.clone()).await {
                Ok(value) => return Ok(Rotation { value, index, failures }),
                Err(error) => {
                    warn!("Key index {} failed: {}", index, error);
                    failures.push(AttemptFailure { index, error });
                }
            }
        }

        let last_error = failures.last().map(|f| f.error.to_string()).unwrap_or_else(|| "Unknown".to_string());
        Err(AutofillError::CredentialsExhausted { attempts: failures.len(), last_error })
    }
}

/// First four characters of a key followed by `***`
pub fn mask_key(key: &str) -> String {
    format!("{}***", key.chars().take(4).collect::<String>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn keys(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("key-{}", i)).collect()
    }

    #[tokio::test]
    async fn test_success_after_two_failures() {
        let seen = Mutex::new(Vec::new());
        let client = KeyRotationClient::with_offset(StartOffset::Fixed(0));

        let rotation = client
            .invoke(&keys(3), |key| {
                seen.lock().unwrap().push(key.clone());
                async move {
                    match key.as_str() {
                        "key-2" => Ok("content"),
                        "key-0" => Err(AutofillError::RateLimited),
                        _ => Err(AutofillError::Api { status: 500, body: "oops".into() }),
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(rotation.value, "content");
        assert_eq!(rotation.index, 2);
        assert_eq!(rotation.failures.len(), 2);
        assert_eq!(*seen.lock().unwrap(), vec!["key-0", "key-1", "key-2"]);
    }

    #[tokio::test]
    async fn test_rotation_wraps_from_offset() {
        let seen = Mutex::new(Vec::new());
        let client = KeyRotationClient::with_offset(StartOffset::Fixed(4));

        let result: Result<Rotation<()>> = client
            .invoke(&keys(3), |key| {
                seen.lock().unwrap().push(key);
                async { Err(AutofillError::Network("down".into())) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(*seen.lock().unwrap(), vec!["key-1", "key-2", "key-0"]);
    }

    #[tokio::test]
    async fn test_all_fail_reports_attempt_count() {
        let client = KeyRotationClient::new();
        let err = client
            .invoke(&keys(4), |_| async { Err::<(), _>(AutofillError::RateLimited) })
            .await
            .unwrap_err();

        match err {
            AutofillError::CredentialsExhausted { attempts, ref last_error } => {
                assert_eq!(attempts, 4);
                assert!(last_error.contains("429"));
            }
            ref other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().starts_with("All 4 keys failed"));
    }

    #[tokio::test]
    async fn test_empty_credentials_fail_fast() {
        let err = KeyRotationClient::new().invoke(&[], |_| async { Ok(()) }).await.unwrap_err();
        assert!(matches!(err, AutofillError::NoCredentials));
    }

    #[tokio::test]
    async fn test_random_offset_stops_on_first_success() {
        let calls = Mutex::new(0);
        let rotation = KeyRotationClient::new()
            .invoke(&keys(5), |_| {
                *calls.lock().unwrap() += 1;
                async { Ok(7) }
            })
            .await
            .unwrap();

        assert_eq!(rotation.value, 7);
        assert!(rotation.failures.is_empty());
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key("AIzaSyExample"), "AIza***");
        assert_eq!(mask_key("ab"), "ab***");
    }
}
