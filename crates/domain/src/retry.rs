use std::time::Duration;

/// Builds a `reqwest::Client` with a fixed per-call timeout, for the one
/// long-lived HTTP client each sidecar keeps for outbound calls.
pub fn client_with_timeout(timeout_ms: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .build()
        .expect("reqwest client build")
}

/// Retries `f` with exponential backoff (base 200ms, doubling) up to
/// `max_retries` additional attempts after the first. Only retries when `f`
/// returns `Ok(None)`-shaped "retryable" signal is not modeled here; callers
/// decide retryability by returning `Err` only for non-retryable outcomes
/// and looping themselves for retryable ones — this helper covers the
/// common case of retrying any `Err`.
pub async fn with_backoff<T, E, Fut, F>(max_retries: u32, mut f: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                if attempt >= max_retries {
                    return Err(e);
                }
                let delay = Duration::from_millis(200 * 2u64.pow(attempt));
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result: Result<&str, &str> = with_backoff(3, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { if n < 2 { Err("not yet") } else { Ok("done") } }
        })
        .await;
        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn zero_retries_calls_exactly_once() {
        let calls = AtomicU32::new(0);
        let result: Result<(), &str> = with_backoff(0, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("always fails") }
        })
        .await;
        assert_eq!(result, Err("always fails"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
