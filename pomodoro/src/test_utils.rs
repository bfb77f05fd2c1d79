//! Polling helpers for async daemon tests.
//!
//! Background tasks (ticker, activity monitor, shutdown) finish on their own
//! schedule. These helpers retry a check until it holds instead of sleeping
//! for a guessed duration.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Retry `f` every `interval` until it returns `Ok`, panicking after `timeout`.
///
/// `desc` names the awaited condition in the panic message, together with
/// the last error seen.
///
/// ```rust,ignore
/// let status = assert_eventually(
///     "timer to enter the short break",
///     Duration::from_secs(2),
///     Duration::from_millis(20),
///     || async {
///         let status = engine.snapshot().await;
///         if status.phase == Phase::ShortBreak {
///             Ok(status)
///         } else {
///             Err(format!("still in {}", status.phase))
///         }
///     },
/// )
/// .await;
/// ```
pub async fn assert_eventually<F, Fut, T, E>(
    desc: &str,
    timeout: Duration,
    interval: Duration,
    mut f: F,
) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let start = tokio::time::Instant::now();
    let mut attempt = 0;

    loop {
        attempt += 1;
        let last_error = match f().await {
            Ok(value) => return value,
            Err(e) => e.to_string(),
        };

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            panic!(
                "Timeout waiting for {}\n\
                 Duration: {:?}\n\
                 Attempts: {}\n\
                 Last error: {}",
                desc, elapsed, attempt, last_error
            );
        }

        tokio::time::sleep(interval).await;
    }
}

/// [`assert_eventually`] for a plain boolean condition
pub async fn assert_eventually_bool<F, Fut>(
    desc: &str,
    timeout: Duration,
    interval: Duration,
    mut f: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    assert_eventually(desc, timeout, interval, || {
        let check = f();
        async move {
            if check.await {
                Ok(())
            } else {
                Err("condition never became true")
            }
        }
    })
    .await
}
