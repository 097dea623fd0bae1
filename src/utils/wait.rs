//! 轮询等待
//!
//! 页面不提供事件通知，所有等待（元素出现、可点击、下拉框就绪、表单清空、页面就绪）
//! 都通过这里的有界轮询实现。超时是唯一的取消方式。

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};

/// 每隔 `interval` 调用一次 `probe`，直到它返回 `Some` 或超时
///
/// `probe` 至少调用一次，即使 `timeout` 为零。
pub async fn poll_until<T, F, Fut>(timeout: Duration, interval: Duration, mut probe: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = probe().await {
            return Some(value);
        }
        let now = Instant::now();
        if now >= deadline {
            return None;
        }
        sleep(interval.min(deadline - now)).await;
    }
}

/// 条件成立返回 true，超时返回 false
pub async fn wait_until<F, Fut>(timeout: Duration, interval: Duration, mut probe: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    poll_until(timeout, interval, || {
        let fut = probe();
        async move { fut.await.then_some(()) }
    })
    .await
    .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_returns_as_soon_as_condition_holds() {
        let calls = AtomicUsize::new(0);
        let ok = wait_until(Duration::from_secs(5), Duration::from_millis(5), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { n >= 2 }
        })
        .await;
        assert!(ok);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_times_out_and_probes_at_least_once() {
        let calls = AtomicUsize::new(0);
        let ok = wait_until(Duration::ZERO, Duration::from_millis(5), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { false }
        })
        .await;
        assert!(!ok);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_poll_until_yields_value() {
        let mut n = 0;
        let found = poll_until(Duration::from_secs(1), Duration::from_millis(1), || {
            n += 1;
            let current = n;
            async move { (current == 4).then_some(current * 10) }
        })
        .await;
        assert_eq!(found, Some(40));
    }

    #[test]
    fn test_wait_until_gives_up_after_timeout() {
        let started = std::time::Instant::now();
        let ok = tokio_test::block_on(wait_until(
            Duration::from_millis(30),
            Duration::from_millis(10),
            || async { false },
        ));
        assert!(!ok);
        assert!(started.elapsed() >= Duration::from_millis(30));
    }
}
