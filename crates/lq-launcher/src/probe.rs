//! Backend readiness probe
//!
//! The only bounded-retry mechanism in the launcher: poll the health
//! endpoint at a fixed interval until it answers with a success status or
//! the deadline elapses. The loop is an explicit deadline-checked loop, is
//! cancellable between polls, and terminates within one interval of the
//! deadline in every case.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use lq_core::ReadinessState;

/// Polls the backend health contract until ready or out of time
pub struct ReadinessProbe {
    client: reqwest::Client,
    health_path: String,
    timeout: Duration,
    interval: Duration,
}

impl ReadinessProbe {
    /// Create a probe for the given health path and timing budget
    pub fn new(health_path: impl Into<String>, timeout: Duration, interval: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            health_path: health_path.into(),
            timeout,
            interval,
        }
    }

    /// Poll `{base_url}{health_path}` until it answers 2xx or the deadline
    /// elapses.
    ///
    /// Any 2xx response resolves `Ready` immediately; connection errors and
    /// non-success statuses schedule another attempt. Cancelling the token
    /// aborts the loop between polls and returns `Pending` - the probe
    /// never reached a verdict, and the caller is shutting down anyway.
    pub async fn wait_ready(&self, base_url: &str, cancel: &CancellationToken) -> ReadinessState {
        let url = format!("{}{}", base_url, self.health_path);
        let deadline = Instant::now() + self.timeout;
        let mut attempts: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                tracing::debug!("Readiness probe cancelled after {} attempts", attempts);
                return ReadinessState::Pending;
            }

            attempts += 1;
            let remaining = deadline.saturating_duration_since(Instant::now());

            // Cap the request itself so a black-holed connection cannot
            // outlive the deadline
            let request_timeout = remaining.max(self.interval);
            let request = self.client.get(&url).timeout(request_timeout).send();
            // The request can hold the whole remaining budget; a shutdown
            // arriving while it is in flight must still win immediately
            let outcome = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(
                        "Readiness probe cancelled mid-request after {} attempts",
                        attempts
                    );
                    return ReadinessState::Pending;
                }
                outcome = request => outcome,
            };
            match outcome {
                Ok(response) if response.status().is_success() => {
                    tracing::info!("Backend ready after {} attempt(s): {}", attempts, url);
                    return ReadinessState::Ready;
                }
                Ok(response) => {
                    tracing::debug!(
                        "Health check attempt {} returned {}",
                        attempts,
                        response.status()
                    );
                }
                Err(e) => {
                    tracing::debug!("Health check attempt {} failed: {}", attempts, e);
                }
            }

            if Instant::now() >= deadline {
                tracing::warn!(
                    "Backend not ready after {} attempts over {:?}",
                    attempts,
                    self.timeout
                );
                return ReadinessState::TimedOut;
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Readiness probe cancelled while waiting to retry");
                    return ReadinessState::Pending;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use axum::Router;
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Instant as StdInstant;

    async fn serve_health(status: axum::http::StatusCode) -> (String, CancellationToken) {
        let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .unwrap();
        let origin = format!("http://127.0.0.1:{}", listener.local_addr().unwrap().port());

        let app = Router::new().route("/health", get(move || async move { status }));
        let cancel = CancellationToken::new();
        let shutdown = cancel.clone().cancelled_owned();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
                .ok();
        });

        (origin, cancel)
    }

    fn probe(timeout_ms: u64, interval_ms: u64) -> ReadinessProbe {
        ReadinessProbe::new(
            "/health",
            Duration::from_millis(timeout_ms),
            Duration::from_millis(interval_ms),
        )
    }

    #[tokio::test]
    async fn test_ready_on_success_status() {
        let (origin, server) = serve_health(axum::http::StatusCode::OK).await;

        let state = probe(2000, 50)
            .wait_ready(&origin, &CancellationToken::new())
            .await;
        assert_eq!(state, ReadinessState::Ready);

        server.cancel();
    }

    #[tokio::test]
    async fn test_non_success_status_times_out() {
        let (origin, server) = serve_health(axum::http::StatusCode::SERVICE_UNAVAILABLE).await;

        let state = probe(300, 50)
            .wait_ready(&origin, &CancellationToken::new())
            .await;
        assert_eq!(state, ReadinessState::TimedOut);

        server.cancel();
    }

    #[tokio::test]
    async fn test_connection_refused_times_out_within_bound() {
        // Find a port with nothing listening on it
        let probe_port = {
            let listener = std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
            listener.local_addr().unwrap().port()
        };
        let origin = format!("http://127.0.0.1:{}", probe_port);

        let started = StdInstant::now();
        let state = probe(400, 100)
            .wait_ready(&origin, &CancellationToken::new())
            .await;
        let elapsed = started.elapsed();

        assert_eq!(state, ReadinessState::TimedOut);
        // Must terminate within timeout + one polling interval (plus
        // scheduling slack)
        assert!(elapsed < Duration::from_millis(400 + 100 + 500));
    }

    #[tokio::test]
    async fn test_becomes_ready_after_retries() {
        let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .unwrap();
        let origin = format!("http://127.0.0.1:{}", listener.local_addr().unwrap().port());

        // Fail the first two attempts, then answer 200
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let app = Router::new().route(
            "/health",
            get(move || {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        axum::http::StatusCode::SERVICE_UNAVAILABLE
                    } else {
                        axum::http::StatusCode::OK
                    }
                }
            }),
        );
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        let state = probe(2000, 50)
            .wait_ready(&origin, &CancellationToken::new())
            .await;
        assert_eq!(state, ReadinessState::Ready);
        assert!(hits.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_inflight_request() {
        // A server that accepts connections but never answers: the probe's
        // first request holds the full remaining budget, so cancellation
        // must preempt the in-flight request, not just the retry sleep
        let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .unwrap();
        let origin = format!("http://127.0.0.1:{}", listener.local_addr().unwrap().port());
        tokio::spawn(async move {
            let mut held = Vec::new();
            loop {
                if let Ok((stream, _)) = listener.accept().await {
                    held.push(stream);
                }
            }
        });

        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        let started = StdInstant::now();
        let state = probe(5000, 50).wait_ready(&origin, &cancel).await;

        // Cancelled, not timed out - and long before the 5s budget
        assert_eq!(state, ReadinessState::Pending);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_cancellation_stops_polling() {
        let (origin, server) = serve_health(axum::http::StatusCode::SERVICE_UNAVAILABLE).await;

        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        let started = StdInstant::now();
        let state = probe(10_000, 50).wait_ready(&origin, &cancel).await;

        assert_eq!(state, ReadinessState::Pending);
        // Cancelled long before the 10s budget
        assert!(started.elapsed() < Duration::from_secs(2));

        server.cancel();
    }
}
