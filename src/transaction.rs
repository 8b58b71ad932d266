//! Request/acknowledgment correlation primitives.
//!
//! Three waiter flavours coordinate the caller context with the receiver
//! task: [`RequestTransaction`] pairs one request with one response,
//! [`ReportTransaction`] accumulates success REPORTs until they cover a
//! message, and [`SendTransaction`] counts acknowledgments for pipelined
//! failure-report chunks. Each is a small state machine behind a mutex
//! with a [`Notify`] wake-up, and each exposes a non-error `terminate()`
//! so session teardown unblocks every waiter without surfacing a failure.

use std::{
    sync::Mutex,
    time::Duration,
};

use tokio::{sync::Notify, time::timeout};

/// Waiter for a single request/response exchange.
#[derive(Debug, Default)]
pub struct RequestTransaction {
    state: Mutex<RequestState>,
    notify: Notify,
}

#[derive(Debug, Default)]
struct RequestState {
    response: Option<u16>,
    terminated: bool,
}

impl RequestTransaction {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Record the response and wake the waiter.
    pub fn notify_response(&self, status: u16) {
        if let Ok(mut state) = self.state.lock() {
            state.response = Some(status);
        }
        self.notify.notify_waiters();
    }

    /// Unblock the waiter without recording a response.
    pub fn terminate(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.terminated = true;
        }
        self.notify.notify_waiters();
    }

    /// Whether a response has been recorded.
    #[must_use]
    pub fn response_received(&self) -> bool {
        self.state.lock().map_or(false, |state| state.response.is_some())
    }

    /// Wait up to `limit` for the response status.
    ///
    /// Returns `None` on timeout or termination.
    pub async fn wait_response(&self, limit: Duration) -> Option<u16> {
        let deadline = tokio::time::Instant::now() + limit;
        loop {
            // Register for wake-ups before inspecting state so a
            // notification between the check and the await is not lost.
            let mut notified = std::pin::pin!(self.notify.notified());
            notified.as_mut().enable();
            {
                let state = self.state.lock().ok()?;
                if let Some(status) = state.response {
                    return Some(status);
                }
                if state.terminated {
                    return None;
                }
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return None;
            }
        }
    }
}

/// Waiter accumulating success REPORTs for an outbound message.
#[derive(Debug, Default)]
pub struct ReportTransaction {
    state: Mutex<ReportState>,
    notify: Notify,
}

#[derive(Debug, Default)]
struct ReportState {
    status: Option<u16>,
    /// Highest byte position a REPORT has covered so far.
    reported: u64,
    events: u64,
    terminated: bool,
}

impl ReportTransaction {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Record one REPORT and wake the waiter.
    pub fn notify_report(&self, status: u16, last_byte: u64) {
        if let Ok(mut state) = self.state.lock() {
            state.status = Some(status);
            state.reported = state.reported.max(last_byte);
            state.events += 1;
        }
        self.notify.notify_waiters();
    }

    /// Unblock the waiter without recording a report.
    pub fn terminate(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.terminated = true;
        }
        self.notify.notify_waiters();
    }

    /// Status carried by the most recent REPORT.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        self.state.lock().ok().and_then(|state| state.status)
    }

    /// Whether reports cover the whole message of `total` bytes.
    #[must_use]
    pub fn is_finished(&self, total: u64) -> bool {
        self.state
            .lock()
            .map_or(false, |state| total > 0 && state.reported >= total)
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.state.lock().map_or(true, |state| state.terminated)
    }

    /// Wait up to `limit` for the next REPORT.
    ///
    /// Returns `false` on timeout or termination.
    pub async fn wait_report(&self, limit: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + limit;
        let seen = match self.state.lock() {
            Ok(state) => state.events,
            Err(_) => return false,
        };
        loop {
            let mut notified = std::pin::pin!(self.notify.notified());
            notified.as_mut().enable();
            {
                let Ok(state) = self.state.lock() else {
                    return false;
                };
                if state.events > seen {
                    return true;
                }
                if state.terminated {
                    return false;
                }
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return false;
            }
        }
    }
}

/// Counting waiter for pipelined failure-report chunks.
///
/// The sender calls [`handle_request`](Self::handle_request) per chunk and
/// the receiver calls [`handle_response`](Self::handle_response) per
/// acknowledgment; [`wait_all_responses`](Self::wait_all_responses) blocks
/// until the counts meet or a wave goes unanswered.
#[derive(Debug, Default)]
pub struct SendTransaction {
    state: Mutex<SendState>,
    notify: Notify,
}

#[derive(Debug, Default)]
struct SendState {
    sent: u64,
    received: u64,
    terminated: bool,
}

impl SendTransaction {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Count one transmitted chunk.
    pub fn handle_request(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.sent += 1;
        }
    }

    /// Count one acknowledgment and wake the waiter.
    pub fn handle_response(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.received += 1;
        }
        self.notify.notify_waiters();
    }

    /// Unblock the waiter without counting a response.
    pub fn terminate(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.terminated = true;
        }
        self.notify.notify_waiters();
    }

    /// Number of acknowledged chunks so far.
    #[must_use]
    pub fn acked_chunks(&self) -> u64 {
        self.state.lock().map_or(0, |state| state.received)
    }

    #[must_use]
    pub fn is_all_responses_received(&self) -> bool {
        self.state
            .lock()
            .map_or(false, |state| state.received >= state.sent)
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.state.lock().map_or(true, |state| state.terminated)
    }

    /// Block until every transmitted chunk is acknowledged, a wave of
    /// `wave_timeout` passes with no new response, or the transaction is
    /// terminated. The timer restarts on every response so slow but
    /// steady peers are not penalised.
    pub async fn wait_all_responses(&self, wave_timeout: Duration) {
        loop {
            let mut notified = std::pin::pin!(self.notify.notified());
            notified.as_mut().enable();
            {
                let Ok(state) = self.state.lock() else {
                    return;
                };
                if state.received >= state.sent || state.terminated {
                    return;
                }
            }
            if timeout(wave_timeout, notified).await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn request_waiter_returns_notified_status() {
        let transaction = Arc::new(RequestTransaction::new());
        let waiter = Arc::clone(&transaction);
        let task =
            tokio::spawn(async move { waiter.wait_response(Duration::from_secs(5)).await });
        tokio::task::yield_now().await;
        transaction.notify_response(200);
        assert_eq!(task.await.unwrap(), Some(200));
        assert!(transaction.response_received());
    }

    #[tokio::test(start_paused = true)]
    async fn request_waiter_times_out() {
        let transaction = RequestTransaction::new();
        assert_eq!(transaction.wait_response(Duration::from_secs(1)).await, None);
    }

    #[tokio::test]
    async fn terminate_unblocks_request_waiter_without_response() {
        let transaction = Arc::new(RequestTransaction::new());
        let waiter = Arc::clone(&transaction);
        let task =
            tokio::spawn(async move { waiter.wait_response(Duration::from_secs(5)).await });
        tokio::task::yield_now().await;
        transaction.terminate();
        assert_eq!(task.await.unwrap(), None);
        assert!(!transaction.response_received());
    }

    #[tokio::test]
    async fn report_waiter_accumulates_highest_byte() {
        let transaction = ReportTransaction::new();
        transaction.notify_report(200, 1000);
        transaction.notify_report(200, 500);
        assert!(transaction.is_finished(1000));
        assert!(!transaction.is_finished(1001));
        assert_eq!(transaction.status_code(), Some(200));
    }

    #[tokio::test]
    async fn report_wait_sees_only_new_events() {
        let transaction = Arc::new(ReportTransaction::new());
        transaction.notify_report(200, 10);
        let waiter = Arc::clone(&transaction);
        let task = tokio::spawn(async move { waiter.wait_report(Duration::from_secs(5)).await });
        tokio::task::yield_now().await;
        transaction.notify_report(200, 20);
        assert!(task.await.unwrap());
    }

    #[tokio::test]
    async fn send_transaction_counts_to_completion() {
        let transaction = Arc::new(SendTransaction::new());
        transaction.handle_request();
        transaction.handle_request();
        transaction.handle_response();
        assert!(!transaction.is_all_responses_received());
        let waiter = Arc::clone(&transaction);
        let task =
            tokio::spawn(async move { waiter.wait_all_responses(Duration::from_secs(5)).await });
        tokio::task::yield_now().await;
        transaction.handle_response();
        task.await.unwrap();
        assert!(transaction.is_all_responses_received());
        assert_eq!(transaction.acked_chunks(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn send_transaction_wave_timeout_leaves_residual() {
        let transaction = SendTransaction::new();
        transaction.handle_request();
        transaction.wait_all_responses(Duration::from_secs(30)).await;
        assert!(!transaction.is_all_responses_received());
        assert!(!transaction.is_terminated());
    }
}
