/*
    InventoryHandler - single-shot request correlation for one connection

    Responsibilities:
    `handler.rs` tracks one in-flight inventory request: it owns the random
    nonce embedded in the outbound frame, the pending oneshot result handed
    to the caller, the abort handle of the timeout task, and the explicit
    state machine Created -> AwaitingResponse -> {Completed | TimedOut |
    ConnectionClosed}. Only a response echoing the matching nonce completes
    the result; a mismatched nonce is ignored. Disposal is idempotent.

    Inputs:
    - decoded InventoryResponse frames
    - timeout / disconnect / shutdown signals from the service

    Outputs:
    - one Result<Inventory, RequestError> per request
    - round-trip time on success
*/

use crate::core_inventory::errors::RequestError;
use crate::core_inventory::inventory::Inventory;
use crate::core_net::ConnectionId;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tracing::debug;

/// Lifecycle of one in-flight request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerState {
    /// Built, frame not yet on the wire
    Created,
    /// Frame sent, waiting for the echoed nonce
    AwaitingResponse,
    /// Matching response received, result delivered
    Completed,
    /// Deadline expired
    TimedOut,
    /// Connection went away first
    ConnectionClosed,
}

impl HandlerState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            HandlerState::Completed | HandlerState::TimedOut | HandlerState::ConnectionClosed
        )
    }
}

/// Correlation state for one outbound inventory request
#[derive(Debug)]
pub struct InventoryHandler {
    connection: ConnectionId,
    data_type: String,
    nonce: i32,
    started_at: Instant,
    state: HandlerState,
    result_tx: Option<oneshot::Sender<Result<Inventory, RequestError>>>,
    timeout_task: Option<AbortHandle>,
}

impl InventoryHandler {
    /// Build a handler with a fresh random nonce; returns the caller's
    /// pending result alongside
    pub fn new(
        connection: ConnectionId,
        data_type: impl Into<String>,
    ) -> (Self, oneshot::Receiver<Result<Inventory, RequestError>>) {
        use rand::Rng;
        let nonce: i32 = rand::rng().random();

        let (tx, rx) = oneshot::channel();
        let handler = InventoryHandler {
            connection,
            data_type: data_type.into(),
            nonce,
            started_at: Instant::now(),
            state: HandlerState::Created,
            result_tx: Some(tx),
            timeout_task: None,
        };
        (handler, rx)
    }

    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    pub fn data_type(&self) -> &str {
        &self.data_type
    }

    pub fn nonce(&self) -> i32 {
        self.nonce
    }

    pub fn state(&self) -> HandlerState {
        self.state
    }

    /// Mark the frame as sent and attach the armed timeout task
    pub fn mark_awaiting(&mut self, timeout_task: AbortHandle) {
        self.state = HandlerState::AwaitingResponse;
        self.started_at = Instant::now();
        self.timeout_task = Some(timeout_task);
    }

    /// Feed a response; returns the round-trip time when it completes the
    /// request, None when the nonce mismatches or the handler is already
    /// terminal (stale/duplicate responses are tolerated, not errors)
    pub fn on_response(&mut self, nonce: i32, inventory: Inventory) -> Option<Duration> {
        if self.state != HandlerState::AwaitingResponse {
            debug!(
                connection = %self.connection,
                state = ?self.state,
                "response arrived for non-awaiting handler, ignoring"
            );
            return None;
        }
        if nonce != self.nonce {
            debug!(
                connection = %self.connection,
                expected = self.nonce,
                got = nonce,
                "response nonce mismatch, ignoring"
            );
            return None;
        }

        let rtt = self.started_at.elapsed();
        self.state = HandlerState::Completed;
        self.abort_timeout();
        if let Some(tx) = self.result_tx.take() {
            let _ = tx.send(Ok(inventory));
        }
        Some(rtt)
    }

    /// Cancel the pending result with an error; idempotent
    pub fn dispose(&mut self, error: RequestError) {
        if self.state.is_terminal() {
            return;
        }
        self.state = match &error {
            RequestError::Timeout => HandlerState::TimedOut,
            RequestError::ConnectionClosed(_) => HandlerState::ConnectionClosed,
            _ => HandlerState::ConnectionClosed,
        };
        self.abort_timeout();
        if let Some(tx) = self.result_tx.take() {
            let _ = tx.send(Err(error));
        }
    }

    fn abort_timeout(&mut self) {
        if let Some(task) = self.timeout_task.take() {
            task.abort();
        }
    }
}

impl Drop for InventoryHandler {
    fn drop(&mut self) {
        // a handler dropped mid-flight must not leave its timeout running
        self.abort_timeout();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_net::CloseReason;

    fn handler() -> (
        InventoryHandler,
        oneshot::Receiver<Result<Inventory, RequestError>>,
    ) {
        InventoryHandler::new(ConnectionId::new(1), "offer")
    }

    fn arm(handler: &mut InventoryHandler) {
        let task = tokio::spawn(async {});
        handler.mark_awaiting(task.abort_handle());
    }

    #[tokio::test]
    async fn test_matching_nonce_completes() {
        let (mut h, rx) = handler();
        arm(&mut h);

        let rtt = h.on_response(h.nonce(), Inventory::new(Vec::new(), 0));
        assert!(rtt.is_some());
        assert_eq!(h.state(), HandlerState::Completed);
        assert!(rx.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_mismatched_nonce_ignored() {
        let (mut h, mut rx) = handler();
        arm(&mut h);

        let wrong = h.nonce().wrapping_add(1);
        assert!(h.on_response(wrong, Inventory::new(Vec::new(), 0)).is_none());
        assert_eq!(h.state(), HandlerState::AwaitingResponse);
        assert!(rx.try_recv().is_err());

        // the real response still completes afterwards
        assert!(h.on_response(h.nonce(), Inventory::new(Vec::new(), 0)).is_some());
    }

    #[tokio::test]
    async fn test_response_before_send_ignored() {
        let (mut h, _rx) = handler();
        assert_eq!(h.state(), HandlerState::Created);
        assert!(h.on_response(h.nonce(), Inventory::new(Vec::new(), 0)).is_none());
    }

    #[tokio::test]
    async fn test_dispose_cancels_pending_result() {
        let (mut h, rx) = handler();
        arm(&mut h);

        h.dispose(RequestError::Timeout);
        assert_eq!(h.state(), HandlerState::TimedOut);
        assert_eq!(rx.await.unwrap(), Err(RequestError::Timeout));
    }

    #[tokio::test]
    async fn test_dispose_is_idempotent() {
        let (mut h, _rx) = handler();
        arm(&mut h);

        h.dispose(RequestError::ConnectionClosed(CloseReason::PeerDisconnected));
        let state = h.state();
        h.dispose(RequestError::Timeout);
        assert_eq!(h.state(), state);
    }

    #[tokio::test]
    async fn test_response_after_dispose_ignored() {
        let (mut h, _rx) = handler();
        arm(&mut h);
        h.dispose(RequestError::Timeout);
        assert!(h.on_response(h.nonce(), Inventory::new(Vec::new(), 0)).is_none());
    }
}
