/*
    InventoryService - node-side orchestration of the inventory exchange

    Responsibilities:
    `service.rs` exposes the store registry to the network and drives
    outbound catch-up rounds. Inbound: decodes frames, serves
    InventoryRequest from the registry and echoes the nonce back on the
    same connection. Outbound: fans one request out to a bounded set of
    open connections that have no request in flight, arms one timeout task
    per request, merges accepted responses back through the registry, and
    disposes handlers on timeout, disconnect or shutdown.

    Inputs:
    - NetEvent values from the transport
    - request/run_round calls from the local node

    Outputs:
    - NetCommand::Send frames
    - per-peer pending results
    - optional SyncEvent notifications (RTT, failures) for peer scoring
*/

use crate::config::SyncConfig;
use crate::core_inventory::errors::RequestError;
use crate::core_inventory::filter::DataFilter;
use crate::core_inventory::handler::InventoryHandler;
use crate::core_inventory::inventory::Inventory;
use crate::core_inventory::message::SyncMessage;
use crate::core_net::{ConnectionId, ConnectionRegistry, NetCommand, NetEvent};
use crate::core_storage::{StorageResult, StoreRegistry};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

/// Notifications emitted as requests complete, for peer-quality scoring
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A peer answered within the deadline
    RequestCompleted {
        connection: ConnectionId,
        data_type: String,
        rtt: Duration,
        accepted: usize,
        rejected: usize,
    },
    /// A request failed (timeout, disconnect, shutdown, send failure)
    RequestFailed {
        connection: ConnectionId,
        error: RequestError,
    },
}

/// Outcome of one outbound catch-up round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundStats {
    /// Peers the round was fanned out to
    pub queried: usize,
    /// Peers that answered within the deadline
    pub succeeded: usize,
    /// Peers that timed out, disconnected or failed to send
    pub failed: usize,
}

/// Per-node façade over the store registry and the connection seam
///
/// Clones share all state; hand clones to the transport pump and to
/// background tasks freely.
#[derive(Clone)]
pub struct InventoryService {
    config: SyncConfig,
    registry: StoreRegistry,
    connections: ConnectionRegistry,
    net_tx: mpsc::Sender<NetCommand>,
    handlers: Arc<Mutex<HashMap<ConnectionId, InventoryHandler>>>,
    events_tx: Option<mpsc::Sender<SyncEvent>>,
}

impl InventoryService {
    pub fn new(
        config: SyncConfig,
        registry: StoreRegistry,
        net_tx: mpsc::Sender<NetCommand>,
    ) -> Self {
        InventoryService {
            config,
            registry,
            connections: ConnectionRegistry::new(),
            net_tx,
            handlers: Arc::new(Mutex::new(HashMap::new())),
            events_tx: None,
        }
    }

    /// Builder: attach a notification channel
    pub fn with_events(mut self, events_tx: mpsc::Sender<SyncEvent>) -> Self {
        self.events_tx = Some(events_tx);
        self
    }

    pub fn registry(&self) -> &StoreRegistry {
        &self.registry
    }

    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    /// Feed one transport event into the service
    pub async fn handle_net_event(&self, event: NetEvent) {
        match event {
            NetEvent::Opened(connection) => {
                debug!(%connection, "connection opened");
                self.connections.open(connection);
            }
            NetEvent::Closed { connection, reason } => {
                debug!(%connection, %reason, "connection closed");
                self.connections.close(connection);
                self.dispose_handler(connection, RequestError::ConnectionClosed(reason))
                    .await;
            }
            NetEvent::Frame { connection, bytes } => match SyncMessage::decode(&bytes) {
                Ok(SyncMessage::InventoryRequest { nonce, filter }) => {
                    self.serve_request(connection, nonce, filter).await;
                }
                Ok(SyncMessage::InventoryResponse { nonce, inventory }) => {
                    self.handle_response(connection, nonce, inventory).await;
                }
                Err(err) => {
                    warn!(%connection, %err, "dropping undecodable frame");
                }
            },
        }
    }

    /// Answer a peer's filter from the registry, echoing the nonce
    ///
    /// Invalid filters are rejected locally; the peer gets no reply and
    /// the connection is not penalized.
    async fn serve_request(&self, connection: ConnectionId, nonce: i32, filter: DataFilter) {
        let inventory = match self.registry.get_inventory(&filter) {
            Ok(inventory) => inventory,
            Err(err) => {
                warn!(%connection, %err, "rejecting inventory request");
                return;
            }
        };

        debug!(
            %connection,
            nonce,
            entries = inventory.len(),
            num_dropped = inventory.num_dropped(),
            "serving inventory request"
        );

        let frame = match (SyncMessage::InventoryResponse { nonce, inventory }).encode() {
            Ok(frame) => frame,
            Err(err) => {
                warn!(%connection, %err, "failed to encode inventory response");
                return;
            }
        };
        if self
            .net_tx
            .send(NetCommand::Send { connection, frame })
            .await
            .is_err()
        {
            warn!(%connection, "transport channel closed, response dropped");
        }
    }

    /// Complete the in-flight handler for a matching response and merge
    /// the carried entries into local state
    async fn handle_response(&self, connection: ConnectionId, nonce: i32, inventory: Inventory) {
        let completed = {
            let mut handlers = self.handlers.lock().await;
            let completed = match handlers.get_mut(&connection) {
                None => {
                    debug!(%connection, nonce, "unsolicited inventory response, ignoring");
                    None
                }
                Some(handler) => handler
                    .on_response(nonce, inventory.clone())
                    .map(|rtt| (rtt, handler.data_type().to_string())),
            };
            if completed.is_some() {
                handlers.remove(&connection);
            }
            completed
        };

        if let Some((rtt, data_type)) = completed {
            let stats = self.registry.merge(&data_type, inventory);
            info!(
                %connection,
                data_type,
                rtt_ms = rtt.as_millis() as u64,
                accepted = stats.accepted,
                rejected = stats.rejected,
                "inventory request completed"
            );
            self.emit(SyncEvent::RequestCompleted {
                connection,
                data_type,
                rtt,
                accepted: stats.accepted,
                rejected: stats.rejected,
            });
        }
    }

    /// Fan one filter out to open connections with no request in flight
    ///
    /// At most `max_requests_per_round` peers are queried; peers already
    /// being queried are skipped. Returns one pending result per peer.
    pub async fn request(
        &self,
        filter: DataFilter,
    ) -> Vec<oneshot::Receiver<Result<Inventory, RequestError>>> {
        let mut receivers = Vec::new();

        for connection in self.connections.open_connections() {
            if receivers.len() >= self.config.max_requests_per_round() {
                break;
            }

            let (mut handler, rx) = InventoryHandler::new(connection, filter.data_type());
            let nonce = handler.nonce();

            {
                let mut handlers = self.handlers.lock().await;
                if handlers.contains_key(&connection) {
                    continue;
                }
                handler.mark_awaiting(self.spawn_timeout(connection, nonce));
                handlers.insert(connection, handler);
            }

            let frame = match (SyncMessage::InventoryRequest {
                nonce,
                filter: filter.clone(),
            })
            .encode()
            {
                Ok(frame) => frame,
                Err(err) => {
                    self.dispose_handler(connection, err).await;
                    receivers.push(rx);
                    continue;
                }
            };

            debug!(%connection, nonce, "sending inventory request");
            if self
                .net_tx
                .send(NetCommand::Send { connection, frame })
                .await
                .is_err()
            {
                self.dispose_handler(connection, RequestError::Send).await;
            }
            receivers.push(rx);
        }

        receivers
    }

    /// One full catch-up round for a data type: build the local filter,
    /// fan out, and wait for every peer to answer or fail. Responses are
    /// merged into the registry as they arrive.
    pub async fn run_round(&self, data_type: &str) -> StorageResult<RoundStats> {
        let filter = self
            .registry
            .build_filter(data_type, self.config.max_filter_entries())?;

        let receivers = self.request(filter).await;
        let mut stats = RoundStats {
            queried: receivers.len(),
            ..RoundStats::default()
        };

        for rx in receivers {
            match rx.await {
                Ok(Ok(_)) => stats.succeeded += 1,
                _ => stats.failed += 1,
            }
        }

        info!(
            data_type,
            queried = stats.queried,
            succeeded = stats.succeeded,
            failed = stats.failed,
            "catch-up round finished"
        );
        Ok(stats)
    }

    /// Dispose every in-flight handler; does not block on the transport
    pub async fn shutdown(&self) {
        let mut handlers = self.handlers.lock().await;
        info!(in_flight = handlers.len(), "shutting down inventory service");
        for (_, mut handler) in handlers.drain() {
            handler.dispose(RequestError::ServiceShutdown);
        }
    }

    /// Number of requests currently in flight
    pub async fn in_flight(&self) -> usize {
        self.handlers.lock().await.len()
    }

    fn spawn_timeout(&self, connection: ConnectionId, nonce: i32) -> AbortHandle {
        let service = self.clone();
        let timeout = self.config.request_timeout();
        let task = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            service.expire_handler(connection, nonce).await;
        });
        task.abort_handle()
    }

    /// Timeout path: dispose only if the slot still holds the same request
    /// (the slot may have been reused by a later round)
    async fn expire_handler(&self, connection: ConnectionId, nonce: i32) {
        let disposed = {
            let mut handlers = self.handlers.lock().await;
            match handlers.get_mut(&connection) {
                Some(handler) if handler.nonce() == nonce => {
                    handler.dispose(RequestError::Timeout);
                    handlers.remove(&connection);
                    true
                }
                _ => false,
            }
        };
        if disposed {
            debug!(%connection, "inventory request timed out");
            self.emit(SyncEvent::RequestFailed {
                connection,
                error: RequestError::Timeout,
            });
        }
    }

    async fn dispose_handler(&self, connection: ConnectionId, error: RequestError) {
        let disposed = {
            let mut handlers = self.handlers.lock().await;
            match handlers.remove(&connection) {
                Some(mut handler) => {
                    handler.dispose(error.clone());
                    true
                }
                None => false,
            }
        };
        if disposed {
            self.emit(SyncEvent::RequestFailed { connection, error });
        }
    }

    fn emit(&self, event: SyncEvent) {
        if let Some(tx) = &self.events_tx {
            // notifications are best-effort; a full channel drops them
            let _ = tx.try_send(event);
        }
    }
}
