//! The long-lived push channel to a backend stream endpoint.
//!
//! A [`StreamConnection`] owns two background tasks: a reader that parses
//! newline-delimited JSON frames into an ordered message channel, and a
//! writer that sends a liveness ping on a fixed interval. The pings let the
//! backend distinguish "client gone" from "client quiet", and give the
//! backend's own silence a bounded meaning on this side.
//!
//! The connection never retries on its own: reconnect and polling fallback
//! are separate, composable recovery strategies that belong to the owning
//! widget.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::message::{HeartbeatFrame, StreamMessage};
use crate::tenant::TenantSelection;

/// Capacity of the inbound message channel.
const CHANNEL_CAPACITY: usize = 16;

/// One persistent duplex channel to a stream endpoint.
#[derive(Debug)]
pub struct StreamConnection {
    messages: mpsc::Receiver<StreamMessage>,
    shutdown: watch::Sender<bool>,
    description: String,
    last_error: Arc<Mutex<Option<String>>>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl StreamConnection {
    /// Connect to a TCP stream endpoint (host:port).
    ///
    /// `tenant` is watched by the heartbeat writer, so a tenant switch
    /// changes what future pings carry without reconnecting.
    pub async fn connect(
        addr: &str,
        heartbeat_interval: Duration,
        tenant: watch::Receiver<TenantSelection>,
    ) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| ClientError::Connect(format!("{}: {}", addr, e)))?;
        Ok(Self::spawn(stream, addr, heartbeat_interval, tenant))
    }

    /// Spawn the reader and heartbeat tasks over any duplex byte stream.
    ///
    /// Useful for tests and for bridging transports other than TCP.
    pub fn spawn<S>(
        io: S,
        description: &str,
        heartbeat_interval: Duration,
        tenant: watch::Receiver<TenantSelection>,
    ) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(io);
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let last_error = Arc::new(Mutex::new(None));

        let reader = tokio::spawn(read_loop(
            read_half,
            tx,
            shutdown_rx.clone(),
            last_error.clone(),
        ));
        let writer = tokio::spawn(heartbeat_loop(
            write_half,
            heartbeat_interval,
            tenant,
            shutdown_rx,
        ));

        Self {
            messages: rx,
            shutdown: shutdown_tx,
            description: format!("stream: {}", description),
            last_error,
            reader,
            writer,
        }
    }

    /// Receive the next inbound message, in receipt order.
    ///
    /// Returns `None` once the channel has closed and all buffered
    /// messages have been drained.
    pub async fn recv(&mut self) -> Option<StreamMessage> {
        self.messages.recv().await
    }

    /// Detach the inbound message receiver from the connection.
    ///
    /// An owning event loop can select on the receiver alongside its
    /// timers without borrowing the connection. After this call,
    /// [`recv`](Self::recv) on the connection itself always returns
    /// `None`.
    pub fn take_messages(&mut self) -> mpsc::Receiver<StreamMessage> {
        let (_detached_tx, detached) = mpsc::channel(1);
        std::mem::replace(&mut self.messages, detached)
    }

    /// Returns a human-readable description of the endpoint.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Get the last transport error, if any.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().unwrap().clone()
    }

    /// Close the channel and stop the heartbeat. Safe to call repeatedly.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Whether both background tasks have exited.
    pub fn is_closed(&self) -> bool {
        self.reader.is_finished() && self.writer.is_finished()
    }
}

async fn read_loop<R>(
    reader: R,
    tx: mpsc::Sender<StreamMessage>,
    mut shutdown: watch::Receiver<bool>,
    last_error: Arc<Mutex<Option<String>>>,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        tokio::select! {
            changed = shutdown.changed() => {
                // a dropped sender counts as shutdown
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            read = reader.read_line(&mut line) => match read {
                Ok(0) => {
                    // EOF
                    *last_error.lock().unwrap() = Some("connection closed".to_string());
                    break;
                }
                Ok(_) => {
                    let frame = line.trim();
                    if frame.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<StreamMessage>(frame) {
                        Ok(message) => {
                            if tx.send(message).await.is_err() {
                                // Receiver dropped
                                break;
                            }
                        }
                        Err(e) => {
                            // Malformed frames are dropped without touching
                            // connection state
                            warn!("dropping malformed stream message: {}", e);
                        }
                    }
                }
                Err(e) => {
                    *last_error.lock().unwrap() = Some(format!("read error: {}", e));
                    break;
                }
            }
        }
    }
}

async fn heartbeat_loop<W>(
    mut writer: W,
    interval: Duration,
    tenant: watch::Receiver<TenantSelection>,
    mut shutdown: watch::Receiver<bool>,
) where
    W: AsyncWrite + Unpin,
{
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let frame = HeartbeatFrame::new(&tenant.borrow());
                let Ok(mut payload) = serde_json::to_vec(&frame) else {
                    break;
                };
                payload.push(b'\n');
                if writer.write_all(&payload).await.is_err() {
                    debug!("heartbeat write failed; stopping pings");
                    break;
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant_watch(selection: TenantSelection) -> watch::Receiver<TenantSelection> {
        let (_tx, rx) = watch::channel(selection);
        rx
    }

    fn event_line(id: u32) -> String {
        format!(
            "{{\"type\":\"event\",\"payload\":{{\"id\":{}}},\"occurred_at\":\"2026-03-09T10:07:30Z\"}}\n",
            id
        )
    }

    #[tokio::test]
    async fn delivers_messages_in_receipt_order() {
        let (client_io, mut server_io) = tokio::io::duplex(1024);
        let mut conn = StreamConnection::spawn(
            client_io,
            "test",
            Duration::from_secs(60),
            tenant_watch(TenantSelection::All),
        );

        server_io
            .write_all(format!("{}{}", event_line(1), event_line(2)).as_bytes())
            .await
            .unwrap();

        let first = conn.recv().await.unwrap();
        let second = conn.recv().await.unwrap();
        assert_eq!(first.payload["id"], 1);
        assert_eq!(second.payload["id"], 2);
    }

    #[tokio::test]
    async fn malformed_frames_are_skipped() {
        let (client_io, mut server_io) = tokio::io::duplex(1024);
        let mut conn = StreamConnection::spawn(
            client_io,
            "test",
            Duration::from_secs(60),
            tenant_watch(TenantSelection::All),
        );

        server_io
            .write_all(format!("not valid json\n{}", event_line(7)).as_bytes())
            .await
            .unwrap();

        // the bad frame is dropped; the next good one still arrives
        let message = conn.recv().await.unwrap();
        assert_eq!(message.payload["id"], 7);
    }

    #[tokio::test]
    async fn heartbeats_carry_the_active_tenant() {
        let (client_io, server_io) = tokio::io::duplex(1024);
        let _conn = StreamConnection::spawn(
            client_io,
            "test",
            Duration::from_millis(20),
            tenant_watch(TenantSelection::Only("acme".into())),
        );

        let mut lines = BufReader::new(server_io).lines();
        let line = lines.next_line().await.unwrap().unwrap();
        let frame: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(frame["type"], "heartbeat");
        assert_eq!(frame["tenant"], "acme");
    }

    #[tokio::test]
    async fn eof_records_an_error_and_closes() {
        let (client_io, server_io) = tokio::io::duplex(1024);
        let mut conn = StreamConnection::spawn(
            client_io,
            "test",
            Duration::from_secs(60),
            tenant_watch(TenantSelection::All),
        );

        drop(server_io);
        assert!(conn.recv().await.is_none());
        assert_eq!(conn.last_error().as_deref(), Some("connection closed"));
    }

    #[tokio::test]
    async fn shutdown_is_idempotent_and_stops_tasks() {
        let (client_io, mut server_io) = tokio::io::duplex(1024);
        let conn = StreamConnection::spawn(
            client_io,
            "test",
            Duration::from_secs(60),
            tenant_watch(TenantSelection::All),
        );

        conn.shutdown();
        conn.shutdown();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(conn.is_closed());

        // writes after shutdown go nowhere but must not panic
        let _ = server_io.write_all(event_line(9).as_bytes()).await;
    }

    #[tokio::test]
    async fn description_names_the_endpoint() {
        let (client_io, _server_io) = tokio::io::duplex(64);
        let conn = StreamConnection::spawn(
            client_io,
            "dash.local:9090",
            Duration::from_secs(60),
            tenant_watch(TenantSelection::All),
        );
        assert_eq!(conn.description(), "stream: dash.local:9090");
    }
}
