use crate::protocol::{ClientMessage, ErrorCode, ServerMessage};
use crate::server::{ConnectionHandle, SignalServer};
use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::sending::send_text_message;

/// Upper bound on draining queued frames once the read side is done.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

pub(super) async fn handle_socket(socket: WebSocket, server: Arc<SignalServer>, addr: SocketAddr) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Arc<ServerMessage>>(server.config().outbound_queue_capacity.max(1));
    let connection = ConnectionHandle::new(Uuid::new_v4(), tx);
    let connection_id = connection.id();

    server.metrics().increment_connections();
    tracing::info!(%connection_id, client_addr = %addr, "WebSocket connection established");

    // The queue closes once every handle clone is gone: the registry's copy
    // is released by `on_disconnect`, the reader's when its task ends.
    let mut send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if send_text_message(&mut sender, &message, connection_id)
                .await
                .is_err()
            {
                break;
            }
        }
        let _ = sender.close().await;
    });

    let server_clone = Arc::clone(&server);
    let mut receive_task = tokio::spawn(async move {
        let max_size = server_clone.config().max_message_size;
        let registration_timeout = server_clone.config().registration_timeout;
        let registration_deadline = tokio::time::sleep(registration_timeout);
        tokio::pin!(registration_deadline);
        let mut registered = false;

        loop {
            let frame = if registered {
                receiver.next().await
            } else {
                tokio::select! {
                    frame = receiver.next() => frame,
                    () = &mut registration_deadline => {
                        tracing::warn!(
                            %connection_id,
                            timeout_secs = registration_timeout.as_secs(),
                            "Registration timeout, closing connection"
                        );
                        server_clone.metrics().increment_registration_timeouts();
                        server_clone.reject_frame(
                            &connection,
                            format!(
                                "Registration timeout - must register within {} seconds",
                                registration_timeout.as_secs()
                            ),
                            ErrorCode::NotRegistered,
                        );
                        break;
                    }
                }
            };

            let Some(frame) = frame else {
                break;
            };
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::warn!(%connection_id, "WebSocket error: {}", e);
                    break;
                }
            };

            match frame {
                Message::Text(text) => {
                    if text.len() > max_size {
                        tracing::warn!(
                            %connection_id,
                            size = text.len(),
                            max = max_size,
                            "Message exceeds size limit"
                        );
                        server_clone.reject_frame(
                            &connection,
                            format!(
                                "Message too large ({} bytes, max {} bytes)",
                                text.len(),
                                max_size
                            ),
                            ErrorCode::MessageTooLarge,
                        );
                        continue;
                    }

                    let client_message = match serde_json::from_str::<ClientMessage>(text.as_str()) {
                        Ok(message) => message,
                        Err(err) => {
                            tracing::warn!(
                                %connection_id,
                                error = %err,
                                "Rejected client WebSocket frame"
                            );
                            server_clone.reject_frame(
                                &connection,
                                format!("Invalid message format: {err}"),
                                ErrorCode::InvalidInput,
                            );
                            continue;
                        }
                    };

                    server_clone.handle_client_message(&connection, client_message);
                    if !registered {
                        registered = server_clone.is_registered(connection_id);
                    }
                }
                Message::Binary(_) => {
                    tracing::warn!(%connection_id, "Received binary frame; only JSON text is accepted");
                    server_clone.reject_frame(
                        &connection,
                        "Binary frames are not supported".to_string(),
                        ErrorCode::InvalidInput,
                    );
                }
                Message::Close(_) => {
                    tracing::info!(%connection_id, "WebSocket connection closed");
                    break;
                }
                // Ping/Pong frames are answered by the transport.
                _ => {}
            }
        }
    });

    let send_finished = tokio::select! {
        _ = &mut send_task => {
            tracing::debug!(%connection_id, "Send task completed");
            receive_task.abort();
            true
        }
        _ = &mut receive_task => {
            tracing::debug!(%connection_id, "Receive task completed");
            false
        }
    };

    server.on_disconnect(connection_id);

    if !send_finished && tokio::time::timeout(FLUSH_TIMEOUT, &mut send_task).await.is_err() {
        tracing::debug!(%connection_id, "Outbound queue did not drain in time");
        send_task.abort();
    }

    server.metrics().decrement_active_connections();
    tracing::info!(%connection_id, client_addr = %addr, "WebSocket connection finished");
}
