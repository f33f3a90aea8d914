//! Surface server: JSON-RPC 2.0 over WebSocket for out-of-process consumers.
//!
//! Methods:
//! - `get_snapshot { identity }` -> canonical snapshot
//! - `subscribe { identity }` -> registers this connection as the consumer
//!   for `identity`; events then arrive as `position` notifications
//! - `unsubscribe` -> drops this connection's registration
//!
//! A connection's registration is removed when the connection ends.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Semaphore, mpsc};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_util::sync::CancellationToken;

use zml_core::{ConsumerId, PositionEvent};
use zml_hub::{ChannelPushHandle, HubError, HubHandle, RegistrationToken};

use crate::rpc::{
    INTERNAL_ERROR, INVALID_PARAMS, IdentityParams, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, METHOD_NOT_FOUND, PARSE_ERROR, POSITION_METHOD,
};

/// Default maximum number of concurrent surface connections.
const DEFAULT_MAX_CONNECTIONS: usize = 64;

/// Per-connection queue of pending position pushes.
const PUSH_QUEUE_CAPACITY: usize = 256;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

// ─── Origin validation ────────────────────────────────────────────

/// Validate the `Origin` header on an incoming upgrade request.
///
/// Allowed: absent (native clients), `null`, `tauri://*`,
/// `http://localhost*` and `http://127.0.0.1*`. Others get HTTP 403.
fn validate_origin(req: &Request, resp: Response) -> Result<Response, ErrorResponse> {
    let Some(origin) = req.headers().get("origin") else {
        return Ok(resp);
    };
    let origin = origin.to_str().unwrap_or("");
    if origin == "null"
        || origin.starts_with("tauri://")
        || origin.starts_with("http://localhost")
        || origin.starts_with("http://127.0.0.1")
    {
        return Ok(resp);
    }
    tracing::warn!(origin = %origin, "surface: rejected connection from disallowed origin");
    let mut err = ErrorResponse::new(Some("Origin not allowed".into()));
    *err.status_mut() = http::StatusCode::FORBIDDEN;
    Err(err)
}

// ─── Server ───────────────────────────────────────────────────────

pub struct SurfaceServer {
    addr: SocketAddr,
    hub: HubHandle,
    cancel: CancellationToken,
    max_connections: usize,
}

impl SurfaceServer {
    pub fn new(addr: SocketAddr, hub: HubHandle, cancel: CancellationToken) -> Self {
        Self {
            addr,
            hub,
            cancel,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Bind the configured address and return the actual local address.
    pub async fn bind(&self) -> std::io::Result<(TcpListener, SocketAddr)> {
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(addr = %local_addr, max_connections = self.max_connections, "surface server bound");
        Ok((listener, local_addr))
    }

    /// Accept loop on a pre-bound listener, until cancellation.
    pub async fn serve(&self, listener: TcpListener) -> std::io::Result<()> {
        let semaphore = Arc::new(Semaphore::new(self.max_connections));

        loop {
            tokio::select! {
                result = listener.accept() => match result {
                    Ok((stream, peer)) => {
                        let Ok(permit) = semaphore.clone().try_acquire_owned() else {
                            tracing::warn!(
                                peer = %peer,
                                max = self.max_connections,
                                "surface: connection limit reached, rejecting"
                            );
                            drop(stream);
                            continue;
                        };
                        let hub = self.hub.clone();
                        let cancel = self.cancel.clone();
                        tokio::spawn(async move {
                            let _permit = permit;
                            match tokio_tungstenite::accept_hdr_async(stream, validate_origin).await {
                                Ok(ws) => {
                                    if let Err(e) = handle_connection(ws, hub, cancel).await {
                                        tracing::debug!(peer = %peer, error = %e, "surface: connection ended with error");
                                    }
                                }
                                Err(e) => {
                                    tracing::debug!(peer = %peer, error = %e, "surface: handshake failed");
                                }
                            }
                        });
                    }
                    Err(e) => tracing::error!(error = %e, "surface: TCP accept failed"),
                },
                _ = self.cancel.cancelled() => {
                    tracing::info!("surface server: cancellation requested, shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}

// ─── Per-connection handler ───────────────────────────────────────

/// The registration held by one connection.
struct Subscription {
    identity: ConsumerId,
    token: RegistrationToken,
    rx: mpsc::Receiver<PositionEvent>,
}

async fn handle_connection(
    ws: WebSocketStream<TcpStream>,
    hub: HubHandle,
    cancel: CancellationToken,
) -> Result<(), BoxError> {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let mut subscription: Option<Subscription> = None;
    tracing::debug!("surface: client connected");

    let result: Result<(), BoxError> = loop {
        tokio::select! {
            _ = cancel.cancelled() => break Ok(()),

            msg = ws_rx.next() => {
                let text = match msg {
                    Some(Ok(Message::Text(t))) => t,
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = ws_tx.send(Message::Pong(data)).await {
                            break Err(e.into());
                        }
                        continue;
                    }
                    Some(Ok(Message::Close(_))) | None => break Ok(()),
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => break Err(e.into()),
                };

                let resp = match serde_json::from_str::<JsonRpcRequest>(&text) {
                    Ok(req) => dispatch(req, &hub, &mut subscription).await,
                    Err(e) => JsonRpcResponse::error(None, PARSE_ERROR, format!("parse error: {e}")),
                };
                if let Err(e) = send_json(&mut ws_tx, &resp).await {
                    break Err(e);
                }
            }

            event = next_push(&mut subscription) => match event {
                Some(event) => {
                    let notif = JsonRpcNotification::new(
                        POSITION_METHOD,
                        serde_json::json!({ "event": event }),
                    );
                    if let Err(e) = send_json(&mut ws_tx, &notif).await {
                        break Err(e);
                    }
                }
                None => {
                    // Handle dropped by the hub: another connection took the identity.
                    if let Some(sub) = subscription.take() {
                        tracing::debug!(identity = %sub.identity, "surface: subscription replaced");
                    }
                }
            },
        }
    };

    if let Some(sub) = subscription.take() {
        let _ = hub.unregister(sub.identity, sub.token).await;
    }
    tracing::debug!("surface: client disconnected");
    result
}

/// Next pushed event of the current subscription; pending without one.
async fn next_push(subscription: &mut Option<Subscription>) -> Option<PositionEvent> {
    match subscription {
        Some(sub) => sub.rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn send_json<S, T>(ws_tx: &mut S, value: &T) -> Result<(), BoxError>
where
    S: futures_util::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
    T: serde::Serialize,
{
    ws_tx.send(Message::Text(serde_json::to_string(value)?)).await?;
    Ok(())
}

async fn dispatch(
    req: JsonRpcRequest,
    hub: &HubHandle,
    subscription: &mut Option<Subscription>,
) -> JsonRpcResponse {
    tracing::debug!(method = %req.method, id = ?req.id, "surface: request received");
    let id = req.id;

    match req.method.as_str() {
        "get_snapshot" => {
            let params = match identity_params(req.params) {
                Ok(p) => p,
                Err(resp) => return resp.with_id(id),
            };
            match hub.get_snapshot(&params.identity).await {
                Ok(snapshot) => match serde_json::to_value(snapshot) {
                    Ok(v) => JsonRpcResponse::success(id, v),
                    Err(e) => JsonRpcResponse::error(id, INTERNAL_ERROR, e.to_string()),
                },
                Err(e) => hub_error(id, e),
            }
        }

        "subscribe" => {
            let params = match identity_params(req.params) {
                Ok(p) => p,
                Err(resp) => return resp.with_id(id),
            };
            let identity: ConsumerId = match params.identity.parse() {
                Ok(identity) => identity,
                Err(e) => return JsonRpcResponse::error(id, INVALID_PARAMS, e.to_string()),
            };

            if let Some(old) = subscription.take() {
                let _ = hub.unregister(old.identity, old.token).await;
            }
            let (handle, rx) = ChannelPushHandle::new(PUSH_QUEUE_CAPACITY);
            match hub.register(identity, handle).await {
                Ok(token) => {
                    *subscription = Some(Subscription { identity, token, rx });
                    tracing::debug!(identity = %identity, "surface: client subscribed");
                    JsonRpcResponse::success(
                        id,
                        serde_json::json!({ "subscribed": true, "identity": identity }),
                    )
                }
                Err(e) => hub_error(id, e),
            }
        }

        "unsubscribe" => {
            let removed = match subscription.take() {
                Some(sub) => match hub.unregister(sub.identity, sub.token).await {
                    Ok(removed) => removed,
                    Err(e) => return hub_error(id, e),
                },
                None => false,
            };
            JsonRpcResponse::success(id, serde_json::json!({ "unsubscribed": removed }))
        }

        other => JsonRpcResponse::error(id, METHOD_NOT_FOUND, format!("method not found: {other}")),
    }
}

fn identity_params(params: serde_json::Value) -> Result<IdentityParams, JsonRpcResponse> {
    serde_json::from_value(params).map_err(|_| {
        JsonRpcResponse::error(None, INVALID_PARAMS, "missing required param: identity")
    })
}

fn hub_error(id: Option<u64>, e: HubError) -> JsonRpcResponse {
    let code = match e {
        HubError::InvalidArgument(_) | HubError::InvalidRouting(_) => INVALID_PARAMS,
        HubError::Closed => INTERNAL_ERROR,
    };
    JsonRpcResponse::error(id, code, e.to_string())
}
