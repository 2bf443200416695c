use crate::domain::RoomEvent;
use crate::domain::ports::Clock;
use crate::interface_adapters::http::error_response;
use crate::interface_adapters::protocol::{RelayQueryParams, WireEvent, encode_frame};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::rng::rand_id;
use crate::use_cases::{RelayEnvelope, RoomHandle, RoomRegistry};

use axum::{
    Error,
    extract::{
        Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::broadcast;
use tracing::{Instrument, debug, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Encode(String),
    RoomEventsClosed,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

enum LoopControl {
    Continue,
    Disconnect,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<RelayQueryParams>,
) -> impl IntoResponse {
    let room_code = query.room.trim().to_string();
    if state.rooms.get_room(&room_code).await.is_none() {
        // Keep not-found responses consistent with the JSON error schema.
        return error_response(StatusCode::NOT_FOUND, "room not found").into_response();
    }

    let rooms = state.rooms.clone();
    let clock = state.clock.clone();
    ws.on_upgrade(move |socket| {
        // Separate connection id doubles as the relay sender id.
        let conn_id = rand_id();
        let span = info_span!("conn", conn_id, room = %room_code);
        handle_socket(socket, conn_id, room_code, rooms, clock).instrument(span)
    })
}

async fn handle_socket(
    mut socket: WebSocket,
    conn_id: u64,
    room_code: String,
    rooms: Arc<RoomRegistry>,
    clock: Arc<dyn Clock>,
) {
    // Register the connection so an ended room stays around while sockets are active.
    let Some(room) = rooms.register_connection(&room_code).await else {
        // The room can be removed between lookup and upgrade.
        warn!("room missing during connection registration");
        let _ = socket
            .send(Message::Close(Some(CloseFrame {
                code: close_code::POLICY,
                reason: "room unavailable".into(),
            })))
            .await;
        let _ = socket.close().await;
        return;
    };

    // Subscribe and snapshot together so nothing lands between catch-up and live traffic.
    let (snapshot, events_rx) = room.join();
    let now = Instant::now() - LOG_THROTTLE;
    let mut ctx = ConnCtx {
        conn_id,
        room,
        events_rx,
        lag_recovery_count: 0,
        msgs_in: 0,
        msgs_out: 0,
        bytes_in: 0,
        bytes_out: 0,
        invalid_json: 0,
        last_lag_log: now,
        last_invalid_log: now,
        close_frame: None,
    };
    info!("client connected");

    let result = match send_events(&mut socket, snapshot, &mut ctx).await {
        Ok(()) => run_client_loop(&mut socket, &mut ctx).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        warn!(error = ?e, "client loop exited with error");
    }

    rooms
        .register_disconnect(&room_code, clock.now_epoch_millis())
        .await;
    debug!(
        msgs_in = ctx.msgs_in,
        msgs_out = ctx.msgs_out,
        bytes_in = ctx.bytes_in,
        bytes_out = ctx.bytes_out,
        invalid_json = ctx.invalid_json,
        lag_recovery_count = ctx.lag_recovery_count,
        "connection stats"
    );
    info!("client disconnected");
}

struct ConnCtx {
    conn_id: u64,
    room: RoomHandle,
    events_rx: broadcast::Receiver<RelayEnvelope>,
    // Count snapshot resyncs sent to this client.
    lag_recovery_count: u64,

    msgs_in: u64,
    msgs_out: u64,
    bytes_in: u64,
    bytes_out: u64,

    invalid_json: u32,

    last_lag_log: Instant,
    last_invalid_log: Instant,

    close_frame: Option<CloseFrame>,
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

async fn send_event(
    socket: &mut WebSocket,
    event: RoomEvent,
    ctx: &mut ConnCtx,
) -> Result<(), NetError> {
    let txt = encode_frame(event).map_err(|e| NetError::Encode(e.to_string()))?;
    let bytes = txt.len() as u64;
    socket.send(Message::Text(txt.into())).await?;
    ctx.msgs_out += 1;
    ctx.bytes_out += bytes;
    Ok(())
}

async fn send_events(
    socket: &mut WebSocket,
    events: Vec<RoomEvent>,
    ctx: &mut ConnCtx,
) -> Result<(), NetError> {
    for event in events {
        send_event(socket, event, ctx).await?;
    }
    Ok(())
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let mut fatal: Option<NetError> = None;

    loop {
        let control = tokio::select! {
            // Incoming frame from the client.
            incoming = socket.recv() => handle_incoming_ws(incoming, ctx),

            // Outgoing relay traffic for this room.
            envelope = ctx.events_rx.recv() => match envelope {
                Ok(envelope) if envelope.is_for(ctx.conn_id) => {
                    match send_event(socket, envelope.event, ctx).await {
                        Ok(()) => LoopControl::Continue,
                        Err(err) => {
                            // Disconnect follows immediately.
                            warn!(error = ?err, "failed to forward room event");
                            LoopControl::Disconnect
                        }
                    }
                }
                Ok(_) => LoopControl::Continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    if should_log(&mut ctx.last_lag_log) {
                        warn!(missed = n, "room events lagged; sending snapshot");
                    }
                    // Resync strategy: resend the current keyword and total.
                    ctx.lag_recovery_count += 1;
                    let snapshot = ctx.room.snapshot();
                    match send_events(socket, snapshot, ctx).await {
                        Ok(()) => LoopControl::Continue,
                        Err(err) => {
                            warn!(error = ?err, "failed to send lag recovery snapshot");
                            LoopControl::Disconnect
                        }
                    }
                }
                Err(broadcast::error::RecvError::Closed) => {
                    fatal = Some(NetError::RoomEventsClosed);
                    LoopControl::Disconnect
                }
            },
        };

        if let LoopControl::Disconnect = control {
            if let Some(frame) = ctx.close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    match fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn handle_incoming_ws(incoming: Option<Result<Message, Error>>, ctx: &mut ConnCtx) -> LoopControl {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                ctx.msgs_in += 1;
                ctx.bytes_in += text.len() as u64;

                match serde_json::from_str::<WireEvent>(&text) {
                    Ok(event) => {
                        let delivered = ctx.room.relay(ctx.conn_id, event.into());
                        if delivered == 0 {
                            debug!("event produced no deliveries");
                        }
                        LoopControl::Continue
                    }
                    Err(parse_err) => {
                        ctx.invalid_json += 1;
                        if should_log(&mut ctx.last_invalid_log) {
                            warn!(
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse client frame"
                            );
                        }

                        if ctx.invalid_json > MAX_INVALID_JSON {
                            ctx.close_frame = Some(CloseFrame {
                                code: close_code::POLICY,
                                reason: "too many invalid messages".into(),
                            });
                            return LoopControl::Disconnect;
                        }
                        LoopControl::Continue
                    }
                }
            }
            Message::Binary(_) => {
                ctx.close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                LoopControl::Disconnect
            }
            Message::Ping(_) | Message::Pong(_) => LoopControl::Continue,
            Message::Close(_) => LoopControl::Disconnect,
        },
        Some(Err(e)) => {
            warn!(error = %e, "websocket recv error");
            LoopControl::Disconnect
        }
        None => {
            info!("websocket closed");
            LoopControl::Disconnect
        }
    }
}
