// Channel adapter that talks to a remote relay over WebSocket.

use crate::domain::ports::ChannelAdapter;
use crate::domain::{RoomEvent, TransportError};
use crate::interface_adapters::protocol::{WireEvent, encode_frame};
use crate::use_cases::rooms::is_valid_room_code;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};

pub struct WsChannel {
    room: String,
    outbound_tx: mpsc::Sender<String>,
    inbound: Mutex<Option<mpsc::Receiver<RoomEvent>>>,
    reader: JoinHandle<()>,
}

impl WsChannel {
    /// Connects to `{relay_url}/ws?room=..`. Inbound events are buffered from this point
    /// on, so nothing is lost before `subscribe` is called.
    pub async fn connect(
        relay_url: &str,
        room: &str,
        capacity: usize,
    ) -> Result<Self, TransportError> {
        if !is_valid_room_code(room) {
            return Err(TransportError::Connect(format!("invalid room code {room:?}")));
        }
        let base = relay_url.trim_end_matches('/');
        let base = base
            .strip_prefix("http://")
            .map(|rest| format!("ws://{rest}"))
            .or_else(|| base.strip_prefix("https://").map(|rest| format!("wss://{rest}")))
            .unwrap_or_else(|| base.to_string());
        let url = format!("{base}/ws?room={room}");

        let (stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        let (mut write, mut read) = stream.split();

        let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(capacity);
        let (inbound_tx, inbound_rx) = mpsc::channel::<RoomEvent>(capacity);

        // Writer drains queued frames and exits once the channel is dropped, so a final
        // quit still goes out.
        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                if let Err(e) = write.send(Message::Text(frame.into())).await {
                    warn!(error = %e, "relay send failed; writer exiting");
                    return;
                }
            }
            let _ = write.close().await;
        });

        let reader = tokio::spawn(async move {
            while let Some(msg) = read.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<WireEvent>(text.as_str()) {
                            Ok(event) => {
                                if inbound_tx.send(event.into()).await.is_err() {
                                    // Subscriber dropped.
                                    return;
                                }
                            }
                            Err(e) => warn!(error = %e, "unparseable relay frame dropped"),
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "relay receive failed");
                        break;
                    }
                }
            }
            debug!("relay connection closed");
        });

        Ok(Self {
            room: room.to_string(),
            outbound_tx,
            inbound: Mutex::new(Some(inbound_rx)),
            reader,
        })
    }
}

#[async_trait]
impl ChannelAdapter for WsChannel {
    fn room(&self) -> &str {
        &self.room
    }

    async fn publish(&self, event: RoomEvent) -> Result<(), TransportError> {
        let frame = encode_frame(event)?;
        self.outbound_tx
            .send(frame)
            .await
            .map_err(|_| TransportError::Closed)
    }

    fn subscribe(&self) -> Result<mpsc::Receiver<RoomEvent>, TransportError> {
        let mut inbound = self
            .inbound
            .lock()
            .map_err(|_| TransportError::Closed)?;
        inbound.take().ok_or(TransportError::AlreadySubscribed)
    }
}

impl Drop for WsChannel {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
