// In-process channel adapter: joins a relay room directly, no socket in between.

use crate::domain::ports::ChannelAdapter;
use crate::domain::{RoomEvent, TransportError};
use crate::interface_adapters::utils::rng::rand_id;
use crate::use_cases::RoomHandle;
use async_trait::async_trait;
use std::sync::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::warn;

pub struct LocalChannel {
    member: u64,
    room: RoomHandle,
    inbound: Mutex<Option<mpsc::Receiver<RoomEvent>>>,
    forwarder: JoinHandle<()>,
}

impl LocalChannel {
    /// Joins `room` as a new member. The room snapshot and all later deliveries are
    /// buffered until `subscribe` is called.
    pub fn join(room: RoomHandle, capacity: usize) -> Self {
        let member = rand_id();
        let (snapshot, mut events_rx) = room.join();
        let (inbound_tx, inbound_rx) = mpsc::channel(capacity);

        let resync = room.clone();
        let forwarder = tokio::spawn(async move {
            for event in snapshot {
                if inbound_tx.send(event).await.is_err() {
                    return;
                }
            }
            loop {
                let events = match events_rx.recv().await {
                    Ok(envelope) if envelope.is_for(member) => vec![envelope.event],
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "local member lagged; resending snapshot");
                        resync.snapshot()
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                };
                for event in events {
                    if inbound_tx.send(event).await.is_err() {
                        return;
                    }
                }
            }
        });

        Self {
            member,
            room,
            inbound: Mutex::new(Some(inbound_rx)),
            forwarder,
        }
    }
}

#[async_trait]
impl ChannelAdapter for LocalChannel {
    fn room(&self) -> &str {
        &self.room.room_code
    }

    async fn publish(&self, event: RoomEvent) -> Result<(), TransportError> {
        if self.room.is_ended() {
            return Err(TransportError::Closed);
        }
        self.room.relay(self.member, event);
        Ok(())
    }

    fn subscribe(&self) -> Result<mpsc::Receiver<RoomEvent>, TransportError> {
        let mut inbound = self
            .inbound
            .lock()
            .map_err(|_| TransportError::Closed)?;
        inbound.take().ok_or(TransportError::AlreadySubscribed)
    }
}

impl Drop for LocalChannel {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}
