// Room orchestration for relaying round traffic between participants.

use crate::domain::ports::Clock;
use crate::domain::{Audience, LOCAL_ROOM, RoomEvent, RoomLedger};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;
use tracing::{debug, info};

const MAX_ROOM_CODE_LEN: usize = 64;

/// Shared configuration for newly created rooms.
#[derive(Debug, Clone)]
pub struct RoomSettings {
    /// Capacity of each room's fan-out channel.
    pub broadcast_capacity: usize,
    /// Countdown length handed to participants on room creation.
    pub round_duration: Duration,
}

/// Errors returned by room registry operations.
#[derive(Debug)]
pub enum RoomError {
    /// Room already exists and cannot be re-created.
    AlreadyExists,
    /// Room code is empty, too long, reserved or not URL-safe.
    InvalidCode,
}

/// Event fanned out to the members of a room, tagged with the member that caused it.
#[derive(Debug, Clone)]
pub struct RelayEnvelope {
    pub sender: u64,
    pub audience: Audience,
    pub event: RoomEvent,
}

impl RelayEnvelope {
    /// Returns true if `member` should receive this event.
    pub fn is_for(&self, member: u64) -> bool {
        match self.audience {
            Audience::Everyone => true,
            Audience::Others => self.sender != member,
        }
    }
}

/// Per-room relay state.
#[derive(Clone)]
pub struct RoomHandle {
    /// Identifier clients use to target this room.
    pub room_code: Arc<str>,
    /// Shared countdown start in epoch millis.
    pub start_time: u64,
    events_tx: broadcast::Sender<RelayEnvelope>,
    ledger: Arc<Mutex<RoomLedger>>,
    connections: Arc<AtomicUsize>,
}

impl RoomHandle {
    fn new(room_code: &str, start_time: u64, capacity: usize) -> Self {
        let (events_tx, _events_rx) = broadcast::channel(capacity);
        Self {
            room_code: Arc::from(room_code),
            start_time,
            events_tx,
            ledger: Arc::new(Mutex::new(RoomLedger::new())),
            connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn ledger(&self) -> MutexGuard<'_, RoomLedger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Catch-up events for a new member plus a receiver for everything after them.
    /// Both are taken under the ledger lock so no delivery falls in between.
    pub fn join(&self) -> (Vec<RoomEvent>, broadcast::Receiver<RelayEnvelope>) {
        let ledger = self.ledger();
        let events_rx = self.events_tx.subscribe();
        (ledger.snapshot(), events_rx)
    }

    /// Current catch-up events, used to resync a lagging member.
    pub fn snapshot(&self) -> Vec<RoomEvent> {
        self.ledger().snapshot()
    }

    /// Applies an event from `sender` and fans the resulting deliveries out.
    /// Returns the number of deliveries produced.
    pub fn relay(&self, sender: u64, event: RoomEvent) -> usize {
        let mut ledger = self.ledger();
        let deliveries = ledger.apply(event);
        let count = deliveries.len();
        for delivery in deliveries {
            // A send error only means nobody is subscribed right now.
            let _ = self.events_tx.send(RelayEnvelope {
                sender,
                audience: delivery.audience,
                event: delivery.event,
            });
        }
        count
    }

    pub fn points(&self) -> u32 {
        self.ledger().points()
    }

    pub fn is_ended(&self) -> bool {
        self.ledger().is_ended()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// True once the shared countdown of `round_duration` has run out at `now_ms`.
    pub fn is_expired(&self, now_ms: u64, round_duration: Duration) -> bool {
        let duration_ms = u64::try_from(round_duration.as_millis()).unwrap_or(u64::MAX);
        now_ms >= self.start_time.saturating_add(duration_ms)
    }

    // Quit or clock expiry; either way no more rounds will be played here.
    fn is_over(&self, now_ms: u64, round_duration: Duration) -> bool {
        self.is_ended() || self.is_expired(now_ms, round_duration)
    }
}

/// Thread-safe registry for active rooms.
pub struct RoomRegistry {
    /// Settings applied to newly created rooms.
    settings: RoomSettings,
    /// Map of room code to active handle.
    rooms: RwLock<HashMap<String, RoomHandle>>,
}

impl RoomRegistry {
    pub fn new(settings: RoomSettings) -> Self {
        Self {
            settings,
            rooms: RwLock::new(HashMap::new()),
        }
    }

    pub fn round_duration(&self) -> Duration {
        self.settings.round_duration
    }

    /// Creates a new room whose countdown starts at `start_time`.
    pub async fn create_room(
        &self,
        room_code: String,
        start_time: u64,
    ) -> Result<RoomHandle, RoomError> {
        if !is_valid_room_code(&room_code) {
            return Err(RoomError::InvalidCode);
        }

        let mut rooms = self.rooms.write().await;
        // A room code frees up once its previous game is over and abandoned.
        self.retain_live(&mut rooms, start_time);
        if rooms.contains_key(&room_code) {
            return Err(RoomError::AlreadyExists);
        }

        let room = RoomHandle::new(&room_code, start_time, self.settings.broadcast_capacity);
        info!(room_code = %room_code, start_time, "room created");
        rooms.insert(room_code, room.clone());
        Ok(room)
    }

    /// Returns a room handle for the provided code, if it exists.
    pub async fn get_room(&self, room_code: &str) -> Option<RoomHandle> {
        let rooms = self.rooms.read().await;
        rooms.get(room_code).cloned()
    }

    /// Authoritative total for a room, if it exists.
    pub async fn room_points(&self, room_code: &str) -> Option<u32> {
        self.get_room(room_code).await.map(|room| room.points())
    }

    /// Counts a new socket against the room and returns its handle.
    pub async fn register_connection(&self, room_code: &str) -> Option<RoomHandle> {
        let rooms = self.rooms.read().await;
        let room = rooms.get(room_code)?.clone();
        room.connections.fetch_add(1, Ordering::SeqCst);
        Some(room)
    }

    /// Releases a socket; a room that is over is dropped once its last socket leaves.
    pub async fn register_disconnect(&self, room_code: &str, now_ms: u64) {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get(room_code) else {
            return;
        };

        let remaining = room
            .connections
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| {
                Some(count.saturating_sub(1))
            })
            .map(|previous| previous.saturating_sub(1))
            .unwrap_or(0);

        if remaining == 0 && room.is_over(now_ms, self.settings.round_duration) {
            rooms.remove(room_code);
            info!(room_code, "finished room removed");
        }
    }

    /// Drops every room that is over and has no sockets left, including rooms nobody joined.
    /// Returns how many rooms were removed.
    pub async fn sweep(&self, now_ms: u64) -> usize {
        let mut rooms = self.rooms.write().await;
        self.retain_live(&mut rooms, now_ms)
    }

    /// Runs [`RoomRegistry::sweep`] every `period` on a background task.
    pub fn spawn_sweeper(
        self: Arc<Self>,
        clock: Arc<dyn Clock>,
        period: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let removed = self.sweep(clock.now_epoch_millis()).await;
                if removed > 0 {
                    debug!(removed, "swept finished rooms");
                }
            }
        })
    }

    fn retain_live(&self, rooms: &mut HashMap<String, RoomHandle>, now_ms: u64) -> usize {
        let before = rooms.len();
        let round_duration = self.settings.round_duration;
        rooms.retain(|room_code, room| {
            let keep = room.connection_count() > 0 || !room.is_over(now_ms, round_duration);
            if !keep {
                info!(room_code = %room_code, "finished room removed");
            }
            keep
        });
        before - rooms.len()
    }
}

/// Room codes travel in URLs, so keep them to a conservative character set.
pub fn is_valid_room_code(room_code: &str) -> bool {
    !room_code.is_empty()
        && room_code.len() <= MAX_ROOM_CODE_LEN
        && room_code != LOCAL_ROOM
        && room_code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Outcome;

    fn registry() -> RoomRegistry {
        RoomRegistry::new(RoomSettings {
            broadcast_capacity: 16,
            round_duration: Duration::from_secs(300),
        })
    }

    #[tokio::test]
    async fn when_room_exists_then_create_returns_already_exists() {
        let rooms = registry();
        rooms
            .create_room("room-1".to_string(), 0)
            .await
            .expect("first create should succeed");

        let result = rooms.create_room("room-1".to_string(), 0).await;

        assert!(matches!(result, Err(RoomError::AlreadyExists)));
    }

    #[tokio::test]
    async fn when_code_is_not_url_safe_then_create_returns_invalid_code() {
        let rooms = registry();

        for code in ["", "has space", "simple-local", "a/b"] {
            let result = rooms.create_room(code.to_string(), 0).await;
            assert!(matches!(result, Err(RoomError::InvalidCode)), "{code}");
        }
    }

    #[tokio::test]
    async fn relay_fans_out_to_other_members_only() {
        let rooms = registry();
        let room = rooms
            .create_room("room-2".to_string(), 0)
            .await
            .expect("create should succeed");
        let (_, mut events_rx) = room.join();

        let delivered = room.relay(
            1,
            RoomEvent::Keyword {
                keyword: "artery".to_string(),
                hint: "carries blood away from heart".to_string(),
            },
        );
        room.relay(
            2,
            RoomEvent::Outcome {
                keyword: "artery".to_string(),
                outcome: Outcome::CorrectNoHint,
            },
        );

        assert_eq!(delivered, 1);
        let keyword = events_rx.recv().await.expect("keyword envelope");
        assert!(keyword.is_for(2));
        assert!(!keyword.is_for(1));
        let outcome = events_rx.recv().await.expect("outcome envelope");
        assert!(outcome.is_for(1));
        let score = events_rx.recv().await.expect("score envelope");
        assert!(score.is_for(1) && score.is_for(2));
        assert_eq!(score.event, RoomEvent::Score { points: 2 });
        assert_eq!(rooms.room_points("room-2").await, Some(2));
    }

    #[tokio::test]
    async fn ended_room_is_removed_after_last_disconnect() {
        let rooms = registry();
        rooms
            .create_room("room-3".to_string(), 0)
            .await
            .expect("create should succeed");
        let room = rooms
            .register_connection("room-3")
            .await
            .expect("room should exist");
        rooms.register_connection("room-3").await;

        room.relay(1, RoomEvent::PlayerQuit);
        rooms.register_disconnect("room-3", 0).await;
        assert!(rooms.get_room("room-3").await.is_some());

        rooms.register_disconnect("room-3", 0).await;
        assert!(rooms.get_room("room-3").await.is_none());
    }

    #[tokio::test]
    async fn open_room_survives_empty_connection_count() {
        let rooms = registry();
        rooms
            .create_room("room-4".to_string(), 0)
            .await
            .expect("create should succeed");
        rooms.register_connection("room-4").await;

        rooms.register_disconnect("room-4", 0).await;
        rooms.register_disconnect("room-4", 0).await;

        let room = rooms.get_room("room-4").await.expect("room should remain");
        assert_eq!(room.connection_count(), 0);
    }

    const ROUND_MS: u64 = 300_000;

    #[tokio::test]
    async fn expired_room_is_removed_after_last_disconnect() {
        let rooms = registry();
        rooms
            .create_room("room-5".to_string(), 0)
            .await
            .expect("create should succeed");
        rooms.register_connection("room-5").await;

        rooms.register_disconnect("room-5", ROUND_MS).await;

        assert!(rooms.get_room("room-5").await.is_none());
    }

    #[tokio::test]
    async fn sweep_drops_expired_rooms_nobody_joined() {
        let rooms = registry();
        for code in ["never-joined", "still-running", "in-use"] {
            rooms
                .create_room(code.to_string(), 0)
                .await
                .expect("create should succeed");
        }
        rooms.register_connection("in-use").await;
        let still_running = rooms
            .get_room("still-running")
            .await
            .expect("room should exist");
        assert!(!still_running.is_expired(ROUND_MS - 1, rooms.round_duration()));

        assert_eq!(rooms.sweep(ROUND_MS - 1).await, 0);
        assert_eq!(rooms.sweep(ROUND_MS).await, 2);

        assert!(rooms.get_room("never-joined").await.is_none());
        assert!(rooms.get_room("still-running").await.is_none());
        assert!(rooms.get_room("in-use").await.is_some());
    }

    #[tokio::test]
    async fn creating_a_room_reclaims_the_code_of_a_finished_one() {
        let rooms = registry();
        rooms
            .create_room("room-6".to_string(), 0)
            .await
            .expect("create should succeed");

        let again = rooms.create_room("room-6".to_string(), ROUND_MS).await;

        let room = again.expect("expired code should be reusable");
        assert_eq!(room.start_time, ROUND_MS);
    }

    #[tokio::test]
    async fn sweeper_task_removes_expired_rooms() {
        let rooms = Arc::new(registry());
        rooms
            .create_room("room-7".to_string(), 0)
            .await
            .expect("create should succeed");

        let sweeper = rooms.clone().spawn_sweeper(
            Arc::new(crate::use_cases::test_support::FixedClock(ROUND_MS)),
            Duration::from_millis(10),
        );
        for _ in 0..100 {
            if rooms.get_room("room-7").await.is_none() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        sweeper.abort();

        assert!(rooms.get_room("room-7").await.is_none());
    }
}
