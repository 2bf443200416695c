// Session runner: drives one participant's round state machine from the clock, local
// actions, inbound channel events and completed keyword fetches.

use super::types::{LocalAction, SessionView};
use crate::domain::ports::{ChannelAdapter, Clock, KeywordSource, OutcomeSink, ScoreQuery};
use crate::domain::{
    Effect, KeywordPair, Origin, Outcome, RoomEvent, Session, SessionEvent, SessionSummary,
    SourceError,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{Instrument, debug, info, info_span, warn};

/// Collaborators a session talks to.
#[derive(Clone)]
pub struct SessionPorts {
    /// Relay channel; ignored for non-networked sessions.
    pub channel: Option<Arc<dyn ChannelAdapter>>,
    pub keywords: Arc<dyn KeywordSource>,
    pub outcomes: Arc<dyn OutcomeSink>,
    /// Seeds the score of networked sessions.
    pub scores: Option<Arc<dyn ScoreQuery>>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Clock tick period.
    pub tick_interval: Duration,
    /// Capacity for queued UI actions.
    pub action_capacity: usize,
}

/// UI-facing handle of a running session.
pub struct SessionHandle {
    pub actions_tx: mpsc::Sender<LocalAction>,
    pub view_rx: watch::Receiver<SessionView>,
    pub task: JoinHandle<SessionSummary>,
}

pub fn spawn_session(
    session: Session,
    ports: SessionPorts,
    settings: SessionSettings,
) -> SessionHandle {
    let (actions_tx, actions_rx) = mpsc::channel::<LocalAction>(settings.action_capacity);
    let (view_tx, view_rx) = watch::channel(SessionView {
        points: session.ledger().points(),
        remaining_secs: session.clock().duration().as_secs(),
        ..SessionView::default()
    });

    // Subscribe before spawning so nothing published in between is missed.
    let inbound = subscribe(&session, &ports);
    let span = info_span!(
        "session",
        role = ?session.role(),
        room = session.room().unwrap_or("local"),
    );
    let task = tokio::spawn(
        session_task(
            session,
            ports,
            inbound,
            actions_rx,
            view_tx,
            settings.tick_interval,
        )
        .instrument(span),
    );

    SessionHandle {
        actions_tx,
        view_rx,
        task,
    }
}

fn subscribe(session: &Session, ports: &SessionPorts) -> Option<mpsc::Receiver<RoomEvent>> {
    if !session.is_networked() {
        return None;
    }
    let channel = ports.channel.as_ref()?;
    match channel.subscribe() {
        Ok(inbound) => Some(inbound),
        Err(e) => {
            warn!(room = channel.room(), error = %e, "channel subscribe failed; no remote events");
            None
        }
    }
}

pub async fn session_task(
    mut session: Session,
    ports: SessionPorts,
    mut inbound: Option<mpsc::Receiver<RoomEvent>>,
    mut actions_rx: mpsc::Receiver<LocalAction>,
    view_tx: watch::Sender<SessionView>,
    tick_interval: Duration,
) -> SessionSummary {
    let view = view_tx.borrow().clone();
    let mut ctx = EffectContext {
        room: session.room().map(str::to_owned),
        view,
        ports,
        fetches: JoinSet::new(),
        view_tx,
    };

    // Seed the total before any local mutation can happen.
    if let (Some(room), Some(scores)) = (ctx.room.clone(), ctx.ports.scores.clone()) {
        match scores.room_score(&room).await {
            Ok(points) => {
                let effects = session.seed_score(points);
                ctx.run(effects).await;
            }
            Err(e) => warn!(error = %e, "room score query failed; starting from zero"),
        }
    }

    info!(networked = session.is_networked(), "session started");
    let effects = session.start();
    let mut summary = ctx.run(effects).await;

    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let summary = loop {
        if let Some(summary) = summary.take() {
            break summary;
        }

        let event = tokio::select! {
            _ = interval.tick() => {
                // Re-trigger a fetch that came back empty.
                if session.needs_keyword() {
                    ctx.spawn_fetch();
                }
                Some(SessionEvent::ClockTick {
                    now_ms: ctx.ports.clock.now_epoch_millis(),
                })
            }
            action = actions_rx.recv() => match action {
                Some(action) => Some(SessionEvent::from(action)),
                // The UI dropped its handle; treat it as leaving.
                None => Some(SessionEvent::Quit { origin: Origin::Local }),
            },
            remote = recv_remote(&mut inbound) => match remote {
                Some(event) => SessionEvent::from_remote(event),
                None => {
                    warn!("channel subscription closed; continuing without remote events");
                    inbound = None;
                    None
                }
            },
            Some(joined) = ctx.fetches.join_next() => Some(match joined {
                Ok(Ok(pair)) => SessionEvent::KeywordReceived {
                    origin: Origin::Local,
                    keyword: pair.keyword,
                    hint: pair.hint,
                },
                Ok(Err(e)) => {
                    warn!(error = %e, "keyword fetch failed");
                    SessionEvent::KeywordUnavailable
                }
                Err(e) => {
                    warn!(error = %e, "keyword fetch task failed");
                    SessionEvent::KeywordUnavailable
                }
            }),
        };

        if let Some(event) = event {
            let effects = session.handle(event);
            summary = ctx.run(effects).await;
        }
    };

    // Nothing scheduled for this session may outlive it.
    ctx.fetches.abort_all();
    drop(inbound);
    summary
}

async fn recv_remote(inbound: &mut Option<mpsc::Receiver<RoomEvent>>) -> Option<RoomEvent> {
    match inbound {
        Some(inbound) => inbound.recv().await,
        None => std::future::pending().await,
    }
}

struct EffectContext {
    room: Option<String>,
    view: SessionView,
    ports: SessionPorts,
    fetches: JoinSet<Result<KeywordPair, SourceError>>,
    view_tx: watch::Sender<SessionView>,
}

impl EffectContext {
    /// Executes effects in order and publishes the resulting view. Returns the summary
    /// once the session has ended.
    async fn run(&mut self, effects: Vec<Effect>) -> Option<SessionSummary> {
        let mut summary = None;
        let mut changed = false;

        for effect in effects {
            match effect {
                Effect::FetchKeyword => self.spawn_fetch(),
                Effect::Publish(event) => self.publish(event).await,
                Effect::Persist { keyword, outcome } => self.persist(keyword, outcome),
                Effect::KeywordShown { keyword } => {
                    debug!(%keyword, "keyword shown");
                    self.view.keyword = Some(keyword);
                    self.view.hint = None;
                    changed = true;
                }
                Effect::RevealHint(hint) => {
                    debug!("hint revealed");
                    self.view.hint = Some(hint);
                    changed = true;
                }
                Effect::ScoreChanged(points) => {
                    self.view.points = points;
                    changed = true;
                }
                Effect::TimeRemaining(remaining_secs) => {
                    if self.view.remaining_secs != remaining_secs {
                        self.view.remaining_secs = remaining_secs;
                        changed = true;
                    }
                }
                Effect::Ended(ended) => {
                    info!(
                        points = ended.points,
                        rounds = ended.history.len(),
                        reason = ?ended.reason,
                        "session ended"
                    );
                    self.view.summary = Some(ended.clone());
                    summary = Some(ended);
                    changed = true;
                }
            }
        }

        if changed {
            self.view_tx.send_replace(self.view.clone());
        }
        summary
    }

    fn spawn_fetch(&mut self) {
        if !self.fetches.is_empty() {
            return;
        }
        let keywords = self.ports.keywords.clone();
        self.fetches
            .spawn(async move { keywords.next_keyword().await }.in_current_span());
    }

    async fn publish(&self, event: RoomEvent) {
        let Some(channel) = &self.ports.channel else {
            return;
        };
        if self.room.is_none() {
            return;
        }
        // Dropped events are treated as never sent.
        if let Err(e) = channel.publish(event).await {
            warn!(error = %e, "publish failed; continuing");
        }
    }

    fn persist(&self, keyword: String, outcome: Outcome) {
        let Some(room) = self.room.clone() else {
            return;
        };
        let sink = self.ports.outcomes.clone();
        tokio::spawn(
            async move {
                if let Err(e) = sink.record(&room, &keyword, outcome).await {
                    warn!(%keyword, error = %e, "failed to record outcome");
                }
            }
            .in_current_span(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DEFAULT_ROUND_DURATION, EndReason, Role, RoundClock, Verdict};
    use crate::interface_adapters::clients::local::LocalChannel;
    use crate::use_cases::rooms::{RoomRegistry, RoomSettings};
    use crate::use_cases::test_support::{FixedClock, RecordingSink, ScriptedKeywords};

    const START: u64 = 1_700_000_000_000;
    const WAIT: Duration = Duration::from_secs(3);

    fn settings() -> SessionSettings {
        SessionSettings {
            tick_interval: Duration::from_millis(20),
            action_capacity: 8,
        }
    }

    fn ports(
        channel: Option<Arc<dyn ChannelAdapter>>,
        keywords: Arc<ScriptedKeywords>,
        sink: Arc<RecordingSink>,
        now_ms: u64,
    ) -> SessionPorts {
        SessionPorts {
            channel,
            keywords,
            outcomes: sink,
            scores: None,
            clock: Arc::new(FixedClock(now_ms)),
        }
    }

    async fn wait_for_view(
        view_rx: &mut watch::Receiver<SessionView>,
        condition: impl FnMut(&SessionView) -> bool,
    ) -> SessionView {
        tokio::time::timeout(WAIT, view_rx.wait_for(condition))
            .await
            .expect("view condition timed out")
            .expect("session view closed")
            .clone()
    }

    async fn finish(handle: SessionHandle) -> SessionSummary {
        tokio::time::timeout(WAIT, handle.task)
            .await
            .expect("session did not end")
            .expect("session task panicked")
    }

    #[tokio::test]
    async fn local_session_scores_and_moves_to_next_keyword() {
        let keywords = Arc::new(ScriptedKeywords::new([
            ("artery", "carries blood away from heart"),
            ("vein", "carries blood back to the heart"),
        ]));
        let sink = Arc::new(RecordingSink::default());
        let session = Session::new(
            Role::Guesser,
            None,
            RoundClock::new(START, DEFAULT_ROUND_DURATION),
        );
        let mut handle = spawn_session(session, ports(None, keywords, sink.clone(), START), settings());

        wait_for_view(&mut handle.view_rx, |v| v.keyword.as_deref() == Some("artery")).await;
        handle
            .actions_tx
            .send(LocalAction::Judge(Verdict::Correct))
            .await
            .expect("session should accept actions");
        let view = wait_for_view(&mut handle.view_rx, |v| {
            v.keyword.as_deref() == Some("vein")
        })
        .await;
        assert_eq!(view.points, 2);

        handle
            .actions_tx
            .send(LocalAction::Quit)
            .await
            .expect("session should accept actions");
        let summary = finish(handle).await;

        assert_eq!(summary.reason, EndReason::LocalQuit);
        assert_eq!(
            summary.history,
            vec![("artery".to_string(), Outcome::CorrectNoHint)]
        );
        assert!(sink.records().is_empty());
    }

    #[tokio::test]
    async fn expired_clock_ends_session_on_first_tick() {
        let keywords = Arc::new(ScriptedKeywords::new([("artery", "hint")]));
        let sink = Arc::new(RecordingSink::default());
        let session = Session::new(
            Role::Guesser,
            None,
            RoundClock::new(START, DEFAULT_ROUND_DURATION),
        );
        let handle = spawn_session(
            session,
            ports(None, keywords, sink, START + 300_000),
            settings(),
        );

        let summary = finish(handle).await;

        assert_eq!(summary.reason, EndReason::ClockExpired);
    }

    #[tokio::test]
    async fn empty_source_is_retried_on_clock_ticks() {
        let keywords = Arc::new(ScriptedKeywords::new([]));
        let sink = Arc::new(RecordingSink::default());
        let session = Session::new(
            Role::Guesser,
            None,
            RoundClock::new(START, DEFAULT_ROUND_DURATION),
        );
        let mut handle = spawn_session(
            session,
            ports(None, keywords.clone(), sink, START),
            settings(),
        );

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(handle.view_rx.borrow().keyword, None);

        keywords.push("platelet", "helps blood clot");
        wait_for_view(&mut handle.view_rx, |v| v.keyword.as_deref() == Some("platelet")).await;
        assert!(keywords.calls() >= 2);

        handle
            .actions_tx
            .send(LocalAction::Quit)
            .await
            .expect("session should accept actions");
        finish(handle).await;
    }

    #[tokio::test]
    async fn two_participants_stay_in_sync_over_local_relay() {
        let rooms = RoomRegistry::new(RoomSettings {
            broadcast_capacity: 32,
            round_duration: DEFAULT_ROUND_DURATION,
        });
        let room = rooms
            .create_room("room-sync".to_string(), START)
            .await
            .expect("room should be created");
        let keywords = Arc::new(ScriptedKeywords::new([
            ("artery", "carries blood away from heart"),
            ("vein", "carries blood back to the heart"),
        ]));
        let sink = Arc::new(RecordingSink::default());
        let clock = RoundClock::new(START, DEFAULT_ROUND_DURATION);

        let guesser_channel: Arc<dyn ChannelAdapter> = Arc::new(LocalChannel::join(room.clone(), 16));
        let giver_channel: Arc<dyn ChannelAdapter> = Arc::new(LocalChannel::join(room.clone(), 16));
        let mut guesser = spawn_session(
            Session::new(Role::Guesser, Some("room-sync".to_string()), clock),
            ports(Some(guesser_channel), keywords.clone(), sink.clone(), START),
            settings(),
        );
        let mut giver = spawn_session(
            Session::new(Role::ClueGiver, Some("room-sync".to_string()), clock),
            ports(Some(giver_channel), keywords.clone(), sink.clone(), START),
            settings(),
        );

        wait_for_view(&mut guesser.view_rx, |v| v.keyword.as_deref() == Some("artery")).await;
        guesser
            .actions_tx
            .send(LocalAction::RequestHint)
            .await
            .expect("guesser should accept actions");
        wait_for_view(&mut giver.view_rx, |v| {
            v.hint.as_deref() == Some("carries blood away from heart")
        })
        .await;

        guesser
            .actions_tx
            .send(LocalAction::Judge(Verdict::Correct))
            .await
            .expect("guesser should accept actions");
        let giver_view = wait_for_view(&mut giver.view_rx, |v| {
            v.keyword.as_deref() == Some("vein")
        })
        .await;
        assert_eq!(giver_view.points, 1);
        let guesser_view = wait_for_view(&mut guesser.view_rx, |v| {
            v.keyword.as_deref() == Some("vein")
        })
        .await;
        assert_eq!(guesser_view.points, 1);
        assert_eq!(guesser_view.hint, None);
        assert_eq!(room.points(), 1);

        guesser
            .actions_tx
            .send(LocalAction::Quit)
            .await
            .expect("guesser should accept actions");
        let giver_summary = finish(giver).await;
        let guesser_summary = finish(guesser).await;

        assert_eq!(giver_summary.reason, EndReason::RemoteQuit);
        assert_eq!(guesser_summary.reason, EndReason::LocalQuit);
        let expected = vec![("artery".to_string(), Outcome::CorrectWithHint)];
        assert_eq!(giver_summary.history, expected);
        assert_eq!(guesser_summary.history, expected);

        tokio::time::timeout(WAIT, async {
            while sink.records().is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("outcome should be persisted");
        assert_eq!(
            sink.records(),
            vec![(
                "room-sync".to_string(),
                "artery".to_string(),
                Outcome::CorrectWithHint
            )]
        );
    }

    #[tokio::test]
    async fn rejected_persist_does_not_stop_the_session() {
        let rooms = RoomRegistry::new(RoomSettings {
            broadcast_capacity: 32,
            round_duration: DEFAULT_ROUND_DURATION,
        });
        let room = rooms
            .create_room("room-persist".to_string(), START)
            .await
            .expect("room should be created");
        let channel: Arc<dyn ChannelAdapter> = Arc::new(LocalChannel::join(room.clone(), 16));
        let mut guesser = spawn_session(
            Session::new(
                Role::Guesser,
                Some("room-persist".to_string()),
                RoundClock::new(START, DEFAULT_ROUND_DURATION),
            ),
            SessionPorts {
                channel: Some(channel),
                keywords: Arc::new(ScriptedKeywords::new([])),
                outcomes: Arc::new(RecordingSink::rejecting()),
                scores: None,
                clock: Arc::new(FixedClock(START)),
            },
            settings(),
        );

        // Stand-in clue-giver talking straight to the room.
        room.relay(
            999,
            RoomEvent::Keyword {
                keyword: "artery".to_string(),
                hint: "carries blood away from heart".to_string(),
            },
        );
        wait_for_view(&mut guesser.view_rx, |v| v.keyword.as_deref() == Some("artery")).await;
        guesser
            .actions_tx
            .send(LocalAction::Judge(Verdict::Skip))
            .await
            .expect("guesser should accept actions");
        room.relay(
            999,
            RoomEvent::Keyword {
                keyword: "vein".to_string(),
                hint: "carries blood back to the heart".to_string(),
            },
        );

        let view = wait_for_view(&mut guesser.view_rx, |v| v.keyword.as_deref() == Some("vein")).await;
        assert_eq!(view.points, 0);
        assert!(!guesser.task.is_finished());

        drop(guesser.actions_tx);
        let summary = tokio::time::timeout(WAIT, guesser.task)
            .await
            .expect("session did not end")
            .expect("session task panicked");
        assert_eq!(summary.reason, EndReason::LocalQuit);
        assert!(room.is_ended());
    }
}
