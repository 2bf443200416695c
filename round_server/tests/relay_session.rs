mod support;

use round_server::domain::{EndReason, Outcome, Role, SessionSummary, Verdict};
use round_server::use_cases::{LocalAction, SessionHandle, SessionView};
use round_server::{RoomChoice, start_session};
use serde_json::Value;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

async fn wait_for_view(
    handle: &mut SessionHandle,
    condition: impl FnMut(&SessionView) -> bool,
) -> SessionView {
    tokio::time::timeout(WAIT, handle.view_rx.wait_for(condition))
        .await
        .expect("view condition timed out")
        .expect("session view closed")
        .clone()
}

async fn act(handle: &SessionHandle, action: LocalAction) {
    handle
        .actions_tx
        .send(action)
        .await
        .expect("session should accept actions");
}

async fn finish(handle: SessionHandle) -> SessionSummary {
    tokio::time::timeout(WAIT, handle.task)
        .await
        .expect("session did not end")
        .expect("session task panicked")
}

#[tokio::test]
async fn test_participants_share_rounds_over_relay() {
    let base_url = support::ensure_server();
    let room_code = support::unique_room();
    let room = RoomChoice::Join(room_code.clone());

    let mut giver = start_session(base_url, Role::ClueGiver, &room)
        .await
        .expect("clue-giver should start");
    let mut guesser = start_session(base_url, Role::Guesser, &room)
        .await
        .expect("guesser should start");

    // The guesser may join after the first keyword went out; the room snapshot covers that.
    let first = wait_for_view(&mut guesser, |v| v.keyword.is_some())
        .await
        .keyword
        .expect("keyword shown");
    wait_for_view(&mut giver, |v| v.keyword.as_ref() == Some(&first)).await;

    act(&guesser, LocalAction::RequestHint).await;
    wait_for_view(&mut giver, |v| v.hint.is_some()).await;

    act(&guesser, LocalAction::Judge(Verdict::Correct)).await;
    let giver_view = wait_for_view(&mut giver, |v| {
        v.points == 1 && v.keyword.as_ref().is_some_and(|k| *k != first)
    })
    .await;
    let second = giver_view.keyword.expect("next keyword");
    let guesser_view =
        wait_for_view(&mut guesser, |v| v.keyword.as_ref() == Some(&second)).await;
    assert_eq!(guesser_view.points, 1);
    assert_eq!(guesser_view.hint, None);

    let score: Value = reqwest::get(format!(
        "{base_url}/api/gameplay-score?roomCode={room_code}"
    ))
    .await
    .expect("score request")
    .json()
    .await
    .expect("score body");
    assert_eq!(score["score"], 1);

    // A participant joining mid-game starts from the room total.
    let mut late = start_session(base_url, Role::Guesser, &room)
        .await
        .expect("late guesser should start");
    let late_view = wait_for_view(&mut late, |v| v.keyword.is_some()).await;
    assert_eq!(late_view.points, 1);
    assert_eq!(late_view.keyword, Some(second));

    act(&guesser, LocalAction::Quit).await;
    let guesser_summary = finish(guesser).await;
    let giver_summary = finish(giver).await;
    let late_summary = finish(late).await;

    assert_eq!(guesser_summary.reason, EndReason::LocalQuit);
    assert_eq!(giver_summary.reason, EndReason::RemoteQuit);
    assert_eq!(late_summary.reason, EndReason::RemoteQuit);
    assert_eq!(
        giver_summary.history,
        vec![(first.clone(), Outcome::CorrectWithHint)]
    );
    assert_eq!(guesser_summary.history, giver_summary.history);
    assert_eq!(giver_summary.points, 1);
}

#[tokio::test]
async fn test_local_session_uses_keyword_api_only() {
    let base_url = support::ensure_server();

    let mut player = start_session(base_url, Role::Guesser, &RoomChoice::Local)
        .await
        .expect("local session should start");

    let first = wait_for_view(&mut player, |v| v.keyword.is_some())
        .await
        .keyword
        .expect("keyword shown");
    act(&player, LocalAction::Judge(Verdict::Correct)).await;
    let view = wait_for_view(&mut player, |v| {
        v.points == 2 && v.keyword.as_ref().is_some_and(|k| *k != first)
    })
    .await;
    assert_eq!(view.summary, None);

    act(&player, LocalAction::Quit).await;
    let summary = finish(player).await;

    assert_eq!(summary.reason, EndReason::LocalQuit);
    assert_eq!(summary.history, vec![(first, Outcome::CorrectNoHint)]);
}
