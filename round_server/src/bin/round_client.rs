// Terminal participant: `round_client <clue-giver|guesser> [local|new|ROOM_CODE]`.
// Commands on stdin: `h` (hint), `c` (correct), `s` (skip), `q` (quit).

use round_server::domain::{Role, Verdict, format_remaining};
use round_server::use_cases::{LocalAction, SessionView};
use round_server::{RoomChoice, start_session_with_config};
use tokio::io::{AsyncBufReadExt, BufReader};

fn parse_command(line: &str) -> Option<LocalAction> {
    match line.trim().to_ascii_lowercase().as_str() {
        "h" | "hint" => Some(LocalAction::RequestHint),
        "c" | "correct" => Some(LocalAction::Judge(Verdict::Correct)),
        "s" | "skip" => Some(LocalAction::Judge(Verdict::Skip)),
        "q" | "quit" => Some(LocalAction::Quit),
        _ => None,
    }
}

// What one stdin read asks the loop to do.
#[derive(Debug, PartialEq)]
enum Input {
    Send { action: LocalAction, last: bool },
    Help,
}

fn interpret(line: std::io::Result<Option<String>>) -> Input {
    match line {
        Ok(Some(line)) => match parse_command(&line) {
            Some(action) => {
                let last = action == LocalAction::Quit;
                Input::Send { action, last }
            }
            None => Input::Help,
        },
        // Closed stdin means the player walked away.
        Ok(None) | Err(_) => Input::Send {
            action: LocalAction::Quit,
            last: true,
        },
    }
}

fn render(view: &SessionView, role: Role) {
    let keyword = view.keyword.as_deref().unwrap_or("(waiting for keyword)");
    let hint = match (&view.hint, role) {
        (Some(hint), _) => hint.as_str(),
        (None, Role::Guesser) => "(press h)",
        (None, Role::ClueGiver) => "(hidden)",
    };
    println!(
        "[{}] score {} | {} | hint: {}",
        format_remaining(view.remaining_secs),
        view.points,
        keyword,
        hint
    );
}

#[tokio::main]
async fn main() {
    let mut args = std::env::args().skip(1);
    let Some(role) = args.next().as_deref().and_then(Role::parse) else {
        eprintln!("usage: round_client <clue-giver|guesser> [local|new|ROOM_CODE]");
        std::process::exit(2);
    };
    let choice = match args.next().as_deref() {
        None | Some("local") => RoomChoice::Local,
        Some("new") => RoomChoice::Create,
        Some(code) => RoomChoice::Join(code.to_string()),
    };

    let mut handle = match start_session_with_config(role, &choice).await {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("failed to start session: {e}");
            std::process::exit(1);
        }
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_rendered = SessionView::default();
    loop {
        tokio::select! {
            changed = handle.view_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = handle.view_rx.borrow_and_update().clone();
                if view.summary.is_some() {
                    break;
                }
                // Redraw only on visible changes.
                if view != last_rendered {
                    render(&view, role);
                    last_rendered = view;
                }
            }
            line = lines.next_line() => match interpret(line) {
                // Stop reading after a quit and wait for the session to wind down.
                Input::Send { action, last } => {
                    if handle.actions_tx.send(action).await.is_err() || last {
                        break;
                    }
                }
                Input::Help => println!("commands: h (hint), c (correct), s (skip), q (quit)"),
            },
        }
    }

    match handle.task.await {
        Ok(summary) => {
            println!("game over ({:?}): {} points", summary.reason, summary.points);
            for (keyword, outcome) in summary.history {
                println!("  {keyword}: {outcome:?}");
            }
        }
        Err(e) => eprintln!("session task failed: {e}"),
    }
}
