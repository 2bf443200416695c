// Room traffic exchanged through the channel adapter.

use super::round::Outcome;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    // Clue-giver announces the next keyword.
    Keyword { keyword: String, hint: String },
    // Relay tells the other members a hint was opened.
    ShowHint { hint: String },
    // Guesser reports that it opened the hint.
    HintUsed { hint: String },
    // Guesser resolved a keyword.
    Outcome { keyword: String, outcome: Outcome },
    // Authoritative room total from the relay.
    Score { points: u32 },
    PlayerQuit,
}
