// Network adapter modules split by relay sockets vs plain HTTP routes.

pub mod api;
pub mod client;

pub use api::{
    create_room_handler, random_keyword_handler, record_outcome_handler, room_info_handler,
    room_score_handler,
};
pub use client::ws_handler;
