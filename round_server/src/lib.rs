pub mod domain;
pub mod frameworks;
pub mod interface_adapters;
pub mod use_cases;

pub use frameworks::client::{RoomChoice, start_session, start_session_with_config};
pub use frameworks::config::http_port;
pub use frameworks::server::{app, run, run_with_config};
