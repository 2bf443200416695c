// Interface adapters: wire protocol, network handling and outbound clients.

pub mod clients;
pub mod http;
pub mod net;
pub mod protocol;
pub mod state;
pub mod stores;
pub mod utils;
