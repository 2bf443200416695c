// Outbound adapters: HTTP backend client and the two channel adapters.

pub mod backend;
pub mod local;
pub mod relay;

pub use backend::{BackendClient, BackendClientError};
pub use local::LocalChannel;
pub use relay::WsChannel;
