pub mod codec;
pub mod host;
pub mod messages;
pub mod outbox;

pub use host::BridgeHost;
pub use outbox::Outbox;
