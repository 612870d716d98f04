//! Event channels: which connections watch which event, and fan-out.

pub mod broker;
pub mod channel;
pub mod registry;
pub mod subscription;

pub use broker::EventBroker;
pub use registry::ChannelRegistry;
