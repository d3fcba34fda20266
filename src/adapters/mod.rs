// Adapters layer: filesystem storage and the output sinks.

pub mod sinks;
pub mod storage;
