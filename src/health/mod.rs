pub mod counter;
pub mod heartbeat;

pub use heartbeat::HeartbeatMap;
