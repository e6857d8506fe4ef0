pub mod dispatch;
pub mod inflight;
pub mod orchestrator;
