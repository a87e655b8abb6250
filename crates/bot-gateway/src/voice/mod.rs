//! Voice connections and playback queues

mod orchestrator;
mod queue;

pub use orchestrator::VoiceOrchestrator;
pub use queue::{PlaybackQueue, QueueEntry, QueueSelector};
