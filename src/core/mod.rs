pub mod candidate;
pub mod collector;
pub mod gather;
pub mod player;
pub mod queue;
pub mod signal;

pub use candidate::{Candidate, SortOrder};
pub use gather::{GatherRequest, GatherResponse, GatherService};
pub use player::{PlayerState, PlaylistPlayer};
pub use queue::QueuePlan;
pub use signal::EndSignal;
