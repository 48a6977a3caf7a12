pub mod cli;
pub mod config;
pub mod core;
pub mod extractors;
pub mod storage;
pub mod tabs;
pub mod utils;

pub use core::{GatherRequest, GatherResponse, GatherService, PlaylistPlayer, SortOrder};
pub use extractors::VideoId;
