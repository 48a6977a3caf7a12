pub mod video_id;
pub mod youtube;

pub use video_id::VideoId;
pub use youtube::OEmbedClient;
