pub mod error;
pub mod handler;
pub mod projection;
pub mod publisher;

pub use error::{PublisherError, Result};
pub use handler::PublisherJobHandler;
pub use projection::StoryOut;
pub use publisher::Publisher;
