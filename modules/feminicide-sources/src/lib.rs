pub mod adapter;
pub mod error;
pub mod mediacloud;
pub mod newscatcher;
pub mod rss;
pub mod wayback;

pub use adapter::{broaden_with_watermark, DateWindow, SourceAdapter};
pub use error::{Result, SourceError};
pub use mediacloud::MediaCloudAdapter;
pub use newscatcher::NewscatcherAdapter;
pub use rss::RssAdapter;
pub use wayback::WaybackAdapter;
