pub mod bloom;
pub mod content_seen;
pub mod dedup;
pub mod frontier;
pub mod url_seen;

// Re-export common types
pub use bloom::{BloomError, BloomFilter};
pub use content_seen::ContentSeen;
pub use dedup::Deduplicator;
pub use frontier::Frontier;
pub use url_seen::{BloomUrlSeen, ExactUrlSeen, UrlSeen};
