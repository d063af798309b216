pub mod extract;
pub mod http;

// Re-export common types
pub use extract::{ExtractError, Extractor, HtmlExtractor};
pub use http::{FetchError, Fetcher, HttpFetcher, PageBody};

#[cfg(test)]
pub use http::MockFetcher;
