pub mod http;
pub mod revisions;
pub mod sourcemap_fetcher;

pub use http::build_client;
pub use revisions::{RevisionsOutcome, RevisionsRefresher};
pub use sourcemap_fetcher::{SourcemapDocument, SourcemapFetcher, SourcemapSource};
