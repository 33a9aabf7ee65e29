// rams-document-service/src/pipeline/mod.rs

mod cache;
mod progress;
mod retry;
mod session;

pub use cache::{CacheKey, DocumentCache, PdfPayload, DEFAULT_CACHE_CAPACITY};
pub use progress::ProgressConfig;
pub use retry::{BackoffPolicy, RetryPolicy};
pub use session::{PipelineConfig, PreviewSession, PreviewState};
