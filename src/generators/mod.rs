// rams-document-service/src/generators/mod.rs

mod rams;

use crate::composition::GenerationInput;
use crate::error::Result;
use async_trait::async_trait;

pub use rams::RamsGenerator;

/// Turns a composed document into Markdown ready for PDF rendering.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, input: &GenerationInput) -> Result<String>;
}
