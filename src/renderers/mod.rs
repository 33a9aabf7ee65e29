// rams-document-service/src/renderers/mod.rs

mod pdf;

use crate::composition::GenerationInput;
use crate::error::Result;
use crate::models::GeneratedDocument;
use async_trait::async_trait;

pub use pdf::{PandocBackend, PdfRenderer, RenderMetadata};

/// The external PDF renderer. Accepts the composed document and returns the
/// PDF base64-encoded for transport.
#[async_trait]
pub trait PdfBackend: Send + Sync {
    async fn render(&self, input: &GenerationInput) -> Result<GeneratedDocument>;
}
