// rams-document-service/src/renderers/pdf.rs

use crate::composition::GenerationInput;
use crate::error::{RamsError, Result};
use crate::generators::{Generator, RamsGenerator};
use crate::models::GeneratedDocument;
use crate::preview::todays_download_filename;
use crate::renderers::PdfBackend;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use chrono::NaiveDate;
use std::io::Write;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, info};

pub struct RenderMetadata {
    pub title: String,
    pub author: String,
    pub date: NaiveDate,
    pub company_name: Option<String>,
}

impl RenderMetadata {
    pub fn from_input(input: &GenerationInput) -> Self {
        Self {
            title: input.document.title(),
            author: input.document.project.assessor.clone(),
            date: input.document.project.date,
            company_name: input.options.company_name.clone(),
        }
    }
}

pub struct PdfRenderer {
    program: String,
}

impl PdfRenderer {
    pub fn new() -> Self {
        Self {
            program: "pandoc".to_string(),
        }
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Landscape A4, sized for the nine-column risk register.
    fn pandoc_args(metadata: &RenderMetadata) -> Vec<String> {
        let mut vars = vec![
            "geometry:a4paper".to_string(),
            "geometry:landscape".to_string(),
            "geometry:margin=2cm".to_string(),
            "fontsize=10pt".to_string(),
            format!("title={}", metadata.title),
            format!("author={}", metadata.author),
            format!("date={}", metadata.date.format("%d %B %Y")),
        ];
        if let Some(company) = &metadata.company_name {
            vars.push(format!("subtitle={}", company));
        }

        let mut args = vec![
            "--from=markdown+pipe_tables".to_string(),
            "--pdf-engine=xelatex".to_string(),
        ];
        for var in vars {
            args.push("-V".to_string());
            args.push(var);
        }
        args
    }

    pub async fn render(&self, markdown: &str, metadata: &RenderMetadata) -> Result<Vec<u8>> {
        let mut source = tempfile::Builder::new().suffix(".md").tempfile()?;
        source.write_all(markdown.as_bytes())?;
        source.flush()?;
        let target = tempfile::Builder::new().suffix(".pdf").tempfile()?;

        let mut cmd = Command::new(&self.program);
        cmd.arg(source.path())
            .arg("-o")
            .arg(target.path())
            .args(Self::pandoc_args(metadata));

        debug!(program = %self.program, title = %metadata.title, "Invoking renderer");
        let output = cmd.output().await?;
        if !output.status.success() {
            return Err(RamsError::PandocError(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let pdf = fs::read(target.path()).await?;
        info!(title = %metadata.title, size_bytes = pdf.len(), "PDF rendered");
        Ok(pdf)
    }
}

impl Default for PdfRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders locally: Handlebars Markdown through Pandoc to PDF.
pub struct PandocBackend {
    generator: RamsGenerator,
    renderer: PdfRenderer,
}

impl PandocBackend {
    pub fn new(generator: RamsGenerator, renderer: PdfRenderer) -> Self {
        Self {
            generator,
            renderer,
        }
    }

    /// Same name the preview session downloads under.
    pub fn filename_for(input: &GenerationInput) -> String {
        todays_download_filename(&input.document.project.project_name)
    }
}

#[async_trait]
impl PdfBackend for PandocBackend {
    async fn render(&self, input: &GenerationInput) -> Result<GeneratedDocument> {
        let markdown = self.generator.generate(input).await?;
        let metadata = RenderMetadata::from_input(input);
        let bytes = self.renderer.render(&markdown, &metadata).await?;

        Ok(GeneratedDocument {
            content_base64: general_purpose::STANDARD.encode(&bytes),
            filename: Self::filename_for(input),
            mime_type: "application/pdf".to_string(),
            size_bytes: bytes.len(),
        })
    }
}
