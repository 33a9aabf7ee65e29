// rams-document-service/src/preview/export.rs

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{RamsError, Result};
use crate::pipeline::PdfPayload;

/// `RAMS_<project>_<YYYY-MM-DD>.pdf`, with anything outside `[A-Za-z0-9_-]`
/// replaced by `_`.
pub fn download_filename(project_name: &str, date: NaiveDate) -> String {
    let sanitized = project_name
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect::<String>();
    let name = if sanitized.is_empty() { "document".to_string() } else { sanitized };
    format!("RAMS_{}_{}.pdf", name, date.format("%Y-%m-%d"))
}

/// Filename for a download made today. Renderers and the preview session
/// both name documents through this.
pub fn todays_download_filename(project_name: &str) -> String {
    download_filename(project_name, Local::now().date_naive())
}

pub async fn write_pdf(pdf: &PdfPayload, dir: &Path, filename: &str) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(filename);
    tokio::fs::write(&path, pdf.as_bytes()).await?;
    info!(path = %path.display(), size_bytes = pdf.len(), "PDF downloaded");
    Ok(path)
}

/// Destination for print jobs.
#[async_trait]
pub trait PrintSink: Send + Sync {
    async fn print(&self, job_name: &str, pdf: &PdfPayload) -> Result<()>;
}

/// Submits to the system spooler through `lp`.
pub struct LpPrinter {
    destination: Option<String>,
}

impl LpPrinter {
    pub fn new(destination: Option<String>) -> Self {
        Self { destination }
    }
}

#[async_trait]
impl PrintSink for LpPrinter {
    async fn print(&self, job_name: &str, pdf: &PdfPayload) -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(pdf.as_bytes())?;
        file.flush()?;

        let mut cmd = Command::new("lp");
        cmd.arg("-t").arg(job_name);
        if let Some(dest) = &self.destination {
            cmd.arg("-d").arg(dest);
        }
        cmd.arg(file.path());

        debug!("Running lp: {:?}", cmd);
        let output = cmd.output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RamsError::GenerationFailed(format!("print failed: {}", stderr)));
        }
        info!(job = %job_name, "Print job submitted");
        Ok(())
    }
}
