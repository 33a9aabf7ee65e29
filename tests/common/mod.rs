//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use chrono::NaiveDate;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use rams_document_service::composition::{compose_document, GenerationInput};
use rams_document_service::error::{RamsError, Result};
use rams_document_service::models::{GeneratedDocument, NewRisk, ProjectInfoUpdate};
use rams_document_service::pipeline::{PdfPayload, PipelineConfig, PreviewSession};
use rams_document_service::preview::{Capabilities, PrintSink, ViewerStrategy};
use rams_document_service::renderers::PdfBackend;
use rams_document_service::store::RamsStore;

#[derive(Debug, Clone)]
pub enum Behaviour {
    Succeed,
    AlwaysFail,
    /// Fail this many calls, then succeed
    FailTimes(usize),
    /// First call sleeps this long before succeeding
    DelayFirst(Duration),
    /// Every call sleeps this long before succeeding
    DelayAll(Duration),
    Panic,
    /// Succeed with bytes that are not a PDF
    Garbage,
}

/// Renderer double that counts calls and records when each one started.
pub struct FakeBackend {
    behaviour: Behaviour,
    pages: usize,
    calls: AtomicUsize,
    started: Mutex<Vec<Instant>>,
}

impl FakeBackend {
    pub fn new(behaviour: Behaviour) -> Arc<Self> {
        Self::with_pages(behaviour, 1)
    }

    pub fn with_pages(behaviour: Behaviour, pages: usize) -> Arc<Self> {
        Arc::new(Self {
            behaviour,
            pages,
            calls: AtomicUsize::new(0),
            started: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn start_times(&self) -> Vec<Instant> {
        self.started.lock().unwrap().clone()
    }
}

/// A minimal PDF whose body names the call that produced it.
pub fn fake_pdf(call: usize, pages: usize) -> Vec<u8> {
    let mut body = String::from("%PDF-1.7\n1 0 obj << /Type /Pages >> endobj\n");
    for n in 0..pages {
        body.push_str(&format!("{} 0 obj << /Type /Page >> endobj\n", n + 2));
    }
    body.push_str(&format!("% produced by call {}\n%%EOF\n", call));
    body.into_bytes()
}

pub fn produced_by(pdf: &PdfPayload, call: usize) -> bool {
    let marker = format!("produced by call {}", call);
    String::from_utf8_lossy(pdf.as_bytes()).contains(&marker)
}

#[async_trait]
impl PdfBackend for FakeBackend {
    async fn render(&self, _input: &GenerationInput) -> Result<GeneratedDocument> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.started.lock().unwrap().push(Instant::now());

        let bytes = match &self.behaviour {
            Behaviour::Succeed => fake_pdf(call, self.pages),
            Behaviour::AlwaysFail => {
                return Err(RamsError::GenerationFailed(format!("renderer down (call {})", call)))
            }
            Behaviour::FailTimes(n) if call <= *n => {
                return Err(RamsError::GenerationFailed("transient".into()))
            }
            Behaviour::FailTimes(_) => fake_pdf(call, self.pages),
            Behaviour::DelayFirst(delay) => {
                if call == 1 {
                    tokio::time::sleep(*delay).await;
                }
                fake_pdf(call, self.pages)
            }
            Behaviour::DelayAll(delay) => {
                tokio::time::sleep(*delay).await;
                fake_pdf(call, self.pages)
            }
            Behaviour::Panic => panic!("renderer exploded"),
            Behaviour::Garbage => b"definitely not a pdf".to_vec(),
        };

        Ok(GeneratedDocument {
            content_base64: general_purpose::STANDARD.encode(&bytes),
            filename: format!("call-{}.pdf", call),
            mime_type: "application/pdf".into(),
            size_bytes: bytes.len(),
        })
    }
}

/// Print sink that records job names.
#[derive(Default)]
pub struct RecordingPrinter {
    pub jobs: Mutex<Vec<(String, usize)>>,
}

#[async_trait]
impl PrintSink for RecordingPrinter {
    async fn print(&self, job_name: &str, pdf: &PdfPayload) -> Result<()> {
        self.jobs.lock().unwrap().push((job_name.to_string(), pdf.len()));
        Ok(())
    }
}

pub fn session(backend: Arc<FakeBackend>) -> PreviewSession {
    session_with(backend, PipelineConfig::default(), Capabilities::default())
}

pub fn session_with(
    backend: Arc<FakeBackend>,
    config: PipelineConfig,
    capabilities: Capabilities,
) -> PreviewSession {
    PreviewSession::new(backend, config, ViewerStrategy::detect(&capabilities))
}

/// The "Rewire, 12 High St" job used across tests.
pub fn scenario_store() -> RamsStore {
    let mut store = RamsStore::new();
    store.update_project_info(ProjectInfoUpdate {
        project_name: Some("Rewire — 12 High St".into()),
        location: Some("Leeds".into()),
        assessor: Some("J. Smith".into()),
        date: NaiveDate::from_ymd_opt(2025, 1, 10),
    });
    store.add_risk(NewRisk {
        hazard: "Working at height".into(),
        risk: "Fall from ladder".into(),
        likelihood: 3,
        severity: 4,
        controls: "Use tower scaffold".into(),
        residual_risk: None,
    });
    store.add_activity("Isolate supply");
    store
}

/// Risk ids are fresh per store, so rebuilding the store yields a different
/// input. Clone the returned value to reopen the same document.
pub fn scenario_input() -> GenerationInput {
    input_for(&scenario_store())
}

pub fn input_for(store: &RamsStore) -> GenerationInput {
    GenerationInput::new(compose_document(&store.snapshot(), None, None))
}
