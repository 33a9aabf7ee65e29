// rams-document-service/src/preview/viewer.rs

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{RamsError, Result};
use crate::pipeline::PdfPayload;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewerKind {
    /// In-process paginated viewer
    Embedded,
    /// Hands the document to the platform's own PDF viewer
    Native,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadedPreview {
    pub num_pages: u32,
}

pub trait Viewer: Send + Sync {
    fn kind(&self) -> ViewerKind;

    fn load(&self, pdf: &PdfPayload) -> Result<LoadedPreview>;
}

/// Paginates the document itself, so it needs a well-formed file with
/// countable pages and within its memory budget.
pub struct EmbeddedViewer {
    max_bytes: usize,
}

impl EmbeddedViewer {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }
}

impl Viewer for EmbeddedViewer {
    fn kind(&self) -> ViewerKind {
        ViewerKind::Embedded
    }

    fn load(&self, pdf: &PdfPayload) -> Result<LoadedPreview> {
        let bytes = pdf.as_bytes();
        if bytes.len() > self.max_bytes {
            return Err(RamsError::RenderDisplay(format!(
                "document is {} bytes, embedded viewer limit is {}",
                bytes.len(),
                self.max_bytes
            )));
        }
        if !bytes.starts_with(b"%PDF-") {
            return Err(RamsError::RenderDisplay("missing PDF header".into()));
        }
        if !contains(bytes, b"%%EOF") {
            return Err(RamsError::RenderDisplay("missing PDF trailer".into()));
        }
        match page_count(bytes) {
            0 => Err(RamsError::RenderDisplay("no page objects found".into())),
            num_pages => Ok(LoadedPreview { num_pages }),
        }
    }
}

/// The platform viewer does its own pagination; only the header is checked.
pub struct NativeViewer;

impl Viewer for NativeViewer {
    fn kind(&self) -> ViewerKind {
        ViewerKind::Native
    }

    fn load(&self, pdf: &PdfPayload) -> Result<LoadedPreview> {
        if !pdf.as_bytes().starts_with(b"%PDF-") {
            return Err(RamsError::RenderDisplay("not a PDF document".into()));
        }
        Ok(LoadedPreview {
            num_pages: page_count(pdf.as_bytes()).max(1),
        })
    }
}

/// What the environment can display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub embedded_viewer: bool,
    pub embedded_max_bytes: usize,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            embedded_viewer: true,
            embedded_max_bytes: 20 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewDisplay {
    pub viewer: ViewerKind,
    pub num_pages: u32,
    /// Set when the primary viewer failed and the fallback is showing
    pub notice: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayState {
    Hidden,
    Shown(PreviewDisplay),
    /// Neither viewer could load the document. Export still works.
    Unavailable(String),
}

pub struct ViewerStrategy {
    primary: Box<dyn Viewer>,
    fallback: Box<dyn Viewer>,
}

impl ViewerStrategy {
    pub fn new(primary: Box<dyn Viewer>, fallback: Box<dyn Viewer>) -> Self {
        Self { primary, fallback }
    }

    pub fn detect(capabilities: &Capabilities) -> Self {
        let embedded = Box::new(EmbeddedViewer::new(capabilities.embedded_max_bytes));
        let native = Box::new(NativeViewer);
        if capabilities.embedded_viewer {
            Self::new(embedded, native)
        } else {
            Self::new(native, embedded)
        }
    }

    pub fn primary_kind(&self) -> ViewerKind {
        self.primary.kind()
    }

    /// Load with the primary viewer, falling back once on failure.
    pub fn display(&self, pdf: &PdfPayload) -> DisplayState {
        let primary_err = match self.primary.load(pdf) {
            Ok(loaded) => {
                return DisplayState::Shown(PreviewDisplay {
                    viewer: self.primary.kind(),
                    num_pages: loaded.num_pages,
                    notice: None,
                })
            }
            Err(e) => e,
        };

        warn!(
            viewer = ?self.primary.kind(),
            error = %primary_err,
            "Primary viewer failed, falling back"
        );

        match self.fallback.load(pdf) {
            Ok(loaded) => {
                info!(viewer = ?self.fallback.kind(), pages = loaded.num_pages, "Fallback viewer loaded document");
                DisplayState::Shown(PreviewDisplay {
                    viewer: self.fallback.kind(),
                    num_pages: loaded.num_pages,
                    notice: Some(format!(
                        "Preview switched to the {:?} viewer: {}",
                        self.fallback.kind(),
                        primary_err
                    )),
                })
            }
            Err(fallback_err) => DisplayState::Unavailable(format!(
                "{}; fallback: {}",
                primary_err, fallback_err
            )),
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Page count for display. Files that keep page objects in compressed object
/// streams (PDF 1.5+) show no `/Type /Page` text, so a visible page-tree
/// `/Count` is used instead, and failing that the count is unknown and
/// reported as 1. Zero means the file has no recognisable pages.
pub fn page_count(bytes: &[u8]) -> u32 {
    match count_pages(bytes) {
        0 => declared_page_count(bytes)
            .filter(|&n| n > 0)
            .or_else(|| contains(bytes, b"/ObjStm").then_some(1))
            .unwrap_or(0),
        n => n,
    }
}

/// Largest `/Count` value visible in the file, which is the page tree root's.
fn declared_page_count(bytes: &[u8]) -> Option<u32> {
    const COUNT: &[u8] = b"/Count";

    let mut best = None;
    let mut i = 0;
    while i + COUNT.len() <= bytes.len() {
        if &bytes[i..i + COUNT.len()] != COUNT {
            i += 1;
            continue;
        }
        let mut j = i + COUNT.len();
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        let digits = bytes[j..].iter().take_while(|c| c.is_ascii_digit()).count();
        let value = std::str::from_utf8(&bytes[j..j + digits])
            .ok()
            .and_then(|d| d.parse::<u32>().ok());
        if let Some(value) = value {
            best = best.max(Some(value));
        }
        i = j.max(i + 1);
    }
    best
}

/// Counts `/Type /Page` objects, excluding `/Type /Pages` tree nodes.
pub fn count_pages(bytes: &[u8]) -> u32 {
    const TYPE: &[u8] = b"/Type";
    const PAGE: &[u8] = b"/Page";

    let mut count = 0;
    let mut i = 0;
    while i + TYPE.len() <= bytes.len() {
        if &bytes[i..i + TYPE.len()] != TYPE {
            i += 1;
            continue;
        }
        let mut j = i + TYPE.len();
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if bytes[j..].starts_with(PAGE) {
            let after = bytes.get(j + PAGE.len()).copied();
            if !matches!(after, Some(c) if c.is_ascii_alphanumeric()) {
                count += 1;
            }
        }
        i = j.max(i + 1);
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf(pages: usize) -> PdfPayload {
        let mut body = String::from("%PDF-1.7\n1 0 obj << /Type /Pages /Count 2 >> endobj\n");
        for n in 0..pages {
            body.push_str(&format!("{} 0 obj << /Type /Page /Parent 1 0 R >> endobj\n", n + 2));
        }
        body.push_str("%%EOF\n");
        PdfPayload::new(body.into_bytes(), "test.pdf")
    }

    #[test]
    fn counts_pages_not_page_trees() {
        assert_eq!(count_pages(pdf(3).as_bytes()), 3);
        assert_eq!(count_pages(b"<< /Type/Page >> << /Type /Pages >>"), 1);
        assert_eq!(count_pages(b"/Type"), 0);
    }

    fn object_stream_pdf(trailer: &str) -> PdfPayload {
        let body = format!(
            "%PDF-1.5\n\
             5 0 obj << /Type /ObjStm /N 4 /First 20 /Filter /FlateDecode /Length 9 >>\n\
             stream\nx\x01\x02\x03\nendstream endobj\n\
             9 0 obj << /Type /XRef /Size 10 /W [1 2 1] {} >>\n\
             stream\n\x00\x01\nendstream endobj\n\
             startxref\n120\n%%EOF\n",
            trailer
        );
        PdfPayload::new(body.into_bytes(), "compressed.pdf")
    }

    #[test]
    fn compressed_page_objects_still_load_embedded() {
        let unknown = object_stream_pdf("/Root 1 0 R");
        assert_eq!(count_pages(unknown.as_bytes()), 0);
        assert_eq!(page_count(unknown.as_bytes()), 1);

        let strategy = ViewerStrategy::detect(&Capabilities::default());
        match strategy.display(&unknown) {
            DisplayState::Shown(display) => {
                assert_eq!(display.viewer, ViewerKind::Embedded);
                assert_eq!(display.num_pages, 1);
                assert!(display.notice.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn visible_page_tree_count_is_used() {
        let declared = object_stream_pdf("/Root 1 0 R >> << /Type /Pages /Count 7");
        assert_eq!(page_count(declared.as_bytes()), 7);
        // Scanned page objects win over the declared count
        assert_eq!(page_count(pdf(3).as_bytes()), 3);
        assert_eq!(page_count(b"%PDF-1.7 no pages %%EOF"), 0);
    }

    #[test]
    fn embedded_primary_shows_pages() {
        let strategy = ViewerStrategy::detect(&Capabilities::default());
        match strategy.display(&pdf(2)) {
            DisplayState::Shown(display) => {
                assert_eq!(display.viewer, ViewerKind::Embedded);
                assert_eq!(display.num_pages, 2);
                assert!(display.notice.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn oversized_document_falls_back_to_native() {
        let strategy = ViewerStrategy::detect(&Capabilities {
            embedded_viewer: true,
            embedded_max_bytes: 16,
        });
        match strategy.display(&pdf(2)) {
            DisplayState::Shown(display) => {
                assert_eq!(display.viewer, ViewerKind::Native);
                assert!(display.notice.is_some());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn native_preference_swaps_order() {
        let strategy = ViewerStrategy::detect(&Capabilities {
            embedded_viewer: false,
            ..Default::default()
        });
        assert_eq!(strategy.primary_kind(), ViewerKind::Native);
    }

    #[test]
    fn garbage_is_unavailable() {
        let strategy = ViewerStrategy::detect(&Capabilities::default());
        let garbage = PdfPayload::new(b"hello".to_vec(), "x.pdf");
        assert!(matches!(strategy.display(&garbage), DisplayState::Unavailable(_)));
    }
}
