// rams-document-service/src/preview/mod.rs

mod export;
mod view;
mod viewer;

pub use export::{download_filename, todays_download_filename, write_pdf, LpPrinter, PrintSink};
pub use view::{PageCursor, Zoom, MAX_ZOOM, MIN_ZOOM, ZOOM_STEP};
pub use viewer::{
    count_pages, page_count, Capabilities, DisplayState, EmbeddedViewer, LoadedPreview, NativeViewer,
    PreviewDisplay, Viewer, ViewerKind, ViewerStrategy,
};
