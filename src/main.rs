// rams-document-service/src/main.rs

use anyhow::{Context, Result};
use rams_document_service::composition::{compose_document, GenerationInput};
use rams_document_service::config::Config;
use rams_document_service::error::RamsError;
use rams_document_service::generators::RamsGenerator;
use rams_document_service::library::TemplateLibrary;
use rams_document_service::pipeline::{PreviewSession, PreviewState};
use rams_document_service::preview::{DisplayState, LpPrinter, ViewerStrategy};
use rams_document_service::renderers::{PandocBackend, PdfRenderer};
use rams_document_service::session_file::SessionFile;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Print to stderr BEFORE logging initialization to catch early failures
    eprintln!("Starting rams-document-service...");

    let config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("FATAL: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.service.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!(
        service = %config.service.name,
        version = env!("CARGO_PKG_VERSION"),
        "Starting RAMS document service"
    );

    if let Err(e) = run(config).await {
        // Domain errors are reported in their structured form
        match e.downcast_ref::<RamsError>() {
            Some(rams) => println!(
                "{}",
                serde_json::to_string(&rams.to_error_response()).unwrap_or_else(|_| rams.to_string())
            ),
            None => eprintln!("FATAL: {:#}", e),
        }
        error!(error = %format!("{:#}", e), "RAMS generation failed");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<()> {
    let library = match &config.library.path {
        Some(path) => TemplateLibrary::load(path)
            .await
            .with_context(|| format!("Failed to load hazard library from {}", path))?,
        None => TemplateLibrary::builtin().context("Built-in hazard library is invalid")?,
    };

    let session_file = SessionFile::load(&config.input.session)
        .await
        .with_context(|| format!("Failed to read session file {}", config.input.session))?;
    let session = session_file.replay(&library)?;

    let mut errors = session.store.validate().errors;
    if let Some(ms) = &session.method_statement {
        errors.extend(ms.validate().errors);
    }
    if !errors.is_empty() {
        for message in &errors {
            warn!(error = %message, "Validation failed");
        }
        return Err(RamsError::Validation(errors).into());
    }

    let document = compose_document(
        &session.store.snapshot(),
        session.method_statement.as_ref(),
        Some(&session.overrides),
    );

    let backend = PandocBackend::new(
        RamsGenerator::new(Some(PathBuf::from(&config.templates.path))),
        PdfRenderer::new(),
    );
    let mut preview = PreviewSession::new(
        Arc::new(backend),
        config.pipeline(),
        ViewerStrategy::detect(&config.capabilities()),
    );

    let cancel = CancellationToken::new();
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal, closing preview");
                cancel_for_signal.cancel();
            }
            Err(err) => error!("Unable to listen for shutdown signal: {}", err),
        }
    });

    preview.open(GenerationInput::new(document));

    let cancelled = tokio::select! {
        _ = cancel.cancelled() => true,
        _ = preview.settle() => false,
    };
    if cancelled {
        preview.close();
        anyhow::bail!("Generation cancelled");
    }

    match preview.state() {
        PreviewState::Ready { .. } => {}
        PreviewState::Failed { error, attempts, .. } => {
            return Err(RamsError::GenerationFailed(format!(
                "{} (after {} attempts)",
                error, attempts
            ))
            .into());
        }
        other => anyhow::bail!("Unexpected preview state: {:?}", other),
    }

    match preview.display() {
        DisplayState::Shown(shown) => {
            if let Some(notice) = &shown.notice {
                warn!(notice = %notice, "Preview fallback in use");
            }
            info!(viewer = ?shown.viewer, pages = shown.num_pages, "Preview ready");
        }
        DisplayState::Unavailable(reason) => warn!(reason = %reason, "Preview unavailable, exporting anyway"),
        DisplayState::Hidden => {}
    }

    let path = preview
        .download(&PathBuf::from(&config.output.dir))
        .await
        .context("Failed to write PDF")?;

    if config.output.print {
        preview
            .print(&LpPrinter::new(config.output.printer.clone()))
            .await
            .context("Failed to print PDF")?;
    }

    println!("{}", serde_json::json!({ "status": "success", "path": path }));
    Ok(())
}
