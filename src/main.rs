use std::sync::Arc;

use anyhow::Context;

use swasthya_scan::assessment::{
    AssessmentRouteState, Notifier, RecordingNotifier, SessionController, assessment_routes,
};
use swasthya_scan::cli::{self, TerminalNotifier};
use swasthya_scan::config::{AssessmentConfig, ServerConfig};
use swasthya_scan::llm::{LlmBackend, LlmConfig, create_provider};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let server_config = ServerConfig::from_env().context("export GEMINI_API_KEY=...")?;
    let assessment_config = AssessmentConfig::from_env();

    eprintln!("🩺 SwasthyaScan v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", server_config.model);
    if let Some(max) = assessment_config.max_turns {
        eprintln!("   Turn cap: {}", max);
    }

    let llm = create_provider(&LlmConfig {
        backend: LlmBackend::Gemini,
        api_key: server_config.api_key.clone(),
        model: server_config.model.clone(),
        timeout: server_config.request_timeout,
    })?;

    if server_config.cli {
        let notifier: Arc<dyn Notifier> = Arc::new(TerminalNotifier);
        let controller = Arc::new(SessionController::new(llm, assessment_config, notifier));
        eprintln!("   Mode: terminal (/done, /reset, /quit)\n");
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let mut stdout = tokio::io::stdout();
        cli::run(controller, stdin, &mut stdout).await?;
        return Ok(());
    }

    let notifications = Arc::new(RecordingNotifier::new());
    let controller = Arc::new(SessionController::new(
        llm,
        assessment_config,
        notifications.clone(),
    ));
    let app = assessment_routes(AssessmentRouteState {
        controller,
        notifications,
        model: server_config.model.clone(),
    });

    let addr = format!("0.0.0.0:{}", server_config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    eprintln!("   API: http://{}/api/session\n", addr);
    tracing::info!(port = server_config.port, "Assessment API started");

    axum::serve(listener, app).await?;
    Ok(())
}
