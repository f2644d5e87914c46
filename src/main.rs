use std::sync::Arc;

use anyhow::Context;

use inbox_triage::api::triage_routes;
use inbox_triage::config::TriageConfig;
use inbox_triage::triage::TriageCoordinator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = TriageConfig::from_env().context("Invalid configuration")?;

    let coordinator = Arc::new(
        TriageCoordinator::from_config(&config).context("Failed to create LLM provider")?,
    );

    eprintln!("📬 Inbox Triage v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Strategy: {}", coordinator.strategy().label());
    if config.has_usable_credential() {
        eprintln!("   Model: {} ({})", config.model, config.base_url);
    } else {
        eprintln!("   Model: disabled (OPENAI_API_KEY unset or 'demo')");
    }
    eprintln!("   Locale: {:?}", config.locale);
    eprintln!("   API: http://0.0.0.0:{}/api/process-emails\n", config.port);

    let app = triage_routes(coordinator);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;
    tracing::info!(port = config.port, "Triage server started");

    axum::serve(listener, app).await?;

    Ok(())
}
