use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use identity_service::{IdentityService, InMemoryCredentialStore, InMemoryRoleStore, ServiceConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "identity_service=info,auth=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration; an invalid signing secret aborts startup
    let config = ServiceConfig::from_env().map_err(|e| {
        tracing::error!("Invalid configuration: {}", e);
        e
    })?;
    tracing::info!("Starting identity service v{}", config.version);
    tracing::info!(
        "Issuer {}, tokens valid for {} day(s)",
        config.jwt.issuer,
        config.jwt.expiration_in_days
    );

    let service = IdentityService::new(
        &config.jwt,
        Arc::new(InMemoryCredentialStore::new()),
        Arc::new(InMemoryRoleStore::new()),
    )?;

    // No transport is attached yet
    tracing::info!(
        "Identity service ready for issuer {} (no transport attached, waiting for ctrl-c)",
        service.issuer()
    );
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    drop(service);

    Ok(())
}
