//! Persisting the session in SQLite with `SeaOrmDeviceStorage`.
//!
//! The first run signs in and stores the session; later runs restore it
//! without contacting the identity backend. Pass `--logout` to clear it.
//!
//! # Running the example
//!
//! ```bash
//! export BACKOFFICE_DEVICE_DATABASE_URL="sqlite://backoffice.db?mode=rwc"
//! cargo run --example sqlite_device_storage
//! cargo run --example sqlite_device_storage   # restored
//! cargo run --example sqlite_device_storage -- --logout
//! ```

use std::env;
use std::sync::Arc;

use backoffice_core::memory::MemoryIdentity;
use backoffice_core::{
    AuthContext, BackofficeConfig, CredentialExchange, SeaOrmDeviceStorage, SessionStore,
};
use dotenvy::dotenv;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    dotenv().ok();

    // Only the device database matters here; the identity backend is in memory.
    let config = BackofficeConfig::from_lookup(|key| match key {
        "BACKOFFICE_FIREBASE_API_KEY" => Some("unused".to_string()),
        "BACKOFFICE_DEVICE_DATABASE_URL" => Some(
            env::var(key).unwrap_or_else(|_| "sqlite://backoffice.db?mode=rwc".to_string()),
        ),
        _ => env::var(key).ok(),
    })?;
    info!(
        "Connecting to device database: {}",
        config.device_database_url.as_deref().unwrap_or_default()
    );

    let Some(storage) = SeaOrmDeviceStorage::from_config(&config).await? else {
        return Err("BACKOFFICE_DEVICE_DATABASE_URL is not set".into());
    };
    storage.migrate().await?;

    let auth = AuthContext::new(SessionStore::new(Arc::new(storage)));

    if env::args().any(|arg| arg == "--logout") {
        auth.logout().await;
        info!("Session cleared");
        return Ok(());
    }

    if auth.restore().await {
        let session = auth.state().session().cloned();
        if let Some(session) = session {
            info!(
                "Restored session for {} issued at {}",
                session.email(),
                session.issued_at()
            );
        }
        return Ok(());
    }

    let identity = MemoryIdentity::new().with_account("staff@example.org", "secret");
    let exchange = CredentialExchange::new(Arc::new(identity));
    auth.sign_in(&exchange, "staff@example.org", "secret").await?;
    info!("Signed in; run again to restore the session");

    Ok(())
}
