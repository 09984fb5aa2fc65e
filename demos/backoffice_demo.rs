//! Backoffice walkthrough on in-process backends.
//!
//! Signs in, opens the employee roster and footer news, works through the
//! newsletter board (selection, cover upload, issues), and signs out, logging
//! every step.
//!
//! # Running the example
//!
//! ```bash
//! RUST_LOG=backoffice_core=debug cargo run --example backoffice_demo
//! ```
//!
//! When `BACKOFFICE_FIREBASE_API_KEY` is set (directly or in `.env`), sign-in
//! goes to the Identity Toolkit REST API instead, using
//! `BACKOFFICE_DEMO_EMAIL` and `BACKOFFICE_DEMO_PASSWORD`.

use std::env;
use std::sync::Arc;

use backoffice_core::memory::{
    MemoryDeviceStorage, MemoryIdentity, MemoryObjectStorage, MemoryRealtimeStore,
};
use backoffice_core::{
    AuthContext, BackofficeConfig, CredentialExchange, EmployeeDraft, Employees, FirebaseIdentity,
    IdentityBackend, IssueDraft, News, NewsDraft, NewsletterBoard, SessionStore, UploadFile,
    UploadPolicy,
};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEMO_EMAIL: &str = "gabinete@example.org";
const DEMO_PASSWORD: &str = "demo";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let (identity, email, password, policy) = match BackofficeConfig::from_env() {
        Ok(config) => {
            info!(endpoint = %config.identity_endpoint, "using identity toolkit");
            let identity: Arc<dyn IdentityBackend> = Arc::new(FirebaseIdentity::from_config(&config));
            (
                identity,
                env::var("BACKOFFICE_DEMO_EMAIL").unwrap_or_default(),
                env::var("BACKOFFICE_DEMO_PASSWORD").unwrap_or_default(),
                UploadPolicy::from_config(&config),
            )
        }
        Err(e) => {
            info!(reason = %e, "using in-memory identity");
            let identity: Arc<dyn IdentityBackend> =
                Arc::new(MemoryIdentity::new().with_account(DEMO_EMAIL, DEMO_PASSWORD));
            (
                identity,
                DEMO_EMAIL.to_string(),
                DEMO_PASSWORD.to_string(),
                UploadPolicy::default(),
            )
        }
    };

    let auth = AuthContext::new(SessionStore::new(Arc::new(MemoryDeviceStorage::new())));
    if !auth.restore().await {
        info!(screen = ?auth.screen(), "no persisted session");
    }

    let exchange = CredentialExchange::new(identity);
    auth.sign_in(&exchange, &email, &password).await?;
    info!(screen = ?auth.screen(), "signed in");

    let store = Arc::new(MemoryRealtimeStore::new());
    let storage = Arc::new(MemoryObjectStorage::new());

    // Employees
    let employees = Employees::open(store.clone()).await;
    let maria = auth
        .check(
            employees
                .create(
                    &EmployeeDraft::new("Maria Santos", "2024", "2024-07-01")
                        .with_department("Comunicação"),
                )
                .await,
        )
        .await?;
    auth.check(
        employees
            .create(&EmployeeDraft::new("Rui Costa", "2021", "2021-02-15"))
            .await,
    )
    .await?;
    for (department, members) in employees.by_department() {
        info!(%department, members = members.len(), "department");
    }

    if let Err(e) = employees.create(&EmployeeDraft::default()).await {
        warn!(error = %e, "form rejected");
    }
    auth.check(employees.delete(&maria).await).await?;
    info!(total = employees.total(), "roster after delete");

    // Footer news
    let news = News::open(store.clone()).await;
    auth.check(news.create(&NewsDraft::new("Candidaturas abertas")).await)
        .await?;
    for item in news.items() {
        info!(title = %item.title, "news");
    }

    // Newsletters
    let mut board = NewsletterBoard::open(store.clone(), storage, policy).await;
    for newsletter in board.newsletters().items() {
        info!(name = %newsletter.name, display = %newsletter.display_name, "newsletter");
    }

    board.select(Some("em_rede")).await?;
    let cover = board
        .upload_cover(UploadFile::new("capa.png", vec![0x89; 2048]))
        .await?;
    board
        .newsletters()
        .add_issue(
            "em_rede",
            &IssueDraft::new("Edição de outono", "2024-10-01")
                .with_description("Notícias da rede")
                .with_cover_image_path(cover),
        )
        .await?;
    info!(
        issues = board.issues().len(),
        images = board.gallery().items().len(),
        "em_rede loaded"
    );

    let oversized = UploadFile::new("poster.png", vec![0; 6 * 1024 * 1024]);
    if let Err(e) = board.upload_cover(oversized).await {
        warn!(error = %e, "upload rejected");
    }

    board.select(None).await?;
    auth.logout().await;
    info!(screen = ?auth.screen(), "signed out");

    Ok(())
}
