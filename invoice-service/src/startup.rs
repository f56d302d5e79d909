use crate::config::InvoiceConfig;
use crate::extraction::{PdfTextLayer, TesseractOcr, TextAcquisition};
use crate::handlers;
use crate::services::{Database, LocalStorage, Storage};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub config: InvoiceConfig,
    pub db: Database,
    pub storage: Arc<dyn Storage>,
    pub acquisition: Arc<TextAcquisition>,
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
    state: AppState,
}

impl Application {
    pub async fn build(config: InvoiceConfig) -> Result<Self, AppError> {
        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to PostgreSQL: {}", e);
            e
        })?;

        db.run_migrations().await.map_err(|e| {
            tracing::error!("Failed to run database migrations: {}", e);
            e
        })?;

        let storage: Arc<dyn Storage> = Arc::new(
            LocalStorage::new(&config.storage.local_path)
                .await
                .map_err(|e| {
                    tracing::error!(
                        "Failed to initialize local storage at {}: {}",
                        config.storage.local_path,
                        e
                    );
                    e
                })?,
        );

        let acquisition = Arc::new(TextAcquisition::new(
            Arc::new(PdfTextLayer::new()),
            Arc::new(TesseractOcr::new(
                Duration::from_secs(config.ocr.command_timeout_secs),
                config.ocr.psm,
                config.ocr.dpi,
            )),
            config.ocr.language.clone(),
        ));

        let state = AppState {
            config: config.clone(),
            db,
            storage,
            acquisition,
        };

        let app = Router::new()
            .route("/health", get(handlers::health_check))
            .route("/metrics", get(handlers::metrics_endpoint))
            .route("/invoices", get(handlers::list_invoices))
            .route(
                "/invoices/upload/:company_id",
                post(handlers::upload_invoice),
            )
            .route(
                "/invoices/:invoice_id",
                get(handlers::get_invoice).delete(handlers::delete_invoice),
            )
            .route(
                "/invoices/:invoice_id/download",
                get(handlers::download_invoice),
            )
            .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
            .layer(TraceLayer::new_for_http())
            .with_state(state.clone());

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(listener, app);

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
            state,
        })
    }

    pub fn db(&self) -> &Database {
        &self.state.db
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}
