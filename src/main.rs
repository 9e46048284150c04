mod config;
mod dto;
mod handler;
mod mailer;
mod service;

use tokio::signal;

use std::sync::Arc;

use mailer::SmtpMailer;
use service::ContactService;

#[tokio::main]
async fn main() {
    // Log setup
    tracing_subscriber::fmt().init();

    // Load config
    let cfg = config::load_config().expect("failed to locate or load config file");
    tracing::info!("Successfully loaded contact relay config");
    tracing::info!(
        "Relaying to {} via {}:{} ({:?})",
        cfg.recipient,
        cfg.smtp.host,
        cfg.smtp.port,
        cfg.smtp.security
    );

    // Setup transport and service
    let mailer = SmtpMailer::new(&cfg.smtp).expect("failed to set up SMTP transport");
    let service = ContactService::new(&cfg, Arc::new(mailer))
        .expect("configured sender or recipient is not a valid email address");

    // Setup router
    let router = handler::router(Arc::new(service));

    // Start server
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", cfg.port))
        .await
        .expect("Failed to bind to address");
    let addr = listener.local_addr().expect("Failed to read local address");

    tracing::info!("Contact relay listening on {}", addr);
    tracing::info!("Submission endpoint: POST http://{}/send", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
