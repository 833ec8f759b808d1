use docproc::{api, config, logging, processing};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    config::init_config();
    logging::init_tracing();

    let service =
        processing::DocumentService::new().expect("Failed to initialize document service");
    let app = api::create_router(Arc::new(service));

    let (listener, port) = bind_listener().await.expect("Failed to bind listener");
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app).await.unwrap();
}

async fn bind_listener() -> Result<(TcpListener, u16), std::io::Error> {
    use std::net::Ipv4Addr;

    // Deployment platforms inject PORT; SERVER_PORT wins when both are set.
    let port = config::get_config().server_port.unwrap_or(8080);
    TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
        .await
        .map(|listener| (listener, port))
}
