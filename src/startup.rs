use std::{future::Future, net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    body::Body,
    extract::Request,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use hyper::body::Incoming;
use hyper_util::rt::TokioIo;
use tokio::{net::TcpStream, sync::watch, task::JoinHandle};
use tower::Service;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use crate::{
    auth::TokenKeys,
    routes::{self, auth, docs, projects, tasks, users},
    store::{MemoryStore, Repository},
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Repository>,
    pub tokens: TokenKeys,
}

impl AppState {
    pub fn new(store: Arc<dyn Repository>, tokens: TokenKeys) -> Self {
        Self { store, tokens }
    }

    /// State backed by a fresh in-memory store.
    pub fn in_memory(tokens: TokenKeys) -> Self {
        Self::new(Arc::new(MemoryStore::new()), tokens)
    }
}

/// HTTP behaviour that does not depend on the store.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub request_timeout: Duration,
    pub cors_origins: Vec<String>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            cors_origins: vec!["*".to_string()],
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        return CorsLayer::very_permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("ignoring invalid CORS origin '{origin}'");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub fn router(state: AppState, settings: &HttpSettings) -> Router {
    Router::new()
        .route("/", get(routes::root))
        .route("/healthcheck", get(routes::healthcheck))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me))
        .route("/api/users/search", get(users::search_users))
        .route(
            "/api/projects",
            post(projects::create_project).get(projects::list_projects),
        )
        .route(
            "/api/projects/:project_id",
            get(projects::get_project)
                .put(projects::update_project)
                .delete(projects::delete_project),
        )
        .route(
            "/api/projects/:project_id/members",
            post(projects::add_member).get(projects::list_members),
        )
        .route(
            "/api/projects/:project_id/members/:user_id",
            axum::routing::delete(projects::remove_member),
        )
        .route(
            "/api/projects/:project_id/tasks",
            post(tasks::create_task).get(tasks::list_tasks),
        )
        .route(
            "/api/projects/:project_id/tasks/:task_id",
            get(tasks::get_task)
                .put(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .merge(docs::docs_routes())
        .fallback(routes::not_found)
        .layer((
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &Request<Body>| {
                    let request_id = uuid::Uuid::new_v4();
                    let version = format!("{:?}", request.version());

                    tracing::span!(
                        tracing::Level::INFO,
                        "request",
                        method = tracing::field::display(request.method()),
                        uri = tracing::field::display(request.uri()),
                        version = tracing::field::display(version),
                        request_id = tracing::field::display(request_id),
                    )
                },
            ),
            axum::middleware::map_response(routes::method_not_allowed),
            tower_http::timeout::TimeoutLayer::new(settings.request_timeout),
            cors_layer(&settings.cors_origins),
        ))
        .with_state(state)
}

/// Binds `service_address` and serves the API until SIGINT or SIGTERM
/// arrives. Returns the accept loop's handle, the bound address and a
/// sender whose `closed()` resolves once every connection is finished.
pub async fn run_server(
    service_address: &str,
    state: AppState,
    settings: HttpSettings,
) -> anyhow::Result<(JoinHandle<()>, SocketAddr, watch::Sender<()>)> {
    serve(service_address, state, settings, shutdown_signal()).await
}

/// Like [`run_server`], but stops once `shutdown` completes.
pub async fn serve<F>(
    service_address: &str,
    state: AppState,
    settings: HttpSettings,
    shutdown: F,
) -> anyhow::Result<(JoinHandle<()>, SocketAddr, watch::Sender<()>)>
where
    F: Future<Output = ()> + Send + 'static,
{
    let router = router(state, &settings);

    tracing::debug!("bind server address {service_address} ...");
    let listener = tokio::net::TcpListener::bind(service_address).await?;
    // The socket is open from here on, clients may already connect.
    let addr = listener.local_addr()?;
    tracing::info!("listening on {addr}");

    let (close_tx, close_rx) = watch::channel(());
    let (stop_tx, stop_rx) = watch::channel(false);

    let join_handle = tokio::spawn(async move {
        let mut shutdown = std::pin::pin!(shutdown);
        loop {
            let (socket, remote_addr) = tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok(stream) => stream,
                        Err(e) => {
                            tracing::error!("failed to accept connection: {e}");
                            continue;
                        }
                    }
                }
                _ = &mut shutdown => {
                    tracing::info!("shutting down, not accepting new connections");
                    break;
                }
            };

            tracing::debug!("connection from {remote_addr} accepted");

            let tower_service = router.clone();
            let close_rx = close_rx.clone();
            let stop_rx = stop_rx.clone();

            tokio::spawn(async move {
                handle_client(socket, remote_addr, tower_service, close_rx, stop_rx).await;
            });
        }
        stop_tx.send_replace(true);
        tracing::debug!("exit from loop which accepts connections");
    });

    Ok((join_handle, addr, close_tx))
}

async fn handle_client(
    socket: TcpStream,
    remote_addr: SocketAddr,
    tower_service: Router,
    close_rx: watch::Receiver<()>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let socket = TokioIo::new(socket);

    // hyper's `Service` takes `&self` while tower's takes `&mut self`, hence the clone.
    let hyper_service = hyper::service::service_fn(move |request: Request<Incoming>| {
        tower_service.clone().call(request)
    });

    let conn = hyper::server::conn::http1::Builder::new().serve_connection(socket, hyper_service);
    // `graceful_shutdown` requires a pinned connection.
    let mut conn = std::pin::pin!(conn);

    let result = tokio::select! {
        // Completes when the client closed the connection or a TCP error occurred.
        result = conn.as_mut() => result,
        // In-flight requests may still finish. The `TimeoutLayer` bounds how
        // long that takes.
        _ = async { stop_rx.wait_for(|stop| *stop).await.map(|_| ()) } => {
            tracing::debug!("starting graceful shutdown of {remote_addr}");
            conn.as_mut().graceful_shutdown();
            conn.as_mut().await
        }
    };
    if let Err(err) = result {
        tracing::debug!("failed to serve connection {remote_addr}: {err:#}");
    }

    tracing::debug!("client connection {remote_addr} closed");

    // Dropping the receiver tells the owner of the sender this task is done.
    drop(close_rx);
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
