// src/server.rs
// In-process mock controller: an axum server dispatching through a runtime route table

use crate::error::{Error, Result};
use axum::Router;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::http::header::LOCATION;
use axum::response::{IntoResponse, Response};
use futures::FutureExt;
use futures::future::BoxFuture;
use std::any::Any;
use std::future::Future;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// How long `shutdown` waits for the serve task before aborting it
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

type Handler = Arc<dyn Fn(Request) -> BoxFuture<'static, Response> + Send + Sync>;

struct Route {
    pattern: String,
    handler: Handler,
}

/// Request multiplexer for the mock server.
///
/// Routes can be registered at any time, including after the server has
/// started. A pattern ending in `/` matches every path under it; any other
/// pattern matches one path exactly. The longest matching pattern wins.
/// A request for `/x` with only the subtree `/x/` registered gets a 301 to
/// `/x/`.
#[derive(Clone, Default)]
pub struct Mux {
    routes: Arc<RwLock<Vec<Route>>>,
    failures: Arc<Mutex<Vec<String>>>,
}

impl Mux {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `pattern`, replacing any existing handler for it
    pub fn handle_func<F, Fut, R>(&self, pattern: &str, handler: F)
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        if !pattern.starts_with('/') {
            warn!(pattern, "Mock route pattern does not start with '/'; it will never match");
        }

        let handler = Arc::new(handler);
        let boxed: Handler = Arc::new(move |request: Request| {
            let handler = Arc::clone(&handler);
            async move { handler(request).await.into_response() }.boxed()
        });

        let mut routes = self.routes.write().unwrap_or_else(|e| e.into_inner());
        match routes.iter_mut().find(|route| route.pattern == pattern) {
            Some(route) => {
                debug!(pattern, "Replacing mock route");
                route.handler = boxed;
            }
            None => {
                debug!(pattern, "Registering mock route");
                routes.push(Route {
                    pattern: pattern.to_string(),
                    handler: boxed,
                });
            }
        }
    }

    /// Patterns currently registered, in registration order
    pub fn patterns(&self) -> Vec<String> {
        self.routes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|route| route.pattern.clone())
            .collect()
    }

    /// Panics caught while running handlers, oldest first
    pub fn failures(&self) -> Vec<String> {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Axum router that sends every request through this mux
    pub fn router(&self) -> Router {
        let mux = self.clone();
        Router::new().fallback(move |request: Request| mux.clone().dispatch(request))
    }

    fn lookup(&self, path: &str) -> Option<Handler> {
        let routes = self.routes.read().unwrap_or_else(|e| e.into_inner());
        routes
            .iter()
            .filter(|route| pattern_matches(&route.pattern, path))
            .max_by_key(|route| route.pattern.len())
            .map(|route| Arc::clone(&route.handler))
    }

    /// True when `path` has no route of its own but `path/` is a registered subtree
    fn redirects_to_subtree(&self, path: &str) -> bool {
        let routes = self.routes.read().unwrap_or_else(|e| e.into_inner());
        let subtree = format!("{path}/");
        !routes.iter().any(|route| route.pattern == path)
            && routes.iter().any(|route| route.pattern == subtree)
    }

    async fn dispatch(self, request: Request) -> Response {
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        if self.redirects_to_subtree(&path) {
            let location = match request.uri().query() {
                Some(query) => format!("{path}/?{query}"),
                None => format!("{path}/"),
            };
            debug!(%method, %path, %location, "Redirecting to subtree pattern");
            return (StatusCode::MOVED_PERMANENTLY, [(LOCATION, location)]).into_response();
        }

        let Some(handler) = self.lookup(&path) else {
            debug!(%method, %path, "No mock route registered");
            return (StatusCode::NOT_FOUND, "404 page not found\n").into_response();
        };

        match AssertUnwindSafe(handler(request)).catch_unwind().await {
            Ok(response) => response,
            Err(panic) => {
                let message = format!("{method} {path}: {}", panic_message(panic.as_ref()));
                error!(%method, %path, "Mock handler panicked");
                self.failures
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .push(message.clone());
                (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
            }
        }
    }
}

fn pattern_matches(pattern: &str, path: &str) -> bool {
    if pattern.ends_with('/') {
        path.starts_with(pattern)
    } else {
        path == pattern
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

/// Mock HTTP server listening on an ephemeral localhost port.
///
/// The server stops on [`TestServer::close`], [`TestServer::shutdown`] or
/// drop. Closing more than once is a no-op.
pub struct TestServer {
    pub mux: Mux,
    addr: SocketAddr,
    url: String,
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl TestServer {
    /// Start a server with an empty route table
    pub async fn start() -> Result<Self> {
        Self::start_with_mux(Mux::new()).await
    }

    /// Start a server that dispatches through `mux`
    pub async fn start_with_mux(mux: Mux) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(Error::Bind)?;
        let addr = listener.local_addr().map_err(Error::Bind)?;
        let url = format!("http://{addr}");

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = mux.router();
        let task = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = result {
                warn!(error = %e, "Mock server stopped with error");
            }
        });

        info!(%url, "Mock server listening");

        Ok(Self {
            mux,
            addr,
            url,
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            task: Mutex::new(Some(task)),
        })
    }

    /// Base URL, e.g. `http://127.0.0.1:54321`
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Full URL for `path` on this server
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.url, path)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Shorthand for `self.mux.handle_func`
    pub fn handle_func<F, Fut, R>(&self, pattern: &str, handler: F)
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        self.mux.handle_func(pattern, handler);
    }

    /// Signal the server to stop accepting connections
    pub fn close(&self) {
        let sender = self
            .shutdown_tx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(sender) = sender {
            let _ = sender.send(());
            info!(url = %self.url, "Mock server closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown_tx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_none()
    }

    /// Close the server and wait for in-flight connections to finish
    pub async fn shutdown(&self) {
        self.close();
        let task = self.task.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(task) = task {
            let abort = task.abort_handle();
            if tokio::time::timeout(SHUTDOWN_TIMEOUT, task).await.is_err() {
                warn!(url = %self.url, "Mock server did not stop in time; aborting");
                abort.abort();
            }
        }
    }

    /// Panics caught in route handlers so far
    pub fn handler_failures(&self) -> Vec<String> {
        self.mux.failures()
    }

    /// Fail the calling test if any route handler panicked
    pub fn assert_no_handler_failures(&self) {
        let failures = self.handler_failures();
        if !failures.is_empty() {
            panic!(
                "{} mock handler failure(s):\n{}",
                failures.len(),
                failures.join("\n")
            );
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.close();
    }
}
