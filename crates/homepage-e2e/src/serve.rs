//! Static file server for built sites and test fixtures
//!
//! Serves a directory the way static hosts serve a built site: `/blog`
//! resolves to `blog`, `blog.html` or `blog/index.html`, and misses return
//! 404 with the site's `404.html` as the body when it has one.

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// A running static server; stops when dropped
pub struct StaticServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl StaticServer {
    /// Bind an ephemeral port on 127.0.0.1 and serve `root` from a
    /// background thread with its own runtime.
    pub fn start(root: &Path) -> std::io::Result<Self> {
        let listener = StdTcpListener::bind("127.0.0.1:0")?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;

        let root = Arc::new(root.to_path_buf());
        let app = Router::new().fallback(serve_path).with_state(root);
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let join = thread::spawn(move || {
            runtime.block_on(async move {
                let listener = match tokio::net::TcpListener::from_std(listener) {
                    Ok(listener) => listener,
                    Err(err) => {
                        warn!(error = %err, "Static server could not adopt listener");
                        return;
                    }
                };
                let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                });
                if let Err(err) = server.await {
                    warn!(error = %err, "Static server stopped with an error");
                }
            });
        });
        debug!(%addr, "Static server listening");

        Ok(Self {
            addr,
            shutdown: Some(shutdown_tx),
            join: Some(join),
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for StaticServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

async fn serve_path(State(root): State<Arc<PathBuf>>, uri: Uri) -> Response {
    if let Some(file) = resolve(&root, uri.path()) {
        match tokio::fs::read(&file).await {
            Ok(bytes) => return file_response(StatusCode::OK, &file, bytes),
            Err(err) => warn!(path = %file.display(), error = %err, "Failed to read file"),
        }
    }

    let not_found = root.join("404.html");
    match tokio::fs::read(&not_found).await {
        Ok(bytes) => file_response(StatusCode::NOT_FOUND, &not_found, bytes),
        Err(_) => (StatusCode::NOT_FOUND, "Not Found").into_response(),
    }
}

/// Map a request path to a file under `root`
fn resolve(root: &Path, request_path: &str) -> Option<PathBuf> {
    let relative = Path::new(request_path.trim_start_matches('/'));
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }
    let base = root.join(relative);

    if request_path.ends_with('/') {
        let index = base.join("index.html");
        return index.is_file().then_some(index);
    }

    let mut html = base.clone().into_os_string();
    html.push(".html");
    [base.clone(), PathBuf::from(html), base.join("index.html")]
        .into_iter()
        .find(|candidate| candidate.is_file())
}

fn file_response(status: StatusCode, path: &Path, bytes: Vec<u8>) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, content_type(path))],
        Body::from(bytes),
    )
        .into_response()
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("xml") => "application/xml",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("woff2") => "font/woff2",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}
