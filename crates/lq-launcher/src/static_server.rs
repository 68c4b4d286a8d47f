//! Static frontend server (packaged mode)
//!
//! Serves the exported frontend bundle from disk over loopback HTTP. Any
//! request that doesn't match a file on disk falls back to the root index
//! document so client-side routing survives direct navigation and refresh.
//! The bundle itself is produced by an external build step; the only
//! precondition checked here is the presence of the index document.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use lq_core::{LauncherError, PortBinding};

/// Root index document required at the top of the bundle
const INDEX_FILE: &str = "index.html";

/// Handle owning the bound listener and the serve task
#[derive(Debug)]
pub struct StaticServer {
    addr: SocketAddr,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl StaticServer {
    /// Bind the negotiated port on loopback and start serving `root`.
    ///
    /// Fails with `StaticAssetMissing` before any network resource is
    /// opened if the index document is absent, and with `PortBind` if the
    /// pre-allocated port was snatched between allocation and bind (the
    /// accepted allocator race).
    pub async fn start(root: PathBuf, binding: &PortBinding) -> Result<Self, LauncherError> {
        if !root.join(INDEX_FILE).is_file() {
            return Err(LauncherError::StaticAssetMissing { root });
        }

        let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, binding.port))
            .await
            .map_err(|source| LauncherError::PortBind {
                requested: binding.requested,
                source,
            })?;
        let addr = listener.local_addr()?;

        let app = Router::new()
            .fallback(serve_asset)
            .with_state(Arc::new(root));

        let cancel = CancellationToken::new();
        let shutdown = cancel.clone().cancelled_owned();
        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                tracing::error!("Static server error: {}", e);
            }
        });

        tracing::info!("Static frontend served at http://{}", addr);

        Ok(Self { addr, cancel, task })
    }

    /// The bound loopback address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The origin the UI window should navigate to
    pub fn origin(&self) -> String {
        format!("http://127.0.0.1:{}", self.addr.port())
    }

    /// Close the listener and wait for the serve task to finish
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!("Static server task did not shut down cleanly: {}", e);
        }
        tracing::info!("Static server stopped");
    }
}

/// Serve a file by relative path, or the index document for anything else
async fn serve_asset(State(root): State<Arc<PathBuf>>, uri: Uri) -> Response {
    let relative = uri.path().trim_start_matches('/');

    if let Some(path) = resolve_request_path(&root, relative) {
        if path.is_file() {
            return file_response(&path).await;
        }
    }

    // SPA fallback: unmatched (or unsafe) paths get the index document
    file_response(&root.join(INDEX_FILE)).await
}

/// Map a request path onto the bundle directory.
///
/// Only plain path segments are accepted; anything containing parent or
/// root components is rejected so requests can never escape the bundle.
fn resolve_request_path(root: &Path, relative: &str) -> Option<PathBuf> {
    if relative.is_empty() {
        return Some(root.join(INDEX_FILE));
    }

    let mut path = root.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(segment) => path.push(segment),
            _ => return None,
        }
    }
    Some(path)
}

async fn file_response(path: &Path) -> Response {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            (
                [(header::CONTENT_TYPE, mime.as_ref().to_string())],
                Body::from(bytes),
            )
                .into_response()
        }
        Err(e) => {
            tracing::warn!("Failed to read asset {:?}: {}", path, e);
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn make_bundle() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), "<html>shell</html>").unwrap();
        fs::write(dir.path().join("foo.txt"), "plain contents").unwrap();
        fs::create_dir_all(dir.path().join("assets")).unwrap();
        fs::write(dir.path().join("assets/app.js"), "console.log(1)").unwrap();
        dir
    }

    async fn start_on_ephemeral(root: PathBuf) -> StaticServer {
        StaticServer::start(root, &PortBinding::new(0, 0))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_serves_file_by_relative_path() {
        let bundle = make_bundle();
        let server = start_on_ephemeral(bundle.path().to_path_buf()).await;

        let body = reqwest::get(format!("{}/foo.txt", server.origin()))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "plain contents");

        server.stop().await;
    }

    #[tokio::test]
    async fn test_nested_asset_and_content_type() {
        let bundle = make_bundle();
        let server = start_on_ephemeral(bundle.path().to_path_buf()).await;

        let response = reqwest::get(format!("{}/assets/app.js", server.origin()))
            .await
            .unwrap();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(content_type.contains("javascript"), "{}", content_type);

        server.stop().await;
    }

    #[tokio::test]
    async fn test_spa_fallback_for_unmatched_route() {
        let bundle = make_bundle();
        let server = start_on_ephemeral(bundle.path().to_path_buf()).await;

        let body = reqwest::get(format!("{}/nonexistent/route", server.origin()))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "<html>shell</html>");

        server.stop().await;
    }

    #[tokio::test]
    async fn test_root_serves_index() {
        let bundle = make_bundle();
        let server = start_on_ephemeral(bundle.path().to_path_buf()).await;

        let body = reqwest::get(server.origin())
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "<html>shell</html>");

        server.stop().await;
    }

    #[tokio::test]
    async fn test_traversal_cannot_escape_bundle() {
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("secret.txt"), "secret").unwrap();
        let bundle_dir = outside.path().join("bundle");
        fs::create_dir_all(&bundle_dir).unwrap();
        fs::write(bundle_dir.join("index.html"), "<html>shell</html>").unwrap();

        let server = start_on_ephemeral(bundle_dir).await;

        let body = reqwest::get(format!("{}/..%2Fsecret.txt", server.origin()))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_ne!(body, "secret");

        server.stop().await;
    }

    #[tokio::test]
    async fn test_bind_race_reports_preferred_port() {
        let bundle = make_bundle();

        // Snatch the negotiated port so the server's bind loses the race
        let holder = std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let taken = holder.local_addr().unwrap().port();

        let err = StaticServer::start(
            bundle.path().to_path_buf(),
            &PortBinding::new(5173, taken),
        )
        .await
        .unwrap_err();

        // The error names the original preference, not the fallback that
        // happened to lose the race
        match err {
            LauncherError::PortBind { requested, .. } => assert_eq!(requested, 5173),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_index_is_fatal_before_bind() {
        let dir = TempDir::new().unwrap();
        let err = StaticServer::start(dir.path().to_path_buf(), &PortBinding::new(0, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::StaticAssetMissing { .. }));
    }
}
