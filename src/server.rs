//! HTTP front end
//!
//! Routes:
//! - `GET /` redirects to the top directory
//! - `GET /file/` and `GET /file/<path>` show a directory or a file
//! - `GET /search?sym=...&dir=...` runs a symbol search
//!
//! Pages render on a blocking worker into a bounded channel that feeds the
//! response body, so a big file or search streams out as it is produced.
//! Anything that can fail before the first byte (bad path, missing file) is
//! checked up front and answered with a proper status code.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_TYPE, LOCATION};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info};

use crate::backends::{Backend, FileSet};
use crate::core::error::{BrowseError, Result};
use crate::core::links::{encode_path, Links};
use crate::core::paths::RelativePath;
use crate::core::render::Sink;
use crate::flows::search::sym_search;
use crate::flows::show::{resolve_target, show_dir, show_file, Target};

const HTML: &str = "text/html; charset=utf-8";

/// Bytes buffered by the render worker before a chunk is sent
const CHUNK_SIZE: usize = 8 * 1024;

/// Chunks in flight between the render worker and the response body
const CHANNEL_DEPTH: usize = 16;

/// Shared, read-only state of the server
pub struct AppState {
    pub fileset: Backend,
    pub links: Links,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/search", get(search))
        .route("/file/", get(file_root))
        .route("/file/*path", get(file))
        .fallback(not_found)
        .with_state(state)
}

/// Bind and serve until Ctrl-C
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    info!(
        addr = %local,
        backend = state.fileset.kind(),
        "Listening on http://{}/",
        local
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

/// Error page with a status code
#[derive(Debug)]
pub struct PageError {
    status: StatusCode,
    message: String,
}

impl PageError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let body = format!(
            "<title>{}</title>{}: {}\n",
            self.status,
            self.status,
            html_escape::encode_text(&self.message)
        );
        (self.status, [(CONTENT_TYPE, HTML)], body).into_response()
    }
}

impl From<BrowseError> for PageError {
    fn from(err: BrowseError) -> Self {
        let status = match &err {
            BrowseError::NotFound(_) => StatusCode::NOT_FOUND,
            _ if err.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %err, "request failed");
        }
        Self::new(status, err.to_string())
    }
}

/// Sink sending rendered HTML to the response body in chunks
struct ChannelSink {
    tx: mpsc::Sender<io::Result<Bytes>>,
    buf: String,
}

impl ChannelSink {
    fn new(tx: mpsc::Sender<io::Result<Bytes>>) -> Self {
        Self {
            tx,
            buf: String::with_capacity(CHUNK_SIZE),
        }
    }

    fn send(&self, item: io::Result<Bytes>) -> Result<()> {
        self.tx
            .blocking_send(item)
            .map_err(|_| BrowseError::SinkClosed)
    }

    /// Send what was rendered so far, then an error that aborts the body
    fn abort(&mut self, err: &BrowseError) {
        let _ = self.flush();
        let _ = self.send(Err(io::Error::other(err.to_string())));
    }
}

impl Sink for ChannelSink {
    fn emit(&mut self, chunk: &str) -> Result<()> {
        self.buf.push_str(chunk);
        if self.buf.len() >= CHUNK_SIZE {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let chunk = std::mem::replace(&mut self.buf, String::with_capacity(CHUNK_SIZE));
        self.send(Ok(Bytes::from(chunk)))
    }
}

/// Render on a blocking worker, streaming into the response
fn stream_page<F>(render: F) -> Response
where
    F: FnOnce(&mut dyn Sink) -> Result<()> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);

    tokio::task::spawn_blocking(move || {
        let mut sink = ChannelSink::new(tx);
        match render(&mut sink).and_then(|()| sink.flush()) {
            Ok(()) => {}
            Err(BrowseError::SinkClosed) => debug!("client went away"),
            Err(e) => {
                error!(error = %e, "render failed after response started");
                sink.abort(&e);
            }
        }
    });

    (
        [(CONTENT_TYPE, HTML)],
        Body::from_stream(ReceiverStream::new(rx)),
    )
        .into_response()
}

fn redirect(location: String) -> Response {
    (StatusCode::FOUND, [(LOCATION, location)]).into_response()
}

async fn index(State(state): State<Arc<AppState>>) -> Response {
    redirect(state.links.file_url(""))
}

async fn not_found() -> PageError {
    PageError::not_found("no such page")
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    sym: Option<String>,
    dir: Option<String>,
}

async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> std::result::Result<Response, PageError> {
    let sym = params
        .sym
        .ok_or_else(|| PageError::bad_request("missing search term (sym)"))?;
    let subdir = RelativePath::new(params.dir.as_deref().unwrap_or(""))?;
    info!(sym = %sym, dir = %subdir, "search");

    if !state.fileset.is_dir(&subdir) {
        return Err(BrowseError::NotFound(subdir.to_string()).into());
    }

    Ok(stream_page(move |sink| {
        sym_search(&state.fileset, &state.links, &subdir, &sym, sink)
    }))
}

#[derive(Debug, Deserialize)]
pub struct FileParams {
    sym: Option<String>,
}

async fn file_root(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FileParams>,
) -> std::result::Result<Response, PageError> {
    show(state, String::new(), params).await
}

async fn file(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    Query(params): Query<FileParams>,
) -> std::result::Result<Response, PageError> {
    show(state, path, params).await
}

async fn show(
    state: Arc<AppState>,
    raw_path: String,
    params: FileParams,
) -> std::result::Result<Response, PageError> {
    let path = RelativePath::new(&raw_path)?;
    info!(path = %path, sym = ?params.sym, "file");

    let target = resolve_target(&state.fileset, &path)?;
    if target == Target::Dir && !path.is_root() && !raw_path.ends_with('/') {
        let location = format!(
            "{}/file/{}/",
            state.links.url_root(),
            encode_path(path.as_str())
        );
        return Ok(redirect(location));
    }

    Ok(stream_page(move |sink| match target {
        Target::Dir => show_dir(&state.fileset, &state.links, &path, sink),
        Target::File => show_file(
            &state.fileset,
            &state.links,
            &path,
            params.sym.as_deref(),
            sink,
        ),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::fs::FsFileSet;
    use std::fs;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn start(dir: &TempDir) -> SocketAddr {
        let state = Arc::new(AppState {
            fileset: Backend::Fs(FsFileSet::new(dir.path(), false)),
            links: Links::new(""),
        });
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router(state)).await;
        });
        addr
    }

    /// Raw HTTP/1.0 GET, returning (status code, full response text)
    async fn get(addr: SocketAddr, target: &str) -> (u16, String) {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!(
            "GET {} HTTP/1.0\r\nHost: localhost\r\nConnection: close\r\n\r\n",
            target
        );
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        let text = String::from_utf8_lossy(&response).into_owned();
        let status = text
            .split_whitespace()
            .nth(1)
            .and_then(|s| s.parse().ok())
            .unwrap();
        (status, text)
    }

    fn example_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("foofile"), "foo data!\n").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/inner.c"), "int foo;\n").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_root_redirects() {
        let dir = example_tree();
        let addr = start(&dir).await;
        let (status, text) = get(addr, "/").await;
        assert_eq!(status, 302);
        assert!(text.to_lowercase().contains("location: /file/"));
    }

    #[tokio::test]
    async fn test_directory_listing() {
        let dir = example_tree();
        let addr = start(&dir).await;
        let (status, text) = get(addr, "/file/").await;
        assert_eq!(status, 200);
        assert!(text.contains("<a href='foofile'>foofile</a>"));
        assert!(text.contains("<a href='sub/'>sub/</a>"));
    }

    #[tokio::test]
    async fn test_directory_without_slash_redirects() {
        let dir = example_tree();
        let addr = start(&dir).await;
        let (status, text) = get(addr, "/file/sub").await;
        assert_eq!(status, 302);
        assert!(text.to_lowercase().contains("location: /file/sub/"));

        let (status, text) = get(addr, "/file/sub/").await;
        assert_eq!(status, 200);
        assert!(text.contains("inner.c"));
    }

    #[tokio::test]
    async fn test_file_display() {
        let dir = example_tree();
        let addr = start(&dir).await;
        let (status, text) = get(addr, "/file/foofile?sym=foo").await;
        assert_eq!(status, 200);
        assert!(text.contains("<span class=highlight><a name='line1'></a><strong>foo</strong>"));
    }

    #[tokio::test]
    async fn test_symbol_search() {
        let dir = example_tree();
        let addr = start(&dir).await;
        let (status, text) = get(addr, "/search?sym=foo&dir=sub").await;
        assert_eq!(status, 200);
        assert!(text.contains("<a href='/file/sub/inner.c?sym=foo#line1'>inner.c</a>:"));
        assert!(text.contains("Other symbols found:"));
    }

    #[tokio::test]
    async fn test_errors() {
        let dir = example_tree();
        let addr = start(&dir).await;
        assert_eq!(get(addr, "/file/missing").await.0, 404);
        assert_eq!(get(addr, "/file/sub/../foofile").await.0, 400);
        assert_eq!(get(addr, "/search?sym=foo&dir=..").await.0, 400);
        assert_eq!(get(addr, "/search?dir=sub").await.0, 400);
        assert_eq!(get(addr, "/search?sym=foo&dir=nope").await.0, 404);
        assert_eq!(get(addr, "/elsewhere").await.0, 404);
    }
}
