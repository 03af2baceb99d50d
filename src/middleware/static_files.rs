//! Static file serving with SPA fallback.
//!
//! Files under `root` are served as-is; HTML routes (`/` or any path without an
//! extension) and missing files fall back to the index document so the client-side
//! router can take over.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use axum::http::StatusCode;

use crate::http::{HostRequest, ResponseWriter};
use crate::middleware::{Middleware, MiddlewareError};

pub struct StaticFiles {
    root: PathBuf,
    index: PathBuf,
}

impl StaticFiles {
    pub fn new<P: Into<PathBuf>, I: Into<PathBuf>>(root: P, index: I) -> Self {
        Self {
            root: root.into(),
            index: index.into(),
        }
    }

    fn map_path(&self, url_path: &str) -> Option<PathBuf> {
        let mut pb = self.root.clone();
        for comp in Path::new(url_path.trim_start_matches('/')).components() {
            match comp {
                Component::Normal(s) => pb.push(s),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(pb)
    }

    fn is_html_route(url_path: &str) -> bool {
        url_path == "/" || Path::new(url_path).extension().is_none()
    }

    fn content_type(path: &Path) -> &'static str {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase()
            .as_str()
        {
            "html" => "text/html",
            "js" => "application/javascript",
            "css" => "text/css",
            "json" => "application/json",
            "png" => "image/png",
            "jpg" => "image/jpeg",
            "gif" => "image/gif",
            "svg" => "image/svg+xml",
            "ico" => "image/x-icon",
            _ => "text/html",
        }
    }

    async fn serve_index(&self, response: &mut ResponseWriter) -> Result<(), MiddlewareError> {
        let index = self.root.join(&self.index);
        match tokio::fs::read(&index).await {
            Ok(bytes) => response.send(StatusCode::OK, "text/html", bytes)?,
            Err(e) => {
                tracing::error!(path = ?index, error = %e, "Failed to read index document");
                response.send(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "text/plain",
                    format!("Internal Server Error\n{}", e),
                )?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Middleware for StaticFiles {
    fn name(&self) -> &str {
        "static_files"
    }

    async fn process(
        &self,
        request: &HostRequest,
        response: &mut ResponseWriter,
    ) -> Result<(), MiddlewareError> {
        let url_path = request.path();
        if Self::is_html_route(url_path) {
            return self.serve_index(response).await;
        }

        let Some(path) = self.map_path(url_path) else {
            return self.serve_index(response).await;
        };

        if !tokio::fs::metadata(&path).await.map(|m| m.is_file()).unwrap_or(false) {
            return self.serve_index(response).await;
        }

        match tokio::fs::read(&path).await {
            Ok(bytes) => response.send(StatusCode::OK, Self::content_type(&path), bytes)?,
            Err(e) => {
                tracing::warn!(path = ?path, error = %e, "Failed to read static file");
                response.send(StatusCode::NOT_FOUND, "text/plain", "404 Not Found")?;
            }
        }
        Ok(())
    }
}
