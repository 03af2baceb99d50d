//! Response building for the middleware chain.
//!
//! # Responsibilities
//! - Let middleware set status/headers and write the body incrementally
//! - Track whether the head has been committed and whether the response is done
//! - Convert the finished writer into an axum response
//!
//! # Design Decisions
//! - Once anything is written the head is committed; status/headers become immutable
//! - Writes after `end` are rejected, not silently dropped

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Misuse of a [`ResponseWriter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResponseError {
    #[error("response head already sent")]
    HeadersSent,

    #[error("response already finished")]
    AlreadyFinished,
}

/// Progress of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseState {
    /// Nothing committed; status and headers may still change.
    Pending,
    /// Head committed and some body written.
    Started,
    /// Complete; later middleware must not run.
    Finished,
}

/// Mutable response handed to each middleware in turn.
#[derive(Debug)]
pub struct ResponseWriter {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    state: ResponseState,
    destroyed: bool,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
            state: ResponseState::Pending,
            destroyed: false,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) -> Result<(), ResponseError> {
        self.ensure_pending()?;
        self.status = status;
        Ok(())
    }

    pub fn header(&self, name: &HeaderName) -> Option<&HeaderValue> {
        self.headers.get(name)
    }

    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) -> Result<(), ResponseError> {
        self.ensure_pending()?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// Append to the body, committing the head.
    pub fn write(&mut self, chunk: impl AsRef<[u8]>) -> Result<(), ResponseError> {
        if self.state == ResponseState::Finished {
            return Err(ResponseError::AlreadyFinished);
        }
        self.state = ResponseState::Started;
        self.body.extend_from_slice(chunk.as_ref());
        Ok(())
    }

    /// Write a final chunk and complete the response.
    pub fn end(&mut self, chunk: impl AsRef<[u8]>) -> Result<(), ResponseError> {
        self.write(chunk)?;
        self.state = ResponseState::Finished;
        Ok(())
    }

    /// Set status and content type, then complete with `body`.
    pub fn send(
        &mut self,
        status: StatusCode,
        content_type: &'static str,
        body: impl AsRef<[u8]>,
    ) -> Result<(), ResponseError> {
        self.set_status(status)?;
        self.set_header(CONTENT_TYPE, HeaderValue::from_static(content_type))?;
        self.end(body)
    }

    /// Abandon the request. No further middleware runs; anything written so far
    /// is discarded and the client gets a bare `400` with `Connection: close`.
    pub fn destroy(&mut self) {
        self.destroyed = true;
    }

    pub fn state(&self) -> ResponseState {
        self.state
    }

    pub fn headers_sent(&self) -> bool {
        self.state != ResponseState::Pending
    }

    pub fn is_finished(&self) -> bool {
        self.state == ResponseState::Finished
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    fn ensure_pending(&self) -> Result<(), ResponseError> {
        match self.state {
            ResponseState::Pending => Ok(()),
            ResponseState::Started => Err(ResponseError::HeadersSent),
            ResponseState::Finished => Err(ResponseError::AlreadyFinished),
        }
    }

    /// Replace an uncommitted response with a 500 carrying `diagnostic`.
    pub(crate) fn fail(&mut self, diagnostic: &str) {
        self.status = StatusCode::INTERNAL_SERVER_ERROR;
        self.headers.clear();
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        self.body = format!("Internal Server Error\n{}", diagnostic).into_bytes();
        self.state = ResponseState::Finished;
    }

    /// Close out whatever has been written so far.
    pub(crate) fn finalize(&mut self) {
        self.state = ResponseState::Finished;
    }
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl IntoResponse for ResponseWriter {
    fn into_response(self) -> Response {
        if self.destroyed {
            return (StatusCode::BAD_REQUEST, [(axum::http::header::CONNECTION, "close")]).into_response();
        }
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
