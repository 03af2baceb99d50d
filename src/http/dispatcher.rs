//! Ordered middleware dispatch.
//!
//! # Responsibilities
//! - Run the registered middleware in order for every request
//! - Stop as soon as the response is finished or the connection destroyed
//! - Contain middleware faults (errors and panics) at the request boundary
//!
//! # Design Decisions
//! - A fault before the head is committed becomes a 500 with a diagnostic body
//! - A fault after the head is committed is logged; the partial response is closed out
//! - The chain stops after a fault
//! - A request nobody answers gets a 404

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::http::StatusCode;
use futures_util::FutureExt;

use crate::http::{HostRequest, ResponseWriter};
use crate::middleware::Middleware;

/// Owns the middleware chain. Built once per host and shared by every run.
#[derive(Clone, Default)]
pub struct Dispatcher {
    middleware: Vec<Arc<dyn Middleware>>,
}

impl Dispatcher {
    pub fn new(middleware: Vec<Arc<dyn Middleware>>) -> Self {
        Self { middleware }
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    /// Dispatch one request through the chain.
    pub async fn handle(&self, request: &HostRequest, response: &mut ResponseWriter) {
        for middleware in &self.middleware {
            if response.is_finished() || response.is_destroyed() {
                return;
            }

            let outcome = AssertUnwindSafe(middleware.process(request, response))
                .catch_unwind()
                .await;

            let diagnostic = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e.to_string(),
                Err(panic) => panic_message(panic.as_ref()),
            };

            if response.headers_sent() {
                tracing::error!(
                    request_id = %request.id,
                    middleware = middleware.name(),
                    error = %diagnostic,
                    "Middleware failed after response started"
                );
                response.finalize();
            } else {
                tracing::error!(
                    request_id = %request.id,
                    middleware = middleware.name(),
                    error = %diagnostic,
                    "Middleware failed"
                );
                response.fail(&diagnostic);
            }
            return;
        }

        if !response.is_finished() && !response.is_destroyed() {
            if response.headers_sent() {
                response.finalize();
            } else {
                tracing::debug!(request_id = %request.id, path = %request.path(), "No middleware answered");
                // Pending responses always accept a send.
                let _ = response.send(StatusCode::NOT_FOUND, "text/plain", "404 Not Found");
            }
        }
    }
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {}", s)
    } else {
        "panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::MiddlewareError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Copy)]
    enum Behavior {
        Pass,
        Answer,
        Fail,
        Panic,
        WriteThenFail,
        Destroy,
    }

    struct Scripted {
        behavior: Behavior,
        calls: Arc<AtomicUsize>,
    }

    impl Scripted {
        fn new(behavior: Behavior) -> (Arc<dyn Middleware>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let scripted = Scripted {
                behavior,
                calls: calls.clone(),
            };
            (Arc::new(scripted), calls)
        }
    }

    #[async_trait]
    impl Middleware for Scripted {
        async fn process(
            &self,
            _request: &HostRequest,
            response: &mut ResponseWriter,
        ) -> Result<(), MiddlewareError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Pass => Ok(()),
                Behavior::Answer => {
                    response.send(StatusCode::OK, "text/plain", "answered")?;
                    Ok(())
                }
                Behavior::Fail => Err(MiddlewareError::msg("boom")),
                Behavior::Panic => panic!("kaboom"),
                Behavior::WriteThenFail => {
                    response.write("partial")?;
                    Err(MiddlewareError::msg("late failure"))
                }
                Behavior::Destroy => {
                    response.destroy();
                    Ok(())
                }
            }
        }
    }

    #[tokio::test]
    async fn completed_response_short_circuits_chain() {
        let (first, first_calls) = Scripted::new(Behavior::Pass);
        let (second, second_calls) = Scripted::new(Behavior::Answer);
        let (third, third_calls) = Scripted::new(Behavior::Answer);
        let dispatcher = Dispatcher::new(vec![first, second, third]);

        let mut res = ResponseWriter::new();
        dispatcher.handle(&HostRequest::get("/"), &mut res).await;

        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
        assert_eq!(third_calls.load(Ordering::SeqCst), 0);
        assert_eq!(res.body(), b"answered");
    }

    #[tokio::test]
    async fn destroyed_connection_short_circuits_chain() {
        let (first, _) = Scripted::new(Behavior::Destroy);
        let (second, second_calls) = Scripted::new(Behavior::Answer);
        let dispatcher = Dispatcher::new(vec![first, second]);

        let mut res = ResponseWriter::new();
        dispatcher.handle(&HostRequest::get("/"), &mut res).await;

        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
        assert!(res.is_destroyed());
    }

    #[tokio::test]
    async fn error_before_head_becomes_500() {
        let (failing, _) = Scripted::new(Behavior::Fail);
        let (after, after_calls) = Scripted::new(Behavior::Answer);
        let dispatcher = Dispatcher::new(vec![failing, after]);

        let mut res = ResponseWriter::new();
        dispatcher.handle(&HostRequest::get("/"), &mut res).await;

        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(String::from_utf8_lossy(res.body()).contains("boom"));
        assert_eq!(after_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn panic_is_contained() {
        let (panicking, _) = Scripted::new(Behavior::Panic);
        let dispatcher = Dispatcher::new(vec![panicking]);

        let mut res = ResponseWriter::new();
        dispatcher.handle(&HostRequest::get("/"), &mut res).await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(String::from_utf8_lossy(res.body()).contains("kaboom"));

        // The dispatcher is still usable afterwards.
        let mut again = ResponseWriter::new();
        dispatcher.handle(&HostRequest::get("/"), &mut again).await;
        assert_eq!(again.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn error_after_head_keeps_partial_response() {
        let (late, _) = Scripted::new(Behavior::WriteThenFail);
        let dispatcher = Dispatcher::new(vec![late]);

        let mut res = ResponseWriter::new();
        dispatcher.handle(&HostRequest::get("/"), &mut res).await;

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.body(), b"partial");
        assert!(res.is_finished());
    }

    #[tokio::test]
    async fn unanswered_request_is_404() {
        let (pass, _) = Scripted::new(Behavior::Pass);
        let dispatcher = Dispatcher::new(vec![pass]);

        let mut res = ResponseWriter::new();
        dispatcher.handle(&HostRequest::get("/nowhere"), &mut res).await;

        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
