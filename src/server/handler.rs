// src/server/handler.rs
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Body, Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::sync::Arc;
use tower::Service;

use super::response::HealthResponse;
use crate::health::{DependencyDescriptor, HealthChecker};

/// Answers `GET <path>` with a fresh check of every registered dependency.
#[derive(Clone)]
pub struct HealthHandler {
    checker: Arc<HealthChecker>,
    deps: Arc<Vec<DependencyDescriptor>>,
    path: Arc<str>,
}

impl HealthHandler {
    pub fn new(
        checker: Arc<HealthChecker>,
        deps: Vec<DependencyDescriptor>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            checker,
            deps: Arc::new(deps),
            path: Arc::from(path.into()),
        }
    }

    pub async fn handle(&self, req: Request<Body>) -> Response<Body> {
        if req.uri().path() != &*self.path {
            return text_response(StatusCode::NOT_FOUND, "Not Found");
        }
        if req.method() != Method::GET {
            return text_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
        }

        let (status, results) = self.checker.check_deps(&self.deps).await;
        let report = HealthResponse::new(status, results);

        match serde_json::to_vec_pretty(&report) {
            Ok(body) => {
                let mut response = Response::new(Body::from(body));
                *response.status_mut() = report.http_status();
                response
                    .headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                response
            }
            Err(e) => {
                tracing::error!(%e, "failed to encode health response");
                text_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        }
    }
}

fn text_response(status: StatusCode, message: &'static str) -> Response<Body> {
    let mut response = Response::new(Body::from(message));
    *response.status_mut() = status;
    response
}

impl Service<Request<Body>> for HealthHandler {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = futures::future::BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let handler = self.clone();
        Box::pin(async move { Ok(handler.handle(req).await) })
    }
}
