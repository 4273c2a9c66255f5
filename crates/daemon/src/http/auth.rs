// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bearer-token admin auth, as a `tower::Layer`/`Service` pair wrapping
//! every route except `/health` and `OPTIONS` preflight (§4.9, §6.1).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::response::IntoResponse;
use core_wire::{ApiError, ApiErrorKind};
use tower::{Layer, Service};

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

#[derive(Clone)]
pub struct BearerAuthLayer {
    token: Option<Arc<String>>,
}

impl BearerAuthLayer {
    /// `token = None` disables auth entirely (local dev only; never set
    /// in a real deployment).
    pub fn new(token: Option<String>) -> Self {
        Self { token: token.map(Arc::new) }
    }
}

impl<S> Layer<S> for BearerAuthLayer {
    type Service = BearerAuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BearerAuthMiddleware { inner, token: self.token.clone() }
    }
}

#[derive(Clone)]
pub struct BearerAuthMiddleware<S> {
    inner: S,
    token: Option<Arc<String>>,
}

impl<S> Service<Request<Body>> for BearerAuthMiddleware<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Error: Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = BoxFuture<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let Some(expected) = self.token.clone() else {
            let mut inner = self.inner.clone();
            return Box::pin(async move { inner.call(req).await });
        };

        // CORS preflight and the health probe never require a token.
        if req.method() == Method::OPTIONS || req.uri().path() == "/health" {
            let mut inner = self.inner.clone();
            return Box::pin(async move { inner.call(req).await });
        }

        let supplied = req
            .headers()
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));

        if supplied == Some(expected.as_str()) {
            let mut inner = self.inner.clone();
            Box::pin(async move { inner.call(req).await })
        } else {
            Box::pin(async move {
                let body = ApiError::new(ApiErrorKind::Unauthorized, "missing or invalid bearer token");
                Ok((StatusCode::UNAUTHORIZED, axum::Json(body)).into_response())
            })
        }
    }
}
