//! Adapting a typed DTO handler into a native axum handler.

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use axum::extract::{FromRequestParts, RawPathParams, Request};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::bind::{BindSource, ResolutionPlan};
use crate::context::BindValues;
use crate::envelope::IntoEnvelope;
use crate::error::{BindError, Rejection};
use crate::format::Formatters;
use crate::pipeline::{bind_dto, EmptyBodyPolicy, RawRequest};
use crate::request::Bindable;

type AdapterFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Convert a typed handler into an axum handler, binding from the given
/// sources (none means bind-all).
///
/// ```rust,ignore
/// Router::new().route("/users", post(to(create_user, [BindSource::Body])));
/// ```
///
/// This is the one-line form of [`Adapter`]; reach for the builder when a
/// route needs explicit formatters or a different empty-body policy.
pub fn to<T, H, Fut, R>(
    handler: H,
    sources: impl IntoIterator<Item = BindSource>,
) -> impl Fn(Request) -> AdapterFuture + Clone + Send + Sync + 'static
where
    T: Bindable,
    H: Fn(T) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoEnvelope,
{
    Adapter::new(handler).sources(sources).into_handler()
}

/// Builder for an adapted route handler.
///
/// Carries the resolution plan (computed once here, not per request), an
/// optional explicit [`Formatters`] set overriding the process-wide one, and
/// the empty-body policy.
pub struct Adapter<T, H> {
    handler: H,
    plan: ResolutionPlan,
    formatters: Option<Formatters>,
    empty_body: EmptyBodyPolicy,
    _dto: PhantomData<fn() -> T>,
}

impl<T, H, Fut, R> Adapter<T, H>
where
    T: Bindable,
    H: Fn(T) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoEnvelope,
{
    /// Start from a handler in bind-all mode.
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            plan: ResolutionPlan::resolve(&[]),
            formatters: None,
            empty_body: EmptyBodyPolicy::default(),
            _dto: PhantomData,
        }
    }

    /// Declare the bind sources for this route.
    pub fn sources(mut self, sources: impl IntoIterator<Item = BindSource>) -> Self {
        let directives: Vec<BindSource> = sources.into_iter().collect();
        self.plan = ResolutionPlan::resolve(&directives);
        self
    }

    /// Use an explicit formatter set instead of the process-wide one.
    pub fn formatters(mut self, formatters: Formatters) -> Self {
        self.formatters = Some(formatters);
        self
    }

    pub fn empty_body(mut self, policy: EmptyBodyPolicy) -> Self {
        self.empty_body = policy;
        self
    }

    /// Finish the build: the returned closure is a native axum handler.
    pub fn into_handler(
        self,
    ) -> impl Fn(Request) -> AdapterFuture + Clone + Send + Sync + 'static {
        let Self {
            handler,
            plan,
            formatters,
            empty_body,
            ..
        } = self;
        let plan = Arc::new(plan);
        move |request: Request| {
            let handler = handler.clone();
            let plan = Arc::clone(&plan);
            let formatters = formatters.clone();
            Box::pin(async move { serve(request, handler, &plan, formatters, empty_body).await })
                as AdapterFuture
        }
    }
}

/// One request through the adapter: bind, invoke, resolve status, format.
///
/// Every failure is turned into a well-formed JSON response here; nothing
/// escapes the adapter boundary.
async fn serve<T, H, Fut, R>(
    request: Request,
    handler: H,
    plan: &ResolutionPlan,
    formatters: Option<Formatters>,
    empty_body: EmptyBodyPolicy,
) -> Response
where
    T: Bindable,
    H: Fn(T) -> Fut,
    Fut: Future<Output = R> + Send,
    R: IntoEnvelope,
{
    let formatters = formatters.unwrap_or_else(Formatters::current);
    let (mut parts, body) = request.into_parts();

    // Absent on routes without params; encoding faults surface at extraction.
    let path_params: Vec<(String, String)> =
        match RawPathParams::from_request_parts(&mut parts, &()).await {
            Ok(params) => params
                .iter()
                .map(|(key, value)| (key.to_owned(), value.to_owned()))
                .collect(),
            Err(_) => Vec::new(),
        };

    // Body size limits belong to the surrounding server (tower-http's
    // RequestBodyLimitLayer); the adapter reads whatever it is given.
    let body = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            let err = BindError::Body(err.to_string());
            return Rejection {
                status: err.status(),
                body: (formatters.error)(&err),
            }
            .into_response();
        }
    };

    let raw = RawRequest {
        query: parts.uri.query(),
        path_params: &path_params,
        body: &body,
        context: parts.extensions.get::<BindValues>(),
    };

    let dto = match bind_dto::<T>(plan, &raw, empty_body, &formatters) {
        Ok(dto) => dto,
        Err(rejection) => return rejection.into_response(),
    };

    let mut envelope = match handler(dto).await.into_envelope() {
        Ok(envelope) => envelope,
        Err(err) => {
            return Rejection {
                status: err.status,
                body: (formatters.error)(&err),
            }
            .into_response()
        }
    };

    let status = envelope.resolve_status(&parts.method);
    let body = (formatters.response)(&envelope);
    (status, Json(body)).into_response()
}
