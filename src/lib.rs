//! # bindkit - typed request binding for axum
//!
//! A small adapter layer that turns a handler over a validated request DTO
//! into a native axum handler. The adapter pulls input from the request body,
//! the query string, the matched path parameters and values placed in request
//! extensions by upstream middleware, merges everything into one DTO, runs
//! domain validation and wraps the handler's result in a pluggable response
//! envelope.
//!
//! ## Example
//!
//! ```rust,ignore
//! use bindkit::{to, Bindable, BindSource, Envelope};
//!
//! #[derive(Default, serde::Serialize, serde::Deserialize)]
//! struct CreateUser {
//!     name: String,
//! }
//!
//! impl Bindable for CreateUser {
//!     type Error = MissingName;
//!     fn validate(&self) -> Result<(), MissingName> {
//!         if self.name.is_empty() { Err(MissingName) } else { Ok(()) }
//!     }
//! }
//!
//! async fn create_user(req: CreateUser) -> Envelope {
//!     Envelope::of(req.name)
//! }
//!
//! let app = axum::Router::new()
//!     .route("/users", axum::routing::post(to(create_user, [BindSource::Body])));
//! ```

pub mod adapter;
pub mod bind;
pub mod context;
pub mod envelope;
pub mod error;
pub mod format;
pub mod pipeline;
pub mod request;

pub use adapter::{to, Adapter};
pub use bind::{BindSource, ResolutionPlan};
pub use context::BindValues;
pub use envelope::{status_for_method, Envelope, IntoEnvelope};
pub use error::{BindError, HttpError, Rejection};
pub use format::{
    set_error_formatter, set_response_formatter, use_raw_error_format, use_raw_response_format,
    ErrorFormatter, Formatters, ResponseFormatter,
};
pub use pipeline::EmptyBodyPolicy;
pub use request::Bindable;
