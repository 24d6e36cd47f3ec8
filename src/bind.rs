//! Bind-source directives and their resolution into a per-route plan.

/// One data source a route declares for populating its DTO.
///
/// Declared once at route registration and immutable for the route's
/// lifetime. Declaring no sources at all selects bind-all mode: body, query
/// and path are attempted and no context keys are pulled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindSource {
    /// Decode the JSON request body.
    Body,
    /// Decode the query string.
    Query,
    /// Decode the matched route path parameters.
    Path,
    /// Copy fields from a value stored under this key in request extensions
    /// (see [`BindValues`](crate::BindValues)).
    Context(String),
}

impl BindSource {
    /// Shorthand for [`BindSource::Context`].
    pub fn context(key: impl Into<String>) -> Self {
        Self::Context(key.into())
    }
}

/// The concrete resolution of a directive list, computed once per route
/// registration, never per request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionPlan {
    pub body: bool,
    pub query: bool,
    pub path: bool,
    /// Context keys in declaration order; duplicates are kept and each is
    /// applied independently.
    pub context_keys: Vec<String>,
}

impl ResolutionPlan {
    /// Resolve a directive list. Pure and total over its input.
    ///
    /// An empty list means bind-all: every structural source is active. A
    /// non-empty list activates exactly what it names, so a context-only
    /// declaration suppresses body/query/path instead of collapsing to
    /// "bind nothing".
    pub fn resolve(directives: &[BindSource]) -> Self {
        if directives.is_empty() {
            return Self {
                body: true,
                query: true,
                path: true,
                context_keys: Vec::new(),
            };
        }
        let mut plan = Self::default();
        for directive in directives {
            match directive {
                BindSource::Body => plan.body = true,
                BindSource::Query => plan.query = true,
                BindSource::Path => plan.path = true,
                BindSource::Context(key) => plan.context_keys.push(key.clone()),
            }
        }
        plan
    }
}
