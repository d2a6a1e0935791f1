//! HTTP control-plane API — a thin translator from JSON requests to
//! `ControlPlane` operations (§6). No Swagger, no JWT: a single
//! `X-Api-Key` header check stands in for authorization, per §1's
//! "authorization beyond a single static control-plane key" non-goal.

pub mod auth;
pub mod dto;
pub mod handlers;
pub mod router;

pub use router::{build_router, AppState};
