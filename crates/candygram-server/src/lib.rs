// The relay server: rendezvous and forwarding only. Payloads stay opaque;
// routing happens by public-key header, authentication by signature.

pub mod api;
pub mod auth;
pub mod error;
pub mod registry;

pub use api::{build_router, serve, AppState};
pub use error::ServerError;
pub use registry::Registry;

/// Default listen port for the relay
pub const DEFAULT_PORT: u16 = 8080;
