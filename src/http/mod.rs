//! HTTP request pipeline in front of the rate governor.

mod key;
mod middleware;
mod rejection;
mod routes;
mod server;

pub use key::ClientKey;
pub use middleware::{enforce_rate_limit, GateState};
pub use rejection::Rejection;
pub use routes::default_routes;
pub use server::{build_router, HttpServer};
