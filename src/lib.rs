//! Keygate - Per-key Request Rate Governor
//!
//! This crate implements a rate governor that sits in front of an HTTP
//! request pipeline. Every request carries a key (an API key header by
//! default); each key may make a fixed number of requests per window and
//! callers over quota are rejected with `429 Too Many Requests`.

pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod ratelimit;
