// ABOUTME: Platform module - client abstraction for the remote hosting platform.
// ABOUTME: Defines wire types, the client trait, and the HTTP implementation.

mod client;
mod http;
mod types;

pub use client::*;
pub use http::*;
pub use types::*;
