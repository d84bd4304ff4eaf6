//! Request and response bodies of the HTTP API.

pub mod chat;
pub mod dream;
