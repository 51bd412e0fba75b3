//! HTTP API for submitting and polling jobs

pub mod routes;
pub mod server;

pub use server::{router, ApiServer};
