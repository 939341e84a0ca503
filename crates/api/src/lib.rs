//! `spendgate-api` — HTTP surface over the access engine.
//!
//! Thin axum layer: identity arrives pre-authenticated from the gateway as
//! request headers; every handler passes an explicit [`context`] into the
//! service facade. No resolver logic lives here.

pub mod app;
pub mod context;
pub mod errors;
pub mod middleware;
