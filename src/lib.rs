//! Client-side orchestration for the HospiCast forecasting service.
//!
//! The statistical backend lives behind an HTTP API; this crate owns
//! everything in front of it: session lifecycle and persistence, ordered
//! request sequencing (coordinates before predict, train before status),
//! and a single reducer-driven view state.

pub mod api;
pub mod orchestrator;
pub mod session;
pub mod state;
pub mod upload;
