//! Probabilistic disaster prediction from point weather telemetry.
//!
//! A fixed battery of per-disaster heuristics scores each sample; every
//! heuristic that clears its activation floor emits an independent
//! [`Prediction`](crate::model::Prediction). The engine is pure — it never
//! writes to a store; routing its output belongs to the caller.

mod engine;

pub use engine::{age_out, evaluate};
