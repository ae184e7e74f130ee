// src/lib.rs

//! NFL agent tool gateway.
//!
//! Serves read-only SQL over the stats warehouse, per-game files, knowledge
//! base search and query-learning writes to an AI agent, behind one request
//! entry point.

pub mod config;
pub mod error;
pub mod gateway;
pub mod knowledge;
#[cfg(feature = "lambda")]
pub mod lambda;
pub mod models;
pub mod query;
pub mod services;
pub mod storage;
