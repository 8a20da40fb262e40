//! # Larder Core
//!
//! Shared, I/O-free logic for Larder: data models, the ingredient matching
//! engine, lenient parsing of language-model output, meal-plan shopping
//! aggregation, the store abstraction, and the capability traits for
//! external AI and recipe-search services.
//!
//! This crate contains no tokio, filesystem, or network dependencies. The
//! `larder` app crate supplies the JSON file store, the HTTP clients, and
//! the server.

pub mod extraction;
pub mod matching;
pub mod models;
pub mod planning;
pub mod providers;
pub mod store;

pub use providers::UpstreamError;
