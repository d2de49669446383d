//! Core library for Brandpost
//!
//! This crate contains the shared domain layer, including:
//! - Brand, plan and post records
//! - Document storage
//! - Run tracing

pub mod brand;
pub mod error;
pub mod plan;
pub mod post;
pub mod store;
pub mod trace;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
