//! Custom Axum extractors.

pub mod owner;

pub use owner::Owner;
