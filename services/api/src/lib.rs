//! services/api/src/lib.rs
//!
//! The QuickCart HTTP service: configuration, storage and payment adapters, and
//! the axum web layer.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
