//! Core use-case services.
//!
//! # Responsibility
//! - Expose registry operations to transport layers.
//! - Keep transport decoupled from repository and storage types.

pub mod registry_service;
