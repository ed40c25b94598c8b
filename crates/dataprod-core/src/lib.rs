//! Core types, collaborator traits and the data product management service.
//!
//! This crate has no HTTP or database dependencies.
//! Storage backends implement [`registry::ResourceRegistry`] and
//! [`clients::Datastores`]; transports wrap
//! [`service::DataProductManagementService`].

pub mod clients;
pub mod config;
pub mod embedded;
pub mod error;
pub mod lifecycle;
pub mod registry;
pub mod resource;
pub mod service;

pub use error::{Error, Result};
pub use service::DataProductManagementService;
