//! HTTP service implementations.
//!
//! Each module holds the handlers for one resource. Handlers stay thin:
//! parse the request, call tally-core for rules and tally-db for storage,
//! shape the response.

pub mod catalog_service;
pub mod client_service;
pub mod health_service;
pub mod invoice_service;
pub mod report_service;
pub mod share_service;
