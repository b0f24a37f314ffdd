//! Shared utilities and types for feature modules
//!
//! # Contents
//!
//! - **extract**: JSON and query extractors that reject with the API envelope
//! - **pagination**: Common pagination parameters
//! - **validation**: Input validation utilities
//! - **test_helpers**: Test fixtures and utilities (test-only)

pub mod extract;
pub mod pagination;
pub mod validation;

#[cfg(test)]
pub mod test_helpers;

// Re-export commonly used types
pub use extract::{ApiJson, ApiQuery};
pub use pagination::PaginationParams;
pub use validation::{parse_id, FieldValidationError, IdValidationError};
