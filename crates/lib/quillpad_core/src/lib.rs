//! # quillpad_core
//!
//! Runtime mode resolution, credential hashing, token issuance, and the
//! register/login flows for Quillpad.

pub mod auth;
pub mod context;
pub mod migrate;
pub mod models;
pub mod runtime;
pub mod settings;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
