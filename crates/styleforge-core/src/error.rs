// SPDX-FileCopyrightText: 2026 Styleforge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Styleforge image generation core.

use thiserror::Error;

/// The primary error type used across all Styleforge crates.
///
/// Expected domain outcomes (insufficient balance, an unresolvable style,
/// a failed generation job) are modeled as enum values in their own
/// modules, not as error variants here. This type covers the failures
/// that abort an operation.
#[derive(Debug, Error)]
pub enum StyleforgeError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Generation Service errors (HTTP failure, malformed response, remote rejection).
    #[error("generation error: {message}")]
    Generation {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl StyleforgeError {
    /// Shorthand for a generation error with no underlying source.
    pub fn generation(message: impl Into<String>) -> Self {
        StyleforgeError::Generation {
            message: message.into(),
            source: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_variants_render_their_context() {
        let config = StyleforgeError::Config("missing [billing] section".into());
        assert!(config.to_string().contains("missing [billing]"));

        let storage = StyleforgeError::Storage {
            source: Box::new(std::io::Error::other("disk gone")),
        };
        assert!(storage.to_string().contains("disk gone"));

        let generation = StyleforgeError::generation("remote returned 502");
        assert!(generation.to_string().contains("502"));

        let internal = StyleforgeError::Internal("job task panicked".into());
        assert!(internal.to_string().contains("panicked"));
    }
}
