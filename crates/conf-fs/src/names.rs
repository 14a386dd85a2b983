//! Directory-safe configuration name validation

use crate::{Error, Result};

/// Validate that a configuration or component name is safe to use as a
/// directory name.
///
/// Accepted characters are ASCII alphanumerics, `_` and `-`. The rules are
/// deliberately stricter than what most filesystems allow: these names end
/// up in git paths and in values exposed to remote clients.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidName {
            name: name.to_string(),
            reason: "name is empty".to_string(),
        });
    }

    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(Error::InvalidName {
            name: name.to_string(),
            reason: format!("character {bad:?} is not allowed"),
        });
    }

    // Leading '-' would read as a flag in git command lines.
    if name.starts_with('-') {
        return Err(Error::InvalidName {
            name: name.to_string(),
            reason: "name may not start with '-'".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_typical_names() {
        for name in ["larmor_base", "SANS2D", "test-2024", "a"] {
            assert!(validate_name(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn rejects_empty_name() {
        assert!(validate_name("").is_err());
    }

    #[test]
    fn rejects_path_traversal() {
        assert!(validate_name("..").is_err());
        assert!(validate_name("../other").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("a\\b").is_err());
    }

    #[test]
    fn rejects_leading_dash() {
        assert!(validate_name("-rf").is_err());
    }

    #[test]
    fn rejects_whitespace() {
        assert!(validate_name("my config").is_err());
    }
}
