//! Limits for document construction and pattern compilation
//!
//! Bounds the resources a single document or pattern may consume so that
//! hostile input cannot blow the stack or exhaust memory.

use crate::error::{Error, Result};

/// Global limits configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum element nesting depth in a document
    pub max_xml_depth: usize,

    /// Maximum XML input size in bytes
    pub max_xml_size: usize,

    /// Maximum number of attributes per element
    pub max_attributes: usize,

    /// Maximum number of namespace declarations per element
    pub max_namespaces: usize,

    /// Maximum nesting depth of map/sequence patterns
    pub max_pattern_depth: usize,

    /// Maximum number of items in a single map or sequence pattern
    pub max_pattern_items: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_xml_depth: 1000,
            max_xml_size: 100 * 1024 * 1024, // 100 MB
            max_attributes: 1000,
            max_namespaces: 1000,
            max_pattern_depth: 64,
            max_pattern_items: 1024,
        }
    }
}

impl Limits {
    /// Create a new Limits with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create strict limits (more restrictive)
    pub fn strict() -> Self {
        Self {
            max_xml_depth: 100,
            max_xml_size: 10 * 1024 * 1024, // 10 MB
            max_attributes: 100,
            max_namespaces: 100,
            max_pattern_depth: 16,
            max_pattern_items: 128,
        }
    }

    /// Create permissive limits (less restrictive, use with caution)
    pub fn permissive() -> Self {
        Self {
            max_xml_depth: 10000,
            max_xml_size: 1024 * 1024 * 1024, // 1 GB
            max_attributes: 10000,
            max_namespaces: 10000,
            max_pattern_depth: 512,
            max_pattern_items: 65536,
        }
    }

    /// Check if XML depth is within limits
    pub fn check_xml_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_xml_depth {
            Err(Error::LimitExceeded(format!(
                "XML depth {} exceeds maximum {}",
                depth, self.max_xml_depth
            )))
        } else {
            Ok(())
        }
    }

    /// Check if XML size is within limits
    pub fn check_xml_size(&self, size: usize) -> Result<()> {
        if size > self.max_xml_size {
            Err(Error::LimitExceeded(format!(
                "XML size {} bytes exceeds maximum {} bytes",
                size, self.max_xml_size
            )))
        } else {
            Ok(())
        }
    }

    /// Check if number of attributes is within limits
    pub fn check_attributes(&self, count: usize) -> Result<()> {
        if count > self.max_attributes {
            Err(Error::LimitExceeded(format!(
                "Attribute count {} exceeds maximum {}",
                count, self.max_attributes
            )))
        } else {
            Ok(())
        }
    }

    /// Check if number of namespace declarations is within limits
    pub fn check_namespaces(&self, count: usize) -> Result<()> {
        if count > self.max_namespaces {
            Err(Error::LimitExceeded(format!(
                "Namespace count {} exceeds maximum {}",
                count, self.max_namespaces
            )))
        } else {
            Ok(())
        }
    }

    /// Check if pattern nesting depth is within limits
    pub fn check_pattern_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_pattern_depth {
            Err(Error::LimitExceeded(format!(
                "Pattern depth {} exceeds maximum {}",
                depth, self.max_pattern_depth
            )))
        } else {
            Ok(())
        }
    }

    /// Check if a map or sequence pattern item count is within limits
    pub fn check_pattern_items(&self, count: usize) -> Result<()> {
        if count > self.max_pattern_items {
            Err(Error::LimitExceeded(format!(
                "Pattern item count {} exceeds maximum {}",
                count, self.max_pattern_items
            )))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = Limits::default();
        assert_eq!(limits.max_xml_depth, 1000);
        assert!(limits.check_xml_depth(500).is_ok());
        assert!(limits.check_xml_depth(1500).is_err());
    }

    #[test]
    fn test_strict_limits() {
        let limits = Limits::strict();
        assert!(limits.max_xml_depth < Limits::default().max_xml_depth);
        assert!(limits.check_xml_depth(150).is_err());
        assert!(limits.check_pattern_depth(17).is_err());
    }

    #[test]
    fn test_permissive_limits() {
        let limits = Limits::permissive();
        assert!(limits.max_xml_depth > Limits::default().max_xml_depth);
        assert!(limits.check_xml_depth(5000).is_ok());
        assert!(limits.check_pattern_items(5000).is_ok());
    }

    #[test]
    fn test_check_xml_size() {
        let limits = Limits::default();
        assert!(limits.check_xml_size(1024).is_ok());
        assert!(limits.check_xml_size(200 * 1024 * 1024).is_err());
    }

    #[test]
    fn test_limit_error_kind() {
        let err = Limits::strict().check_attributes(101).unwrap_err();
        assert!(matches!(err, Error::LimitExceeded(_)));
        assert!(err.to_string().contains("Attribute count 101"));
    }
}
