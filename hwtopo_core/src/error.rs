//! Unified error handling for hwtopo
//!
//! A single error type is shared by every discovery routine. Most failures in
//! this crate are non-fatal and end up in an [`Enumeration`](crate::hardware::Enumeration)
//! error list rather than aborting a scan.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for hwtopo operations
#[derive(Debug, Error)]
pub enum HwError {
    /// I/O related errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration parsing or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Parse errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization/Deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Permission/Access errors
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// A device class listing directory could not be read
    #[error("cannot list {class} devices: {source}")]
    Enumeration {
        class: String,
        #[source]
        source: std::io::Error,
    },

    /// A per-device metadata file could not be read
    #[error("cannot read {}: {source}", path.display())]
    Attribute {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Internal errors with source location for debugging.
    /// Use the `hw_internal!()` macro to create these.
    #[error("Internal error: {message} (at {file}:{line})")]
    Internal {
        message: String,
        file: &'static str,
        line: u32,
    },
}

/// Create an internal error with automatic file/line capture.
///
/// ```rust,ignore
/// use hwtopo_core::hw_internal;
/// return Err(hw_internal!("worker panicked on {}", name));
/// ```
#[macro_export]
macro_rules! hw_internal {
    ($($arg:tt)*) => {
        $crate::error::HwError::Internal {
            message: format!($($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// Convenience type alias for Results using HwError
pub type HwResult<T> = std::result::Result<T, HwError>;

impl From<serde_json::Error> for HwError {
    fn from(err: serde_json::Error) -> Self {
        HwError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for HwError {
    fn from(err: serde_yaml::Error) -> Self {
        HwError::Serialization(format!("YAML error: {}", err))
    }
}

impl From<std::num::ParseIntError> for HwError {
    fn from(err: std::num::ParseIntError) -> Self {
        HwError::Parse(format!("Integer parse error: {}", err))
    }
}

impl HwError {
    /// Create a configuration error with a custom message
    pub fn config<S: Into<String>>(msg: S) -> Self {
        HwError::Config(msg.into())
    }

    /// Wrap a listing failure for a device class
    pub fn enumeration<S: Into<String>>(class: S, source: std::io::Error) -> Self {
        HwError::Enumeration {
            class: class.into(),
            source,
        }
    }

    /// Wrap a metadata read failure for a device file
    pub fn attribute<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        HwError::Attribute {
            path: path.into(),
            source,
        }
    }

    /// Map a root-listing I/O error onto the matching error kind
    pub fn from_listing(class: &str, path: &std::path::Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => HwError::PermissionDenied(format!(
                "cannot list {} devices at {}",
                class,
                path.display()
            )),
            _ => HwError::enumeration(class, err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_enumeration_message_names_class() {
        let err = HwError::enumeration("usb", io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert_eq!(err.to_string(), "cannot list usb devices: gone");
    }

    #[test]
    fn test_attribute_message_names_path() {
        let err = HwError::attribute(
            "/sys/bus/usb/devices/1-1/uevent",
            io::Error::new(io::ErrorKind::NotFound, "missing"),
        );
        assert!(err.to_string().contains("/sys/bus/usb/devices/1-1/uevent"));
    }

    #[test]
    fn test_listing_permission_denied() {
        let err = HwError::from_listing(
            "usb",
            std::path::Path::new("/sys/bus/usb/devices"),
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, HwError::PermissionDenied(_)));
    }

    #[test]
    fn test_internal_macro_captures_location() {
        let err = hw_internal!("bad state {}", 7);
        match err {
            HwError::Internal { message, file, line } => {
                assert_eq!(message, "bad state 7");
                assert!(file.ends_with("error.rs"));
                assert!(line > 0);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
