//! Error types for decoding and converting files.
use std::{fmt, path::PathBuf};

use thiserror::Error;

/// The file format that produced a [DecodeError].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Format {
    /// Studio model header and metadata `.mdl`.
    Mdl,
    /// Vertex data `.vvd`.
    Vvd,
    /// Optimized strip data `.vtx`.
    Vtx,
    /// Valve texture format `.vtf`.
    Vtf,
}

impl Format {
    /// The file signature or `None` for formats without a magic.
    pub fn magic(&self) -> Option<&'static [u8; 4]> {
        match self {
            Format::Mdl => Some(b"IDST"),
            Format::Vvd => Some(b"IDSV"),
            Format::Vtx => None,
            Format::Vtf => Some(b"VTF\0"),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::Mdl => "MDL",
            Format::Vvd => "VVD",
            Format::Vtx => "VTX",
            Format::Vtf => "VTF",
        };
        f.write_str(name)
    }
}

/// Errors while decoding a single file.
///
/// Any error aborts the entire read.
/// Partially decoded data is never returned.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("{format} signature {found} at {pos:#x} does not match {expected:?}")]
    FormatIdentity {
        format: Format,
        pos: u64,
        expected: String,
        found: String,
    },

    #[error("{format} {field} {found} at {pos:#x} is not supported, expected {expected}")]
    FormatVersion {
        format: Format,
        pos: u64,
        field: &'static str,
        expected: String,
        found: String,
    },

    #[error("{format} data truncated at {pos:#x}: {message}")]
    TruncatedData {
        format: Format,
        pos: u64,
        message: String,
    },

    #[error("{format} {field} {value} at {pos:#x} is not supported: {reason}")]
    UnsupportedEncoding {
        format: Format,
        pos: u64,
        field: &'static str,
        value: i64,
        reason: String,
    },

    #[error("{format} {field} at {pos:#x} is inconsistent: {message}")]
    InconsistentLayout {
        format: Format,
        pos: u64,
        field: &'static str,
        message: String,
    },

    #[error("error reading {format} data")]
    Io {
        format: Format,
        #[source]
        source: std::io::Error,
    },

    #[error("error parsing {format} data")]
    Parse {
        format: Format,
        #[source]
        source: binrw::Error,
    },
}

/// Errors while reading a file from disk.
#[derive(Debug, Error)]
#[error("error reading {path:?}")]
pub struct ReadFileError {
    pub path: PathBuf,
    #[source]
    pub source: DecodeError,
}

/// Structural errors raised from inside the binrw parsers.
///
/// The file format is only known at the top level,
/// so these are converted to [DecodeError] after parsing fails.
#[derive(Debug, Error, PartialEq, Clone)]
pub(crate) enum LayoutError {
    #[error("{field} {found} is not supported, expected {expected}")]
    Version {
        field: &'static str,
        expected: String,
        found: String,
    },

    #[error("{message}")]
    Truncated { message: String },

    #[error("{field} {value} is not supported: {reason}")]
    Unsupported {
        field: &'static str,
        value: i64,
        reason: String,
    },

    #[error("{field} is inconsistent: {message}")]
    Inconsistent {
        field: &'static str,
        message: String,
    },
}

impl LayoutError {
    pub(crate) fn version<E: fmt::Display, F: fmt::Display>(
        field: &'static str,
        expected: E,
        found: F,
    ) -> Self {
        Self::Version {
            field,
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    pub(crate) fn truncated<S: Into<String>>(message: S) -> Self {
        Self::Truncated {
            message: message.into(),
        }
    }

    pub(crate) fn inconsistent<S: Into<String>>(field: &'static str, message: S) -> Self {
        Self::Inconsistent {
            field,
            message: message.into(),
        }
    }

    /// Raise this error as a binrw error at `pos`.
    pub(crate) fn at(self, pos: u64) -> binrw::Error {
        binrw::Error::Custom {
            pos,
            err: Box::new(self),
        }
    }

    fn into_decode_error(self, format: Format, pos: u64) -> DecodeError {
        match self {
            LayoutError::Version {
                field,
                expected,
                found,
            } => DecodeError::FormatVersion {
                format,
                pos,
                field,
                expected,
                found,
            },
            LayoutError::Truncated { message } => DecodeError::TruncatedData {
                format,
                pos,
                message,
            },
            LayoutError::Unsupported {
                field,
                value,
                reason,
            } => DecodeError::UnsupportedEncoding {
                format,
                pos,
                field,
                value,
                reason,
            },
            LayoutError::Inconsistent { field, message } => DecodeError::InconsistentLayout {
                format,
                pos,
                field,
                message,
            },
        }
    }
}

impl DecodeError {
    /// Classify a binrw error from reading a file of the given `format`.
    ///
    /// Reads past the end of the stream are reported at `stream_len`.
    pub(crate) fn from_binrw(format: Format, error: binrw::Error, stream_len: u64) -> Self {
        match error {
            // Context added by the derive macros wraps the original error.
            binrw::Error::Backtrace(backtrace) => {
                Self::from_binrw(format, *backtrace.error, stream_len)
            }
            binrw::Error::BadMagic { pos, found } => Self::FormatIdentity {
                format,
                pos,
                expected: format
                    .magic()
                    .map(|m| String::from_utf8_lossy(m).into_owned())
                    .unwrap_or_default(),
                found: format!("{found:?}"),
            },
            binrw::Error::Io(source) if source.kind() == std::io::ErrorKind::UnexpectedEof => {
                Self::TruncatedData {
                    format,
                    pos: stream_len,
                    message: "unexpected end of stream".to_string(),
                }
            }
            binrw::Error::Io(source) => Self::Io { format, source },
            binrw::Error::Custom { pos, err } => match err.downcast::<LayoutError>() {
                Ok(layout) => (*layout).into_decode_error(format, pos),
                Err(err) => Self::Parse {
                    format,
                    source: binrw::Error::Custom { pos, err },
                },
            },
            error => Self::Parse {
                format,
                source: error,
            },
        }
    }

    /// The format of the file that failed to decode.
    pub fn format(&self) -> Format {
        match self {
            DecodeError::FormatIdentity { format, .. }
            | DecodeError::FormatVersion { format, .. }
            | DecodeError::TruncatedData { format, .. }
            | DecodeError::UnsupportedEncoding { format, .. }
            | DecodeError::InconsistentLayout { format, .. }
            | DecodeError::Io { format, .. }
            | DecodeError::Parse { format, .. } => *format,
        }
    }
}
