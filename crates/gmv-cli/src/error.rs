// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use gmv_core::GmvError;
use std::fmt;

#[derive(Debug)]
pub enum CliError {
    Gmv(GmvError),
    Io {
        context: String,
        source: std::io::Error,
    },
    Json {
        context: String,
        source: serde_json::Error,
    },
    Zip {
        context: String,
        source: zip::result::ZipError,
    },
    InvalidInput(String),
    NotSupported(String),
}

impl CliError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_supported(msg: impl Into<String>) -> Self {
        Self::NotSupported(msg.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }

    pub fn zip(context: impl Into<String>, source: zip::result::ZipError) -> Self {
        Self::Zip {
            context: context.into(),
            source,
        }
    }

    /// Stable machine-readable code for the JSON error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Gmv(err) => err.code(),
            Self::InvalidInput(_) => "invalid_input",
            Self::NotSupported(_) => "not_supported",
            Self::Io { .. } => "io_error",
            Self::Json { .. } => "json_error",
            Self::Zip { .. } => "zip_error",
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gmv(err) => write!(f, "{err}"),
            Self::Io { context, source } => write!(f, "{context}: {source}"),
            Self::Json { context, source } => write!(f, "{context}: {source}"),
            Self::Zip { context, source } => write!(f, "{context}: {source}"),
            Self::InvalidInput(msg) => write!(f, "{msg}"),
            Self::NotSupported(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Gmv(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::Zip { source, .. } => Some(source),
            Self::InvalidInput(_) | Self::NotSupported(_) => None,
        }
    }
}

impl From<GmvError> for CliError {
    fn from(value: GmvError) -> Self {
        Self::Gmv(value)
    }
}
