//
// Copyright (c) The yangtree Core Contributors
//
// SPDX-License-Identifier: MIT
//

/// A convenience wrapper around `Result` for `yangtree::Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories reported by yangtree.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// Requested schema module could not be found in the search paths.
    NotFound,
    /// Malformed or semantically invalid schema, or a query referencing an
    /// undeclared module or node.
    Schema,
    /// Instance data violates the schema.
    Validation,
    /// Malformed serialization syntax (XML or JSON).
    Format,
    /// Resource could not be read.
    Io,
    /// Invalid or missing option flags.
    Config,
    /// Malformed path expression.
    Syntax,
    /// Navigation invoked on an absent node.
    NullTarget,
}

/// Error returned by yangtree operations.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Error {
    pub errcode: ErrorKind,
    pub msg: Option<String>,
    pub path: Option<String>,
    pub apptag: Option<String>,
    pub line: Option<u64>,
}

impl Error {
    pub fn new(errcode: ErrorKind, msg: impl Into<String>) -> Error {
        Error {
            errcode,
            msg: Some(msg.into()),
            path: None,
            apptag: None,
            line: None,
        }
    }

    pub(crate) fn not_found(msg: impl Into<String>) -> Error {
        Error::new(ErrorKind::NotFound, msg)
    }

    pub(crate) fn schema(msg: impl Into<String>) -> Error {
        Error::new(ErrorKind::Schema, msg)
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Error {
        Error::new(ErrorKind::Validation, msg)
    }

    pub(crate) fn format(msg: impl Into<String>) -> Error {
        Error::new(ErrorKind::Format, msg)
    }

    pub(crate) fn config(msg: impl Into<String>) -> Error {
        Error::new(ErrorKind::Config, msg)
    }

    pub(crate) fn syntax(msg: impl Into<String>) -> Error {
        Error::new(ErrorKind::Syntax, msg)
    }

    pub(crate) fn null_target() -> Error {
        Error::new(ErrorKind::NullTarget, "Navigation on an absent node")
    }

    /// Attach the data or schema path the error refers to.
    pub(crate) fn with_path(mut self, path: impl Into<String>) -> Error {
        self.path = Some(path.into());
        self
    }

    /// Attach the input line number the error refers to.
    pub(crate) fn with_line(mut self, line: u64) -> Error {
        self.line = Some(line);
        self
    }

    pub(crate) fn with_apptag(mut self, apptag: impl Into<String>) -> Error {
        self.apptag = Some(apptag.into());
        self
    }

    /// Returns the error category.
    pub fn kind(&self) -> ErrorKind {
        self.errcode
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Error {
        Error::new(ErrorKind::Io, error.to_string())
    }
}

impl std::fmt::Display for Error {
    // Print only the base error message by default.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(msg) = &self.msg {
            write!(f, "{}", msg)
        } else {
            write!(f, "Unknown error: {:?}", self.errcode)
        }
    }
}

impl std::error::Error for Error {}
