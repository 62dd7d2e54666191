#![forbid(unsafe_code)]

use std::fmt;

use thiserror::Error;

/// Errors accumulated while serving a single request.
///
/// None of these abort the request. Each one is appended to the request's
/// error list and rendered through `Display` into the response, while the
/// remaining branches of the query keep running.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// The document as a whole could not be parsed.
    #[error("{message}")]
    Parse {
        /// Human-readable parse failure.
        message: String,
    },
    /// A node named an entity the catalog does not describe.
    #[error("{name} is not a valid entity")]
    UnknownEntity {
        /// Name as written in the query text.
        name: String,
    },
    /// A nested node names an entity that is not related to its parent.
    #[error("{name} is not a child relationship of {parent}")]
    UnknownRelationship {
        /// Name as written in the query text.
        name: String,
        /// Entity name of the enclosing node.
        parent: String,
    },
    /// An argument value could not be used to build the native query.
    #[error("{entity}: argument '{key}' {reason}")]
    InvalidArgument {
        /// Entity the argument was attached to.
        entity: String,
        /// Argument name.
        key: String,
        /// What was wrong with the value.
        reason: String,
    },
    /// The backing store rejected or failed a compiled query.
    #[error("{message}")]
    Execution {
        /// Failure message reported by the store.
        message: String,
    },
}

impl RequestError {
    /// Builds a [`RequestError::Parse`].
    pub fn parse(message: impl Into<String>) -> Self {
        RequestError::Parse {
            message: message.into(),
        }
    }

    /// Builds a [`RequestError::UnknownEntity`].
    pub fn unknown_entity(name: impl Into<String>) -> Self {
        RequestError::UnknownEntity { name: name.into() }
    }

    /// Returns a machine-readable code for the error variant.
    pub fn code(&self) -> &'static str {
        match self {
            RequestError::Parse { .. } => "ParseError",
            RequestError::UnknownEntity { .. } => "UnknownEntityError",
            RequestError::UnknownRelationship { .. } => "UnknownEntityError",
            RequestError::InvalidArgument { .. } => "InvalidArgument",
            RequestError::Execution { .. } => "ExecutionError",
        }
    }
}

/// Formats a request error together with its code.
pub struct RequestErrorWithCode<'a>(pub &'a RequestError);

impl fmt::Display for RequestErrorWithCode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.0.code(), self.0)
    }
}
