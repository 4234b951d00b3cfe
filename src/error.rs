//! Error taxonomy for route resolution
//!
//! - Not finding something is an expected outcome ([`NotFoundReason`]).
//! - A candidate file that cannot be read as text is skipped by the resolver
//!   ([`WorkspaceError::Malformed`]).
//! - Every other [`WorkspaceError`] means the file collaborator itself failed
//!   and aborts the lookup.

use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by a [`crate::workspace::Workspace`] implementation
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not valid UTF-8 text", .path.display())]
    Malformed { path: PathBuf },

    #[error("invalid file pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("workspace root {} does not exist", .0.display())]
    MissingRoot(PathBuf),

    #[error("file search task failed: {0}")]
    Task(String),
}

impl WorkspaceError {
    /// Whether this failure only concerns one file's contents
    ///
    /// Malformed files are skipped; everything else aborts the lookup.
    pub fn is_malformed(&self) -> bool {
        matches!(self, WorkspaceError::Malformed { .. })
    }
}

/// Why a lookup came back empty
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotFoundReason {
    #[error("no route name under cursor")]
    NoRouteUnderCursor,

    #[error("no controller binding on this line")]
    NoControllerBinding,

    #[error("Route '{name}' not found in route files")]
    RouteNotDeclared { name: String },

    #[error("Controller '{controller}' not found")]
    ControllerNotFound { controller: String },
}

impl NotFoundReason {
    /// Whether the user asked about something concrete that could not be located
    ///
    /// A cursor that is not on a route token is silent; a route token that
    /// has no declaration is worth a warning.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            NotFoundReason::RouteNotDeclared { .. } | NotFoundReason::ControllerNotFound { .. }
        )
    }
}

/// Error returned by [`crate::resolver::RouteResolver`] lookups
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    NotFound(#[from] NotFoundReason),

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error("lookup cancelled")]
    Cancelled,
}

impl ResolveError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolveError::NotFound(_))
    }

    pub fn not_found_reason(&self) -> Option<&NotFoundReason> {
        match self {
            ResolveError::NotFound(reason) => Some(reason),
            _ => None,
        }
    }
}
