//! Laravel Goto Route - jump from route names to route declarations
//!
//! This library provides the route-name resolution engine behind the
//! `laravel-goto-route` language server: recognizing `route('name')` calls
//! and controller bindings under the cursor, finding the route files that
//! may declare a name, and locating the declaration inside them.

// Core modules
pub mod route_name;
pub mod span;
pub mod error;
pub mod config;
pub mod extractor;
pub mod candidates;
pub mod declaration;
pub mod workspace;
pub mod resolver;
pub mod provider;

// Re-export commonly used types
pub use config::{find_project_root, LspSettings, ResolverConfig};
pub use declaration::{locate_declaration, Declaration, MatchRule};
pub use error::{NotFoundReason, ResolveError, WorkspaceError};
pub use extractor::{extract_controller_binding, extract_logical_name, is_controller_binding_line};
pub use resolver::{RouteDefinition, RouteResolver};
pub use route_name::RouteName;
pub use span::{SourceSpan, TextPosition};
pub use workspace::{Document, FsWorkspace, Workspace};
