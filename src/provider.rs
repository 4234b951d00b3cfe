//! Definition providers, one per kind of source file.
//!
//! The server classifies the requesting file and picks a provider:
//! - Blade templates only ever reference routes by name.
//! - Other PHP files may also hold route declarations, whose controller
//!   binding is itself something to jump to.

use std::path::{Path, PathBuf};

use crate::error::{NotFoundReason, ResolveError};
use crate::extractor::{extract_logical_name, is_controller_binding_line};
use crate::resolver::{RouteDefinition, RouteResolver};
use crate::span::SourceSpan;
use crate::workspace::Workspace;

/// The kind of file a definition request comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// `*.blade.php`
    Template,
    /// Any other `*.php` file
    Source,
}

impl FileKind {
    /// Classify a path, or `None` for files we do not handle
    pub fn classify(path: &Path) -> Option<FileKind> {
        let file_name = path.file_name()?.to_str()?;
        if file_name.ends_with(".blade.php") {
            Some(FileKind::Template)
        } else if file_name.ends_with(".php") {
            Some(FileKind::Source)
        } else {
            None
        }
    }
}

/// Something a cursor can jump to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Definition {
    Route(RouteDefinition),
    /// A controller file; always the first line of the file
    Controller(PathBuf),
}

impl Definition {
    /// The range to navigate to
    pub fn span(&self) -> SourceSpan {
        match self {
            Definition::Route(route) => route.span.clone(),
            Definition::Controller(path) => SourceSpan::file_start(path.clone()),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Definition::Route(route) => route.span.path(),
            Definition::Controller(path) => path,
        }
    }
}

/// Resolve whatever sits under the cursor on `line`
#[tower_lsp::async_trait]
pub trait DefinitionProvider: Send + Sync {
    /// `cursor` is a character column into `line`
    async fn provide_definition(&self, line: &str, cursor: usize) -> Result<Definition, ResolveError>;
}

/// Route names in Blade templates
pub struct TemplateRouteProvider<'a, W> {
    resolver: &'a RouteResolver<W>,
}

impl<'a, W> TemplateRouteProvider<'a, W> {
    pub fn new(resolver: &'a RouteResolver<W>) -> Self {
        Self { resolver }
    }
}

#[tower_lsp::async_trait]
impl<'a, W: Workspace> DefinitionProvider for TemplateRouteProvider<'a, W> {
    async fn provide_definition(&self, line: &str, cursor: usize) -> Result<Definition, ResolveError> {
        let name = extract_logical_name(line, cursor).ok_or(NotFoundReason::NoRouteUnderCursor)?;
        let route = self.resolver.resolve_route(&name).await?;
        Ok(Definition::Route(route))
    }
}

/// Controller bindings and route names in PHP source files
pub struct SourceFileProvider<'a, W> {
    resolver: &'a RouteResolver<W>,
}

impl<'a, W> SourceFileProvider<'a, W> {
    pub fn new(resolver: &'a RouteResolver<W>) -> Self {
        Self { resolver }
    }
}

#[tower_lsp::async_trait]
impl<'a, W: Workspace> DefinitionProvider for SourceFileProvider<'a, W> {
    async fn provide_definition(&self, line: &str, cursor: usize) -> Result<Definition, ResolveError> {
        // A route() call on the line takes precedence when the cursor is on it
        if let Some(name) = extract_logical_name(line, cursor) {
            let route = self.resolver.resolve_route(&name).await?;
            return Ok(Definition::Route(route));
        }

        if is_controller_binding_line(line) {
            let path = self.resolver.resolve_controller_binding(line).await?;
            return Ok(Definition::Controller(path));
        }

        Err(NotFoundReason::NoRouteUnderCursor.into())
    }
}

/// Pick the provider for a file kind
pub fn provider_for<'a, W: Workspace>(
    kind: FileKind,
    resolver: &'a RouteResolver<W>,
) -> Box<dyn DefinitionProvider + 'a> {
    match kind {
        FileKind::Template => Box::new(TemplateRouteProvider::new(resolver)),
        FileKind::Source => Box::new(SourceFileProvider::new(resolver)),
    }
}
