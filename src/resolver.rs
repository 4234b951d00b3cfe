//! Definition resolution: name in, declaration location out.
//!
//! The resolver composes the other pieces: it asks the candidate locator
//! which files to search, loads them one at a time through the
//! [`Workspace`], and stops at the first file with a declaration.
//!
//! Files are searched strictly one after another. Every lookup re-reads its
//! files, so results always reflect what is on disk (or in the editor) right
//! now.

use std::path::PathBuf;

use lsp_types::{Position, Range};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::candidates::{locate_candidate_files, locate_controller_files};
use crate::config::ResolverConfig;
use crate::declaration::{locate_declaration, Declaration, MatchRule};
use crate::error::{NotFoundReason, ResolveError};
use crate::extractor::{extract_controller_binding, is_controller_binding_line, ControllerBinding};
use crate::route_name::RouteName;
use crate::span::{SourceSpan, TextPosition};
use crate::workspace::Workspace;

/// Where a route is declared
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDefinition {
    /// The whole declaration, enclosing group included
    pub span: SourceSpan,
    /// Start of the line holding the match itself
    pub anchor: TextPosition,
    /// Which rule found it
    pub rule: MatchRule,
}

impl RouteDefinition {
    fn new(path: PathBuf, declaration: Declaration) -> Self {
        Self {
            span: declaration.to_span(path),
            anchor: TextPosition::new(declaration.anchor_line as u32, 0),
            rule: declaration.rule,
        }
    }

    /// Where the cursor lands when navigating: the start of the matched line
    pub fn selection_range(&self) -> Range {
        let anchor: Position = self.anchor.into();
        Range { start: anchor, end: anchor }
    }
}

/// Resolves route names and controller bindings against a workspace
pub struct RouteResolver<W> {
    workspace: W,
    config: ResolverConfig,
    cancel: Option<CancellationToken>,
}

impl<W: Workspace> RouteResolver<W> {
    pub fn new(workspace: W, config: ResolverConfig) -> Self {
        Self {
            workspace,
            config,
            cancel: None,
        }
    }

    /// Abort lookups once `token` is cancelled
    ///
    /// The token is checked before each pattern expansion and each file load.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn workspace(&self) -> &W {
        &self.workspace
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    fn check_cancelled(&self) -> Result<(), ResolveError> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(ResolveError::Cancelled),
            _ => Ok(()),
        }
    }

    /// Find the declaration of a route
    ///
    /// Candidate files are searched in priority order and the search stops at
    /// the first file containing a match. Files that are not valid text are
    /// skipped; any other workspace failure aborts the lookup.
    pub async fn resolve_route(&self, name: &RouteName) -> Result<RouteDefinition, ResolveError> {
        info!("Searching for route: {}", name);

        let mut candidates = locate_candidate_files(&self.workspace, name, &self.config);
        let mut searched = 0usize;

        loop {
            self.check_cancelled()?;
            let Some(path) = candidates.next().await? else {
                break;
            };

            self.check_cancelled()?;
            let document = match self.workspace.open_document(&path).await {
                Ok(document) => document,
                Err(e) if e.is_malformed() => {
                    warn!("Skipping unreadable route file: {}", e);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            searched += 1;

            if let Some(declaration) = locate_declaration(document.text(), name) {
                info!(
                    "Found route '{}' in {:?} at line {} ({:?})",
                    name, path, declaration.anchor_line, declaration.rule
                );
                return Ok(RouteDefinition::new(path, declaration));
            }

            debug!("Route '{}' not declared in {:?}", name, path);
        }

        info!(
            "Route '{}' not found after searching {} file(s) from {} pattern(s)",
            name,
            searched,
            candidates.patterns_expanded()
        );
        Err(NotFoundReason::RouteNotDeclared {
            name: name.to_string(),
        }
        .into())
    }

    /// Find the controller file bound by a route declaration line
    pub async fn resolve_controller_binding(&self, line: &str) -> Result<PathBuf, ResolveError> {
        if !is_controller_binding_line(line) {
            return Err(NotFoundReason::NoControllerBinding.into());
        }

        let binding = extract_controller_binding(line).ok_or(NotFoundReason::NoControllerBinding)?;
        debug!("Controller binding: {}@{}", binding.controller, binding.method);

        self.resolve_controller(&binding).await
    }

    /// Find the file defining a controller class
    ///
    /// Controllers resolve to the file as a whole, not to the method.
    pub async fn resolve_controller(&self, binding: &ControllerBinding) -> Result<PathBuf, ResolveError> {
        self.check_cancelled()?;

        let mut candidates = locate_controller_files(&self.workspace, &binding.controller, &self.config);
        match candidates.next().await? {
            Some(path) => {
                info!("Found controller {} at {:?}", binding.controller, path);
                Ok(path)
            }
            None => Err(NotFoundReason::ControllerNotFound {
                controller: binding.controller.clone(),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidates::CandidatePattern;
    use crate::error::WorkspaceError;
    use crate::workspace::Document;
    use glob::{MatchOptions, Pattern};
    use std::collections::{BTreeMap, HashSet};
    use std::path::Path;
    use std::sync::Mutex;

    /// In-memory project that records which files were opened
    #[derive(Default)]
    struct MemoryWorkspace {
        files: BTreeMap<PathBuf, String>,
        malformed: HashSet<PathBuf>,
        fail_find: bool,
        opened: Mutex<Vec<PathBuf>>,
    }

    impl MemoryWorkspace {
        fn with_file(mut self, path: &str, text: &str) -> Self {
            self.files.insert(PathBuf::from(path), text.to_string());
            self
        }

        fn with_malformed(mut self, path: &str) -> Self {
            self.files.insert(PathBuf::from(path), String::new());
            self.malformed.insert(PathBuf::from(path));
            self
        }

        fn opened(&self) -> Vec<PathBuf> {
            self.opened.lock().unwrap().clone()
        }
    }

    #[tower_lsp::async_trait]
    impl Workspace for MemoryWorkspace {
        async fn find_files(&self, pattern: &CandidatePattern) -> Result<Vec<PathBuf>, WorkspaceError> {
            if self.fail_find {
                return Err(WorkspaceError::MissingRoot(PathBuf::from("/gone")));
            }

            let options = MatchOptions {
                require_literal_separator: true,
                ..MatchOptions::new()
            };
            let include = Pattern::new(&pattern.include).unwrap();
            let exclude = Pattern::new(&pattern.exclude).unwrap();

            // Reverse order on purpose; callers must not rely on it
            Ok(self
                .files
                .keys()
                .rev()
                .filter(|path| {
                    include.matches_path_with(path, options) && !exclude.matches_path_with(path, options)
                })
                .cloned()
                .collect())
        }

        async fn open_document(&self, path: &Path) -> Result<Document, WorkspaceError> {
            self.opened.lock().unwrap().push(path.to_path_buf());

            if self.malformed.contains(path) {
                return Err(WorkspaceError::Malformed { path: path.to_path_buf() });
            }

            match self.files.get(path) {
                Some(text) => Ok(Document::new(path.to_path_buf(), text.clone())),
                None => Err(WorkspaceError::Io {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
                }),
            }
        }
    }

    fn route(name: &str) -> RouteName {
        RouteName::parse(name).unwrap()
    }

    fn resolver(workspace: MemoryWorkspace) -> RouteResolver<MemoryWorkspace> {
        RouteResolver::new(workspace, ResolverConfig::default())
    }

    #[test]
    fn test_selection_range_is_matched_line_not_group() {
        let text = "Route::group(['as' => 'admin.'], function () {\n  Route::get('/x')->name('admin.x');\n});";
        let declaration = locate_declaration(text, &route("admin.x")).unwrap();
        let definition = RouteDefinition::new(PathBuf::from("routes/web/admin.php"), declaration);

        assert_eq!(definition.span.start.line, 0);
        let selection = definition.selection_range();
        assert_eq!(selection.start, Position::new(1, 0));
        assert_eq!(selection.start, selection.end);
    }

    #[tokio::test]
    async fn test_first_candidate_wins_and_second_is_never_opened() {
        let workspace = MemoryWorkspace::default()
            .with_file("routes/web/admin.php", "<?php\nRoute::get('/x')->name('admin.x');\n")
            .with_file("routes/web.php", "<?php\nRoute::get('/admin/x')->name('admin.x');\n");
        let resolver = resolver(workspace);

        let definition = resolver.resolve_route(&route("admin.x")).await.unwrap();

        assert_eq!(definition.span.path, PathBuf::from("routes/web/admin.php"));
        assert_eq!(definition.span.start, TextPosition::new(1, 0));
        assert_eq!(definition.anchor, TextPosition::new(1, 0));
        assert_eq!(definition.rule, MatchRule::ExactName);
        assert_eq!(resolver.workspace().opened(), vec![PathBuf::from("routes/web/admin.php")]);
    }

    #[tokio::test]
    async fn test_broad_fallback_searched_in_sorted_order() {
        let workspace = MemoryWorkspace::default()
            .with_file("routes/api.php", "<?php\nRoute::get('/api/users')->name('api.users');\n")
            .with_file("routes/web.php", "<?php\n\nRoute::get('/users')->name('users.index');\n")
            .with_file("routes/zzz.php", "<?php\nRoute::get('/users')->name('users.index');\n")
            .with_file("vendor/pkg/routes/web.php", "Route::get('/')->name('users.index');");
        let resolver = resolver(workspace);

        let definition = resolver.resolve_route(&route("users.index")).await.unwrap();

        assert_eq!(definition.span.path, PathBuf::from("routes/web.php"));
        assert_eq!(definition.span.start.line, 2);
        assert_eq!(
            resolver.workspace().opened(),
            vec![PathBuf::from("routes/api.php"), PathBuf::from("routes/web.php")]
        );
    }

    #[tokio::test]
    async fn test_missing_route_is_not_found() {
        let workspace = MemoryWorkspace::default()
            .with_file("routes/web.php", "<?php\nRoute::get('/')->name('home');\n");
        let resolver = resolver(workspace);

        let err = resolver.resolve_route(&route("missing.route")).await.unwrap_err();

        assert_eq!(
            err.not_found_reason(),
            Some(&NotFoundReason::RouteNotDeclared {
                name: "missing.route".to_string()
            })
        );
        assert_eq!(resolver.workspace().opened(), vec![PathBuf::from("routes/web.php")]);
    }

    #[tokio::test]
    async fn test_no_route_files_is_not_found() {
        let resolver = resolver(MemoryWorkspace::default());
        let err = resolver.resolve_route(&route("home")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_malformed_file_is_skipped() {
        let workspace = MemoryWorkspace::default()
            .with_malformed("routes/web/users.php")
            .with_file("routes/web.php", "Route::get('/users')->name('users.index');");
        let resolver = resolver(workspace);

        let definition = resolver.resolve_route(&route("users.index")).await.unwrap();

        assert_eq!(definition.span.path, PathBuf::from("routes/web.php"));
        assert_eq!(
            resolver.workspace().opened(),
            vec![PathBuf::from("routes/web/users.php"), PathBuf::from("routes/web.php")]
        );
    }

    #[tokio::test]
    async fn test_workspace_failure_propagates() {
        let workspace = MemoryWorkspace {
            fail_find: true,
            ..MemoryWorkspace::default()
        };
        let resolver = resolver(workspace);

        let err = resolver.resolve_route(&route("home")).await.unwrap_err();
        assert!(matches!(err, ResolveError::Workspace(WorkspaceError::MissingRoot(_))));
    }

    #[tokio::test]
    async fn test_cancelled_lookup_opens_nothing() {
        let workspace = MemoryWorkspace::default()
            .with_file("routes/web.php", "Route::get('/')->name('home');");
        let token = CancellationToken::new();
        token.cancel();
        let resolver = resolver(workspace).with_cancellation(token);

        let err = resolver.resolve_route(&route("home")).await.unwrap_err();

        assert!(matches!(err, ResolveError::Cancelled));
        assert!(resolver.workspace().opened().is_empty());
    }

    #[tokio::test]
    async fn test_uncancelled_token_does_not_change_result() {
        let workspace = MemoryWorkspace::default()
            .with_file("routes/web.php", "Route::get('/')->name('home');");
        let resolver = resolver(workspace).with_cancellation(CancellationToken::new());

        let definition = resolver.resolve_route(&route("home")).await.unwrap();
        assert_eq!(definition.span.path, PathBuf::from("routes/web.php"));
    }

    #[tokio::test]
    async fn test_controller_binding_resolves_to_file() {
        let workspace = MemoryWorkspace::default()
            .with_file("app/Http/Controllers/Admin/UserController.php", "<?php\nclass UserController {}\n")
            .with_file("app/Controllers/UserController.php", "<?php\n");
        let resolver = resolver(workspace);

        let path = resolver
            .resolve_controller_binding("Route::get('/users')->controller('UserController', 'index');")
            .await
            .unwrap();

        assert_eq!(path, PathBuf::from("app/Http/Controllers/Admin/UserController.php"));
    }

    #[tokio::test]
    async fn test_controller_in_secondary_directory() {
        let workspace = MemoryWorkspace::default().with_file("app/Controllers/PostController.php", "<?php\n");
        let resolver = resolver(workspace);

        let path = resolver
            .resolve_controller_binding("Route::get('/posts', ['uses' => 'PostController@index']);")
            .await
            .unwrap();

        assert_eq!(path, PathBuf::from("app/Controllers/PostController.php"));
    }

    #[tokio::test]
    async fn test_controller_not_found() {
        let resolver = resolver(MemoryWorkspace::default());

        let err = resolver
            .resolve_controller_binding("Route::get('/')->controller('GhostController', 'index');")
            .await
            .unwrap_err();
        assert_eq!(
            err.not_found_reason(),
            Some(&NotFoundReason::ControllerNotFound {
                controller: "GhostController".to_string()
            })
        );

        let err = resolver
            .resolve_controller_binding("Route::get('/', HomeController::class);")
            .await
            .unwrap_err();
        assert_eq!(err.not_found_reason(), Some(&NotFoundReason::NoControllerBinding));
    }
}
