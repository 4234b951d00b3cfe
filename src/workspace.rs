//! The file collaborator the resolver talks to.
//!
//! The resolver never touches the filesystem directly. It asks a
//! [`Workspace`] to expand glob patterns and to open documents, so the
//! language server can serve unsaved editor buffers and tests can hand in
//! whatever files they need.

use std::path::{Component, Path, PathBuf};

use glob::{MatchOptions, Pattern};
use tracing::debug;
use walkdir::WalkDir;

use crate::candidates::CandidatePattern;
use crate::error::WorkspaceError;

/// Read-only text of one document, as loaded at lookup time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    path: PathBuf,
    text: String,
}

impl Document {
    pub fn new(path: PathBuf, text: String) -> Self {
        Self { path, text }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Text of line `n` (0-based) without its line terminator
    pub fn line_at(&self, n: usize) -> Option<&str> {
        self.text.lines().nth(n)
    }
}

/// File access needed by route resolution
#[tower_lsp::async_trait]
pub trait Workspace: Send + Sync {
    /// Expand `pattern.include` under the workspace root, minus `pattern.exclude`
    ///
    /// No particular result order is promised.
    async fn find_files(&self, pattern: &CandidatePattern) -> Result<Vec<PathBuf>, WorkspaceError>;

    /// Load the current text of a document
    async fn open_document(&self, path: &Path) -> Result<Document, WorkspaceError>;
}

/// A workspace backed directly by the filesystem
#[derive(Debug, Clone)]
pub struct FsWorkspace {
    root: PathBuf,
}

impl FsWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

#[tower_lsp::async_trait]
impl Workspace for FsWorkspace {
    async fn find_files(&self, pattern: &CandidatePattern) -> Result<Vec<PathBuf>, WorkspaceError> {
        let root = self.root.clone();
        let pattern = pattern.clone();

        // Directory walking is blocking I/O
        tokio::task::spawn_blocking(move || glob_under(&root, &pattern))
            .await
            .map_err(|e| WorkspaceError::Task(e.to_string()))?
    }

    async fn open_document(&self, path: &Path) -> Result<Document, WorkspaceError> {
        let path = self.absolute(path);
        let bytes = tokio::fs::read(&path).await.map_err(|source| WorkspaceError::Io {
            path: path.clone(),
            source,
        })?;

        match String::from_utf8(bytes) {
            Ok(text) => Ok(Document::new(path, text)),
            Err(_) => Err(WorkspaceError::Malformed { path }),
        }
    }
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Expand a candidate pattern relative to `root`, returning sorted absolute paths
pub fn glob_under(root: &Path, pattern: &CandidatePattern) -> Result<Vec<PathBuf>, WorkspaceError> {
    if !root.is_dir() {
        return Err(WorkspaceError::MissingRoot(root.to_path_buf()));
    }

    let include = compile(&pattern.include)?;
    let exclude = compile(&pattern.exclude)?;

    // Only walk the part of the tree the pattern can reach
    let base = root.join(literal_base(&pattern.include));
    if !base.exists() {
        debug!("Glob base {:?} does not exist", base);
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(&base).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry under {:?}: {}", base, e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };

        if include.matches_path_with(relative, MATCH_OPTIONS)
            && !exclude.matches_path_with(relative, MATCH_OPTIONS)
        {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

fn compile(pattern: &str) -> Result<Pattern, WorkspaceError> {
    Pattern::new(pattern).map_err(|source| WorkspaceError::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// The leading path components of a glob that contain no wildcards
///
/// `routes/**/*.php` -> `routes`, `routes/web/admin.php` -> `routes/web/admin.php`
fn literal_base(pattern: &str) -> PathBuf {
    Path::new(pattern)
        .components()
        .take_while(|component| match component {
            Component::Normal(part) => !part
                .to_str()
                .is_some_and(|s| s.contains(['*', '?', '[', '{'])),
            _ => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn relative_names(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_literal_base() {
        assert_eq!(literal_base("routes/**/*.php"), PathBuf::from("routes"));
        assert_eq!(literal_base("routes/web/admin.php"), PathBuf::from("routes/web/admin.php"));
        assert_eq!(literal_base("**/*.php"), PathBuf::new());
    }

    #[test]
    fn test_document_lines() {
        let doc = Document::new(PathBuf::from("routes/web.php"), "<?php\r\n\r\nRoute::get('/');\n".to_string());
        assert_eq!(doc.line_at(1), Some(""));
        assert_eq!(doc.line_at(3), None);
        assert_eq!(doc.line_at(0), Some("<?php"));
        assert_eq!(doc.line_at(2), Some("Route::get('/');"));
        assert_eq!(doc.line_at(3), None);
    }

    #[test]
    fn test_glob_recursive_with_vendor_exclusion() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "routes/web.php", "");
        touch(root, "routes/web/admin.php", "");
        touch(root, "routes/notes.txt", "");
        touch(root, "routes/vendor/package.php", "");
        touch(root, "vendor/laravel/routes/web.php", "");

        let pattern = CandidatePattern::new("routes/**/*.php", "**/vendor/**");
        let files = glob_under(root, &pattern).unwrap();

        assert_eq!(relative_names(root, &files), vec!["routes/web.php", "routes/web/admin.php"]);
    }

    #[test]
    fn test_glob_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "routes/web/admin.php", "");
        touch(root, "routes/web/users.php", "");

        let pattern = CandidatePattern::new("routes/web/admin.php", "**/vendor/**");
        let files = glob_under(root, &pattern).unwrap();
        assert_eq!(relative_names(root, &files), vec!["routes/web/admin.php"]);

        let missing = CandidatePattern::new("routes/web/billing.php", "**/vendor/**");
        assert!(glob_under(root, &missing).unwrap().is_empty());
    }

    #[test]
    fn test_glob_missing_root() {
        let pattern = CandidatePattern::new("routes/**/*.php", "**/vendor/**");
        let result = glob_under(Path::new("/definitely/not/a/laravel/project"), &pattern);
        assert!(matches!(result, Err(WorkspaceError::MissingRoot(_))));
    }

    #[test]
    fn test_glob_invalid_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = CandidatePattern::new("routes/[*.php", "**/vendor/**");
        let result = glob_under(dir.path(), &pattern);
        assert!(matches!(result, Err(WorkspaceError::Pattern { .. })));
    }

    #[tokio::test]
    async fn test_open_document() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "routes/web.php", "<?php\nRoute::get('/');\n");
        let workspace = FsWorkspace::new(dir.path());

        let doc = workspace.open_document(Path::new("routes/web.php")).await.unwrap();
        assert_eq!(doc.line_at(1), Some("Route::get('/');"));
        assert_eq!(doc.path(), dir.path().join("routes/web.php"));
    }

    #[tokio::test]
    async fn test_open_document_failures() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("routes")).unwrap();
        fs::write(dir.path().join("routes/binary.php"), [0xff, 0xfe, 0x00, 0x80]).unwrap();
        let workspace = FsWorkspace::new(dir.path());

        let malformed = workspace.open_document(Path::new("routes/binary.php")).await;
        assert!(matches!(malformed, Err(WorkspaceError::Malformed { .. })));

        let missing = workspace.open_document(Path::new("routes/missing.php")).await;
        assert!(matches!(missing, Err(WorkspaceError::Io { .. })));
    }

    #[tokio::test]
    async fn test_find_files_through_trait() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "app/Http/Controllers/Admin/UserController.php", "<?php\n");
        let workspace = FsWorkspace::new(dir.path());

        let pattern = CandidatePattern::new("app/Http/Controllers/**/UserController.php", "**/vendor/**");
        let files = workspace.find_files(&pattern).await.unwrap();
        assert_eq!(
            relative_names(dir.path(), &files),
            vec!["app/Http/Controllers/Admin/UserController.php"]
        );
    }
}
