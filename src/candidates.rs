//! Candidate file discovery.
//!
//! Works out which files are likely to hold a declaration and in which
//! order to search them. The actual globbing is done by the
//! [`Workspace`]; this module only decides what to ask for.
//!
//! For a route named `admin.users.edit` the order is:
//! 1. `routes/web/admin.php`
//! 2. `routes/admin.php`
//! 3. `routes/**/*.php`
//!
//! For a controller only the conventional directories are searched.

use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;

use tracing::debug;

use crate::config::ResolverConfig;
use crate::error::WorkspaceError;
use crate::route_name::RouteName;
use crate::workspace::Workspace;

/// A glob to expand, paired with the glob to leave out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidatePattern {
    pub include: String,
    pub exclude: String,
}

impl CandidatePattern {
    pub fn new(include: impl Into<String>, exclude: impl Into<String>) -> Self {
        Self {
            include: include.into(),
            exclude: exclude.into(),
        }
    }
}

/// Patterns for the files that may declare `name`, highest priority first
pub fn route_candidate_patterns(name: &RouteName, config: &ResolverConfig) -> Vec<CandidatePattern> {
    let routes = config.routes_dir();
    let prefix = name.file_prefix();

    vec![
        CandidatePattern::new(format!("{}/web/{}.php", routes, prefix), &config.exclude),
        CandidatePattern::new(format!("{}/{}.php", routes, prefix), &config.exclude),
        CandidatePattern::new(format!("{}/**/*.php", routes), &config.exclude),
    ]
}

/// Patterns for the file defining a controller class, highest priority first
///
/// Namespaced names are narrowed to their basename, so
/// `App\Http\Controllers\UserController` searches for `UserController.php`.
pub fn controller_candidate_patterns(controller: &str, config: &ResolverConfig) -> Vec<CandidatePattern> {
    let class_name = controller.rsplit('\\').next().unwrap_or(controller);
    let file_name = format!("{}.php", glob::Pattern::escape(class_name));

    config
        .controller_dirs()
        .map(|dir| CandidatePattern::new(format!("{}/**/{}", dir, file_name), &config.exclude))
        .collect()
}

/// Lazily expanded candidate files
///
/// Each pattern is only handed to the workspace once every file from the
/// patterns before it has been consumed. Files a higher-priority pattern
/// already produced are skipped.
pub struct CandidateFiles<'w, W: ?Sized> {
    workspace: &'w W,
    patterns: VecDeque<CandidatePattern>,
    pending: VecDeque<PathBuf>,
    seen: HashSet<PathBuf>,
    expanded: usize,
}

impl<'w, W: Workspace + ?Sized> CandidateFiles<'w, W> {
    pub fn new(workspace: &'w W, patterns: Vec<CandidatePattern>) -> Self {
        Self {
            workspace,
            patterns: patterns.into(),
            pending: VecDeque::new(),
            seen: HashSet::new(),
            expanded: 0,
        }
    }

    /// Next candidate file, or `None` once every pattern is exhausted
    pub async fn next(&mut self) -> Result<Option<PathBuf>, WorkspaceError> {
        loop {
            if let Some(path) = self.pending.pop_front() {
                return Ok(Some(path));
            }

            let Some(pattern) = self.patterns.pop_front() else {
                return Ok(None);
            };

            let mut files = self.workspace.find_files(&pattern).await?;
            self.expanded += 1;

            // The workspace promises no order
            files.sort();
            files.retain(|file| self.seen.insert(file.clone()));

            debug!("Pattern {} yielded {} new candidate(s)", pattern.include, files.len());
            self.pending.extend(files);
        }
    }

    /// How many patterns have been handed to the workspace so far
    pub fn patterns_expanded(&self) -> usize {
        self.expanded
    }
}

/// Candidate files for a route name, in search order
pub fn locate_candidate_files<'w, W: Workspace + ?Sized>(
    workspace: &'w W,
    name: &RouteName,
    config: &ResolverConfig,
) -> CandidateFiles<'w, W> {
    CandidateFiles::new(workspace, route_candidate_patterns(name, config))
}

/// Candidate files for a controller class, in search order
pub fn locate_controller_files<'w, W: Workspace + ?Sized>(
    workspace: &'w W,
    controller: &str,
    config: &ResolverConfig,
) -> CandidateFiles<'w, W> {
    CandidateFiles::new(workspace, controller_candidate_patterns(controller, config))
}
