//! Route declaration lookup inside one route file.
//!
//! Given the full text of a file and a route name, finds the line that
//! declares the route and widens it to the whole declaration: the start of a
//! multi-line fluent chain, the closing line of a closure, and the header
//! and closing `});` of the route group the declaration lives in.
//!
//! Matching is purely textual. Three rules are tried in priority order and
//! the first rule that matches anywhere in the text wins:
//!
//! 1. [`MatchRule::ExactName`]: `->name('admin.users.edit')`
//! 2. [`MatchRule::GroupPrefix`]: `'as' => 'admin.users.'`
//! 3. [`MatchRule::VerbPath`]: `Route::get('/edit', ...)`

use std::path::PathBuf;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::route_name::RouteName;
use crate::span::{SourceSpan, TextPosition};

lazy_static! {
    /// 'as' => 'admin.' / ->as('admin.') / Route::name('admin.')
    static ref GROUP_ALIAS: Regex =
        Regex::new(r#"(?:['"]as['"]\s*=>\s*|(?:->|::)(?:as|name)\(\s*)['"]([^'"]+)['"]"#).unwrap();
}

/// A heuristic for finding a route declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchRule {
    /// `->name('<full.name>')`
    ExactName,
    /// `'as' => '<p1>.<p2>.'` group alias built from the name's prefix path
    GroupPrefix,
    /// `::get('<leaf>')` and the other HTTP verbs, for unnamed routes
    VerbPath,
}

impl MatchRule {
    /// Every rule, highest priority first
    pub const PRIORITY: [MatchRule; 3] = [
        MatchRule::ExactName,
        MatchRule::GroupPrefix,
        MatchRule::VerbPath,
    ];

    /// The regular expression source for `name`, or `None` when the rule
    /// cannot apply (single-segment names have no group prefix)
    pub fn pattern(&self, name: &RouteName) -> Option<String> {
        match self {
            MatchRule::ExactName => Some(format!(
                r#"->name\(\s*['"]{}['"]\s*\)"#,
                regex::escape(name.as_str())
            )),
            MatchRule::GroupPrefix => {
                let alias = name.group_alias()?;
                Some(format!(
                    r#"['"]as['"]\s*=>\s*['"]{}['"]"#,
                    regex::escape(&alias)
                ))
            }
            MatchRule::VerbPath => Some(format!(
                r#"(?:::|->)(?:get|post|put|patch|delete)\s*\(\s*['"]/?{}/?['"]"#,
                regex::escape(name.leaf())
            )),
        }
    }

    fn regex(&self, name: &RouteName) -> Option<Regex> {
        let pattern = self.pattern(name)?;
        match Regex::new(&pattern) {
            Ok(regex) => Some(regex),
            Err(e) => {
                debug!("Skipping {:?} rule for '{}': {}", self, name, e);
                None
            }
        }
    }
}

/// A located route declaration, in line terms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Declaration {
    /// The rule that produced the match
    pub rule: MatchRule,
    /// Line holding the raw match
    pub anchor_line: usize,
    /// First line of the declaration (column 0)
    pub start_line: usize,
    /// Last line of the declaration
    pub end_line: usize,
    /// Length of the last line, in characters
    pub end_column: usize,
}

impl Declaration {
    pub fn to_span(&self, path: PathBuf) -> SourceSpan {
        SourceSpan::new(
            path,
            TextPosition::new(self.start_line as u32, 0),
            TextPosition::new(self.end_line as u32, self.end_column as u32),
        )
    }
}

/// Find the declaration of `name` in `text`
///
/// Returns `None` when no rule matches.
pub fn locate_declaration(text: &str, name: &RouteName) -> Option<Declaration> {
    let lines: Vec<&str> = text.lines().collect();
    if lines.is_empty() {
        return None;
    }

    for rule in MatchRule::PRIORITY {
        let Some(regex) = rule.regex(name) else {
            continue;
        };
        let Some(found) = regex.find(text) else {
            continue;
        };

        let anchor_line = line_of_offset(text, found.start()).min(lines.len() - 1);
        let (start_line, end_line) = expand_declaration(&lines, anchor_line, name);

        debug!(
            "Route '{}' matched {:?} at line {}, declaration spans {}..={}",
            name, rule, anchor_line, start_line, end_line
        );

        return Some(Declaration {
            rule,
            anchor_line,
            start_line,
            end_line,
            end_column: lines[end_line].chars().count(),
        });
    }

    None
}

fn line_of_offset(text: &str, offset: usize) -> usize {
    text[..offset].matches('\n').count()
}

/// Widen a matched line to the full declaration
///
/// The span also covers the nearest enclosing route group whose name alias
/// is a prefix of `name`. Groups without a matching alias (a plain
/// `Route::middleware(..)->group(..)` wrapper) are looked through.
fn expand_declaration(lines: &[&str], anchor: usize, name: &RouteName) -> (usize, usize) {
    let start = declaration_start(lines, anchor);
    let end = declaration_end(lines, start, anchor);

    let mut inner = start;
    while let Some(opener) = enclosing_block(lines, inner) {
        let header = declaration_start(lines, opener);
        if names_group_of(&lines[header..=opener], name) {
            return (header, declaration_end(lines, header, end));
        }
        inner = header;
    }

    (start, end)
}

/// Walk back to the line that starts the declaration
///
/// Stops at a `Route::` line, a `Route::group` line, an `'as' =>` alias
/// line, or the top of the file.
fn declaration_start(lines: &[&str], from: usize) -> usize {
    let mut line = from;
    while line > 0 && !starts_declaration(lines[line]) {
        line -= 1;
    }
    line
}

/// Walk forward to the statement terminator that closes the declaration
///
/// A `;` (which includes the `});` closing a group call) only ends the
/// declaration once every brace opened since `start` is closed again, and
/// never before `at_least`. Falls back to the last line.
fn declaration_end(lines: &[&str], start: usize, at_least: usize) -> usize {
    let mut depth: i32 = 0;
    for (index, line) in lines.iter().enumerate().skip(start) {
        depth += brace_delta(line);
        if index >= at_least && depth <= 0 && line.contains(';') {
            return index;
        }
    }
    lines.len() - 1
}

/// The nearest line above `before` whose `{` is still open at `before`
fn enclosing_block(lines: &[&str], before: usize) -> Option<usize> {
    let mut depth: i32 = 0;
    for index in (0..before).rev() {
        depth += brace_delta(lines[index]);
        if depth > 0 {
            return Some(index);
        }
    }
    None
}

fn starts_declaration(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with("Route::") || trimmed.contains("Route::group") || is_alias_marker(trimmed)
}

/// Whether the header lines of a block open a route group aliased with a
/// prefix of `name`
fn names_group_of(header: &[&str], name: &RouteName) -> bool {
    if !header.iter().any(|line| line.contains("group(") || is_alias_marker(line)) {
        return false;
    }

    header.iter().any(|line| {
        GROUP_ALIAS
            .captures_iter(line)
            .filter_map(|captures| captures.get(1))
            .any(|alias| name.as_str().starts_with(alias.as_str()))
    })
}

fn is_alias_marker(line: &str) -> bool {
    line.contains("'as' =>") || line.contains("\"as\" =>")
}

/// Opening minus closing braces on one line
fn brace_delta(line: &str) -> i32 {
    line.chars().fold(0, |depth, c| match c {
        '{' => depth + 1,
        '}' => depth - 1,
        _ => depth,
    })
}
