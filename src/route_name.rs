//! Route names as they appear in `route('users.index')` calls.
//!
//! A route name is a dotted identifier. The last segment is the leaf
//! (`index`), everything before it is the prefix path (`users`), which
//! usually mirrors the `'as' => 'users.'` aliases of the enclosing route
//! groups.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A validated, dot-separated route name such as `admin.users.edit`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteName(String);

/// Why a string was rejected as a route name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRouteName {
    #[error("route name is empty")]
    Empty,

    #[error("route name '{0}' contains an empty segment")]
    EmptySegment(String),

    #[error("route name '{name}' contains invalid character '{ch}'")]
    InvalidCharacter { name: String, ch: char },
}

impl RouteName {
    /// Parse and validate a route name
    pub fn parse(name: &str) -> Result<Self, InvalidRouteName> {
        if name.is_empty() {
            return Err(InvalidRouteName::Empty);
        }

        for segment in name.split('.') {
            if segment.is_empty() {
                return Err(InvalidRouteName::EmptySegment(name.to_string()));
            }
            if let Some(ch) = segment.chars().find(|c| !is_segment_char(*c)) {
                return Err(InvalidRouteName::InvalidCharacter {
                    name: name.to_string(),
                    ch,
                });
            }
        }

        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// All dot-separated segments, in order
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// Number of segments (always at least one)
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// The top-level segment, used as a hint for the route file name
    ///
    /// `admin.users.edit` -> `admin`
    pub fn file_prefix(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }

    /// The last segment
    ///
    /// `admin.users.edit` -> `edit`
    pub fn leaf(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }

    /// Group alias built from the first two segments, or `None` for
    /// single-segment names
    ///
    /// `admin.users.edit` -> `Some("admin.users.")`, `admin.x` -> `Some("admin.x.")`
    pub fn group_alias(&self) -> Option<String> {
        if self.depth() < 2 {
            return None;
        }
        Some(self.segments().take(2).map(|segment| format!("{}.", segment)).collect())
    }
}

fn is_segment_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

impl FromStr for RouteName {
    type Err = InvalidRouteName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RouteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RouteName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dotted_name() {
        let name = RouteName::parse("admin.users.edit").unwrap();
        assert_eq!(name.as_str(), "admin.users.edit");
        assert_eq!(name.depth(), 3);
        assert_eq!(name.file_prefix(), "admin");
        assert_eq!(name.leaf(), "edit");
        assert_eq!(name.group_alias(), Some("admin.users.".to_string()));
    }

    #[test]
    fn test_single_segment_name() {
        let name: RouteName = "dashboard".parse().unwrap();
        assert_eq!(name.file_prefix(), "dashboard");
        assert_eq!(name.leaf(), "dashboard");
        assert_eq!(name.group_alias(), None);
    }

    #[test]
    fn test_hyphens_and_underscores_allowed() {
        assert!(RouteName::parse("password-reset.send_link").is_ok());
    }

    #[test]
    fn test_rejects_invalid_names() {
        assert_eq!(RouteName::parse(""), Err(InvalidRouteName::Empty));
        assert!(matches!(
            RouteName::parse("users..index"),
            Err(InvalidRouteName::EmptySegment(_))
        ));
        assert!(matches!(
            RouteName::parse(".users"),
            Err(InvalidRouteName::EmptySegment(_))
        ));
        assert!(matches!(
            RouteName::parse("users/index"),
            Err(InvalidRouteName::InvalidCharacter { ch: '/', .. })
        ));
    }
}
