//! Token extraction from a single line of source text.
//!
//! Recognizes the two things a cursor can sit on:
//! - a route name inside `route('name', ...)`, bare or inside a Blade echo
//!   `{{ route('name') }}`
//! - a controller binding on a route declaration line, either
//!   `->controller('UserController', 'index')` or `'uses' => 'UserController@index'`
//!
//! Everything here is pure string scanning, no I/O.

use lazy_static::lazy_static;
use regex::Regex;

use crate::route_name::RouteName;

lazy_static! {
    /// route('name') / route("name", [...])
    static ref ROUTE_CALL: Regex =
        Regex::new(r#"route\(['"]([a-zA-Z0-9\-._]+)['"](?:\s*,\s*.*?)?\)"#).unwrap();

    /// {{ route('name') }}
    static ref BLADE_ROUTE_ECHO: Regex =
        Regex::new(r#"\{\{\s*route\(['"]([a-zA-Z0-9\-._]+)['"](?:\s*,\s*.*?)?\)\s*\}\}"#).unwrap();

    /// ->controller('UserController', 'index')
    static ref FLUENT_CONTROLLER: Regex =
        Regex::new(r#"controller\(\s*['"](.*?)['"],\s*['"](.*?)['"]\s*\)"#).unwrap();

    /// 'uses' => 'UserController@index' (the key may be quoted or bare)
    static ref USES_ACTION: Regex =
        Regex::new(r#"uses['"]?\s*=>\s*['"](.*?)@(.*?)['"]"#).unwrap();

    static ref USES_KEY: Regex = Regex::new(r#"uses['"]?\s*=>"#).unwrap();
}

/// A route name found on a line, with the columns it occupies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteReference {
    pub name: RouteName,
    /// Character column of the first character of the name
    pub start: usize,
    /// Character column just past the last character of the name
    pub end: usize,
}

impl RouteReference {
    /// Whether a cursor column touches the name (both ends inclusive)
    pub fn contains(&self, cursor: usize) -> bool {
        self.start <= cursor && cursor <= self.end
    }
}

/// The controller class and method a route declaration binds to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerBinding {
    pub controller: String,
    pub method: String,
}

impl ControllerBinding {
    /// The class name without its namespace
    ///
    /// `App\Http\Controllers\UserController` -> `UserController`
    pub fn class_basename(&self) -> &str {
        self.controller
            .rsplit('\\')
            .next()
            .unwrap_or(&self.controller)
    }
}

/// Return the route name under `cursor`, if any
///
/// `cursor` is a character column into `line`.
pub fn extract_logical_name(line: &str, cursor: usize) -> Option<RouteName> {
    route_reference_at(line, cursor).map(|reference| reference.name)
}

/// Return the route name under `cursor` together with its column span
///
/// The span is recovered by searching the captured name back into the line,
/// so the first occurrence of that literal wins. If the same text appears
/// earlier on the line outside any route() call (`'users.index' . route('users.index')`),
/// the recovered span points at the earlier copy. This is a known
/// limitation of the text scan.
pub fn route_reference_at(line: &str, cursor: usize) -> Option<RouteReference> {
    for pattern in [&*ROUTE_CALL, &*BLADE_ROUTE_ECHO] {
        for captures in pattern.captures_iter(line) {
            let Some(raw_name) = captures.get(1).map(|m| m.as_str()) else {
                continue;
            };

            let Some(byte_start) = line.find(raw_name) else {
                continue;
            };
            let start = line[..byte_start].chars().count();
            let end = start + raw_name.chars().count();

            if cursor < start || cursor > end {
                continue;
            }

            // route('users..index') matches the character class but is not a name
            let Ok(name) = RouteName::parse(raw_name) else {
                continue;
            };

            return Some(RouteReference { name, start, end });
        }
    }

    None
}

/// Whether a line declares a route that binds a controller
///
/// Requires `Route::` plus either a fluent `->controller(` call or a
/// `uses =>` array key.
pub fn is_controller_binding_line(line: &str) -> bool {
    line.contains("Route::") && (line.contains("->controller(") || USES_KEY.is_match(line))
}

/// Extract the controller class and method from a route declaration line
///
/// The fluent form is tried before the array form.
pub fn extract_controller_binding(line: &str) -> Option<ControllerBinding> {
    for pattern in [&*FLUENT_CONTROLLER, &*USES_ACTION] {
        if let Some(captures) = pattern.captures(line) {
            let controller = captures.get(1)?.as_str().trim();
            let method = captures.get(2)?.as_str().trim();

            if controller.is_empty() {
                continue;
            }

            return Some(ControllerBinding {
                controller: controller.to_string(),
                method: method.to_string(),
            });
        }
    }

    None
}
