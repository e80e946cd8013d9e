//! Variables path resolution for resolvers.

use crate::placement::PlacementContext;

use super::ItemKind;

/// Scheme prefix marking a resolver storage as a Nomad Variables path.
pub const NOMAD_SCHEME: &str = "nomad://";

/// Resolve the Variables path a resolver's state is stored under.
///
/// An explicit `nomad://some/path` is used verbatim (without the scheme).
/// An empty path (`nomad://` or `""`) is derived from the task placement:
/// `nomad/jobs/<job>/<group>/<task>/acme/<resolver>`, with the resolver name
/// lower-cased.
pub fn resolve_variables_path(
    resolver: &str,
    variables_path: &str,
    placement: &PlacementContext,
) -> String {
    let explicit = variables_path
        .strip_prefix(NOMAD_SCHEME)
        .unwrap_or(variables_path);
    if !explicit.is_empty() {
        return explicit.to_string();
    }

    format!(
        "nomad/jobs/{}/{}/{}/acme/{}",
        placement.job,
        placement.group,
        placement.task,
        resolver.to_lowercase()
    )
}

/// Path of the variable holding `kind` under a resolver's base path.
pub fn item_path(base: &str, kind: ItemKind) -> String {
    join(&[base, kind.as_str()])
}

/// Slash-join path elements and clean the result: empty and `.` segments are
/// dropped, `..` removes the previous segment, and a leading `/` is kept.
fn join(elements: &[&str]) -> String {
    let joined = elements
        .iter()
        .filter(|e| !e.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/");
    if joined.is_empty() {
        return String::new();
    }

    let rooted = joined.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|last| *last != "..") {
                    segments.pop();
                } else if !rooted {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }

    let cleaned = segments.join("/");
    match (rooted, cleaned.is_empty()) {
        (true, _) => format!("/{cleaned}"),
        (false, true) => ".".to_string(),
        (false, false) => cleaned,
    }
}
