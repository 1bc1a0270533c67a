//! Flat-string rendering of path-qualified names.
//!
//! The namespace algebra itself is [`LoomPath`] concatenation; a
//! qualified name only ever becomes a string at presentation
//! boundaries (event payloads, diagnostics). The rendering keeps the
//! path and the name separable, so re-qualifying a rendered name is
//! the same as qualifying under the joined path:
//! `qualify(p1, qualify(p2, name)) == qualify(p1 ++ p2, name)`.

use loom_types::{LoomPath, TypeError};

/// Separator between the rendered path and the local name.
const QUALIFIER: char = ':';

/// Render `name` under `path`.
///
/// Re-qualifying an already qualified name folds the paths together
/// rather than nesting separators.
pub fn qualify(path: &LoomPath, name: &str) -> String {
    let (inner_path, local) = match split_qualified(name) {
        Ok((p, l)) if !p.is_root() => (p, l.to_string()),
        _ => (LoomPath::root(), name.to_string()),
    };
    let full = path.join(&inner_path);
    if full.is_root() {
        local
    } else {
        format!("{full}{QUALIFIER}{local}")
    }
}

/// Split a rendered qualified name back into `(path, local name)`.
///
/// Unqualified names split as `(root, name)`.
pub fn split_qualified(name: &str) -> Result<(LoomPath, &str), TypeError> {
    match name.split_once(QUALIFIER) {
        Some((path, local)) => Ok((LoomPath::parse(path)?, local)),
        None => Ok((LoomPath::root(), name)),
    }
}
