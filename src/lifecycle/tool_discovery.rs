//! Tool pack discovery: scan a tools directory for `toolpack.json` markers.

use std::path::Path;

use crate::inference::ToolPack;

/// Marker file that turns a directory into a tool pack.
pub const TOOL_PACK_MARKER: &str = "toolpack.json";

/// Scan the immediate subdirectories of `tools_dir` for tool packs.
///
/// Skips directories starting with `_` or `.`, and directories whose marker
/// is missing or unreadable. Returns an empty list if `tools_dir` does not
/// exist. Packs are sorted by name so load order is stable.
pub fn discover_tool_packs(tools_dir: &Path) -> Vec<ToolPack> {
    let entries = match std::fs::read_dir(tools_dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(
                path = %tools_dir.display(),
                error = %e,
                "tools directory not found, skipping tool pack discovery"
            );
            return Vec::new();
        }
    };

    let mut packs = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        let dir_name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };
        if dir_name.starts_with('_') || dir_name.starts_with('.') {
            continue;
        }

        let marker = path.join(TOOL_PACK_MARKER);
        let raw = match std::fs::read_to_string(&marker) {
            Ok(raw) => raw,
            Err(_) => continue,
        };

        match serde_json::from_str::<ToolPack>(&raw) {
            Ok(mut pack) if !pack.name.trim().is_empty() => {
                pack.dir = path.clone();
                tracing::debug!(name = %pack.name, version = %pack.version, "discovered tool pack");
                packs.push(pack);
            }
            Ok(_) => {
                tracing::warn!(path = %marker.display(), "tool pack marker has no name, skipping");
            }
            Err(e) => {
                tracing::warn!(path = %marker.display(), error = %e, "invalid tool pack marker, skipping");
            }
        }
    }

    packs.sort_by(|a, b| a.name.cmp(&b.name));
    packs
}
