use std::collections::HashMap;
use std::path::Path;

/// Parses one descriptor file's contents: lines `key=impl`; blank lines and
/// malformed lines are skipped with a logged warning, per `spec.md` §6.
pub fn parse(interface: &str, contents: &str) -> HashMap<String, String> {
    let mut out = HashMap::new();

    for (line_no, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match line.split_once('=') {
            Some((key, impl_name)) if !key.trim().is_empty() && !impl_name.trim().is_empty() => {
                out.insert(key.trim().to_string(), impl_name.trim().to_string());
            }
            _ => {
                log::warn!("{interface}: skipping malformed descriptor line {}: '{line}'", line_no + 1);
            }
        }
    }

    out
}

/// Reads and parses a descriptor file named after `interface` under `root`,
/// if it exists. Returns an empty map (not an error) if the root has no such
/// file, matching a scan root simply not overriding anything.
pub fn read_from_root(root: &Path, interface: &str) -> HashMap<String, String> {
    let path = root.join(interface);
    match std::fs::read_to_string(&path) {
        Ok(contents) => parse(interface, &contents),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
        Err(e) => {
            log::warn!("{interface}: failed to read descriptor file {}: {e}", path.display());
            HashMap::new()
        }
    }
}
