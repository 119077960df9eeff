//! Input selection: which of the given paths are readable record files

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::warn;

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    extensions
        .iter()
        .any(|accepted| accepted.trim_start_matches('.').eq_ignore_ascii_case(ext))
}

/// Keep the regular files among `paths` whose extension is accepted
///
/// Order is preserved (it is the iteration order of the run) and repeated
/// paths are dropped. Everything skipped is reported.
pub fn select_inputs(paths: &[PathBuf], extensions: &[String]) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for path in paths {
        if !path.is_file() {
            warn!(path = %path.display(), "skipping, not a file");
            continue;
        }
        if !has_extension(path, extensions) {
            warn!(path = %path.display(), ?extensions, "skipping, unexpected extension");
            continue;
        }
        if seen.insert(path.clone()) {
            files.push(path.clone());
        }
    }

    files
}
