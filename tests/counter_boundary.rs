use std::fs;
use std::path::{Path, PathBuf};

fn collect_rs_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        if let Ok(read_dir) = fs::read_dir(&dir) {
            for entry in read_dir.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else if path.extension().map(|e| e == "rs").unwrap_or(false) {
                    files.push(path);
                }
            }
        }
    }
    files
}

fn file_contains(path: &Path, needle: &str) -> bool {
    fs::read_to_string(path)
        .map(|c| c.contains(needle))
        .unwrap_or(false)
}

#[test]
fn clamped_counter_updates_stay_in_designated_modules() {
    // Counter mutations must clamp at zero, and the clamp must not be
    // re-implemented ad hoc across the tree: the repository owns the
    // event-driven deltas and the like service owns its fallback
    // transactions. Anything else is a drift risk.
    let src_root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src");
    let allowed = ["repository/videos.rs", "services/like.rs"];

    let mut offenders = Vec::new();
    for file in collect_rs_files(&src_root) {
        let path_str = file.to_string_lossy().replace('\\', "/");
        if allowed.iter().any(|a| path_str.ends_with(a)) {
            continue;
        }
        if file_contains(&file, "GREATEST(likes_count")
            || file_contains(&file, "GREATEST(popularity")
        {
            offenders.push(path_str.to_string());
        }
    }

    if !offenders.is_empty() {
        panic!(
            "Clamped counter updates must go through repository::videos or the like fallback. Offenders: {:?}",
            offenders
        );
    }
}

#[test]
fn like_rows_are_written_only_by_repository_and_fallback() {
    let src_root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src");
    let allowed = ["repository/likes.rs", "services/like.rs"];

    let mut offenders = Vec::new();
    for file in collect_rs_files(&src_root) {
        let path_str = file.to_string_lossy().replace('\\', "/");
        if allowed.iter().any(|a| path_str.ends_with(a)) {
            continue;
        }
        if file_contains(&file, "INSERT INTO likes") || file_contains(&file, "DELETE FROM likes") {
            offenders.push(path_str.to_string());
        }
    }

    if !offenders.is_empty() {
        panic!(
            "Like-row writes must go through repository::likes or the like fallback. Offenders: {:?}",
            offenders
        );
    }
}
