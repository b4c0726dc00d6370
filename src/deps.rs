//! Dependency scanning (design doc C4): freshness of a translation unit
//! w.r.t. its include closure, and whether it defines `main`.
//!
//! Both scans are line/byte-oriented rather than a real preprocessor pass,
//! translated from `foreach_include_directive` / `update_lastmodified_cb` /
//! `has_entry_point` in the original build tool. A full C preprocessor is
//! out of scope; this mirrors the original's willingness to miss includes
//! hidden behind macros in exchange for a scan that costs nothing to run on
//! every file, every build.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Recursion guard for [`effective_mtime`]; include cycles are rare (they
/// terminate naturally once a header is revisited and yields no new newer
/// timestamp) but unbounded recursion on a malformed project is not
/// something a build tool should allow.
const MAX_INCLUDE_DEPTH: u32 = 64;

/// Per-compile-task memo table: canonical include path -> resolved mtime.
/// Scoped to a single call into [`effective_mtime`] so concurrent compiles
/// never share mutable state.
pub type MtimeMemo = HashMap<PathBuf, Option<i64>>;

/// The most recent modification time among `path` and every header it (and
/// its headers, recursively) `#include`s, as epoch seconds. Returns `None`
/// if `path` itself cannot be stat'd.
pub fn effective_mtime(path: &Path) -> Option<i64> {
    let mut memo = MtimeMemo::new();
    effective_mtime_memo(path, &mut memo, 0)
}

fn effective_mtime_memo(path: &Path, memo: &mut MtimeMemo, depth: u32) -> Option<i64> {
    let own = mtime(path)?;
    if depth >= MAX_INCLUDE_DEPTH {
        return Some(own);
    }
    let mut newest = own;
    for header in find_includes(path) {
        let key = header.clone();
        let resolved = if let Some(cached) = memo.get(&key) {
            *cached
        } else {
            let resolved = effective_mtime_memo(&header, memo, depth + 1);
            memo.insert(key, resolved);
            resolved
        };
        if let Some(h) = resolved {
            newest = newest.max(h);
        }
    }
    Some(newest)
}

fn mtime(path: &Path) -> Option<i64> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    let secs = modified
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    Some(secs)
}

/// Scans `path` line by line for `#include <...>` / `#include "..."`
/// directives, resolving each named header relative to the project root
/// (the process's current directory), not to `path`'s own directory — a
/// source under a subdirectory including a header that lives elsewhere
/// under the project root (e.g. `./src/foo.c` including a root-level
/// `"shared.h"`) must still find it. Headers that don't exist there are
/// silently skipped ("missing included files ... are silently ignored").
fn find_includes(path: &Path) -> Vec<PathBuf> {
    let Ok(contents) = fs::read_to_string(path) else {
        return Vec::new();
    };
    let mut headers = Vec::new();
    for line in contents.lines() {
        if !line.starts_with("#include") {
            continue;
        }
        let Some(name) = extract_include_name(line) else {
            continue;
        };
        let candidate = PathBuf::from(name);
        if candidate.is_file() {
            headers.push(candidate);
        }
    }
    headers
}

/// Extracts the header name between the first `<`/`"` and its matching
/// closing delimiter on one `#include` line.
fn extract_include_name(line: &str) -> Option<&str> {
    let bytes = line.as_bytes();
    let start = line.find(['<', '"'])?;
    let open = bytes[start];
    let close = if open == b'<' { b'>' } else { b'"' };
    let rest = &line[start + 1..];
    let end = rest.find(close as char)?;
    Some(&rest[..end])
}

/// Whether `path` contains a translation-unit entry point: the exact byte
/// sequence `int main(` outside of a string literal, line comment, or block
/// comment. A single-pass, three-state lexical scan, not a real C tokenizer,
/// with known blind spots: a macro-generated `main` or one split across a
/// line continuation is not detected.
pub fn has_entry_point(path: &Path) -> bool {
    let Ok(contents) = fs::read_to_string(path) else {
        return false;
    };
    let mut in_string = false;
    let mut in_line_comment = false;
    let mut in_block_comment = false;
    for line in contents.lines() {
        in_line_comment = false;
        let bytes = line.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            let c = bytes[i];
            let next = bytes.get(i + 1).copied();

            if !in_block_comment && !in_line_comment && c == b'"' && (i == 0 || bytes[i - 1] != b'\\')
            {
                in_string = !in_string;
            }
            if !in_string && !in_block_comment && c == b'/' && next == Some(b'/') {
                in_line_comment = true;
                break;
            }
            if !in_string && !in_block_comment && c == b'/' && next == Some(b'*') {
                in_block_comment = true;
                i += 2;
                continue;
            }
            if !in_string && in_block_comment && c == b'*' && next == Some(b'/') {
                in_block_comment = false;
                i += 2;
                continue;
            }
            if !in_string
                && !in_line_comment
                && !in_block_comment
                && line[i..].as_bytes().starts_with(b"int main(")
            {
                return true;
            }
            i += 1;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn entry_point_detected_in_plain_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.c");
        fs::write(&path, "int main(void) { return 0; }\n").unwrap();
        assert!(has_entry_point(&path));
    }

    #[test]
    fn entry_point_inside_comment_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.c");
        fs::write(&path, "// int main(void)\nvoid helper(void) {}\n").unwrap();
        assert!(!has_entry_point(&path));
    }

    #[test]
    fn entry_point_inside_string_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.c");
        fs::write(&path, "const char *s = \"int main(\";\n").unwrap();
        assert!(!has_entry_point(&path));
    }

    #[test]
    fn entry_point_inside_block_comment_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.c");
        fs::write(&path, "/* int main( */\nvoid helper(void) {}\n").unwrap();
        assert!(!has_entry_point(&path));
    }

    #[test]
    fn missing_file_has_no_entry_point() {
        assert!(!has_entry_point(Path::new("/nonexistent/path.c")));
    }

    /// Headers are now resolved relative to the project root (the process's
    /// current directory), not the including file's own directory, so these
    /// tests run inside a temp directory they `chdir` into — the same
    /// contract `compile::compile_one` relies on in production.
    static CWD_GUARD: std::sync::Mutex<()> = std::sync::Mutex::new(());

    fn in_tempdir(f: impl FnOnce()) {
        let _guard = CWD_GUARD.lock().unwrap();
        let original_cwd = std::env::current_dir().unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        f();
        std::env::set_current_dir(original_cwd).unwrap();
    }

    #[test]
    fn effective_mtime_follows_one_level_of_include() {
        in_tempdir(|| {
            fs::write("util.h", "void util(void);\n").unwrap();
            fs::write("main.c", "#include \"util.h\"\nint main(void){return 0;}\n").unwrap();

            let before = effective_mtime(Path::new("main.c")).unwrap();
            sleep(Duration::from_millis(1100));
            fs::write("util.h", "void util(void); // changed\n").unwrap();
            let after = effective_mtime(Path::new("main.c")).unwrap();
            assert!(after >= before);
        });
    }

    #[test]
    fn include_is_resolved_against_project_root_not_includer_directory() {
        in_tempdir(|| {
            fs::create_dir_all("src").unwrap();
            fs::write("shared.h", "void shared(void);\n").unwrap();
            fs::write("src/foo.c", "#include \"shared.h\"\nvoid foo(void) {}\n").unwrap();

            let before = effective_mtime(Path::new("src/foo.c")).unwrap();
            sleep(Duration::from_millis(1100));
            fs::write("shared.h", "void shared(void); // changed\n").unwrap();
            let after = effective_mtime(Path::new("src/foo.c")).unwrap();
            assert!(after > before, "root-level header must contribute even though it isn't next to the includer");
        });
    }

    #[test]
    fn missing_include_is_silently_skipped() {
        in_tempdir(|| {
            fs::write("main.c", "#include <does_not_exist.h>\nint main(void){return 0;}\n").unwrap();
            assert!(effective_mtime(Path::new("main.c")).is_some());
        });
    }

    #[test]
    fn include_cycle_terminates() {
        in_tempdir(|| {
            fs::write("a.h", "#include \"b.h\"\n").unwrap();
            fs::write("b.h", "#include \"a.h\"\n").unwrap();
            assert!(effective_mtime(Path::new("a.h")).is_some());
        });
    }
}
