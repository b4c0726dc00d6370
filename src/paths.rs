//! Path-list tidying and a small rebasing helper shared by the compile and
//! link stages (design doc C5/C7).

use std::path::{Component, Path, PathBuf};

use path_slash::PathExt;

/// Strips leading `.` (current-dir) components from an already-relative
/// path, e.g. `./src/main.c` -> `src/main.c`. `srcpaths` entries such as
/// `.` or `./src` make `WalkDir` yield paths carrying one of these, and
/// since the driver has already `chdir`'d to the project root, every
/// enumerated source is relative to that root already — no
/// rebasing against an absolute root is needed or correct, just this
/// cosmetic normalization so object paths come out exactly
/// `./build/hello/src/main.o`, not `./build/hello/./src/main.o`.
pub fn normalize_relative(path: &Path) -> PathBuf {
    path.components().skip_while(|c| matches!(c, Component::CurDir)).collect()
}

/// Rewrites a space-separated path list so every entry carries `prefix`
/// (`-I` or `-L`), leaving entries that already carry it untouched.
/// Translated from `tidy_pathlist` in the original build tool.
pub fn tidy_pathlist(list: &str, prefix: &str) -> String {
    if list.is_empty() {
        return String::new();
    }
    list.split(' ')
        .filter(|p| !p.is_empty())
        .map(|p| if p.starts_with(prefix) { p.to_string() } else { format!("{prefix}{p}") })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Renders `path` with forward slashes regardless of platform, the way
/// compile/link command templates expect (`-I./includes`, not
/// `-I.\includes`) when embedding paths into generated command strings.
pub fn display_slash(path: &Path) -> String {
    path.to_slash_lossy().into_owned()
}
