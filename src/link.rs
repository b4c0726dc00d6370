//! Link stage (design doc C7): turns the compile stage's object lists into
//! an executable and/or shared/static libraries for one target.
//!
//! Grounded on `link_object_files_cb` / `link_libs` in the original build
//! tool's `cmd_build.c`.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{IoResultExt, Result};
use crate::options::{BuildOptions, TargetType};
use crate::paths::display_slash;

/// Links one executable per entry-point object: for each path in
/// `entry_objects`, `library_objects` are linked in ahead of
/// each entry object.
pub fn link_executables(opts: &BuildOptions, entry_objects: &[PathBuf], library_objects: &[PathBuf]) -> Result<()> {
    let library_objects_joined = join_paths(library_objects);
    for entry_object in entry_objects {
        let name = binary_name(entry_object);
        let binpath = Path::new(&opts.install_root).join(&opts.installdir).join(name);
        ensure_parent_dir(&binpath)?;

        let objs = if library_objects_joined.is_empty() {
            display_slash(entry_object)
        } else {
            format!("{library_objects_joined} {}", display_slash(entry_object))
        };

        let command =
            opts.link.replace("[OBJS]", &objs).replace("[BINPATH]", &display_slash(&binpath));

        info!(binpath = %binpath.display(), "linking executable");
        crate::shell::run(&command)?;
    }
    Ok(())
}

/// Links the shared and/or static library for a target, as selected by
/// `opts.ty`. Also called when a target produced no entry-point objects at
/// all, so a library-only target still gets linked.
pub fn link_libraries(opts: &mut BuildOptions, library_objects: &[PathBuf]) -> Result<()> {
    if opts.libname.is_empty() {
        opts.libname = opts.target.clone();
    }
    if !opts.libname.starts_with("lib") {
        opts.libname = format!("lib{}", opts.libname);
    }

    let binpath = Path::new(&opts.install_root).join(&opts.installdir).join(&opts.libname);
    ensure_parent_dir(&binpath)?;

    let objs = join_paths(library_objects);

    if opts.ty.contains(TargetType::SHARED) {
        let command =
            opts.link_shared.replace("[OBJS]", &objs).replace("[BINPATH]", &display_slash(&binpath));
        info!(binpath = %binpath.display(), "linking shared library");
        crate::shell::run(&command)?;
    }

    if opts.ty.contains(TargetType::STATIC) {
        let command =
            opts.link_static.replace("[OBJS]", &objs).replace("[BINPATH]", &display_slash(&binpath));
        info!(binpath = %binpath.display(), "linking static library");
        crate::shell::run(&command)?;
    }

    Ok(())
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_path(parent)?;
    }
    Ok(())
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths.iter().map(|p| display_slash(p)).collect::<Vec<_>>().join(" ")
}

/// The binary name for an entry object: its file stem with everything from
/// the first `.` onward stripped (`src/main.o` -> `main`).
fn binary_name(entry_object: &Path) -> String {
    let base = entry_object.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    match base.find('.') {
        Some(idx) => base[..idx].to_string(),
        None => base.to_string(),
    }
}
