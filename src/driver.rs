//! Target driver (design doc C8): resolves the project root, then builds
//! each target in config-file order, applying the user's target selector
//! and release/debug mode.
//!
//! Grounded on `build_target_cb` / `cc_build` / `set_root_and_build_paths`
//! in the original build tool's `cmd_build.c`. The original recreates its
//! thread pool inside the per-target loop; here a single [`ThreadPool`] is
//! created once and `Driver` calls [`ThreadPool::fence`]
//! between the compile and link stages of each target instead.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{error, info};
use walkdir::WalkDir;

use crate::compile::{self, ObjectRecord};
use crate::config::Config;
use crate::error::{BuildError, IoResultExt, Result};
use crate::link;
use crate::options::{BuildOptions, TargetType};
use crate::paths;
use crate::pool::ThreadPool;

/// Which flag set (`release` or `debug`) to splice into `[DEBUG_OR_RELEASE]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Debug,
    Release,
}

pub struct Driver {
    root: PathBuf,
    pool: ThreadPool,
}

impl Driver {
    /// Resolves `rootdir` to an absolute path and `chdir`s into it, exactly
    /// once, before any target is processed — matching
    /// `set_root_and_build_paths`'s single early `chdir`. Creates the
    /// process-lifetime worker pool sized from `jlevel`.
    pub fn new(rootdir: &Path, jlevel: usize) -> Result<Self> {
        let root = dunce::canonicalize(rootdir).with_path(rootdir)?;
        std::env::set_current_dir(&root).with_path(&root)?;
        info!(root = %root.display(), "resolved project root");
        Ok(Driver { root, pool: ThreadPool::new(jlevel, crate::pool::DEFAULT_QUEUE_CAPACITY) })
    }

    /// Runs `build` for every target matching `selector` (a substring
    /// match against the target name, or all targets if `None`).
    pub fn build(&self, config_path: &Path, mode: Mode, selector: Option<&str>) -> Result<()> {
        let config = Config::load(config_path)?;
        for mut opts in config.targets {
            if let Some(selector) = selector {
                if !opts.target.contains(selector) {
                    continue;
                }
            }
            self.build_target(&mut opts, mode)?;
        }
        Ok(())
    }

    fn build_target(&self, opts: &mut BuildOptions, mode: Mode) -> Result<()> {
        info!(target = %opts.target, "building target");

        opts.incpaths = paths::tidy_pathlist(&opts.incpaths, "-I");
        opts.libpaths = paths::tidy_pathlist(&opts.libpaths, "-L");

        let debug_or_release = match mode {
            Mode::Release => opts.release.clone(),
            Mode::Debug => opts.debug.clone(),
        };
        opts.compile = opts
            .compile
            .replace("[DEBUG_OR_RELEASE]", &debug_or_release)
            .replace("-I[INCPATHS]", &opts.incpaths);
        opts.link = opts.link.replace("-L[LIBPATHS]", &opts.libpaths);

        let entry_objects: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());
        let library_objects: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());
        let entry_objects = std::sync::Arc::new(entry_objects);
        let library_objects = std::sync::Arc::new(library_objects);
        let failures: std::sync::Arc<Mutex<Vec<BuildError>>> = std::sync::Arc::new(Mutex::new(Vec::new()));

        for src in self.enumerate_sources(&opts.srcpaths)? {
            let opts = opts.clone();
            let entry_objects = std::sync::Arc::clone(&entry_objects);
            let library_objects = std::sync::Arc::clone(&library_objects);
            let failures = std::sync::Arc::clone(&failures);

            self.pool.submit(move || {
                let relative_src = paths::normalize_relative(&src);
                match compile::compile_one(&opts, &relative_src) {
                    Ok(ObjectRecord { object_path, is_entry_point }) => {
                        let target = if is_entry_point { &entry_objects } else { &library_objects };
                        target.lock().unwrap().push(object_path);
                    }
                    Err(e) => {
                        error!(src = %relative_src.display(), error = %e, "compile failed");
                        failures.lock().unwrap().push(e);
                    }
                }
            });
        }

        self.pool.fence();

        // A failing compile does not abort
        // sibling compiles, and the driver attempts the link stage anyway
        // with whatever objects were produced, rather than short-circuiting.
        // The target still fails overall if anything went wrong.
        let entry_objects = entry_objects.lock().unwrap();
        let library_objects = library_objects.lock().unwrap();

        let link_result = (|| -> Result<()> {
            if opts.ty.contains(TargetType::BIN) {
                link::link_executables(opts, &entry_objects, &library_objects)?;
            }
            if opts.ty.contains(TargetType::SHARED)
                || opts.ty.contains(TargetType::STATIC)
                || entry_objects.is_empty()
            {
                link::link_libraries(opts, &library_objects)?;
            }
            Ok(())
        })();

        if let Err(link_err) = link_result {
            return Err(link_err);
        }
        if let Some(first) = failures.lock().unwrap().drain(..).next() {
            return Err(first);
        }

        Ok(())
    }

    /// Recursively enumerates regular files under each space-separated root
    /// in `srcpaths`, filtering to recognized translation-unit extensions.
    ///
    /// Roots commonly overlap (the default `SRCPATHS = . ./src` walks `.`
    /// and `./src`, and `./src/main.c` turns up under both), so the same
    /// file is deduplicated by its project-root-relative path before being
    /// returned — otherwise it would be compiled and linked in twice.
    fn enumerate_sources(&self, srcpaths: &str) -> Result<Vec<PathBuf>> {
        let mut seen = std::collections::HashSet::new();
        let mut files = Vec::new();
        for root in srcpaths.split(' ').filter(|p| !p.is_empty()) {
            for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
                if entry.file_type().is_file() && compile::is_translation_unit(entry.path()) {
                    let path = entry.into_path();
                    let key = paths::normalize_relative(&path);
                    if seen.insert(key) {
                        files.push(path);
                    }
                }
            }
        }
        Ok(files)
    }

    /// Deletes the resolved `build_root` and `install_root` trees for every
    /// target named in `config_path` (design doc §11's resolution of the
    /// `clean` open question).
    pub fn clean(&self, config_path: &Path) -> Result<()> {
        let config = Config::load(config_path)?;
        for opts in &config.targets {
            remove_tree(&opts.build_root)?;
            if opts.install_root != opts.build_root {
                remove_tree(&opts.install_root)?;
            }
        }
        Ok(())
    }
}

fn remove_tree(dir: &str) -> Result<()> {
    let path = Path::new(dir);
    if !path.exists() {
        return Ok(());
    }
    info!(dir, "removing");
    std::fs::remove_dir_all(path).with_path(path)
}
