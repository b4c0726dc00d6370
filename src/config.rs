//! Config-file loading (design doc C2): turns an INI file into a default
//! [`BuildOptions`] plus an ordered map of per-target options, including
//! compiler auto-detection and variable expansion.
//!
//! Grounded on `parse_opts_cb` / `resolve_default_cc` /
//! `parse_build_opts` in the original build tool's `build_opts.c`. The
//! original drives this from an `ini_parse` callback; here the whole file
//! is loaded up front with the `ini` crate and then walked once, which is
//! the same two-pass shape (section order, then key order within a
//! section) without needing a callback context struct.

use std::path::Path;
use std::process::{Command, Stdio};
use std::time::SystemTime;

use tracing::{debug, info};

use crate::error::{BuildError, Result};
use crate::expand;
use crate::options::BuildOptions;

/// One target's fully-resolved build options, in the order its section
/// first appeared in the config file.
pub struct Config {
    pub targets: Vec<BuildOptions>,
}

impl Config {
    /// Loads and fully resolves `path`: parses every section, auto-detects
    /// the default compiler, expands variables, and returns targets in
    /// config-file order.
    pub fn load(path: &Path) -> Result<Config> {
        let ini = ini::Ini::load_from_file(path)
            .map_err(|e| BuildError::config(format!("{}: {e}", path.display())))?;

        let file_mtime = mtime_or_zero(path);

        let mut default = BuildOptions::default();
        default.lastmodified = file_mtime;

        // First pass: populate `default` from the general (sectionless)
        // section. The original resolves the default CC only once the
        // first named section is seen; we resolve it right after the
        // default section since nothing before the first target needs it.
        for (key, value) in ini.general_section().iter() {
            default.apply(key, value)?;
        }
        resolve_default_cc(&mut default)?;

        let mut targets = Vec::new();
        for (section, props) in ini.iter() {
            let Some(name) = section else { continue };
            let mut opts = BuildOptions::from_default(&default, name);
            opts.lastmodified = file_mtime;
            for (key, value) in props.iter() {
                opts.apply(key, value)?;
            }
            expand::expand(&mut opts)?;
            targets.push(opts);
        }

        Ok(Config { targets })
    }
}

fn mtime_or_zero(path: &Path) -> i64 {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Resolves `default.cc`: if empty, probe `"gcc|clang|cl"`; if it already
/// names a `|`-separated list, probe that list instead. Leaves an explicit
/// single compiler name untouched.
fn resolve_default_cc(default: &mut BuildOptions) -> Result<()> {
    if default.cc.is_empty() {
        default.cc = find_compiler("gcc|clang|cl")?;
    } else if default.cc.contains('|') {
        let candidates = default.cc.clone();
        default.cc = find_compiler(&candidates)?;
    }
    Ok(())
}

/// Tries each `|`-separated candidate in order, adopting the first whose
/// `<candidate> --version` exits zero.
pub fn find_compiler(candidate_list: &str) -> Result<String> {
    for candidate in candidate_list.split('|') {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            continue;
        }
        if is_compiler_available(candidate) {
            info!(compiler = candidate, "auto-detected compiler");
            return Ok(candidate.to_string());
        }
        debug!(compiler = candidate, "compiler not available");
    }
    Err(BuildError::config(format!(
        "no compiler found on PATH (tried: {candidate_list}). Install one, or set CC explicitly."
    )))
}

fn is_compiler_available(compiler: &str) -> bool {
    Command::new(compiler)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn minimal_config_produces_one_target_inheriting_defaults() {
        let file = write_config(
            "CC = /bin/true\nSRCPATHS = ./src\n\n[hello]\nTYPE = bin\n",
        );
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.targets.len(), 1);
        let hello = &config.targets[0];
        assert_eq!(hello.target, "hello");
        assert_eq!(hello.srcpaths, "./src");
        assert_eq!(hello.cc, "/bin/true");
    }

    #[test]
    fn targets_preserve_config_file_order() {
        let file = write_config("CC = /bin/true\n\n[b]\nTYPE=bin\n\n[a]\nTYPE=bin\n");
        let config = Config::load(file.path()).unwrap();
        let names: Vec<&str> = config.targets.iter().map(|t| t.target.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn append_operator_accumulates_onto_default() {
        let file = write_config(
            "CC = /bin/true\nCCFLAGS = -Wall\n\n[app]\nCCFLAGS+ = -Werror\n",
        );
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.targets[0].ccflags, "-Wall -Werror");
    }

    #[test]
    fn unknown_key_in_config_is_rejected() {
        let file = write_config("CC = /bin/true\n\n[app]\nNOT_REAL = x\n");
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, BuildError::Config(_)));
    }

    #[test]
    fn explicit_single_compiler_is_kept_as_is_without_probing() {
        let file = write_config("CC = /definitely/not/a/real/compiler\n\n[app]\nTYPE=bin\n");
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.targets[0].cc, "/definitely/not/a/real/compiler");
    }
}
