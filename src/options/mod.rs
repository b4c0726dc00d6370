//! Per-target build options and the registry describing how each one is
//! parsed, appended, inherited and variable-expanded.
//!
//! See [`registry`] for the declarative option table (C1 in the design doc).

mod registry;

pub use registry::{Field, OptionDef, OPTION_DEFS};

use crate::error::{BuildError, Result};
use std::fmt;

/// Bitset over `{BIN, SHARED, STATIC}`. At least one bit must be set once a
/// [`BuildOptions`] has finished parsing. Three flags don't justify a
/// `bitflags` dependency, so this is hand-rolled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TargetType(u8);

impl TargetType {
    pub const BIN: TargetType = TargetType(0b001);
    pub const SHARED: TargetType = TargetType(0b010);
    pub const STATIC: TargetType = TargetType(0b100);

    pub const fn empty() -> Self {
        TargetType(0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl std::ops::BitOr for TargetType {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        TargetType(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for TargetType {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.contains(TargetType::BIN) {
            parts.push("bin");
        }
        if self.contains(TargetType::SHARED) {
            parts.push("shared");
        }
        if self.contains(TargetType::STATIC) {
            parts.push("static");
        }
        write!(f, "{}", parts.join("|"))
    }
}

/// One per build target, plus one additional "default" instance that seeds
/// every target created after it.
#[derive(Clone, Debug)]
pub struct BuildOptions {
    pub target: String,
    pub ty: TargetType,
    pub so_version: u32,
    /// mtime of the configuration file at load time; used to force a
    /// rebuild of every object when the config itself changes.
    pub lastmodified: i64,

    pub cc: String,
    pub libname: String,
    pub build_root: String,
    pub install_root: String,
    pub installdir: String,
    pub srcpaths: String,
    pub incpaths: String,
    pub libpaths: String,
    pub libs: String,
    pub ccflags: String,
    pub ldflags: String,
    pub release: String,
    pub debug: String,
    pub compile: String,
    pub link: String,
    pub link_static: String,
    pub link_shared: String,
}

impl Default for BuildOptions {
    /// The tool's built-in defaults, before any config file is read.
    fn default() -> Self {
        Self {
            target: String::new(),
            ty: TargetType::BIN,
            so_version: 0,
            lastmodified: 0,
            cc: String::new(),
            libname: "$(TARGET)".into(),
            build_root: "./build/$(TARGET)/".into(),
            install_root: "./install/$(TARGET)/".into(),
            installdir: String::new(),
            srcpaths: ". ./src".into(),
            incpaths: ". ./includes".into(),
            libpaths: "$(INSTALL_ROOT)/$(TARGET)".into(),
            libs: String::new(),
            ccflags: "-Wall -Wextra".into(),
            ldflags: String::new(),
            release: "-O2 -DNDEBUG -Werror".into(),
            debug: "-g -O0 -D_FORTIFY_SOURCE=2".into(),
            compile: "$(CC) $(CCFLAGS) [DEBUG_OR_RELEASE] -I[INCPATHS] -o [OBJPATH] -c [SRCPATH]"
                .into(),
            link: "$(CC) $(LDFLAGS) [OBJS] -L[LIBPATHS] $(LIBS) -o [BINPATH]".into(),
            link_static: "ar rcs [BINPATH].a [OBJS]".into(),
            link_shared: "$(CC) -shared -fPIC $(LDFLAGS) [OBJS] -L[LIBPATHS] $(LIBS) -o [BINPATH].so"
                .into(),
        }
    }
}

impl BuildOptions {
    /// Creates a fresh target instance by copying every `COPY_FROM_DEFAULT`
    /// field from `default`, then overwriting `target` with `name`.
    pub fn from_default(default: &BuildOptions, name: &str) -> Self {
        let mut opts = default.clone();
        opts.target = name.to_string();
        opts
    }

    /// The `TARGET` value used in variable expansion: any leading decimal
    /// digits and a trailing `.` are stripped (`10.backend` ->
    /// `backend`).
    pub fn expansion_target_name(&self) -> &str {
        let stripped = self.target.trim_start_matches(|c: char| c.is_ascii_digit());
        stripped.strip_prefix('.').unwrap_or(stripped)
    }

    pub fn get_str(&self, field: Field) -> Option<&str> {
        Some(match field {
            Field::Cc => &self.cc,
            Field::Libname => &self.libname,
            Field::BuildRoot => &self.build_root,
            Field::InstallRoot => &self.install_root,
            Field::InstallDir => &self.installdir,
            Field::SrcPaths => &self.srcpaths,
            Field::IncPaths => &self.incpaths,
            Field::LibPaths => &self.libpaths,
            Field::Libs => &self.libs,
            Field::CcFlags => &self.ccflags,
            Field::LdFlags => &self.ldflags,
            Field::Release => &self.release,
            Field::Debug => &self.debug,
            Field::Compile => &self.compile,
            Field::Link => &self.link,
            Field::LinkStatic => &self.link_static,
            Field::LinkShared => &self.link_shared,
            Field::Target => return Some(&self.target),
            Field::Type | Field::SoVersion => return None,
        })
    }

    /// Overwrites the string-valued `field` with `value`. Used by the
    /// variable expander, which resolves each option independently of the
    /// append/copy-from-default semantics in [`Self::apply`].
    pub fn set_str(&mut self, field: Field, value: String) {
        if let Some(slot) = self.get_str_mut(field) {
            *slot = value;
        }
    }

    fn get_str_mut(&mut self, field: Field) -> Option<&mut String> {
        Some(match field {
            Field::Cc => &mut self.cc,
            Field::Libname => &mut self.libname,
            Field::BuildRoot => &mut self.build_root,
            Field::InstallRoot => &mut self.install_root,
            Field::InstallDir => &mut self.installdir,
            Field::SrcPaths => &mut self.srcpaths,
            Field::IncPaths => &mut self.incpaths,
            Field::LibPaths => &mut self.libpaths,
            Field::Libs => &mut self.libs,
            Field::CcFlags => &mut self.ccflags,
            Field::LdFlags => &mut self.ldflags,
            Field::Release => &mut self.release,
            Field::Debug => &mut self.debug,
            Field::Compile => &mut self.compile,
            Field::Link => &mut self.link,
            Field::LinkStatic => &mut self.link_static,
            Field::LinkShared => &mut self.link_shared,
            Field::Target | Field::Type | Field::SoVersion => return None,
        })
    }

    /// Applies one parsed `key = value` line (section-relative; the caller
    /// has already resolved whether this is the default instance or a named
    /// target) according to the option registry.
    pub fn apply(&mut self, raw_key: &str, value: &str) -> Result<()> {
        let (base_key, append) = match raw_key.strip_suffix('+') {
            Some(base) => (base, true),
            None => (raw_key, false),
        };

        let def = OPTION_DEFS
            .iter()
            .find(|def| def.name.eq_ignore_ascii_case(base_key))
            .ok_or_else(|| BuildError::config(format!("unknown option: '{raw_key}'")))?;

        match def.field {
            Field::Type => self.apply_type(value, append),
            Field::SoVersion => self.apply_so_version(value, append),
            _ => self.apply_string(def, value, append),
        }
    }

    fn apply_string(&mut self, def: &OptionDef, value: &str, append: bool) -> Result<()> {
        if append && !def.append_allowed {
            return Err(BuildError::config(format!(
                "append to {} not supported.",
                def.name
            )));
        }
        let field = def.field;
        let slot = self
            .get_str_mut(field)
            .expect("non-string field routed through apply_string");
        if append {
            if !slot.is_empty() {
                slot.push(' ');
            }
            slot.push_str(value);
        } else {
            slot.clear();
            slot.push_str(value);
        }
        Ok(())
    }

    fn apply_so_version(&mut self, value: &str, append: bool) -> Result<()> {
        if append {
            return Err(BuildError::config("append to SO_VERSION not supported.".to_string()));
        }
        let parsed: u32 = value
            .parse()
            .map_err(|_| BuildError::config(format!("SO_VERSION not a valid number: {value}")))?;
        self.so_version = parsed;
        Ok(())
    }

    fn apply_type(&mut self, value: &str, append: bool) -> Result<()> {
        let mut ty = TargetType::empty();
        if value.contains("bin") {
            ty |= TargetType::BIN;
        }
        if value.contains("shared") {
            ty |= TargetType::SHARED;
        }
        if value.contains("static") {
            ty |= TargetType::STATIC;
        }
        if value.contains("lib") {
            ty |= TargetType::SHARED | TargetType::STATIC;
        }
        if ty.is_empty() {
            return Err(BuildError::config(format!(
                "invalid TYPE: {value} (options: bin, shared, static)"
            )));
        }
        self.ty = if append { self.ty | ty } else { ty };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_from_default_then_override() {
        let mut default = BuildOptions::default();
        default.apply("CCFLAGS", "-Wall").unwrap();
        let mut app = BuildOptions::from_default(&default, "app");
        assert_eq!(app.ccflags, "-Wall");
        app.apply("CCFLAGS+", "-Werror").unwrap();
        assert_eq!(app.ccflags, "-Wall -Werror");
        // default is untouched
        assert_eq!(default.ccflags, "-Wall");
    }

    #[test]
    fn unknown_key_is_rejected() {
        let mut opts = BuildOptions::default();
        let err = opts.apply("NOT_A_REAL_OPTION", "x").unwrap_err();
        assert!(matches!(err, BuildError::Config(_)));
    }

    #[test]
    fn append_unsupported_field_rejected() {
        let mut opts = BuildOptions::default();
        let err = opts.apply("CC+", "gcc").unwrap_err();
        assert!(matches!(err, BuildError::Config(_)));
    }

    #[test]
    fn type_bitmask_union_and_lib_alias() {
        let mut opts = BuildOptions::default();
        opts.apply("TYPE", "lib").unwrap();
        assert!(opts.ty.contains(TargetType::SHARED));
        assert!(opts.ty.contains(TargetType::STATIC));
        assert!(!opts.ty.contains(TargetType::BIN));
    }

    #[test]
    fn type_empty_result_is_an_error() {
        let mut opts = BuildOptions::default();
        let err = opts.apply("TYPE", "nonsense").unwrap_err();
        assert!(matches!(err, BuildError::Config(_)));
    }

    #[test]
    fn so_version_rejects_garbage() {
        let mut opts = BuildOptions::default();
        assert!(opts.apply("SO_VERSION", "abc").is_err());
        assert!(opts.apply("SO_VERSION", "3x").is_err());
        opts.apply("SO_VERSION", "3").unwrap();
        assert_eq!(opts.so_version, 3);
    }

    #[test]
    fn expansion_target_name_strips_numeric_prefix() {
        let mut opts = BuildOptions::default();
        opts.target = "10.backend".into();
        assert_eq!(opts.expansion_target_name(), "backend");
        opts.target = "backend".into();
        assert_eq!(opts.expansion_target_name(), "backend");
    }
}
