//! The declarative option table (design doc C1): which key names exist,
//! which [`BuildOptions`](super::BuildOptions) field each maps to, and
//! whether it supports the `+` append form.
//!
//! This stands in for the original's `option_def[]` table of raw struct
//! offsets plus a switch statement: instead of reflecting into a C struct by
//! byte offset, every option is a tagged [`Field`] variant and a small
//! dispatch in [`super::BuildOptions::apply`] matches on it. Adding an
//! option means adding one `Field` variant, one struct field, and one row
//! here.

/// One option per [`BuildOptions`](super::BuildOptions) field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Target,
    Type,
    SoVersion,
    Cc,
    Libname,
    BuildRoot,
    InstallRoot,
    InstallDir,
    SrcPaths,
    IncPaths,
    LibPaths,
    Libs,
    CcFlags,
    LdFlags,
    Release,
    Debug,
    Compile,
    Link,
    LinkStatic,
    LinkShared,
}

/// One row of the option table.
#[derive(Clone, Copy, Debug)]
pub struct OptionDef {
    /// The config-file key, e.g. `"CCFLAGS"`.
    pub name: &'static str,
    pub field: Field,
    /// Whether `KEY+ = value` is accepted for this option.
    pub append_allowed: bool,
    /// Whether a target section that doesn't mention this key inherits it
    /// from `[default]`. All options do; kept as a field
    /// rather than assumed so a future non-inherited option has somewhere
    /// to say so.
    pub copy_from_default: bool,
}

macro_rules! option_def {
    ($name:expr, $field:ident, append: $append:expr) => {
        OptionDef {
            name: $name,
            field: Field::$field,
            append_allowed: $append,
            copy_from_default: true,
        }
    };
}

pub static OPTION_DEFS: &[OptionDef] = &[
    option_def!("TYPE", Type, append: true),
    option_def!("SO_VERSION", SoVersion, append: false),
    option_def!("CC", Cc, append: false),
    option_def!("LIBNAME", Libname, append: false),
    option_def!("BUILD_ROOT", BuildRoot, append: false),
    option_def!("INSTALL_ROOT", InstallRoot, append: false),
    option_def!("INSTALLDIR", InstallDir, append: false),
    option_def!("SRCPATHS", SrcPaths, append: true),
    option_def!("INCPATHS", IncPaths, append: true),
    option_def!("LIBPATHS", LibPaths, append: true),
    option_def!("LIBS", Libs, append: true),
    option_def!("CCFLAGS", CcFlags, append: true),
    option_def!("LDFLAGS", LdFlags, append: true),
    option_def!("RELEASE", Release, append: true),
    option_def!("DEBUG", Debug, append: true),
    option_def!("COMPILE", Compile, append: false),
    option_def!("LINK", Link, append: false),
    option_def!("LINK_STATIC", LinkStatic, append: false),
    option_def!("LINK_SHARED", LinkShared, append: false),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_field_variant_has_a_row_except_target() {
        // TARGET is implicit (the section name), not a config key.
        let fields: Vec<Field> = OPTION_DEFS.iter().map(|d| d.field).collect();
        assert!(!fields.contains(&Field::Target));
        assert!(fields.contains(&Field::Type));
        assert!(fields.contains(&Field::LinkShared));
    }

    #[test]
    fn names_are_unique() {
        let mut names: Vec<&str> = OPTION_DEFS.iter().map(|d| d.name).collect();
        names.sort_unstable();
        let mut deduped = names.clone();
        deduped.dedup();
        assert_eq!(names.len(), deduped.len());
    }
}
