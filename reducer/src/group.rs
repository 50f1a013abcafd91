// group.rs — Pass registry, option filtering, and pass-group files
//
// A pass group is three phase schedules (`first`, `main`, `last`) built
// either from the shipped catalogue or from a user JSON file. Entries
// carry include/exclude option sets over the closed set
// {sanitize, slow, windows}; an entry is kept iff its include set (if any)
// intersects the active options and its exclude set (if any) does not.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::pass::DeltaPass;
use crate::passes;

// ── Pass options ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassOption {
    Sanitize,
    Slow,
    Windows,
}

impl PassOption {
    pub fn parse(value: &str) -> Option<PassOption> {
        match value {
            "sanitize" => Some(PassOption::Sanitize),
            "slow" => Some(PassOption::Slow),
            "windows" => Some(PassOption::Windows),
            _ => None,
        }
    }
}

/// Keep an entry iff the active options pass its include/exclude sets.
pub fn options_admit(
    include: Option<&[PassOption]>,
    exclude: Option<&[PassOption]>,
    active: &HashSet<PassOption>,
) -> bool {
    let included = include.map_or(true, |set| set.iter().any(|o| active.contains(o)));
    let excluded = exclude.is_some_and(|set| set.iter().any(|o| active.contains(o)));
    included && !excluded
}

// ── Pass registry ────────────────────────────────────────────────────────

/// Look up a pass implementation by catalogue name.
pub fn pass_by_name(name: &str) -> Option<Arc<dyn DeltaPass>> {
    match name {
        "balanced" => Some(Arc::new(passes::balanced::BalancedPass)),
        "blank" => Some(Arc::new(passes::blank::BlankPass)),
        "clang" => Some(Arc::new(passes::clang::ClangPass)),
        "clang-binary-search" => {
            Some(Arc::new(passes::clang_binary_search::ClangBinarySearchPass))
        }
        "clex" => Some(Arc::new(passes::clex::ClexPass)),
        "comments" => Some(Arc::new(passes::comments::CommentsPass)),
        "include-includes" => Some(Arc::new(passes::include_includes::IncludeIncludesPass)),
        "includes" => Some(Arc::new(passes::includes::IncludesPass)),
        "indent" => Some(Arc::new(passes::indent::IndentPass)),
        "ints" => Some(Arc::new(passes::ints::IntsPass)),
        "lines" => Some(Arc::new(passes::lines::LinesPass)),
        "peep" => Some(Arc::new(passes::peep::PeepPass)),
        "special" => Some(Arc::new(passes::special::SpecialPass)),
        "ternary" => Some(Arc::new(passes::ternary::TernaryPass)),
        "unifdef" => Some(Arc::new(passes::unifdef::UnifdefPass)),
        _ => None,
    }
}

// ── Pass group ───────────────────────────────────────────────────────────

/// One scheduled (pass, arg) pair.
#[derive(Clone)]
pub struct PassInstance {
    pub pass: Arc<dyn DeltaPass>,
    pub arg: String,
}

impl fmt::Debug for PassInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} :: {}", self.pass.name(), self.arg)
    }
}

/// The three phase schedules, already ordered.
#[derive(Default)]
pub struct PassGroup {
    pub first: Vec<PassInstance>,
    pub main: Vec<PassInstance>,
    pub last: Vec<PassInstance>,
}

impl PassGroup {
    /// Every scheduled instance, first/main/last order.
    pub fn all(&self) -> impl Iterator<Item = &PassInstance> {
        self.first.iter().chain(&self.main).chain(&self.last)
    }
}

// ── Errors ───────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum GroupError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    UnknownPass {
        name: String,
    },
    InvalidOption {
        pass: String,
        value: String,
    },
}

impl fmt::Display for GroupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupError::Io { path, source } => write!(f, "{}: {}", path.display(), source),
            GroupError::Json { path, source } => {
                write!(f, "{}: invalid pass group: {}", path.display(), source)
            }
            GroupError::UnknownPass { name } => write!(f, "unknown pass '{}'", name),
            GroupError::InvalidOption { pass, value } => {
                write!(f, "pass '{}': invalid option '{}'", pass, value)
            }
        }
    }
}

impl std::error::Error for GroupError {}

// ── Pass-group files ─────────────────────────────────────────────────────

/// File format: `{"first": [ENTRY…], "main": [ENTRY…], "last": [ENTRY…]}`
/// with `ENTRY = {"pass": NAME, "arg": STRING, "include"?: [OPT…],
/// "exclude"?: [OPT…]}`. Declaration order is schedule order; unknown pass
/// names and missing members are hard errors.
#[derive(Deserialize)]
struct GroupFile {
    first: Vec<EntryDef>,
    main: Vec<EntryDef>,
    last: Vec<EntryDef>,
}

#[derive(Deserialize)]
struct EntryDef {
    pass: String,
    arg: String,
    #[serde(default)]
    include: Option<Vec<String>>,
    #[serde(default)]
    exclude: Option<Vec<String>>,
}

impl EntryDef {
    fn options(
        &self,
        raw: &Option<Vec<String>>,
    ) -> Result<Option<Vec<PassOption>>, GroupError> {
        let Some(values) = raw else {
            return Ok(None);
        };
        let mut parsed = Vec::with_capacity(values.len());
        for value in values {
            let option = PassOption::parse(value).ok_or_else(|| GroupError::InvalidOption {
                pass: self.pass.clone(),
                value: value.clone(),
            })?;
            parsed.push(option);
        }
        Ok(Some(parsed))
    }
}

/// Load a custom pass group from a JSON file, applying option filtering.
pub fn load_group_file(
    path: &Path,
    active: &HashSet<PassOption>,
) -> Result<PassGroup, GroupError> {
    let text = std::fs::read_to_string(path).map_err(|e| GroupError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let file: GroupFile = serde_json::from_str(&text).map_err(|e| GroupError::Json {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut group = PassGroup::default();
    for (defs, schedule) in [
        (&file.first, &mut group.first),
        (&file.main, &mut group.main),
        (&file.last, &mut group.last),
    ] {
        for def in defs {
            // Validate every entry, even ones the active options filter out.
            let pass = pass_by_name(&def.pass).ok_or_else(|| GroupError::UnknownPass {
                name: def.pass.clone(),
            })?;
            let include = def.options(&def.include)?;
            let exclude = def.options(&def.exclude)?;
            if !options_admit(include.as_deref(), exclude.as_deref(), active) {
                continue;
            }
            schedule.push(PassInstance {
                pass,
                arg: def.arg.clone(),
            });
        }
    }
    Ok(group)
}

// ── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn active(options: &[PassOption]) -> HashSet<PassOption> {
        options.iter().copied().collect()
    }

    #[test]
    fn option_filtering_rules() {
        let none = active(&[]);
        let slow = active(&[PassOption::Slow]);

        assert!(options_admit(None, None, &none));
        assert!(!options_admit(Some(&[PassOption::Slow]), None, &none));
        assert!(options_admit(Some(&[PassOption::Slow]), None, &slow));
        assert!(options_admit(None, Some(&[PassOption::Slow]), &none));
        assert!(!options_admit(None, Some(&[PassOption::Slow]), &slow));
    }

    #[test]
    fn registry_knows_every_catalogue_pass() {
        for name in [
            "balanced",
            "blank",
            "clang",
            "clang-binary-search",
            "clex",
            "comments",
            "include-includes",
            "includes",
            "indent",
            "ints",
            "lines",
            "peep",
            "special",
            "ternary",
            "unifdef",
        ] {
            assert!(pass_by_name(name).is_some(), "missing pass {}", name);
        }
        assert!(pass_by_name("nonesuch").is_none());
    }

    #[test]
    fn loads_a_minimal_group_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("group.json");
        std::fs::write(
            &path,
            r#"{
                "first": [{"pass": "blank", "arg": "0"}],
                "main": [
                    {"pass": "lines", "arg": "0"},
                    {"pass": "ternary", "arg": "b", "include": ["slow"]}
                ],
                "last": []
            }"#,
        )
        .unwrap();

        let group = load_group_file(&path, &active(&[])).unwrap();
        assert_eq!(group.first.len(), 1);
        assert_eq!(group.main.len(), 1);
        assert_eq!(group.main[0].pass.name(), "lines");

        let group = load_group_file(&path, &active(&[PassOption::Slow])).unwrap();
        assert_eq!(group.main.len(), 2);
    }

    #[test]
    fn unknown_pass_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("group.json");
        std::fs::write(
            &path,
            r#"{"first": [], "main": [{"pass": "nonesuch", "arg": "0"}], "last": []}"#,
        )
        .unwrap();
        assert!(matches!(
            load_group_file(&path, &active(&[])),
            Err(GroupError::UnknownPass { .. })
        ));
    }

    #[test]
    fn missing_phase_member_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("group.json");
        std::fs::write(&path, r#"{"first": [], "main": []}"#).unwrap();
        assert!(matches!(
            load_group_file(&path, &active(&[])),
            Err(GroupError::Json { .. })
        ));
    }

    #[test]
    fn invalid_option_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("group.json");
        std::fs::write(
            &path,
            r#"{"first": [], "main": [{"pass": "lines", "arg": "0", "include": ["fast"]}], "last": []}"#,
        )
        .unwrap();
        assert!(matches!(
            load_group_file(&path, &active(&[])),
            Err(GroupError::InvalidOption { .. })
        ));
    }
}
