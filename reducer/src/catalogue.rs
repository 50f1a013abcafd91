// catalogue.rs — The shipped pass schedule
//
// Data, not code: each entry names a pass, an argument, optional per-phase
// priorities, and option gating. Within a phase, entries run in descending
// priority order, ties broken by declaration order. The priorities encode
// empirically tuned scheduling — treat them as part of the interface.

use std::cmp::Reverse;
use std::collections::HashSet;

use crate::group::{options_admit, pass_by_name, PassGroup, PassInstance, PassOption};

pub struct CatalogueEntry {
    pub pass: &'static str,
    pub arg: &'static str,
    pub first: Option<u32>,
    pub main: Option<u32>,
    pub last: Option<u32>,
    pub include: &'static [PassOption],
    pub exclude: &'static [PassOption],
}

const fn entry(
    pass: &'static str,
    arg: &'static str,
    first: Option<u32>,
    main: Option<u32>,
    last: Option<u32>,
) -> CatalogueEntry {
    gated(pass, arg, first, main, last, &[], &[])
}

const fn gated(
    pass: &'static str,
    arg: &'static str,
    first: Option<u32>,
    main: Option<u32>,
    last: Option<u32>,
    include: &'static [PassOption],
    exclude: &'static [PassOption],
) -> CatalogueEntry {
    CatalogueEntry {
        pass,
        arg,
        first,
        main,
        last,
        include,
        exclude,
    }
}

const SLOW: &[PassOption] = &[PassOption::Slow];
const SANITIZE: &[PassOption] = &[PassOption::Sanitize];
const WINDOWS: &[PassOption] = &[PassOption::Windows];

#[rustfmt::skip]
pub const CATALOGUE: &[CatalogueEntry] = &[
    entry("include-includes", "0",        Some(910), None,      None),
    entry("includes", "0",                Some(905), Some(460), None),
    gated("unifdef", "0",                Some(900), None,      None, &[], WINDOWS),
    entry("comments", "0",                Some(895), Some(455), None),
    entry("blank", "0",                   Some(890), Some(450), None),
    entry("clang-binary-search", "replace-function-def-with-decl",
                                          Some(885), None,      None),
    entry("clang-binary-search", "remove-unused-function",
                                          Some(880), None,      None),
    entry("lines", "0",                   Some(875), Some(445), None),
    entry("lines", "1",                   Some(870), Some(440), None),
    entry("lines", "2",                   Some(865), Some(435), None),
    gated("lines", "10",                 Some(860), Some(430), None, SLOW, &[]),
    entry("clang", "remove-unused-function",
                                          Some(855), Some(370), None),
    entry("balanced", "curly",            Some(850), Some(420), None),

    gated("balanced", "curly-inside",    None,      Some(415), None, SLOW, &[]),
    entry("balanced", "parens",           None,      Some(410), None),
    gated("balanced", "parens-inside",   None,      Some(405), None, SLOW, &[]),
    entry("balanced", "square",           None,      Some(400), None),
    entry("balanced", "angles",           None,      Some(395), None),
    entry("ternary", "b",                 None,      Some(385), None),
    entry("ternary", "c",                 None,      Some(380), None),

    entry("clang", "callexpr-to-value",   None,      Some(365), None),
    entry("clang", "replace-callexpr",    None,      Some(360), None),
    entry("clang", "simplify-callexpr",   None,      Some(355), None),
    entry("clang", "remove-unused-enum-member", None, Some(350), None),
    entry("clang", "remove-enum-member-value",  None, Some(345), None),
    entry("clang", "remove-nested-function",    None, Some(340), None),
    entry("clang", "union-to-struct",     None,      Some(335), None),
    entry("clang", "return-void",         None,      Some(330), None),
    entry("clang", "simple-inliner",      None,      Some(325), None),
    entry("clang", "reduce-pointer-level", None,     Some(320), None),
    entry("clang", "lift-assignment-expr", None,     Some(315), None),
    entry("clang", "copy-propagation",    None,      Some(310), None),
    entry("clang", "simplify-if",         None,      Some(305), None),
    entry("clang", "reduce-array-dim",    None,      Some(300), None),
    entry("clang", "reduce-array-size",   None,      Some(295), None),
    entry("clang", "move-function-body",  None,      Some(290), None),
    entry("clang", "simplify-comma-expr", None,      Some(285), None),
    entry("clang", "local-to-global",     None,      Some(280), None),
    entry("clang", "param-to-global",     None,      Some(275), None),
    entry("clang", "param-to-local",      None,      Some(270), None),
    gated("clang", "combine-global-var", None,      Some(265), None, SLOW, &[]),
    gated("clang", "combine-local-var",  None,      Some(260), None, SLOW, &[]),

    entry("clex", "rename-toks",          None,      Some(240), None),
    entry("clex", "delete-string",        None,      Some(235), None),
    entry("clex", "rm-toks-1",            None,      Some(230), None),
    entry("clex", "rm-toks-2",            None,      Some(225), None),
    entry("clex", "rm-toks-3",            None,      Some(220), None),
    entry("clex", "rm-toks-4",            None,      Some(215), None),
    gated("clex", "rm-toks-5",           None,      Some(210), None, SLOW, &[]),
    gated("clex", "rm-toks-6",           None,      Some(205), None, SLOW, &[]),
    gated("clex", "rm-toks-7",           None,      Some(200), None, SLOW, &[]),
    gated("clex", "rm-toks-8",           None,      Some(195), None, SLOW, &[]),

    entry("ints", "a",                    None,      Some(180), None),
    entry("ints", "b",                    None,      Some(175), None),
    entry("ints", "c",                    None,      Some(170), None),
    entry("ints", "d",                    None,      Some(165), None),
    entry("ints", "e",                    None,      Some(160), None),
    entry("peep", "a",                    None,      Some(150), None),
    entry("peep", "b",                    None,      Some(145), None),
    entry("special", "a",                 None,      Some(140), None),
    gated("special", "b",                None,      Some(135), None, SANITIZE, &[]),
    entry("indent", "regular",            None,      Some(120), None),

    entry("clang", "rename-fun",          None,      None,      Some(90)),
    entry("clang", "rename-param",        None,      None,      Some(85)),
    entry("clang", "rename-var",          None,      None,      Some(80)),
    entry("clang", "rename-class",        None,      None,      Some(75)),
    entry("clang", "rename-cxx-method",   None,      None,      Some(70)),
    gated("indent", "final",             None,      None,      Some(10), &[], WINDOWS),
];

/// Passes that shell out to external tools; excluded from the `delta`
/// group so it runs anywhere.
const EXTERNAL_PASSES: &[&str] = &[
    "clang",
    "clang-binary-search",
    "clex",
    "indent",
    "unifdef",
];

pub fn group_names() -> &'static [&'static str] {
    &["all", "delta"]
}

/// Build a built-in pass group, applying option filtering.
pub fn built_in_group(name: &str, active: &HashSet<PassOption>) -> Option<PassGroup> {
    let keep_external = match name {
        "all" => true,
        "delta" => false,
        _ => return None,
    };

    let mut group = PassGroup::default();
    for (phase, schedule) in [
        (Phase::First, &mut group.first),
        (Phase::Main, &mut group.main),
        (Phase::Last, &mut group.last),
    ] {
        let mut scheduled: Vec<(u32, usize, PassInstance)> = Vec::new();
        for (decl, e) in CATALOGUE.iter().enumerate() {
            let Some(priority) = phase.priority(e) else {
                continue;
            };
            if !keep_external && EXTERNAL_PASSES.contains(&e.pass) {
                continue;
            }
            let include = if e.include.is_empty() {
                None
            } else {
                Some(e.include)
            };
            let exclude = if e.exclude.is_empty() {
                None
            } else {
                Some(e.exclude)
            };
            if !options_admit(include, exclude, active) {
                continue;
            }
            // The registry covers every catalogue name; locked by a test.
            let pass = pass_by_name(e.pass)?;
            scheduled.push((
                priority,
                decl,
                PassInstance {
                    pass,
                    arg: e.arg.to_string(),
                },
            ));
        }
        scheduled.sort_by_key(|(priority, decl, _)| (Reverse(*priority), *decl));
        schedule.extend(scheduled.into_iter().map(|(_, _, instance)| instance));
    }
    Some(group)
}

#[derive(Clone, Copy)]
enum Phase {
    First,
    Main,
    Last,
}

impl Phase {
    fn priority(self, e: &CatalogueEntry) -> Option<u32> {
        match self {
            Phase::First => e.first,
            Phase::Main => e.main,
            Phase::Last => e.last,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn no_options() -> HashSet<PassOption> {
        HashSet::new()
    }

    #[test]
    fn every_catalogue_pass_resolves() {
        for e in CATALOGUE {
            assert!(pass_by_name(e.pass).is_some(), "unknown pass {}", e.pass);
        }
    }

    #[test]
    fn every_entry_is_scheduled_somewhere() {
        for e in CATALOGUE {
            assert!(
                e.first.is_some() || e.main.is_some() || e.last.is_some(),
                "{} :: {} has no phase",
                e.pass,
                e.arg
            );
        }
    }

    #[test]
    fn all_group_orders_by_descending_priority() {
        let group = built_in_group("all", &no_options()).unwrap();
        assert_eq!(group.first[0].pass.name(), "include-includes");
        assert_eq!(group.first[1].pass.name(), "includes");
        assert_eq!(group.main[0].pass.name(), "includes");
        assert_eq!(group.last.last().unwrap().pass.name(), "indent");
    }

    #[test]
    fn delta_group_has_no_external_passes() {
        let group = built_in_group("delta", &no_options()).unwrap();
        for instance in group.all() {
            assert!(
                !EXTERNAL_PASSES.contains(&instance.pass.name()),
                "external pass {} in delta group",
                instance.pass.name()
            );
        }
        assert!(!group.first.is_empty());
        assert!(!group.main.is_empty());
    }

    #[test]
    fn slow_entries_need_the_slow_option() {
        let plain = built_in_group("all", &no_options()).unwrap();
        let slow = built_in_group("all", &[PassOption::Slow].into_iter().collect()).unwrap();
        assert!(plain.main.len() < slow.main.len());
        assert!(!plain
            .main
            .iter()
            .any(|i| i.pass.name() == "balanced" && i.arg == "curly-inside"));
        assert!(slow
            .main
            .iter()
            .any(|i| i.pass.name() == "balanced" && i.arg == "curly-inside"));
    }

    #[test]
    fn windows_option_excludes_unix_tools() {
        let windows = built_in_group("all", &[PassOption::Windows].into_iter().collect()).unwrap();
        assert!(!windows.first.iter().any(|i| i.pass.name() == "unifdef"));
        assert!(windows.last.is_empty() || windows.last.iter().all(|i| i.pass.name() != "indent"));
    }

    #[test]
    fn unknown_group_name_is_none() {
        assert!(built_in_group("nonesuch", &no_options()).is_none());
    }
}
