// passes/include_includes.rs — Inline the Nth quoted `#include`
//
// Replaces a `#include "file"` line with the contents of the included
// file, resolved next to the candidate. Only files that made it into the
// sandbox (i.e. co-reduced test cases) resolve; unreadable targets are
// skipped, which keeps the pass inside its sandbox.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::pass::{read_candidate, write_candidate, DeltaPass, PassState, TransformResult};

pub struct IncludeIncludesPass;

fn include_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^\s*#\s*include\s+"([^"]+)""#).unwrap())
}

impl DeltaPass for IncludeIncludesPass {
    fn name(&self) -> &'static str {
        "include-includes"
    }

    fn new(&self, _test_case: &Path, _arg: &str) -> PassState {
        PassState::Cursor(0)
    }

    fn transform(
        &self,
        test_case: &Path,
        _arg: &str,
        state: &PassState,
    ) -> (TransformResult, PassState) {
        let Ok(content) = read_candidate(test_case) else {
            return (TransformResult::Error, state.clone());
        };
        let dir = test_case.parent().unwrap_or_else(|| Path::new("."));

        let mut ordinal = 0;
        for (line_no, line) in content.split_inclusive('\n').enumerate() {
            let Some(captures) = include_re().captures(line) else {
                continue;
            };
            if ordinal < state.cursor() {
                ordinal += 1;
                continue;
            }

            let header = dir.join(&captures[1]);
            if let Ok(mut inlined) = std::fs::read_to_string(&header) {
                if !inlined.ends_with('\n') {
                    inlined.push('\n');
                }
                let variant: String = content
                    .split_inclusive('\n')
                    .enumerate()
                    .map(|(i, l)| if i == line_no { inlined.as_str() } else { l })
                    .collect();
                if variant != content {
                    if write_candidate(test_case, &variant).is_err() {
                        return (TransformResult::Error, state.clone());
                    }
                    return (TransformResult::Ok, PassState::Cursor(ordinal));
                }
            }
            ordinal += 1;
        }

        (TransformResult::Stop, state.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inlines_a_sibling_header() {
        let dir = tempfile::tempdir().unwrap();
        let case = dir.path().join("case.c");
        std::fs::write(&case, "#include \"defs.h\"\nint main(){}\n").unwrap();
        std::fs::write(dir.path().join("defs.h"), "typedef int myint;\n").unwrap();

        let pass = IncludeIncludesPass;
        let (result, state) = pass.transform(&case, "", &pass.new(&case, ""));
        assert_eq!(result, TransformResult::Ok);
        assert_eq!(state, PassState::Cursor(0));
        assert_eq!(
            std::fs::read_to_string(&case).unwrap(),
            "typedef int myint;\nint main(){}\n"
        );
    }

    #[test]
    fn skips_unresolvable_headers() {
        let dir = tempfile::tempdir().unwrap();
        let case = dir.path().join("case.c");
        std::fs::write(
            &case,
            "#include \"nowhere.h\"\n#include \"defs.h\"\nint main(){}\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("defs.h"), "typedef int myint;\n").unwrap();

        let pass = IncludeIncludesPass;
        let (result, state) = pass.transform(&case, "", &pass.new(&case, ""));
        assert_eq!(result, TransformResult::Ok);
        // The readable header is the second quoted include.
        assert_eq!(state, PassState::Cursor(1));
        assert_eq!(
            std::fs::read_to_string(&case).unwrap(),
            "#include \"nowhere.h\"\ntypedef int myint;\nint main(){}\n"
        );
    }

    #[test]
    fn angle_includes_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let case = dir.path().join("case.c");
        std::fs::write(&case, "#include <stdio.h>\nint main(){}\n").unwrap();

        let pass = IncludeIncludesPass;
        let (result, _) = pass.transform(&case, "", &pass.new(&case, ""));
        assert_eq!(result, TransformResult::Stop);
    }
}
