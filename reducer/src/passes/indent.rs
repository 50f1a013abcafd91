// passes/indent.rs — Reformat via external indenters
//
// arg `regular`: one clang-format candidate. arg `final`: indent, astyle,
// then clang-format, one candidate each. Tools that change nothing are
// skipped. The candidates may grow the file — this pass exists to make the
// final output readable, not smaller.

use std::path::Path;
use std::process::{Command, Stdio};

use crate::pass::{read_candidate, tool_on_path, DeltaPass, PassState, TransformResult};

pub struct IndentPass;

fn command_for(arg: &str, step: usize, test_case: &Path) -> Option<Command> {
    let mut cmd = match (arg, step) {
        ("regular", 0) => Command::new("clang-format"),
        ("final", 0) => {
            let mut c = Command::new("indent");
            c.args([
                "-nbad", "-nbap", "-nbbb", "-cs", "-pcs", "-prs", "-saf", "-sai", "-saw", "-sob",
                "-ss",
            ]);
            c
        }
        ("final", 1) => Command::new("astyle"),
        ("final", 2) => Command::new("clang-format"),
        _ => return None,
    };
    if matches!((arg, step), ("regular", 0) | ("final", 2)) {
        cmd.arg("-i");
    }
    cmd.arg(test_case);
    Some(cmd)
}

impl DeltaPass for IndentPass {
    fn name(&self) -> &'static str {
        "indent"
    }

    fn check_prerequisites(&self) -> bool {
        tool_on_path("clang-format") && tool_on_path("indent") && tool_on_path("astyle")
    }

    fn new(&self, _test_case: &Path, _arg: &str) -> PassState {
        PassState::Cursor(0)
    }

    fn transform(
        &self,
        test_case: &Path,
        arg: &str,
        state: &PassState,
    ) -> (TransformResult, PassState) {
        let Ok(old) = read_candidate(test_case) else {
            return (TransformResult::Error, state.clone());
        };

        let mut step = state.cursor();
        loop {
            let Some(mut cmd) = command_for(arg, step, test_case) else {
                return (TransformResult::Stop, PassState::Cursor(step));
            };
            let status = cmd
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status();
            if status.is_err() {
                return (TransformResult::Error, PassState::Cursor(step));
            }

            let Ok(new) = read_candidate(test_case) else {
                return (TransformResult::Error, PassState::Cursor(step));
            };
            if new != old {
                return (TransformResult::Ok, PassState::Cursor(step));
            }
            step += 1;
        }
    }

    fn advance_on_success(&self, _test_case: &Path, _arg: &str, state: &PassState) -> PassState {
        // A committed reformat is final for its step; move to the next tool.
        PassState::Cursor(state.cursor() + 1)
    }
}
