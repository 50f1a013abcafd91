// passes/clang_binary_search.rs — clang_delta over chunked counter ranges
//
// The first transform primes the cursor by querying the instance count,
// then windows of instances are removed at once, halving the window on
// exhaustion down to a floor of ten. Exit code 1 from clang_delta means
// the window ran past the last instance.

use std::path::Path;
use std::process::{Command, Stdio};

use log::debug;

use crate::pass::{tool_on_path, write_candidate, DeltaPass, PassState, TransformResult};

pub struct ClangBinarySearchPass;

fn count_instances(test_case: &Path, arg: &str) -> usize {
    let output = Command::new("clang_delta")
        .arg(format!("--query-instances={}", arg))
        .arg(test_case)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output();
    let Ok(output) = output else {
        return 0;
    };
    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .trim()
        .strip_prefix("Available transformation instances: ")
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

/// Halve the window and restart from the first instance. Windows below ten
/// instances are not worth the binary search; the plain clang pass covers
/// them one at a time.
fn rechunk(chunk: usize) -> Option<usize> {
    if chunk < 10 {
        return None;
    }
    let halved = chunk.div_ceil(2);
    debug!("granularity = {}", halved);
    Some(halved)
}

impl DeltaPass for ClangBinarySearchPass {
    fn name(&self) -> &'static str {
        "clang-binary-search"
    }

    fn check_prerequisites(&self) -> bool {
        tool_on_path("clang_delta")
    }

    fn new(&self, _test_case: &Path, _arg: &str) -> PassState {
        PassState::Unprimed
    }

    fn transform(
        &self,
        test_case: &Path,
        arg: &str,
        state: &PassState,
    ) -> (TransformResult, PassState) {
        let (mut index, mut chunk, instances) = match state {
            PassState::Unprimed => {
                let instances = count_instances(test_case, arg);
                debug!("initial granularity = {}", instances);
                (1, instances, instances)
            }
            PassState::Chunk {
                index,
                chunk,
                instances,
            } => (*index, *chunk, *instances),
            PassState::Cursor(_) => return (TransformResult::Error, state.clone()),
        };

        loop {
            let current = PassState::Chunk {
                index,
                chunk,
                instances,
            };
            if index > instances || chunk == 0 {
                match rechunk(chunk) {
                    Some(halved) => {
                        chunk = halved;
                        index = 1;
                        continue;
                    }
                    None => return (TransformResult::Stop, current),
                }
            }

            let end = instances.min(index + chunk);
            let output = Command::new("clang_delta")
                .arg(format!("--transformation={}", arg))
                .arg(format!("--counter={}", index))
                .arg(format!("--to-counter={}", end))
                .arg(test_case)
                .stdin(Stdio::null())
                .stderr(Stdio::null())
                .output();
            let Ok(output) = output else {
                return (TransformResult::Error, current);
            };

            match output.status.code() {
                Some(0) => {
                    let variant = String::from_utf8_lossy(&output.stdout);
                    if write_candidate(test_case, &variant).is_err() {
                        return (TransformResult::Error, current);
                    }
                    return (TransformResult::Ok, current);
                }
                Some(1) => {
                    debug!("out of instances at index {}", index);
                    match rechunk(chunk) {
                        Some(halved) => {
                            chunk = halved;
                            index = 1;
                        }
                        None => return (TransformResult::Stop, current),
                    }
                }
                _ => return (TransformResult::Error, current),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rechunk_halves_down_to_a_floor() {
        assert_eq!(rechunk(100), Some(50));
        assert_eq!(rechunk(25), Some(13));
        assert_eq!(rechunk(10), Some(5));
        assert_eq!(rechunk(9), None);
        assert_eq!(rechunk(0), None);
    }
}
