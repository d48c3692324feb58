/*
 * postprocess.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Optional external filter (autoprefixer and friends) over compiled CSS.
 */

use std::path::PathBuf;

use sassproc_runtime::SharedRuntime;
use tracing::{debug, warn};

use crate::config::PostProcessSettings;

/// Environment variable that overrides the post-processor binary location.
pub const POSTPROCESS_BIN_ENV: &str = "SASSPROC_POSTPROCESS_BIN";

/// Pipes compiled CSS through an external command.
///
/// Never fails: when the command is missing, exits non-zero, or produces
/// output that is not UTF-8 or shorter than its input, the original CSS is
/// returned unchanged.
#[derive(Clone)]
pub struct PostProcessor {
    settings: PostProcessSettings,
    runtime: SharedRuntime,
}

impl std::fmt::Debug for PostProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostProcessor")
            .field("command", &self.settings.command)
            .field("args", &self.settings.args)
            .finish()
    }
}

impl PostProcessor {
    pub fn new(settings: PostProcessSettings, runtime: SharedRuntime) -> Self {
        Self { settings, runtime }
    }

    fn binary(&self) -> Option<PathBuf> {
        let command = &self.settings.command;
        if command.contains('/') {
            let path = PathBuf::from(command);
            return self.runtime.is_file(&path).unwrap_or(false).then_some(path);
        }
        self.runtime.find_binary(command, POSTPROCESS_BIN_ENV)
    }

    pub fn process(&self, css: String) -> String {
        let Some(binary) = self.binary() else {
            warn!(command = %self.settings.command, "Post-processor not found; keeping compiled CSS");
            return css;
        };

        let binary = binary.to_string_lossy().into_owned();
        let args: Vec<&str> = self.settings.args.iter().map(String::as_str).collect();
        let output = match self.runtime.exec_pipe(&binary, &args, css.as_bytes()) {
            Ok(output) => output,
            Err(e) => {
                warn!(command = %binary, error = %e, "Post-processor failed; keeping compiled CSS");
                return css;
            }
        };

        match String::from_utf8(output) {
            Ok(processed) if processed.len() >= css.len() => {
                debug!(command = %binary, "Post-processed CSS");
                processed
            }
            Ok(processed) => {
                warn!(
                    command = %binary,
                    before = css.len(),
                    after = processed.len(),
                    "Post-processor output shorter than input; keeping compiled CSS"
                );
                css
            }
            Err(_) => {
                warn!(command = %binary, "Post-processor produced non UTF-8 output; keeping compiled CSS");
                css
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sassproc_runtime::shared_default_runtime;

    fn processor(command: &str, args: &[&str]) -> PostProcessor {
        PostProcessor::new(
            PostProcessSettings {
                command: command.to_string(),
                args: args.iter().map(|a| a.to_string()).collect(),
            },
            shared_default_runtime(),
        )
    }

    #[test]
    fn test_missing_binary_keeps_css() {
        let p = processor("sassproc-no-such-postprocessor", &[]);
        assert_eq!(p.process("a{b:c}".to_string()), "a{b:c}");
    }

    #[cfg(unix)]
    #[test]
    fn test_passthrough_command() {
        let p = processor("cat", &[]);
        assert_eq!(p.process("a{b:c}".to_string()), "a{b:c}");
    }

    #[cfg(unix)]
    #[test]
    fn test_growing_output_is_used() {
        let p = processor("sed", &["s/b:c/-webkit-b:c;b:c/"]);
        assert_eq!(p.process("a{b:c}".to_string()), "a{-webkit-b:c;b:c}");
    }

    #[cfg(unix)]
    #[test]
    fn test_shorter_output_is_discarded() {
        let p = processor("head", &["-c", "2"]);
        assert_eq!(p.process("a{b:c}".to_string()), "a{b:c}");
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_command_keeps_css() {
        let p = processor("false", &[]);
        assert_eq!(p.process("a{b:c}".to_string()), "a{b:c}");
    }
}
