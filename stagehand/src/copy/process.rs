//! Copy bridge backed by an external mirroring utility.

use std::ffi::OsString;
use std::path::PathBuf;

use futures::future::BoxFuture;
use tokio::process::Command;
use tracing::{debug, warn};

use super::outcome::{CopyOutcome, ExitCodePolicy};
use super::{CopyBridge, CopyRequest};

/// Command-line conventions of the supported mirroring tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyToolKind {
    /// `robocopy <src> <dst> <patterns..>`
    Robocopy,
    /// `rsync -rt --include=<pattern>.. --exclude=* <src>/ <dst>/`
    Rsync,
    /// Explicit argument template. `{source}` and `{dest}` are substituted;
    /// a lone `{patterns}` argument expands to one argument per pattern,
    /// followed by one per literal file name.
    Custom(Vec<String>),
}

/// Runs a mirroring tool as a child process and classifies its exit code.
#[derive(Debug, Clone)]
pub struct ProcessCopyBridge {
    program: PathBuf,
    kind: CopyToolKind,
    policy: ExitCodePolicy,
}

impl ProcessCopyBridge {
    /// Create a bridge with an explicit program, argument style and policy.
    pub fn new(program: impl Into<PathBuf>, kind: CopyToolKind, policy: ExitCodePolicy) -> Self {
        Self {
            program: program.into(),
            kind,
            policy,
        }
    }

    /// Robocopy from `PATH` with its standard exit code ranges.
    pub fn robocopy() -> Self {
        Self::new("robocopy", CopyToolKind::Robocopy, ExitCodePolicy::robocopy())
    }

    /// Rsync from `PATH` with its standard exit code ranges.
    pub fn rsync() -> Self {
        Self::new("rsync", CopyToolKind::Rsync, ExitCodePolicy::rsync())
    }

    /// Override the program location.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn policy(&self) -> &ExitCodePolicy {
        &self.policy
    }

    fn tool_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    /// Build the argument list for a request.
    ///
    /// Fails when a literal file name cannot be expressed in the tool's
    /// pattern syntax.
    pub(crate) fn args(&self, request: &CopyRequest) -> Result<Vec<OsString>, String> {
        match &self.kind {
            CopyToolKind::Robocopy => {
                if let Some(name) = request.files.iter().find(|f| f.contains(['*', '?'])) {
                    return Err(format!("robocopy cannot copy '{}' literally", name));
                }
                let mut args: Vec<OsString> = vec![
                    request.source_dir.clone().into_os_string(),
                    request.dest_dir.clone().into_os_string(),
                ];
                args.extend(request.patterns.iter().map(OsString::from));
                args.extend(request.files.iter().map(OsString::from));
                args.extend(["/NJH", "/NJS", "/NDL", "/NP"].map(OsString::from));
                Ok(args)
            }
            CopyToolKind::Rsync => {
                let mut args: Vec<OsString> = vec!["-rt".into()];
                let includes = request
                    .patterns
                    .iter()
                    .cloned()
                    .chain(request.files.iter().map(|f| rsync_literal(f)));
                args.extend(includes.map(|p| OsString::from(format!("--include={}", p))));
                args.push("--exclude=*".into());
                args.push(with_trailing_slash(&request.source_dir));
                args.push(with_trailing_slash(&request.dest_dir));
                Ok(args)
            }
            CopyToolKind::Custom(template) => {
                let mut args = Vec::with_capacity(template.len());
                for arg in template {
                    if arg == "{patterns}" {
                        args.extend(request.patterns.iter().map(OsString::from));
                        args.extend(request.files.iter().map(OsString::from));
                    } else {
                        args.push(OsString::from(
                            arg.replace("{source}", &request.source_dir.to_string_lossy())
                                .replace("{dest}", &request.dest_dir.to_string_lossy()),
                        ));
                    }
                }
                Ok(args)
            }
        }
    }

    async fn run(&self, request: &CopyRequest) -> CopyOutcome {
        let tool = self.tool_name();
        let args = match self.args(request) {
            Ok(args) => args,
            Err(detail) => return CopyOutcome::ToolFailure { code: None, detail },
        };
        debug!(tool = %tool, ?args, "Running copy tool");

        let output = match Command::new(&self.program).args(&args).output().await {
            Ok(output) => output,
            Err(e) => {
                return CopyOutcome::ToolFailure {
                    code: None,
                    detail: format!("failed to run {}: {}", tool, e),
                }
            }
        };

        let outcome = self.policy.classify(output.status.code(), &tool);
        if let CopyOutcome::ToolFailure { code, detail } = &outcome {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(tool = %tool, ?code, stderr = %stderr.trim(), "Copy tool failed");
            if !stderr.trim().is_empty() {
                return CopyOutcome::ToolFailure {
                    code: *code,
                    detail: format!("{}: {}", detail, stderr.trim()),
                };
            }
        }
        outcome
    }
}

/// Escape a file name for an rsync filter rule.
///
/// rsync only honours backslash escapes in rules that contain a wildcard
/// character, so names without one pass through unchanged.
fn rsync_literal(name: &str) -> String {
    if !name.contains(['*', '?', '[']) {
        return name.to_string();
    }
    let mut escaped = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if matches!(c, '*' | '?' | '[' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn with_trailing_slash(path: &std::path::Path) -> OsString {
    let mut s = path.as_os_str().to_os_string();
    if !path.to_string_lossy().ends_with('/') {
        s.push("/");
    }
    s
}

impl CopyBridge for ProcessCopyBridge {
    fn mirror<'a>(&'a self, request: &'a CopyRequest) -> BoxFuture<'a, CopyOutcome> {
        Box::pin(self.run(request))
    }
}
