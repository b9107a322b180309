use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::kernel::construction::{Kernel, KernelConfig};
use crate::prelude;
use crate::script::{run_script, ScriptError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum VerifierStatus {
    /// Every script ran to the end.
    Good,

    /// Some script stopped at an abort, but nothing failed.
    Warning,

    /// Some script failed.
    Error,
}

impl VerifierStatus {
    pub fn verb(&self) -> &str {
        match self {
            VerifierStatus::Good => "succeeded",
            VerifierStatus::Warning => "warned",
            VerifierStatus::Error => "errored",
        }
    }

    pub fn warn(&mut self) {
        if *self == VerifierStatus::Good {
            *self = VerifierStatus::Warning;
        }
    }

    pub fn is_error(&self) -> bool {
        *self == VerifierStatus::Error
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum FileOutcome {
    Verified,
    Aborted,
    Failed,
}

/// What happened to one script file.
#[derive(Clone, Debug, Serialize)]
pub struct FileEvent {
    pub path: PathBuf,
    pub outcome: FileOutcome,

    /// Theorems the script's top-level goals and deductions installed.
    pub proved: Vec<String>,

    /// Output of the script's `show` commands.
    pub shown: Vec<String>,

    /// The error or abort reason, when the script didn't run to the end.
    pub message: Option<String>,

    /// The line the error happened on, when it has one.
    pub line: Option<u32>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct VerifierMetrics {
    pub files_total: usize,
    pub files_verified: usize,
    pub files_aborted: usize,
    pub files_failed: usize,

    /// Commands run across all files.
    pub commands: usize,

    /// Theorems proved across all files.
    pub theorems: usize,
}

impl VerifierMetrics {
    pub fn print(&self, status: VerifierStatus) {
        println!();
        println!(
            "{} files: {} verified, {} aborted, {} failed",
            self.files_total, self.files_verified, self.files_aborted, self.files_failed
        );
        println!("{} commands run, {} theorems proved", self.commands, self.theorems);
        println!("verification {}", status.verb());
    }
}

/// Output from running the verifier.
#[derive(Clone, Debug, Serialize)]
pub struct VerifierOutput {
    pub status: VerifierStatus,
    pub metrics: VerifierMetrics,
    pub events: Vec<FileEvent>,
}

impl VerifierOutput {
    pub fn is_success(&self) -> bool {
        self.status == VerifierStatus::Good
    }
}

#[derive(Clone, Debug)]
pub struct VerifierConfig {
    /// Files with this extension are scripts.
    pub extension: String,

    /// Each script gets a fresh kernel with this configuration.
    pub kernel: KernelConfig,

    /// Whether each kernel starts with the equality prelude installed.
    pub prelude: bool,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            extension: "nd".to_string(),
            kernel: KernelConfig::default(),
            prelude: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerifierError {
    // Trouble reading a file or walking a directory.
    Io { path: PathBuf, message: String },

    // Nothing to verify under the given paths.
    NoFiles(Vec<PathBuf>),
}

impl fmt::Display for VerifierError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VerifierError::Io { path, message } => {
                write!(f, "error reading {}: {}", path.display(), message)
            }
            VerifierError::NoFiles(paths) => {
                let paths: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
                write!(f, "no scripts found in {}", paths.join(", "))
            }
        }
    }
}

impl std::error::Error for VerifierError {}

/// Runs every script under a set of paths, each in its own kernel.
pub struct Verifier {
    config: VerifierConfig,

    /// Files, or directories to search for scripts.
    paths: Vec<PathBuf>,
}

impl Verifier {
    pub fn new(paths: Vec<PathBuf>, config: VerifierConfig) -> Self {
        Self { config, paths }
    }

    /// The script files to run, in a stable order.
    /// Explicitly named files are taken whatever their extension is.
    pub fn collect_files(&self) -> Result<Vec<PathBuf>, VerifierError> {
        let mut files = vec![];
        for path in &self.paths {
            if !path.is_dir() {
                if !path.exists() {
                    return Err(VerifierError::Io {
                        path: path.clone(),
                        message: "no such file or directory".to_string(),
                    });
                }
                files.push(path.clone());
                continue;
            }
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry.map_err(|e| VerifierError::Io {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
                let is_script = entry.file_type().is_file()
                    && entry.path().extension().map_or(false, |ext| {
                        ext.to_string_lossy() == self.config.extension.as_str()
                    });
                if is_script {
                    files.push(entry.into_path());
                }
            }
        }
        if files.is_empty() {
            return Err(VerifierError::NoFiles(self.paths.clone()));
        }
        Ok(files)
    }

    /// Runs one script's text in a fresh kernel.
    pub fn verify_text(&self, path: &Path, text: &str) -> (FileEvent, usize) {
        let mut event = FileEvent {
            path: path.to_path_buf(),
            outcome: FileOutcome::Verified,
            proved: vec![],
            shown: vec![],
            message: None,
            line: None,
        };
        let mut kernel = Kernel::with_config(self.config.kernel.clone());
        if self.config.prelude {
            if let Err(e) = prelude::install(&mut kernel) {
                event.outcome = FileOutcome::Failed;
                event.message = Some(e.to_string());
                return (event, 0);
            }
        }
        match run_script(&mut kernel, text) {
            Ok(output) => {
                event.proved = output.proved;
                event.shown = output.shown;
                if let Some(abort) = output.aborted {
                    event.outcome = FileOutcome::Aborted;
                    event.message = Some(abort.reason);
                }
                (event, output.commands)
            }
            Err(e) => {
                event.outcome = FileOutcome::Failed;
                event.line = e.line();
                event.message = Some(match &e {
                    ScriptError::Syntax(_) | ScriptError::Malformed(_) => e.to_string(),
                    _ => format!("{}: {}", e.error_type(), e),
                });
                (event, 0)
            }
        }
    }

    pub fn run(&self) -> Result<VerifierOutput, VerifierError> {
        let files = self.collect_files()?;
        let mut status = VerifierStatus::Good;
        let mut metrics = VerifierMetrics::default();
        let mut events = vec![];

        for path in files {
            let text = std::fs::read_to_string(&path).map_err(|e| VerifierError::Io {
                path: path.clone(),
                message: e.to_string(),
            })?;
            let (event, commands) = self.verify_text(&path, &text);
            metrics.files_total += 1;
            metrics.commands += commands;
            metrics.theorems += event.proved.len();
            match event.outcome {
                FileOutcome::Verified => {
                    metrics.files_verified += 1;
                    info!(path = %path.display(), theorems = event.proved.len(), "verified");
                }
                FileOutcome::Aborted => {
                    metrics.files_aborted += 1;
                    status.warn();
                    warn!(path = %path.display(), reason = ?event.message, "aborted");
                }
                FileOutcome::Failed => {
                    metrics.files_failed += 1;
                    status = VerifierStatus::Error;
                    warn!(path = %path.display(), error = ?event.message, "failed");
                }
            }
            events.push(event);
        }

        Ok(VerifierOutput {
            status,
            metrics,
            events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use assert_fs::TempDir;

    fn verifier(temp: &TempDir) -> Verifier {
        Verifier::new(vec![temp.path().to_path_buf()], VerifierConfig::default())
    }

    #[test]
    fn test_verifier_basic() {
        let temp = TempDir::new().unwrap();
        temp.child("refl.nd")
            .write_str(
                r#"
                (goal same (forall (x) (= x x))
                  (intros)
                  (autodeduce (= x x)))
                "#,
            )
            .unwrap();
        let output = verifier(&temp).run().unwrap();
        assert!(output.is_success());
        assert_eq!(output.metrics.files_total, 1);
        assert_eq!(output.events[0].proved, vec!["same".to_string()]);
        temp.close().unwrap();
    }

    #[test]
    fn test_verifier_walks_directories() {
        let temp = TempDir::new().unwrap();
        temp.child("a.nd").write_str("(verify (= 1 1))").unwrap();
        temp.child("nested/b.nd")
            .write_str("(suppose h p)\n(apply h h)")
            .unwrap();
        temp.child("nested/c.nd").write_str("(abort \"later\")").unwrap();
        temp.child("notes.txt").write_str("(not a script").unwrap();

        let output = verifier(&temp).run().unwrap();
        assert_eq!(output.status, VerifierStatus::Error);
        assert_eq!(output.metrics.files_total, 3);
        assert_eq!(output.metrics.files_verified, 1);
        assert_eq!(output.metrics.files_failed, 1);
        assert_eq!(output.metrics.files_aborted, 1);

        let failed = &output.events[1];
        assert!(failed.path.ends_with("nested/b.nd"));
        assert_eq!(failed.line, Some(2));
        assert!(failed.message.as_ref().unwrap().contains("NotARule"));
        temp.close().unwrap();
    }

    #[test]
    fn test_verifier_no_files() {
        let temp = TempDir::new().unwrap();
        temp.child("readme.md").write_str("nothing").unwrap();
        assert!(matches!(
            verifier(&temp).run(),
            Err(VerifierError::NoFiles(_))
        ));
        temp.close().unwrap();
    }
}
