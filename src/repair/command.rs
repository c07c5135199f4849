//! Repair command templating and execution
//!
//! The operator supplies a command template containing placeholder tokens
//! for the bucket name, the bucket-relative path, and the absolute source
//! path. Each token's first occurrence is substituted verbatim, then the
//! command is tokenized on whitespace and run as an external process with
//! no shell in between. Paths containing spaces are a known hazard of
//! this format.

use crate::store::RepairTask;
use std::io;
use std::process::{Command, ExitStatus};

/// Placeholder for the bucket name
pub const BUCKET_TOKEN: &str = "{BUCKET}";

/// Placeholder for the bucket-relative path
pub const PATH_TOKEN: &str = "{PATH}";

/// Placeholder for the absolute source path
pub const ABSPATH_TOKEN: &str = "{ABSPATH}";

/// Substitute a task's fields into the command template
pub fn render(template: &str, task: &RepairTask) -> String {
    template
        .replacen(BUCKET_TOKEN, &task.bucket, 1)
        .replacen(PATH_TOKEN, &task.path, 1)
        .replacen(ABSPATH_TOKEN, &task.abs_path, 1)
}

/// Render, tokenize, and execute the repair command for one task
///
/// Blocks until the process exits. The exit status is returned as data;
/// deciding what a failure means is the executor's concern.
pub fn execute(template: &str, task: &RepairTask) -> io::Result<ExitStatus> {
    let rendered = render(template, task);
    let mut parts = rendered.split_whitespace();

    let program = parts.next().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "empty repair command")
    })?;

    Command::new(program).args(parts).status()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn task(bucket: &str, path: &str, abs: &str) -> RepairTask {
        RepairTask {
            bucket: bucket.into(),
            path: path.into(),
            abs_path: abs.into(),
        }
    }

    #[test]
    fn test_render_substitutes_all_tokens() {
        let t = task("b1", "sub/f.txt", "/mnt/src/b1/sub/f.txt");
        let rendered = render("cp {ABSPATH} /mnt/target/{BUCKET}/{PATH}", &t);
        assert_eq!(
            rendered,
            "cp /mnt/src/b1/sub/f.txt /mnt/target/b1/sub/f.txt"
        );
    }

    #[test]
    fn test_render_first_occurrence_only() {
        let t = task("b1", "f.txt", "/src/f.txt");
        let rendered = render("echo {PATH} {PATH}", &t);
        assert_eq!(rendered, "echo f.txt {PATH}");
    }

    #[test]
    fn test_execute_runs_command() {
        let dir = tempdir().unwrap();
        let marker = dir.path().join("marker");
        let t = task("b1", "f.txt", marker.to_str().unwrap());

        let status = execute("touch {ABSPATH}", &t).unwrap();
        assert!(status.success());
        assert!(marker.exists());
    }

    #[test]
    fn test_execute_reports_command_failure() {
        let dir = tempdir().unwrap();
        let t = task("b1", "f.txt", "/nonexistent/source");

        // cp of a nonexistent source exits non-zero but spawns fine
        let template = format!("cp {{ABSPATH}} {}", dir.path().join("dst").display());
        let status = execute(&template, &t).unwrap();
        assert!(!status.success());
    }

    #[test]
    fn test_execute_rejects_empty_template() {
        let t = task("b1", "f.txt", "/src/f.txt");
        let err = execute("   ", &t).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_execute_missing_program_is_io_error() {
        let t = task("b1", "f.txt", "/src/f.txt");
        assert!(execute("definitely-not-a-real-program-xyz {PATH}", &t).is_err());
    }

    #[test]
    fn test_execute_no_shell_interpretation() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        let t = task("b1", "f.txt", "/src/f.txt");

        // Shell metacharacters are plain arguments, not redirections
        let template = format!(
            "touch {} >{}",
            out.display(),
            dir.path().join("redir").display()
        );
        let _ = execute(&template, &t).unwrap();

        assert!(out.exists());
        assert!(!dir.path().join("redir").exists());
    }
}
