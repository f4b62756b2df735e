//! Subprocess pipeline for the signing backend
//!
//! Runs the external program with the payload on stdin while stdout and
//! stderr are drained by scoped reader threads. Writing and reading happen
//! concurrently, so payloads larger than the OS pipe buffer cannot
//! deadlock against a backend that produces output before it has consumed
//! all of its input.
//!
//! A backend that exits early (for example on an unknown key) closes its
//! stdin, and the pending write fails with `BrokenPipe`. That failure is
//! recorded in [`PipeOutput::input_error`] and makes the invocation
//! unsuccessful; it never aborts the calling process.

use crate::error::{Result, SigError};
use crate::format::Format;
use std::io::{Read, Write};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use tempfile::{NamedTempFile, TempPath};

const TEMPFILE_PREFIX: &str = ".sigbridge_vtag_tmp";

/// Captured result of one backend invocation.
#[derive(Debug)]
pub struct PipeOutput {
    /// Exit status of the backend
    pub status: ExitStatus,
    /// Everything the backend wrote to stdout
    pub stdout: Vec<u8>,
    /// Everything the backend wrote to stderr
    pub stderr: Vec<u8>,
    /// Set when the payload could not be written completely
    pub input_error: Option<std::io::Error>,
}

impl PipeOutput {
    /// Whether the backend exited successfully after consuming all input
    #[must_use]
    pub fn success(&self) -> bool {
        self.status.success() && self.input_error.is_none()
    }
}

/// Raw outcome of a verification run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyOutput {
    /// The backend exited successfully and consumed the whole payload
    pub success: bool,
    /// Human-readable output (stderr)
    pub output: Vec<u8>,
    /// Status stream (stdout, via `--status-fd=1`)
    pub status: Vec<u8>,
}

/// Run `program` with `args`, feeding `input` on stdin.
///
/// # Errors
///
/// Returns `SigError::Spawn` if the program cannot be started and
/// `SigError::Io` / `SigError::Pipeline` if its streams cannot be collected.
/// A failed write to stdin is not an error; see [`PipeOutput::input_error`].
pub fn pipe_command<S: AsRef<std::ffi::OsStr>>(
    program: &str,
    args: &[S],
    input: &[u8],
) -> Result<PipeOutput> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| SigError::Spawn {
            program: program.to_string(),
            source,
        })?;

    let streams = (child.stdin.take(), child.stdout.take(), child.stderr.take());
    let (stdin, stdout, stderr) = match streams {
        (Some(stdin), Some(stdout), Some(stderr)) => (stdin, stdout, stderr),
        _ => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(SigError::Pipeline(format!(
                "failed to capture the standard streams of '{program}'"
            )));
        }
    };

    let (input_error, stdout, stderr) = thread::scope(|scope| {
        let stdout_reader = scope.spawn(move || drain(stdout));
        let stderr_reader = scope.spawn(move || drain(stderr));

        let input_error = write_input(stdin, input);

        let stdout = join_reader(stdout_reader, "stdout");
        let stderr = join_reader(stderr_reader, "stderr");
        (input_error, stdout, stderr)
    });

    // Reap the child before reporting reader failures so it never lingers.
    let status = child.wait()?;
    let (stdout, stderr) = (stdout?, stderr?);

    tracing::debug!(
        "{} exited with {} (stdout {} bytes, stderr {} bytes)",
        program,
        status,
        stdout.len(),
        stderr.len()
    );

    Ok(PipeOutput {
        status,
        stdout,
        stderr,
        input_error,
    })
}

/// Create a detached signature over `payload` with the given program.
///
/// The signature is read from stdout; the status stream arrives on stderr.
///
/// # Errors
///
/// See [`pipe_command`].
pub fn run_sign(program: &str, signing_key: &str, payload: &[u8]) -> Result<PipeOutput> {
    let args = sign_args(signing_key);
    tracing::debug!("signing with {} {:?}", program, args);
    pipe_command(program, &args, payload)
}

/// Verify `signature` over `payload` with the backend for `format`.
///
/// The signature is written to a temporary file because backends only read
/// detached signatures by path. The file is removed before this returns,
/// whatever the outcome.
///
/// # Errors
///
/// Returns `SigError::TempFile` if the signature cannot be persisted, and
/// the errors of [`pipe_command`].
pub fn run_verify(format: &Format, payload: &[u8], signature: &[u8]) -> Result<VerifyOutput> {
    let sig_path = write_signature_file(signature)?;
    let args = verify_args(format, &sig_path);
    tracing::debug!("verifying with {} {:?}", format.program(), args);

    let result = pipe_command(format.program(), &args, payload);

    if let Err(e) = sig_path.close() {
        tracing::warn!("failed to remove temporary signature file: {}", e);
    }

    let out = result?;
    Ok(VerifyOutput {
        success: out.success(),
        output: out.stderr,
        status: out.stdout,
    })
}

/// Argument vector (without the program) for creating a signature.
#[must_use]
pub fn sign_args(signing_key: &str) -> Vec<String> {
    vec![
        "--status-fd=2".to_string(),
        "-bsau".to_string(),
        signing_key.to_string(),
    ]
}

/// Argument vector (without the program) for verifying against `sig_path`.
#[must_use]
pub fn verify_args(format: &Format, sig_path: &Path) -> Vec<std::ffi::OsString> {
    let mut args: Vec<std::ffi::OsString> = format
        .verify_args()
        .iter()
        .map(|arg| std::ffi::OsString::from(*arg))
        .collect();
    args.push("--status-fd=1".into());
    args.push("--verify".into());
    args.push(sig_path.as_os_str().to_owned());
    args.push("-".into());
    args
}

/// Persist `signature` to a uniquely named temp file and close it.
///
/// The returned path deletes the file when dropped.
fn write_signature_file(signature: &[u8]) -> Result<TempPath> {
    let mut file = tempfile::Builder::new()
        .prefix(TEMPFILE_PREFIX)
        .tempfile()
        .map_err(|source| SigError::TempFile {
            reason: "could not create temporary file".to_string(),
            source,
        })?;

    if let Err(source) = write_and_flush(&mut file, signature) {
        // Dropping `file` removes it.
        return Err(SigError::TempFile {
            reason: format!(
                "failed writing detached signature to '{}'",
                file.path().display()
            ),
            source,
        });
    }

    Ok(file.into_temp_path())
}

fn write_and_flush(file: &mut NamedTempFile, data: &[u8]) -> std::io::Result<()> {
    file.write_all(data)?;
    file.flush()
}

fn write_input(mut stdin: std::process::ChildStdin, input: &[u8]) -> Option<std::io::Error> {
    // Dropping stdin at the end of this function signals EOF.
    match stdin.write_all(input) {
        Ok(()) => None,
        Err(e) => {
            tracing::debug!("writing payload to backend failed: {}", e);
            Some(e)
        }
    }
}

fn drain(mut stream: impl Read) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf)?;
    Ok(buf)
}

fn join_reader(
    handle: thread::ScopedJoinHandle<'_, std::io::Result<Vec<u8>>>,
    name: &str,
) -> Result<Vec<u8>> {
    match handle.join() {
        Ok(Ok(buf)) => Ok(buf),
        Ok(Err(e)) => Err(SigError::Io(e)),
        Err(_) => Err(SigError::Pipeline(format!("{name} reader thread panicked"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FormatRegistry;

    #[test]
    fn test_sign_args() {
        assert_eq!(sign_args("ABCD"), vec!["--status-fd=2", "-bsau", "ABCD"]);
    }

    #[test]
    fn test_verify_args_openpgp() {
        let registry = FormatRegistry::new();
        let format = registry.by_name("openpgp").unwrap();
        let args = verify_args(format, Path::new("/tmp/sig"));
        assert_eq!(
            args,
            vec!["--keyid-format=long", "--status-fd=1", "--verify", "/tmp/sig", "-"]
        );
    }

    #[test]
    fn test_verify_args_x509_has_no_extra_args() {
        let registry = FormatRegistry::new();
        let format = registry.by_name("x509").unwrap();
        let args = verify_args(format, Path::new("sig"));
        assert_eq!(args, vec!["--status-fd=1", "--verify", "sig", "-"]);
    }

    #[test]
    fn test_signature_file_removed_on_drop() {
        let path = write_signature_file(b"-----BEGIN PGP SIGNATURE-----\n").unwrap();
        let owned = path.to_path_buf();
        assert_eq!(
            std::fs::read(&owned).unwrap(),
            b"-----BEGIN PGP SIGNATURE-----\n"
        );
        assert!(owned
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(TEMPFILE_PREFIX));
        drop(path);
        assert!(!owned.exists());
    }

    #[test]
    fn test_spawn_failure_is_reported() {
        let err = pipe_command::<&str>("/nonexistent/sigbridge-backend", &[], b"x").unwrap_err();
        assert!(matches!(err, SigError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_pipe_command_echoes_large_input() {
        let input = vec![b'a'; 1 << 20];
        let out = pipe_command("cat", &[] as &[&str], &input).unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.len(), input.len());
        assert!(out.stderr.is_empty());
    }
}
