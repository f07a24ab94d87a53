use crate::RuntimeError;
use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};
use tracing::debug;

/// Run a driver CLI to completion and return its stdout.
pub(crate) fn run_cli(
    program: &str,
    args: &[String],
    stdin: Option<&[u8]>,
) -> Result<String, RuntimeError> {
    let rendered = render(program, args);
    debug!("exec: {rendered}");

    let mut child = Command::new(program)
        .args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    if let Some(input) = stdin {
        if let Some(mut pipe) = child.stdin.take() {
            match pipe.write_all(input) {
                Ok(()) => {}
                // The child exited without reading everything; its exit
                // status below says why.
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                    debug!("{program} closed stdin early");
                }
                Err(e) => {
                    drop(pipe);
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(e.into());
                }
            }
        }
    }

    let output = child.wait_with_output()?;
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        Err(RuntimeError::CommandFailed {
            command: rendered,
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        })
    }
}

/// True when `program <args>` runs and exits zero.
pub(crate) fn probe(program: &str, args: &[&str]) -> bool {
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn render(program: &str, args: &[String]) -> String {
    let mut out = program.to_owned();
    for arg in args {
        out.push(' ');
        out.push_str(arg);
    }
    out
}

/// Shell script standing in for a driver CLI. It appends its arguments to
/// `<dir>/argv.log` and saves the stdin of `apply` to `<dir>/stdin.json`.
#[cfg(all(test, unix))]
pub(crate) fn recording_cli(dir: &std::path::Path) -> String {
    use std::os::unix::fs::PermissionsExt;

    let script = dir.join("driver");
    let body = format!(
        "#!/bin/sh\nprintf '%s\\n' \"$*\" >> '{0}/argv.log'\n\
         if [ \"$1\" = apply ]; then cat > '{0}/stdin.json'; fi\necho ok\n",
        dir.display()
    );
    std::fs::write(&script, body).unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    script.to_string_lossy().into_owned()
}

#[cfg(all(test, unix))]
pub(crate) fn recorded_argv(dir: &std::path::Path) -> Vec<String> {
    std::fs::read_to_string(dir.join("argv.log"))
        .unwrap_or_default()
        .lines()
        .map(str::to_owned)
        .collect()
}
