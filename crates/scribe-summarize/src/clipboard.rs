//! Clipboard capability injected by the caller.
//!
//! The summarizer never touches the clipboard itself; the binary picks an
//! implementation and hands the finished message to it.

use std::io::Write;
use std::process::{Command, Stdio};

use scribe_core::ScribeError;

/// Something that can receive the finished commit message.
pub trait Clipboard {
    /// Copy `text` to the clipboard.
    ///
    /// # Errors
    ///
    /// Returns [`ScribeError::Clipboard`] if the text could not be copied.
    fn copy(&self, text: &str) -> Result<(), ScribeError>;
}

/// Discards the text. Used with `--no-clipboard` and in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoClipboard;

impl Clipboard for NoClipboard {
    fn copy(&self, _text: &str) -> Result<(), ScribeError> {
        Ok(())
    }
}

/// Pipes the text to an external program such as `pbcopy`.
///
/// # Examples
///
/// ```
/// use scribe_summarize::clipboard::CommandClipboard;
///
/// let clipboard = CommandClipboard::from_command(&["xclip".into(), "-selection".into(), "clipboard".into()]).unwrap();
/// assert_eq!(clipboard.program(), "xclip");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandClipboard {
    program: String,
    args: Vec<String>,
}

impl CommandClipboard {
    /// Build from a program followed by its arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ScribeError::Config`] if `command` is empty.
    pub fn from_command(command: &[String]) -> Result<Self, ScribeError> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| ScribeError::Config("clipboard command is empty".into()))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    /// Pick the platform's usual clipboard command.
    ///
    /// macOS uses `pbcopy`, Windows uses `clip`, and Linux uses `wl-copy`
    /// under Wayland or `xclip` otherwise. Returns `None` on other platforms.
    pub fn detect() -> Option<Self> {
        let wayland = std::env::var_os("WAYLAND_DISPLAY").is_some();
        Self::for_platform(std::env::consts::OS, wayland)
    }

    fn for_platform(os: &str, wayland: bool) -> Option<Self> {
        let command: &[&str] = match os {
            "macos" => &["pbcopy"],
            "windows" => &["clip"],
            "linux" | "freebsd" | "openbsd" | "netbsd" if wayland => &["wl-copy"],
            "linux" | "freebsd" | "openbsd" | "netbsd" => &["xclip", "-selection", "clipboard"],
            _ => return None,
        };
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        })
    }

    /// The program that receives the text.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Program and arguments as one display string.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Clipboard for CommandClipboard {
    fn copy(&self, text: &str) -> Result<(), ScribeError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ScribeError::Clipboard(format!("failed to run {}: {e}", self.program)))?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(text.as_bytes()) {
                drop(stdin);
                // Reap the child before reporting.
                let _ = child.kill();
                let _ = child.wait();
                return Err(ScribeError::Clipboard(format!(
                    "writing to {}: {e}",
                    self.program
                )));
            }
        }

        let status = child
            .wait()
            .map_err(|e| ScribeError::Clipboard(format!("waiting for {}: {e}", self.program)))?;
        if !status.success() {
            return Err(ScribeError::Clipboard(format!(
                "{} exited with {status}",
                self.program
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_defaults() {
        assert_eq!(
            CommandClipboard::for_platform("macos", false).unwrap().command_line(),
            "pbcopy"
        );
        assert_eq!(
            CommandClipboard::for_platform("windows", false).unwrap().command_line(),
            "clip"
        );
        assert_eq!(
            CommandClipboard::for_platform("linux", true).unwrap().command_line(),
            "wl-copy"
        );
        assert_eq!(
            CommandClipboard::for_platform("linux", false).unwrap().command_line(),
            "xclip -selection clipboard"
        );
        assert!(CommandClipboard::for_platform("solaris", false).is_none());
    }

    #[test]
    fn empty_command_rejected() {
        assert!(matches!(
            CommandClipboard::from_command(&[]),
            Err(ScribeError::Config(_))
        ));
    }

    #[test]
    fn missing_program_is_clipboard_error() {
        let clipboard =
            CommandClipboard::from_command(&["scribe-no-such-clipboard-tool".into()]).unwrap();
        assert!(matches!(
            clipboard.copy("hello"),
            Err(ScribeError::Clipboard(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn text_is_piped_to_the_program() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("clip.txt");
        let clipboard = CommandClipboard::from_command(&[
            "sh".into(),
            "-c".into(),
            format!("cat > '{}'", out.display()),
        ])
        .unwrap();
        clipboard.copy("Add hello world print").unwrap();
        assert_eq!(std::fs::read_to_string(out).unwrap(), "Add hello world print");
    }

    #[cfg(unix)]
    #[test]
    fn program_that_closes_stdin_is_reaped_and_reported() {
        // `true` exits without reading, so a large write hits a closed pipe.
        let clipboard = CommandClipboard::from_command(&["true".into()]).unwrap();
        let text = "x".repeat(1 << 20);
        match clipboard.copy(&text) {
            Err(ScribeError::Clipboard(msg)) => assert!(msg.contains("true")),
            other => panic!("expected clipboard error, got {other:?}"),
        }
    }

    #[test]
    fn no_clipboard_accepts_anything() {
        assert!(NoClipboard.copy("anything").is_ok());
    }
}
