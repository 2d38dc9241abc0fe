// UI layer: everything the user sees on the terminal. Status lines and
// notices go to a `Reporter` (stderr in the binary); payloads such as logs
// and tokens are written to stdout or a file.

use crossterm::style::Stylize;
use crossterm::tty::IsTty;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SEPARATOR: &str = "---------------------------------------------------";
pub const REMEMBER_FOOTER: &str = "--- the client will remember this token for you ---";

/// Writes `[*]`-style status lines, colored when attached to a terminal.
pub struct Reporter<W: Write> {
    w: W,
    color: bool,
}

impl Reporter<io::Stderr> {
    pub fn stderr() -> Self {
        let color = io::stderr().is_tty();
        Reporter::new(io::stderr(), color)
    }
}

impl<W: Write> Reporter<W> {
    pub fn new(w: W, color: bool) -> Self {
        Reporter { w, color }
    }

    pub fn into_inner(self) -> W {
        self.w
    }

    /// `[*] msg`
    pub fn status(&mut self, msg: impl AsRef<str>) {
        let tag = if self.color {
            "[*]".green().to_string()
        } else {
            "[*]".to_string()
        };
        let _ = writeln!(self.w, "{} {}", tag, msg.as_ref());
    }

    /// `[INFO] msg`
    pub fn info(&mut self, msg: impl AsRef<str>) {
        let tag = if self.color {
            "[INFO]".cyan().to_string()
        } else {
            "[INFO]".to_string()
        };
        let _ = writeln!(self.w, "{} {}", tag, msg.as_ref());
    }

    /// `[ERROR] msg`
    pub fn error(&mut self, msg: impl AsRef<str>) {
        let line = format!("[ERROR] {}", msg.as_ref());
        let _ = if self.color {
            writeln!(self.w, "{}", line.red())
        } else {
            writeln!(self.w, "{}", line)
        };
    }

    /// A token framed by separator lines, ending with `footer`.
    pub fn token_block(&mut self, token: &str, footer: &str) {
        let _ = writeln!(self.w, "{}\n{}\n{}", SEPARATOR, token, footer);
    }
}

pub fn stdin_is_tty() -> bool {
    io::stdin().is_tty()
}

pub fn stdout_is_tty() -> bool {
    io::stdout().is_tty()
}

/// Spinner on stderr; indicatif hides it when stderr is not a terminal.
pub fn spinner(msg: impl Into<String>) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(msg.into());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Run `f` while a spinner is shown, clearing it before returning.
pub fn with_spinner<T>(msg: impl Into<String>, f: impl FnOnce() -> T) -> T {
    let spinner = spinner(msg);
    let out = f();
    spinner.finish_and_clear();
    out
}

/// Yes/no prompt, defaulting to no.
pub fn confirm(prompt: &str) -> io::Result<bool> {
    Confirm::new().with_prompt(prompt).default(false).interact()
}

/// Where `sendlogs` reads from. `-` means stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Stdin,
    File(PathBuf),
}

impl Source {
    pub fn from_arg(path: Option<&Path>) -> Self {
        match path {
            Some(p) if p != Path::new("-") => Source::File(p.to_path_buf()),
            _ => Source::Stdin,
        }
    }

    pub fn is_interactive(&self) -> bool {
        matches!(self, Source::Stdin) && stdin_is_tty()
    }

    pub fn read_all(&self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        match self {
            Source::Stdin => {
                io::stdin().lock().read_to_end(&mut buf)?;
            }
            Source::File(p) => {
                File::open(p)?.read_to_end(&mut buf)?;
            }
        }
        Ok(buf)
    }
}

/// Where `getlogs` writes to. `-` means stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sink {
    Stdout,
    File(PathBuf),
}

impl Sink {
    pub fn from_arg(path: Option<&Path>) -> Self {
        match path {
            Some(p) if p != Path::new("-") => Sink::File(p.to_path_buf()),
            _ => Sink::Stdout,
        }
    }

    /// Interactive sinks get text, everything else the exact bytes.
    pub fn is_interactive(&self) -> bool {
        matches!(self, Sink::Stdout) && stdout_is_tty()
    }

    pub fn open(&self) -> io::Result<Box<dyn Write>> {
        Ok(match self {
            Sink::Stdout => Box::new(io::stdout().lock()),
            Sink::File(p) => Box::new(File::create(p)?),
        })
    }
}

/// Write a response body, lossily as text or untouched as bytes.
pub fn write_payload(sink: &mut dyn Write, body: &[u8], text_mode: bool) -> io::Result<()> {
    if text_mode {
        sink.write_all(String::from_utf8_lossy(body).as_bytes())?;
    } else {
        sink.write_all(body)?;
    }
    sink.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(r: Reporter<Vec<u8>>) -> String {
        String::from_utf8(r.into_inner()).unwrap()
    }

    #[test]
    fn plain_reporter_writes_tags() {
        let mut r = Reporter::new(Vec::new(), false);
        r.status("sending logs as user alice");
        r.info("hint");
        r.error("404 Not Found: nope");
        assert_eq!(
            output(r),
            "[*] sending logs as user alice\n[INFO] hint\n[ERROR] 404 Not Found: nope\n"
        );
    }

    #[test]
    fn token_block_is_framed() {
        let mut r = Reporter::new(Vec::new(), false);
        r.token_block("a.b.c", SEPARATOR);
        assert_eq!(output(r), format!("{0}\na.b.c\n{0}\n", SEPARATOR));
    }

    #[test]
    fn dash_means_standard_streams() {
        assert_eq!(Source::from_arg(Some(Path::new("-"))), Source::Stdin);
        assert_eq!(Source::from_arg(None), Source::Stdin);
        assert_eq!(
            Sink::from_arg(Some(Path::new("out.log"))),
            Sink::File(PathBuf::from("out.log"))
        );
    }

    #[test]
    fn payload_bytes_are_kept_when_not_text() {
        let body = [b'a', 0xff, b'\n'];
        let mut raw = Vec::new();
        write_payload(&mut raw, &body, false).unwrap();
        assert_eq!(raw, body);

        let mut text = Vec::new();
        write_payload(&mut text, &body, true).unwrap();
        assert_eq!(String::from_utf8(text).unwrap(), "a\u{fffd}\n");
    }
}
