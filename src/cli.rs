//! Command-line definitions using clap

use std::ffi::OsString;
use std::net::IpAddr;
use std::path::PathBuf;

use clap::builder::NonEmptyStringValueParser;
use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

const EXAMPLES: &str = "\
sample usage:
    cat logfile | logserver-client sendlogs some_user 127.0.0.1 1234
    logserver-client getlogs some_user 127.0.0.1 1234 -nr 20
    logserver-client showtoken some_user";

const DELTOKEN_WARNING: &str = "\
WARNING: without a valid token you can't access your logs on the server.
Make sure to back up the token with the showtoken command first.
There is no way to restore a token once deleted.";

/// Client for the logserver log-collection service
#[derive(Parser, Debug)]
#[command(name = "logserver-client")]
#[command(author, version, about, long_about = None, after_help = EXAMPLES)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-d, -dd, -ddd)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Token store snapshot file
    #[arg(long, global = true, env = "LOGSERVER_TOKEN_STORE", value_hint = ValueHint::FilePath)]
    pub store: Option<PathBuf>,

    /// Use plain HTTP instead of HTTPS (for servers without TLS)
    #[arg(long, global = true, env = "LOGSERVER_PLAIN_HTTP")]
    pub plain_http: bool,

    /// Connect and read timeout in seconds [default: 10]
    #[arg(long, global = true, env = "LOGSERVER_TIMEOUT", value_name = "SECS",
          value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Positional arguments shared by every command that talks to a server.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ServerArgs {
    /// Username on the logserver
    #[arg(value_parser = parse_user)]
    pub user: String,

    /// Address of the logserver (IP or hostname)
    #[arg(value_parser = parse_host)]
    pub ip: String,

    /// Port of the logserver
    #[arg(value_parser = clap::value_parser!(u16).range(1..))]
    pub port: u16,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send log entries, read from stdin or a file
    Sendlogs {
        #[command(flatten)]
        server: ServerArgs,

        /// File to read the log entries from (default: stdin)
        #[arg(short = 'f', long, value_hint = ValueHint::FilePath)]
        infile: Option<PathBuf>,
    },

    /// Get either all or the last NR log entries
    Getlogs {
        #[command(flatten)]
        server: ServerArgs,

        /// Just like tail -n; 0 fetches everything (also accepted as -nr)
        #[arg(short = 'n', long, value_name = "NR", default_value_t = 0)]
        nr_entries: u64,

        /// Where to write the logs (default: stdout)
        #[arg(short = 'f', long, value_hint = ValueHint::FilePath)]
        outfile: Option<PathBuf>,
    },

    /// Show the stored token for a user
    Showtoken {
        #[arg(value_parser = NonEmptyStringValueParser::new())]
        user: String,

        /// Also decode and print the token's JWT claims
        #[arg(long)]
        claims: bool,
    },

    /// Delete the stored token for one or all users
    #[command(long_about = DELTOKEN_WARNING)]
    Deltoken {
        /// User whose token gets deleted
        user: Option<String>,

        /// Delete all stored tokens
        #[arg(long)]
        all: bool,

        /// Don't ask for confirmation on --all
        #[arg(short, long)]
        yes: bool,
    },

    /// Add a token for a user (no validity checks done)
    Addtoken {
        #[arg(value_parser = NonEmptyStringValueParser::new())]
        user: String,

        /// JWT in base64url (parts separated by ".")
        #[arg(value_parser = NonEmptyStringValueParser::new())]
        token: String,

        /// Overwrite an existing token
        #[arg(short, long)]
        force: bool,
    },

    /// Ask the server to create a user and remember the issued token
    Adduser {
        #[command(flatten)]
        server: ServerArgs,

        /// Enroll even if a token is already stored (replaces it)
        #[arg(short, long)]
        force: bool,
    },

    /// Generate shell completions
    Completion {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Accept the historical `-nr N` spelling by rewriting it to `--nr-entries N`.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut out = Vec::new();
    let mut passthrough = false;
    for arg in args.into_iter().map(Into::into) {
        if passthrough {
            out.push(arg);
            continue;
        }
        match arg.to_str() {
            Some("--") => {
                passthrough = true;
                out.push(arg);
            }
            Some("-nr") => out.push("--nr-entries".into()),
            Some(s) if s.starts_with("-nr=") => {
                out.push(format!("--nr-entries={}", &s["-nr=".len()..]).into())
            }
            _ => out.push(arg),
        }
    }
    out
}

/// A username that maps onto exactly one path segment: `.` and `..` would be
/// dropped from the request path by URL normalization.
pub fn parse_user(s: &str) -> Result<String, String> {
    match s {
        "" => Err("username must not be empty".into()),
        "." | ".." => Err(format!("'{}' is not a valid username", s)),
        _ => Ok(s.to_string()),
    }
}

/// An IP literal (IPv6 optionally bracketed) or a DNS hostname.
pub fn parse_host(s: &str) -> Result<String, String> {
    let bare = s
        .strip_prefix('[')
        .and_then(|r| r.strip_suffix(']'))
        .unwrap_or(s);
    if let Ok(ip) = bare.parse::<IpAddr>() {
        return Ok(ip.to_string());
    }

    let name = s.strip_suffix('.').unwrap_or(s);
    let valid_label = |l: &str| {
        !l.is_empty()
            && l.len() <= 63
            && !l.starts_with('-')
            && !l.ends_with('-')
            && l.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    };
    let labels: Vec<&str> = name.split('.').collect();
    let looks_numeric = labels.iter().all(|l| l.chars().all(|c| c.is_ascii_digit()));
    if name.is_empty() || name.len() > 253 || looks_numeric || !labels.iter().all(|l| valid_label(l)) {
        return Err(format!("'{}' is not a valid IP address or hostname", s));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[rstest]
    #[case("127.0.0.1", "127.0.0.1")]
    #[case("::1", "::1")]
    #[case("[::1]", "::1")]
    #[case("logs.example.org", "logs.example.org")]
    #[case("localhost", "localhost")]
    #[case("host.", "host")]
    fn accepts_hosts(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(parse_host(input).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case(".")]
    #[case("..")]
    fn rejects_path_like_usernames(#[case] input: &str) {
        assert!(parse_user(input).is_err());
    }

    #[rstest]
    #[case("alice")]
    #[case("...")]
    #[case(".hidden")]
    #[case("a b")]
    fn accepts_usernames(#[case] input: &str) {
        assert_eq!(parse_user(input).unwrap(), input);
    }

    #[rstest]
    #[case("")]
    #[case("256.1.1.1")]
    #[case("1.2.3")]
    #[case("-bad.example")]
    #[case("under_score")]
    #[case("a..b")]
    fn rejects_hosts(#[case] input: &str) {
        assert!(parse_host(input).is_err());
    }

    #[rstest]
    #[case(&["x", "getlogs", "u", "1.1.1.1", "80", "-nr", "5"], "--nr-entries")]
    #[case(&["x", "getlogs", "u", "1.1.1.1", "80", "-nr=5"], "--nr-entries=5")]
    fn normalizes_nr(#[case] args: &[&str], #[case] expected: &str) {
        let out = normalize_args(args.iter().copied());
        assert!(out.iter().any(|a| a == expected));
        assert!(!out.iter().any(|a| a == "-nr"));
    }

    #[test]
    fn leaves_args_after_double_dash_alone() {
        let out = normalize_args(["x", "--", "-nr"]);
        assert_eq!(out.last().unwrap(), "-nr");
    }
}
