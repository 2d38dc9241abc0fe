//! Request dispatcher: decides which token a command uses, mints one through
//! enrollment when `sendlogs` needs it, performs the exchange and interprets
//! the outcome. Also hosts the commands that only touch the token store.
//!
//! Only `sendlogs` enrolls implicitly. `getlogs` without a stored token is
//! an error; the two paths are kept apart on purpose.

use std::io::Write;

use tracing::{debug, info, instrument};

use crate::api::{Endpoint, LogService};
use crate::error::{CliError, CliResult};
use crate::jwt;
use crate::store::TokenStore;
use crate::ui::{self, Reporter, Sink, Source, REMEMBER_FOOTER, SEPARATOR};

/// What a network command asks the server to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Explicit enrollment; `force` replaces a stored token.
    Enroll { force: bool },
    FetchLogs { entries: u64, output: Sink },
    SubmitLogs { input: Source },
}

/// One validated network command, built fresh per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRequest {
    pub username: String,
    pub endpoint: Endpoint,
    pub operation: Operation,
}

pub struct Dispatcher<'s, S, W: Write> {
    service: S,
    store: &'s mut TokenStore,
    report: Reporter<W>,
}

impl<'s, S: LogService, W: Write> Dispatcher<'s, S, W> {
    pub fn new(service: S, store: &'s mut TokenStore, report: Reporter<W>) -> Self {
        Dispatcher {
            service,
            store,
            report,
        }
    }

    pub fn into_reporter(self) -> Reporter<W> {
        self.report
    }

    #[instrument(skip(self), fields(user = %request.username, endpoint = %request.endpoint))]
    pub fn execute(&mut self, request: &AuthRequest) -> CliResult<()> {
        let user = request.username.as_str();
        match &request.operation {
            Operation::Enroll { force } => self.add_user(user, *force).map(|_| ()),
            Operation::SubmitLogs { input } => {
                if input.is_interactive() {
                    self.report.status("expecting input from stdin:");
                    self.report
                        .info("type something and end with ctrl-d (or use -f next time)");
                }
                let body = input
                    .read_all()
                    .map_err(|e| CliError::io("cannot read log input", e))?;
                self.send_logs(user, body)
            }
            Operation::FetchLogs { entries, output } => {
                let body = self.get_logs(user, *entries)?;
                // opened only after a successful fetch so a failed request
                // leaves an existing outfile untouched
                let mut sink = output
                    .open()
                    .map_err(|e| CliError::io("cannot open log output", e))?;
                ui::write_payload(&mut *sink, &body, output.is_interactive())
                    .map_err(|e| CliError::io("cannot write logs", e))
            }
        }
    }

    /// The enrollment exchange: ask the server for a new user, remember and
    /// show the issued token.
    #[instrument(skip(self))]
    pub fn enroll(&mut self, user: &str) -> CliResult<String> {
        self.report
            .status(format!("requesting server to add user {}", user));
        let token = ui::with_spinner("enrolling...", || self.service.enroll(user))?;
        info!(len = token.len(), "server issued token");

        self.store.put(user, token.as_str());
        self.store.persist()?;

        self.report.status(format!("token for user {}:", user));
        self.report.token_block(&token, REMEMBER_FOOTER);
        Ok(token)
    }

    /// Explicit enrollment. Refuses to replace a stored token unless forced.
    pub fn add_user(&mut self, user: &str, force: bool) -> CliResult<String> {
        if self.store.contains(user) && !force {
            return Err(CliError::TokenConflict(user.to_string()));
        }
        self.enroll(user)
    }

    /// Submit `body` as log text, enrolling first when no token is stored.
    #[instrument(skip(self, body), fields(bytes = body.len()))]
    pub fn send_logs(&mut self, user: &str, body: Vec<u8>) -> CliResult<()> {
        self.report.status(format!("sending logs as user {}", user));
        let body = frame_body(body)?;

        let token = match self.store.get(user) {
            Some(token) => token.to_string(),
            None => {
                self.report
                    .status(format!("no stored token found for user {}", user));
                self.enroll(user)?
            }
        };

        debug!(bytes = body.len(), "submitting framed body");
        ui::with_spinner("sending logs...", || {
            self.service.submit_logs(user, &token, body)
        })?;
        self.report.status("logs sent successfully");
        Ok(())
    }

    /// Fetch the last `entries` log entries (`0` = all). Never enrolls.
    #[instrument(skip(self))]
    pub fn get_logs(&mut self, user: &str, entries: u64) -> CliResult<Vec<u8>> {
        self.report.status(format!("getting logs for user {}", user));
        let token = self
            .store
            .get(user)
            .ok_or_else(|| CliError::TokenMissing(user.to_string()))?
            .to_string();

        let body = ui::with_spinner("fetching logs...", || {
            self.service.fetch_logs(user, &token, entries)
        })?;
        self.report.status("received requested logs");
        Ok(body)
    }
}

/// The server stores line-oriented logs: make sure the body ends with `\n`.
pub fn frame_body(mut body: Vec<u8>) -> CliResult<Vec<u8>> {
    match body.last() {
        None => Err(CliError::UserInput("no log entries to send".into())),
        Some(b'\n') => Ok(body),
        Some(_) => {
            body.push(b'\n');
            Ok(body)
        }
    }
}

/// `showtoken`: print the stored token between separator lines.
pub fn show_token<W: Write>(
    store: &TokenStore,
    user: &str,
    claims: bool,
    out: &mut dyn Write,
    report: &mut Reporter<W>,
) -> CliResult<()> {
    let token = store
        .get(user)
        .ok_or_else(|| CliError::TokenMissing(user.to_string()))?;

    report.status(format!("token for user {}:", user));
    writeln!(out, "{}\n{}\n{}", SEPARATOR, token, SEPARATOR)
        .map_err(|e| CliError::io("cannot write token", e))?;

    if claims {
        match jwt::decode_claims(token) {
            Ok(c) => {
                let pretty = |v: &serde_json::Value| {
                    serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string())
                };
                writeln!(
                    out,
                    "header:\n{}\npayload:\n{}",
                    pretty(&c.header),
                    pretty(&c.payload)
                )
                .map_err(|e| CliError::io("cannot write claims", e))?;
            }
            Err(e) => report.info(format!("token is not a decodable JWT ({})", e)),
        }
    }
    Ok(())
}

/// `deltoken`: remove one user's token, or all of them. Removing the last
/// token wipes the snapshot. Returns how many tokens were removed.
#[instrument(skip(store, report))]
pub fn delete_tokens<W: Write>(
    store: &mut TokenStore,
    user: Option<&str>,
    all: bool,
    report: &mut Reporter<W>,
) -> CliResult<usize> {
    let mut removed = 0;
    let mut wipe = all;

    if let Some(user) = user {
        if store.remove(user) {
            removed += 1;
            report.status(format!("removed stored token for user {}", user));
            wipe |= store.is_empty();
        }
    }

    if wipe {
        removed += store.len();
        store.clear();
        if all && removed > 0 {
            report.status("removed all stored tokens");
        }
    }

    if removed == 0 {
        report.status("no matching token stored, nothing deleted");
        if !wipe {
            return Ok(0);
        }
    }

    store.persist()?;
    debug!(removed, "tokens deleted");
    Ok(removed)
}

/// `addtoken`: store a token by hand. An existing token is only replaced
/// with `force`.
#[instrument(skip(store, token, report))]
pub fn add_token<W: Write>(
    store: &mut TokenStore,
    user: &str,
    token: &str,
    force: bool,
    report: &mut Reporter<W>,
) -> CliResult<()> {
    if token.is_empty() {
        return Err(CliError::UserInput("token must not be empty".into()));
    }
    if store.contains(user) && !force {
        return Err(CliError::TokenConflict(user.to_string()));
    }

    store.put(user, token);
    store.persist()?;
    report.status(format!("token added for user {}", user));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(b"abc".to_vec(), b"abc\n".to_vec())]
    #[case(b"abc\n".to_vec(), b"abc\n".to_vec())]
    #[case(b"a\nb".to_vec(), b"a\nb\n".to_vec())]
    #[case(b"\n".to_vec(), b"\n".to_vec())]
    fn frames_body_with_trailing_newline(#[case] input: Vec<u8>, #[case] expected: Vec<u8>) {
        assert_eq!(frame_body(input).unwrap(), expected);
    }

    #[test]
    fn empty_body_is_rejected() {
        assert!(matches!(frame_body(Vec::new()), Err(CliError::UserInput(_))));
    }
}
