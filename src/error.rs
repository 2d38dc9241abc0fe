//! Top-level errors: what gets shown to the user, and the exit code.

use std::io;
use thiserror::Error;

use crate::api::ApiError;
use crate::exitcode;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("invalid arguments: {0}")]
    UserInput(String),

    #[error("no token found for user '{0}'")]
    TokenMissing(String),

    #[error("there already is a token for user '{0}'")]
    TokenConflict(String),

    #[error("{0}")]
    Api(#[from] ApiError),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// One exit code per failure class.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::UserInput(_) => exitcode::USAGE,
            CliError::TokenMissing(_) => exitcode::NOUSER,
            CliError::TokenConflict(_) => exitcode::DATAERR,
            CliError::Api(e) => match e {
                ApiError::Transport { .. } => exitcode::UNAVAILABLE,
                ApiError::Server { .. } | ApiError::MalformedToken(_) => exitcode::PROTOCOL,
                ApiError::UnusableToken(_) | ApiError::InvalidAddress(_) => exitcode::USAGE,
            },
            CliError::Store(_) | CliError::Io { .. } => exitcode::IOERR,
        }
    }

    /// Follow-up advice printed under the error line, if any.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            CliError::TokenMissing(_) => Some(
                "did you delete it? send logs to enroll the user, or add a token with the addtoken command (it won't be signed by the server then)",
            ),
            CliError::TokenConflict(_) => Some("use --force to overwrite the stored token"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(CliError::UserInput("x".into()), exitcode::USAGE)]
    #[case(CliError::TokenMissing("u".into()), exitcode::NOUSER)]
    #[case(CliError::TokenConflict("u".into()), exitcode::DATAERR)]
    #[case(CliError::Api(ApiError::Server { status: 401, reason: "Unauthorized".into(), body: String::new() }), exitcode::PROTOCOL)]
    #[case(CliError::Api(ApiError::MalformedToken("empty".into())), exitcode::PROTOCOL)]
    #[case(CliError::Api(ApiError::UnusableToken("u".into())), exitcode::USAGE)]
    #[case(CliError::io("reading input", io::Error::other("boom")), exitcode::IOERR)]
    #[case(CliError::Store(StoreError::Write { path: "tokens.json".into(), source: io::Error::other("disk full") }), exitcode::IOERR)]
    fn exit_code_per_class(#[case] err: CliError, #[case] code: i32) {
        assert_eq!(err.exit_code(), code);
        assert_ne!(code, exitcode::OK);
    }

    #[test]
    fn server_error_shows_status_reason_and_body() {
        let err = CliError::from(ApiError::Server {
            status: 404,
            reason: "Not Found".into(),
            body: "no logs found for user 'bob'\n".into(),
        });
        assert_eq!(err.to_string(), "404 Not Found: no logs found for user 'bob'\n");
    }

    #[test]
    fn only_token_errors_carry_hints() {
        assert!(CliError::TokenMissing("u".into()).hint().is_some());
        assert!(CliError::UserInput("x".into()).hint().is_none());
    }
}
