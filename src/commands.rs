//! Maps parsed command lines onto the dispatcher and the token store.

use std::io;

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use tracing::debug;

use crate::api::{ApiClient, Endpoint};
use crate::cli::{Cli, Commands, ServerArgs};
use crate::config::Settings;
use crate::dispatch::{self, AuthRequest, Dispatcher, Operation};
use crate::error::{CliError, CliResult};
use crate::store::TokenStore;
use crate::ui::{self, Reporter, Sink, Source};

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let settings = Settings::from_cli(cli);
    debug!(?settings, "resolved settings");

    match &cli.command {
        Commands::Sendlogs { server, infile } => {
            let request = auth_request(
                server,
                &settings,
                Operation::SubmitLogs {
                    input: Source::from_arg(infile.as_deref()),
                },
            );
            dispatch_request(&settings, &request)
        }
        Commands::Getlogs {
            server,
            nr_entries,
            outfile,
        } => {
            let request = auth_request(
                server,
                &settings,
                Operation::FetchLogs {
                    entries: *nr_entries,
                    output: Sink::from_arg(outfile.as_deref()),
                },
            );
            dispatch_request(&settings, &request)
        }
        Commands::Adduser { server, force } => {
            let request = auth_request(server, &settings, Operation::Enroll { force: *force });
            dispatch_request(&settings, &request)
        }
        Commands::Showtoken { user, claims } => {
            let store = TokenStore::load(&settings.store_path)?;
            let mut out = io::stdout().lock();
            dispatch::show_token(&store, user, *claims, &mut out, &mut Reporter::stderr())
        }
        Commands::Deltoken { user, all, yes } => {
            let mut store = TokenStore::load(&settings.store_path)?;
            let mut report = Reporter::stderr();
            if *all && !*yes && !store.is_empty() && ui::stdin_is_tty() {
                let prompt = format!(
                    "Delete all {} stored tokens? They cannot be restored",
                    store.len()
                );
                let confirmed =
                    ui::confirm(&prompt).map_err(|e| CliError::io("confirmation failed", e))?;
                if !confirmed {
                    report.status("aborted, nothing deleted");
                    return Ok(());
                }
            }
            dispatch::delete_tokens(&mut store, user.as_deref(), *all, &mut report).map(|_| ())
        }
        Commands::Addtoken { user, token, force } => {
            let mut store = TokenStore::load(&settings.store_path)?;
            dispatch::add_token(&mut store, user, token, *force, &mut Reporter::stderr())
        }
        Commands::Completion { shell } => {
            print_completions(*shell);
            Ok(())
        }
    }
}

fn auth_request(server: &ServerArgs, settings: &Settings, operation: Operation) -> AuthRequest {
    AuthRequest {
        username: server.user.clone(),
        endpoint: Endpoint::new(server.ip.as_str(), server.port, settings.plain_http),
        operation,
    }
}

fn dispatch_request(settings: &Settings, request: &AuthRequest) -> CliResult<()> {
    let mut store = TokenStore::load(&settings.store_path)?;
    let client = ApiClient::new(&request.endpoint, settings.timeout)?;
    let mut dispatcher = Dispatcher::new(client, &mut store, Reporter::stderr());
    dispatcher.execute(request)
}

fn print_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}
