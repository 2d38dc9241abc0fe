// Library root
// ------------
// This crate exposes the client as a library; the binary (`main.rs`) only
// parses arguments, sets up logging and reports the outcome.
//
// Module responsibilities:
// - `api`: HTTP exchanges with the logserver behind the `LogService` trait.
// - `store`: the local username -> token cache and its snapshot file.
// - `dispatch`: token lifecycle per command (reuse, enroll, reject) and the
//   token-store commands.
// - `ui`: terminal output, prompts and input/output streams.
// - `cli`, `config`, `commands`: argument definitions, settings and glue.
pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod exitcode;
pub mod jwt;
pub mod store;
pub mod testing;
pub mod ui;
