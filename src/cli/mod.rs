//! Command line front end of the `workshop` tool
//!
//! ```text
//! workshop <command> name=value ...
//!
//!   parse_command ──► Command ──► help / help-tags      (no session)
//!                        │
//!                        └──► execute(client) ──► add / update / find / info / download
//! ```
//!
//! All user-facing text goes to the `Write` sink handed to [`execute`];
//! diagnostics go through `tracing`.

mod args;
mod commands;

pub use args::{
    parse_find_args, parse_info_args, parse_item_args, parse_options, take_command,
    write_standard_tags, CliOption, FindArgs, InfoArgs, ItemArgs,
};
pub use commands::{execute, write_help, Command};

use std::io::Write;

use tracing::debug;

use crate::client::WorkshopClient;
use crate::config::{ConfigError, WorkshopConfig};
use crate::error::{TransportError, WorkshopError};
use crate::local::LocalWorkshop;
use crate::query::PagingError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Invalid option name: '{0}'")]
    InvalidOptionName(String),
    #[error("Command shouldn't have a value specified: {0}")]
    CommandWithValue(String),
    #[error("Invalid command: {0}")]
    UnknownCommand(String),
    #[error("Invalid ID specified: '{0}'")]
    InvalidId(String),
    #[error("At least one id has to be specified")]
    MissingIds,
    #[error("Invalid visibility value: '{0}'")]
    InvalidVisibility(String),
    #[error("Invalid order specified: {0}")]
    InvalidOrder(String),
    #[error("Invalid count specified: {0}")]
    InvalidCount(String),
    #[error("Invalid tag name: '{tag}'\nMax length: {max}, special characters are illegal")]
    InvalidTag { tag: String, max: usize },
    #[error("Empty path given!")]
    EmptyPath,
    #[error("File '{0}' does not exist!")]
    MissingFile(String),
    #[error("Folder '{0}' does not exist!")]
    MissingFolder(String),
    #[error("Error while reading file '{path}': {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("When adding item, title and folder have to be specified")]
    MissingAddFields,
    #[error("When updating item, id has to be specified")]
    MissingUpdateId,
    #[error("{0}")]
    Query(String),
    #[error(transparent)]
    Paging(#[from] PagingError),
    #[error(transparent)]
    Connect(#[from] WorkshopError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("output error: {0}")]
    Io(#[from] std::io::Error),
}

/// Parse the whole argument list (program name excluded).
pub fn parse_command<S: AsRef<str>, W: Write>(
    args: &[S],
    config: &WorkshopConfig,
    out: &mut W,
) -> Result<Command, CliError> {
    let mut options = parse_options(args)?;
    let command = take_command(&mut options)?;
    Command::parse(&command, &options, config, out)
}

/// Run one command line against the local service whose catalog lives at
/// `config.catalog_path`. The catalog is saved afterwards, also when the
/// command failed.
pub fn run<S: AsRef<str>, W: Write>(
    args: &[S],
    config: &WorkshopConfig,
    out: &mut W,
) -> Result<(), CliError> {
    let command = parse_command(args, config, out)?;
    match command {
        Command::Help => return write_help(out),
        Command::HelpTags => return write_standard_tags(config, out),
        _ => {}
    }

    let workshop = LocalWorkshop::open(&config.catalog_path)?
        .with_latency(config.latency_pumps)
        .with_page_size(config.page_size);
    let mut client = WorkshopClient::connect(workshop, config.clone())?;
    debug!(?command, "running command");

    let result = execute(&command, &mut client, out);
    client.close();
    client.transport().save(&config.catalog_path)?;
    result
}
