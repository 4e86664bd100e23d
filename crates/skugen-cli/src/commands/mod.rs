mod generate;
mod models;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub async fn run(cli: &Cli) -> Result<(), CliError> {
    match &cli.command {
        Command::Generate(args) => generate::run(args).await,
        Command::Models(args) => models::run(args),
    }
}
