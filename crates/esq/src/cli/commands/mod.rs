//! Command implementations and dispatch.

pub mod build;
pub mod check;
pub mod config;
pub mod init;
pub mod map;

use std::process::ExitCode;

use super::{args::Commands, context::CommandContext};

/// Dispatches to the selected subcommand.
pub fn run(command: Commands, ctx: &CommandContext) -> ExitCode {
    match command {
        Commands::Build(cmd) => build::run(ctx, &cmd),
        Commands::Map(cmd) => map::run(ctx, &cmd),
        Commands::Init(cmd) => init::run(ctx, &cmd),
        Commands::Check => check::run(ctx),
        Commands::Config => config::run(ctx),
    }
}
