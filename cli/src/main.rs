mod commands;
mod terminal;

use commands::{CommandLine, Commands, craft, modules};

fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    terminal::logging::init();

    match commands.command {
        Commands::Modules => Ok(modules::list()),
        Commands::Craft(args) => craft::craft(&args),
    }
}
