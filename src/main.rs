//! `envresolve` command-line entry point.
use anyhow::Result;
use clap::{CommandFactory as _, Parser as _};

use envresolve::{VERSION, cli, commands, logging};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();
    let command = args.command_name();
    logging::init_subscriber(args.verbose, command);
    let log = logging::Logger::new(command);

    match args.command {
        cli::Command::Build(opts) => commands::build::run(&args.global, &opts, &log),
        cli::Command::Check(opts) => commands::check::run(&args.global, &opts, &log),
        cli::Command::Shell(opts) => commands::shell::run(&args.global, &opts, &log),
        cli::Command::Show(opts) => commands::show::run(&args.global, &opts, &log),
        cli::Command::Completions(opts) => {
            clap_complete::generate(
                opts.shell,
                &mut cli::Cli::command(),
                "envresolve",
                &mut std::io::stdout(),
            );
            Ok(())
        }
        cli::Command::Version => commands::emit(&format!("envresolve {VERSION}\n")),
    }
}
