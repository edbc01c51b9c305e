use std::process::ExitCode;

use clap::{CommandFactory, Parser, error::ErrorKind};
use env_logger::{Builder, Env};

use cairn::app::handle_start;
use cairn::cli::{Cli, Commands};
use cairn::core::CancelToken;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(64),
            };
        }
    };

    let Cli {
        config,
        log_level,
        command,
    } = cli;

    Builder::from_env(Env::default().default_filter_or(log_level.as_str()))
        .format_timestamp(None)
        .init();

    let command = match command {
        Some(cmd) => cmd,
        None => {
            let mut command = Cli::command();
            let _ = command.print_help();
            println!();
            return ExitCode::from(64);
        }
    };

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    if let Err(err) = ctrlc::set_handler(move || on_interrupt.cancel()) {
        log::warn!("Unable to install the interrupt handler: {err}");
    }

    match command {
        Commands::Start(args) => handle_start(args, config.as_ref(), &cancel),
    }
}
