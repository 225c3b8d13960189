mod cli;

use std::process::ExitCode;

use anki_vocab::console::open_console;
use clap::Parser;
use log::LevelFilter;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new().filter_level(level).parse_default_env().init();
}

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    init_logging(cli.verbose);

    let mut console = open_console();
    match cli::run(cli.command, console.as_mut()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::debug!("Exiting with {:?}", e);
            console.report(&format!("Error: {}", e));
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
