use book_shuffler_lib::logger::{level_from_flags, setup_logging};
use book_shuffler_lib::Cli;
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(level_from_flags(cli.verbose, cli.quiet));

    match book_shuffler_lib::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ 错误: {}", e);
            ExitCode::FAILURE
        }
    }
}
