use clap::Parser;
use sortify::cli::{SortArgs, init_tracing, run_sort};
use sortify::output::OutputFormatter;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = SortArgs::parse();
    init_tracing(args.verbose);

    match run_sort(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            OutputFormatter::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}
