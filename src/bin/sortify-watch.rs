use clap::Parser;
use sortify::cli::{WatchArgs, init_tracing, run_watch};
use sortify::output::OutputFormatter;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args = WatchArgs::parse();
    init_tracing(args.verbose);

    match run_watch(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            OutputFormatter::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}
