use clap::Parser;
use tracing_subscriber::EnvFilter;

mod api;
mod apps;
mod cli;
mod commands;
mod exit;
mod jobs;
mod upload;

use cli::RootArgs;
use jobs::CancelToken;

fn main() {
    let args = RootArgs::parse();
    init_tracing(args.command.shared().verbose);

    // Ctrl-C only flips a flag; the poll loop notices it, cancels the remote
    // job once, and the command exits with the aborted code.
    let cancel = CancelToken::new();
    cancel.trip_on_sigint();

    let status = commands::dispatch(args.command, cancel);
    std::process::exit(status.code());
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "aipctl=debug,info" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
