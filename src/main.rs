mod cli;
mod commands;
mod config;
mod constants;
mod git;
mod github;
mod infer;
mod link;
mod logging;
mod process;
mod prune;
mod remote;
mod resolve;
mod tmux;
mod ui;


use anyhow::Result;
use clap::Parser;
use cli::Cli;

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.global.verbose);
    commands::run(cli)
}
