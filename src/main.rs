use clap::Parser;
use layer_editor::cli;

fn main() -> std::process::ExitCode {
    let args = cli::CliArgs::parse();
    cli::run(args)
}
