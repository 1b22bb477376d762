use clap::Parser;

use docsift_lib::cli::Command;

#[derive(Parser, Debug)]
#[command(name = "docsift")]
#[command(about = "Heuristic text extraction for uploaded documents")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

fn main() {
    let args = Args::parse();
    docsift_lib::init_logging(&["docsift=info", "docsift_lib=info", "docsift_core=info"]);

    if let Err(e) = docsift_lib::cli::run(args.command.unwrap_or(Command::Serve)) {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}
