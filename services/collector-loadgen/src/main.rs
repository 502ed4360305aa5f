mod cli;
mod generator;
mod worker;

use anyhow::Context;
use tracing::info;

use crate::cli::{Command, HELP, LoadArgs, parse_args};

fn main() {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(Command::Run(args)) => args,
        Ok(Command::Version) => {
            println!("collector-loadgen {}", env!("CARGO_PKG_VERSION"));
            return;
        }
        Ok(Command::Help) => {
            println!("{HELP}");
            return;
        }
        Err(message) => {
            eprintln!("error: {message}\n\n{HELP}");
            std::process::exit(2);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let result = tokio::runtime::Runtime::new()
        .context("start tokio runtime")
        .map(|runtime| runtime.block_on(run(args)));
    if let Err(err) = result {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

async fn run(args: LoadArgs) {
    println!(
        "Starting load test against {} with target {} RPS for {} seconds using {} workers.",
        args.url,
        args.rps,
        args.duration.as_secs(),
        args.concurrency
    );

    let report = worker::run_load(&args).await;
    info!("workers stopped after {:?}", report.elapsed);

    println!("Load test finished in {:?}", report.elapsed);
    println!("Total requests sent: {}", report.sent);
    println!("Measured RPS: {:.2}", report.measured_rps());
}
