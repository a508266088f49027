// src/main.rs

use assetpipe::{cli, logging, run};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(status) => std::process::exit(status.code()),
        Err(err) => {
            eprintln!("assetpipe error: {err:?}");
            std::process::exit(2);
        }
    }
}

async fn run_main() -> anyhow::Result<assetpipe::types::ExitStatus> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await
}
