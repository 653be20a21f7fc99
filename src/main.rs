use std::process::ExitCode;

use exshot::cli::{self, ParseOutcome};

async fn run() -> anyhow::Result<ExitCode> {
    let config = match cli::parse_args(std::env::args_os().skip(1))? {
        ParseOutcome::Help(text) => {
            print!("{}", text);
            return Ok(ExitCode::SUCCESS);
        }
        ParseOutcome::Run(config) => config,
    };

    let report = exshot::run(config).await?;

    println!(
        "\nSaved {}/{} screenshots to {}",
        report.succeeded(),
        report.results.len(),
        report.out_dir.display()
    );
    println!("Manifest: {}", report.manifest_path.display());

    Ok(if report.all_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
