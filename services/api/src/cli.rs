use crate::infra::evaluate_files;
use crate::server;
use clap::{Args, Parser, Subcommand};
use lead_intake::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Lead Intake API",
    about = "Serve the lead intake API or evaluate a lead against a fund catalog",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print the eligibility result for a lead file against a catalog file
    Evaluate(EvaluateArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    /// Fund catalog document (fundos_criterios.json layout)
    #[arg(long)]
    pub(crate) funds: PathBuf,
    /// Lead JSON as posted by the intake form
    #[arg(long)]
    pub(crate) lead: PathBuf,
    /// Evaluate without running form validation first
    #[arg(long)]
    pub(crate) skip_validation: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Evaluate(args) => {
            let result = evaluate_files(&args.funds, &args.lead, !args.skip_validation)?;
            let rendered = serde_json::to_string_pretty(&result).map_err(std::io::Error::from)?;
            println!("{rendered}");
            Ok(())
        }
    }
}
