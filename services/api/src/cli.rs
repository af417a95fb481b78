use crate::demo::{run_demo, DemoArgs};
use crate::reports::{
    run_competency_listing, run_compliance_report, run_recycling_report, run_tutor_report,
    CompetencyListArgs, ComplianceArgs, RecyclingArgs, TutorArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use preclinitrain::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "preclinitrain",
    about = "Competency validity and continuing-education compliance for lab personnel",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the read-only HTTP service (default command)
    Serve(ServeArgs),
    /// Print continuing-education compliance snapshots for one or more users
    Compliance(ComplianceArgs),
    /// Print a user's stored competency rows
    Competencies(CompetencyListArgs),
    /// Print a user's competencies ordered by recycling due date
    Recycling(RecyclingArgs),
    /// Check whether a skill's tutors are still current
    Tutors(TutorArgs),
    /// Run an end-to-end demo over a generated roster
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Override the configured JSON dataset
    #[arg(long)]
    pub(crate) data_file: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Compliance(args) => run_compliance_report(args),
        Command::Competencies(args) => run_competency_listing(args),
        Command::Recycling(args) => run_recycling_report(args),
        Command::Tutors(args) => run_tutor_report(args),
        Command::Demo(args) => run_demo(args),
    }
}
