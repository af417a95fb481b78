use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::Args;
use preclinitrain::config::AppConfig;
use preclinitrain::error::AppError;
use preclinitrain::workflows::{SkillId, UserId};
use serde::Serialize;

use crate::infra::Engine;

#[derive(Args, Debug)]
pub(crate) struct DatasetArgs {
    /// JSON dataset to load (overrides APP_DATA_FILE; demo records when neither is set)
    #[arg(long)]
    pub(crate) data_file: Option<PathBuf>,
    /// Reference instant (RFC 3339, naive timestamp or YYYY-MM-DD). Defaults to now.
    #[arg(long, value_parser = crate::infra::parse_instant_arg)]
    pub(crate) as_of: Option<DateTime<Utc>>,
}

#[derive(Args, Debug)]
pub(crate) struct ComplianceArgs {
    /// User whose continuing-education compliance is reported (repeatable)
    #[arg(long, required = true)]
    pub(crate) user: Vec<u64>,
    #[command(flatten)]
    pub(crate) dataset: DatasetArgs,
}

#[derive(Args, Debug)]
pub(crate) struct RecyclingArgs {
    /// User whose competencies are listed
    #[arg(long)]
    pub(crate) user: u64,
    #[command(flatten)]
    pub(crate) dataset: DatasetArgs,
}

#[derive(Args, Debug)]
pub(crate) struct CompetencyListArgs {
    /// User whose competency rows are listed
    #[arg(long)]
    pub(crate) user: u64,
    #[command(flatten)]
    pub(crate) dataset: DatasetArgs,
}

#[derive(Args, Debug)]
pub(crate) struct TutorArgs {
    /// Skill whose tutors are checked
    #[arg(long)]
    pub(crate) skill: u64,
    /// Restrict the check to one tutor
    #[arg(long)]
    pub(crate) tutor: Option<u64>,
    #[command(flatten)]
    pub(crate) dataset: DatasetArgs,
}

fn load(args: &DatasetArgs) -> Result<(Engine, DateTime<Utc>), AppError> {
    let mut config = AppConfig::load()?;
    if let Some(path) = args.data_file.clone() {
        config.engine.data_file = Some(path);
    }
    let now = args.as_of.unwrap_or_else(Utc::now);
    Ok((Engine::load(&config.engine, now)?, now))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn run_compliance_report(args: ComplianceArgs) -> Result<(), AppError> {
    let (engine, now) = load(&args.dataset)?;
    let users: Vec<UserId> = args.user.into_iter().map(UserId).collect();
    print_json(&engine.training.cohort(&users, now)?)
}

pub(crate) fn run_recycling_report(args: RecyclingArgs) -> Result<(), AppError> {
    let (engine, now) = load(&args.dataset)?;
    print_json(
        &engine
            .competencies
            .recycling_report(UserId(args.user), now)?,
    )
}

pub(crate) fn run_competency_listing(args: CompetencyListArgs) -> Result<(), AppError> {
    let (engine, _) = load(&args.dataset)?;
    print_json(&engine.competencies.competencies_for(UserId(args.user))?)
}

pub(crate) fn run_tutor_report(args: TutorArgs) -> Result<(), AppError> {
    let (engine, now) = load(&args.dataset)?;
    let skill = SkillId(args.skill);
    match args.tutor {
        Some(tutor) => print_json(
            &engine
                .competencies
                .tutor_validity(UserId(tutor), skill, now)?,
        ),
        None => print_json(&engine.competencies.tutor_validity_all(skill, now)?),
    }
}
