//! Command-line surface over the onboarding library.

mod answers;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::config::{save_api_url, Config};
use crate::data::Database;
use crate::error::OnboardingError;
use crate::onboarding::Onboarding;
use crate::persistence::RecoveryReport;
use crate::recovery::RecoveryPlan;
use crate::session::Session;
use crate::util::mask_aadhaar;
use crate::verification::EvidenceImage;
use crate::workflow::{steps, StepKind, STEP_COUNT};

pub use answers::{AadhaarAnswers, Answers, AnswersError, DocumentAnswers, PersonalAnswers};

/// Environment variable read when `--password` is not given
pub const PASSWORD_ENV: &str = "KYC_ONBOARD_PASSWORD";

#[derive(Debug, Parser)]
#[command(name = "kyc-onboard", version, about = "Walk a KYC onboarding flow against a backend")]
pub struct Cli {
    /// Directory for the profile store, config and logs (default ~/.kyc-onboard)
    #[arg(long = "data-dir", value_name = "DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Backend base URL, overriding the config file for this run
    #[arg(long = "api-url", value_name = "URL", global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the onboarding steps.
    Steps,
    /// Log in and report where the saved flow stands.
    Login(Credentials),
    /// Show the saved progress of the current attempt.
    Progress(Credentials),
    /// Reconcile local backups with the backend and report what happened.
    Recover(Credentials),
    /// Show the verification dashboard.
    Dashboard(Credentials),
    /// Complete the flow non-interactively from an answers file.
    Run(RunArgs),
    /// Edit the config file.
    Config(ConfigCli),
}

#[derive(Debug, Args)]
pub struct Credentials {
    #[arg(short, long)]
    pub username: String,

    /// Falls back to $KYC_ONBOARD_PASSWORD
    #[arg(short, long)]
    pub password: Option<String>,
}

impl Credentials {
    fn password(&self) -> Result<String> {
        match &self.password {
            Some(password) => Ok(password.clone()),
            None => std::env::var(PASSWORD_ENV)
                .with_context(|| format!("No password given; pass --password or set {PASSWORD_ENV}")),
        }
    }
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[clap(flatten)]
    pub credentials: Credentials,

    /// Answers file (TOML, or JSON with a .json extension)
    #[arg(long, value_name = "FILE")]
    pub answers: PathBuf,
}

#[derive(Debug, Args)]
pub struct ConfigCli {
    #[command(subcommand)]
    pub action: ConfigSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigSubcommand {
    /// Store the backend base URL in config.toml.
    SetApiUrl {
        #[arg(value_name = "URL")]
        url: String,
    },
}

pub async fn execute(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Command::Steps => {
            print_steps();
            Ok(())
        }
        Command::Login(credentials) => login(&config, &credentials).await,
        Command::Progress(credentials) => progress(&config, &credentials).await,
        Command::Recover(credentials) => recover(&config, &credentials).await,
        Command::Dashboard(credentials) => dashboard(&config, &credentials).await,
        Command::Run(args) => run(&config, &args).await,
        Command::Config(ConfigCli {
            action: ConfigSubcommand::SetApiUrl { url },
        }) => {
            ensure_not_empty(&url)?;
            save_api_url(&url).context("Failed to update config file")?;
            println!("API URL set to {}", url.trim_end_matches('/'));
            Ok(())
        }
    }
}

fn print_steps() {
    for step in steps::definitions() {
        println!("{}. {:<14} {}", step.index + 1, step.name, step.description);
    }
}

fn open_flow(config: &Config) -> Result<Onboarding> {
    let database = Database::open_default().context("Failed to open profile store")?;
    Onboarding::connect(config, &database).context("Failed to create HTTP client")
}

async fn start(config: &Config, credentials: &Credentials) -> Result<(Onboarding, RecoveryReport)> {
    let mut flow = open_flow(config)?;
    let password = credentials.password()?;
    match flow.login(&credentials.username, &password).await {
        Ok(outcome) => Ok((flow, outcome.recovery)),
        Err(err) => Err(report_failure(&flow, err)),
    }
}

async fn login(config: &Config, credentials: &Credentials) -> Result<()> {
    let (flow, report) = start(config, credentials).await?;
    println!("Logged in as {}", credentials.username);
    if report.snapshot.is_some() {
        let step = flow.workflow().current_step().definition;
        println!("Resuming at step {}/{}: {}", step.index + 1, STEP_COUNT, step.name);
    } else {
        println!("No saved progress; starting at step 1");
    }
    Ok(())
}

async fn progress(config: &Config, credentials: &Credentials) -> Result<()> {
    let (flow, _) = start(config, credentials).await?;
    print_session(flow.session(), &flow);
    Ok(())
}

async fn recover(config: &Config, credentials: &Credentials) -> Result<()> {
    let (flow, report) = start(config, credentials).await?;
    println!(
        "Backend: {}",
        if report.remote_reachable { "reachable" } else { "unreachable" }
    );
    for (label, scopes) in [
        ("Restored to backend", &report.pushed),
        ("Discarded as stale", &report.discarded),
        ("Kept for later", &report.retained),
    ] {
        if !scopes.is_empty() {
            let names: Vec<_> = scopes.iter().map(|s| s.as_str()).collect();
            println!("{label}: {}", names.join(", "));
        }
    }
    match &report.snapshot {
        Some(snapshot) => {
            println!("Newest snapshot: version {} saved {}", snapshot.version, snapshot.saved_at);
            print_session(flow.session(), &flow);
        }
        None => println!("No saved progress found"),
    }
    Ok(())
}

async fn dashboard(config: &Config, credentials: &Credentials) -> Result<()> {
    let (mut flow, _) = start(config, credentials).await?;
    let data = match flow.fetch_dashboard().await {
        Ok(data) => data,
        Err(err) => return Err(report_failure(&flow, err)),
    };

    println!("Total attempts:  {}", data.total_kyc_attempts);
    println!("Successful:      {}", data.successful_kyc);
    println!("Failed:          {}", data.failed_kyc);
    println!("Success rate:    {:.1}%", data.success_rate);
    println!("Upload failures: {}", data.upload_failures);
    println!("OTP failures:    {}", data.otp_failures);
    println!("Face mismatches: {}", data.face_mismatch);
    if !data.failure_by_step.is_empty() {
        println!("Failures by step:");
        for (step, count) in &data.failure_by_step {
            println!("  {step:<16} {count}");
        }
    }
    if !data.recent_attempts.is_empty() {
        println!("Recent attempts:");
        for attempt in &data.recent_attempts {
            println!(
                "  {:<20} {:<10} {:<12} {}",
                attempt.full_name, attempt.status, attempt.document_number, attempt.created_at
            );
        }
    }
    Ok(())
}

async fn run(config: &Config, args: &RunArgs) -> Result<()> {
    let answers = Answers::load(&args.answers)?;
    let (mut flow, _) = start(config, &args.credentials).await?;
    match walk(&mut flow, &answers).await {
        Ok(()) => {
            let reference = flow.session().submission_reference.as_deref().unwrap_or("-");
            println!("Application submitted. Reference: {reference}");
            Ok(())
        }
        Err(err) => Err(report_failure(&flow, err)),
    }
}

/// Drive the flow from its current step to Completion.
async fn walk(flow: &mut Onboarding, answers: &Answers) -> Result<(), OnboardingError> {
    // Each pass either advances or fails, so the step count bounds the loop
    for _ in 0..=STEP_COUNT {
        let step = flow.workflow().current_step().definition;
        println!("Step {}/{}: {}", step.index + 1, STEP_COUNT, step.name);

        match step.kind {
            StepKind::Welcome => {}
            StepKind::PersonalInfo => {
                flow.update_personal_info(answers.personal_info.clone().into())
                    .await?;
            }
            StepKind::PanUpload => {
                if flow.session().document_capture.is_none() {
                    let image = load_image(&answers.document.image)?;
                    let capture = flow
                        .scan_document(&answers.document.document_type, image)
                        .await?;
                    println!("  Document read with quality {}", capture.score);
                }
            }
            StepKind::AadhaarOtp => {
                if !flow.session().aadhaar_verification.otp_verified {
                    flow.set_aadhaar_number(&answers.aadhaar.number).await?;
                    if !flow.session().aadhaar_verification.otp_sent {
                        flow.send_otp().await?;
                        println!("  OTP sent to the number linked with {}", mask_aadhaar(&answers.aadhaar.number));
                    }
                    flow.verify_otp(&answers.aadhaar.otp).await?;
                }
            }
            StepKind::FaceMatch => {
                if !flow.session().facial_verification.verified {
                    let face = flow.verify_face(load_image(&answers.selfie)?).await?;
                    println!("  Face matched with confidence {}", face.capture.score);
                }
            }
            StepKind::FinalReview => {
                if answers.check_duplicates && flow.session().duplicate_check.is_none() {
                    let selfie = load_image(&answers.selfie)?;
                    flow.check_duplicates(Some(selfie)).await?;
                }
                flow.submit(answers.consent).await?;
                continue;
            }
            StepKind::Completion => return Ok(()),
        }
        flow.advance().await?;
    }
    Ok(())
}

fn load_image(path: &std::path::Path) -> Result<EvidenceImage, OnboardingError> {
    EvidenceImage::from_path(path).map_err(|e| {
        tracing::warn!(path = %path.display(), error = %e, "Could not load image");
        OnboardingError::from(crate::error::RecoverableError::new(
            crate::error::ErrorKind::RequestError,
            format!("Could not read image {}: {e}", path.display()),
        ))
    })
}

/// Print the recovery plan for a failure and turn it into the command error.
fn report_failure(flow: &Onboarding, err: OnboardingError) -> anyhow::Error {
    if let Some(plan) = flow.active_error() {
        print_plan(plan);
    }
    if let Some(validation) = err.as_validation() {
        for field in validation.field_errors() {
            eprintln!("  - {field}");
        }
    }
    anyhow::Error::new(err)
}

fn print_plan(plan: &RecoveryPlan) {
    eprintln!("{} ({})", plan.message, plan.error.kind);
    for tip in plan.tips {
        eprintln!("  * {tip}");
    }
    let actions: Vec<_> = plan.actions.iter().map(|a| a.label()).collect();
    eprintln!("Options: {}", actions.join(" | "));
}

fn print_session(session: &Session, flow: &Onboarding) {
    let step = flow.workflow().current_step().definition;
    println!("Step:        {}/{} {}", step.index + 1, STEP_COUNT, step.name);

    let info = &session.personal_info;
    let filled = [
        &info.full_name,
        &info.date_of_birth,
        &info.address,
        &info.phone_number,
        &info.email,
    ]
    .iter()
    .filter(|v| !v.trim().is_empty())
    .count();
    println!("Personal:    {filled}/5 fields");

    match &session.document_capture {
        Some(capture) => println!("Document:    {} (quality {})", capture.label, capture.score),
        None => println!("Document:    not captured"),
    }

    let aadhaar = &session.aadhaar_verification;
    let number = if aadhaar.number.is_empty() {
        "-".to_string()
    } else {
        mask_aadhaar(&aadhaar.number)
    };
    println!(
        "Aadhaar:     {number} ({})",
        if aadhaar.otp_verified {
            "verified"
        } else if aadhaar.otp_sent {
            "OTP sent"
        } else {
            "not verified"
        }
    );

    let face = &session.facial_verification;
    println!(
        "Face:        {}",
        if face.verified {
            format!("verified ({})", face.confidence)
        } else {
            "not verified".to_string()
        }
    );
    if let Some(check) = &session.duplicate_check {
        println!(
            "Duplicates:  {}",
            if check.is_duplicate { "duplicate found" } else { "none" }
        );
    }
    if let Some(reference) = &session.submission_reference {
        println!("Reference:   {reference}");
    }
    if flow.is_degraded() {
        println!("Saving locally only (backend unavailable)");
    }
}

fn ensure_not_empty(url: &str) -> Result<()> {
    if url.trim().is_empty() {
        bail!("API URL must not be empty");
    }
    Ok(())
}
