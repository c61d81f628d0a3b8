use clap::ArgMatches;
use clinickit_core::annotate::{AnnotateOptions, DEFAULT_AUTH_MODULE};
use clinickit_core::imports::ImportStatus;
use clinickit_core::report::generate_run_report;
use clinickit_core::run::RunProgressCallback;
use clinickit_core::{
    AnnotateError, FileOutcome, HandleStatus, ModuleMap, RunOptions, RunSummary, annotate_tree,
};
use clinickit_smoke::{
    ApiClient, Session, StepCallback, Suite, SuiteContext, check_menu, generate_menu_report,
    generate_smoke_report, run_exams, run_modules, run_system,
};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use url::Url;

/// Where the page components live, relative to the repository root
pub const DEFAULT_PAGES_ROOT: &str = "frontend/src/pages";

pub fn print_banner() {
    println!(
        "{} {}",
        "clinickit".bright_cyan().bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
    println!();
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_prompt(msg: &str) -> io::Result<String> {
    print!("{} ", msg.bright_cyan().bold());
    io::stdout().flush()?;
    let mut response = String::new();
    io::stdin().read_line(&mut response)?;
    Ok(response.trim().to_string())
}

/// Log level for the number of `-v` flags
pub fn verbosity_level(count: u8) -> Level {
    match count {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

pub fn init_tracing(verbosity: u8) {
    tracing_subscriber::fmt()
        .with_max_level(verbosity_level(verbosity))
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Expand `~` in a path argument
pub fn resolve_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

/// The module map from `map_file`, or the built-in one
pub fn load_module_map(map_file: Option<&Path>) -> Result<ModuleMap, AnnotateError> {
    match map_file {
        Some(path) => ModuleMap::load(&resolve_path(&path.to_string_lossy())),
        None => Ok(ModuleMap::default()),
    }
}

/// Short notes on what happened to one page, in the order the passes run
pub fn outcome_details(outcome: &FileOutcome) -> Vec<String> {
    let mut details = Vec::new();

    match outcome.import {
        ImportStatus::Added => details.push("import added".to_string()),
        ImportStatus::Merged => details.push("import merged".to_string()),
        ImportStatus::Present => {}
    }

    match outcome.handle {
        HandleStatus::Inserted => details.push("permission handle added".to_string()),
        HandleStatus::MissingAnchor => details.push("no useNavigate() line".to_string()),
        HandleStatus::Present => {}
    }

    let gated = outcome.gated;
    if gated.total() > 0 {
        details.push(format!(
            "{} gated (create {}, edit {}, delete {})",
            gated.total(),
            gated.create,
            gated.edit,
            gated.delete
        ));
    }

    if outcome.already_gated.total() > 0 {
        details.push(format!("{} already gated", outcome.already_gated.total()));
    }

    details
}

fn print_outcome(outcome: &FileOutcome, dry_run: bool) {
    let marker = match (outcome.changed, dry_run) {
        (true, false) => "✓".green().bold(),
        (true, true) => "→".blue().bold(),
        (false, _) => "·".bright_black(),
    };

    let details = outcome_details(outcome);
    let suffix = if details.is_empty() {
        "no changes needed".to_string()
    } else {
        details.join(", ")
    };

    let suffix = if outcome.handle == HandleStatus::MissingAnchor {
        suffix.yellow()
    } else {
        suffix.bright_black()
    };

    println!(
        "{} {} {}",
        marker,
        outcome.path.display().to_string().bright_white(),
        suffix
    );
}

/// Annotate every mapped page under `root`
pub fn run_annotate(
    root: &Path,
    map: &ModuleMap,
    auth_module: &str,
    dry_run: bool,
    progress: Option<RunProgressCallback>,
) -> Result<RunSummary, AnnotateError> {
    let options = RunOptions {
        annotate: AnnotateOptions {
            auth_module: auth_module.to_string(),
        },
        dry_run,
    };
    annotate_tree(root, map, &options, progress)
}

pub fn handle_annotate(args: &ArgMatches, quiet: bool) {
    let root = resolve_path(
        args.get_one::<String>("ROOT")
            .map(String::as_str)
            .unwrap_or(DEFAULT_PAGES_ROOT),
    );
    let auth_module = args
        .get_one::<String>("auth-module")
        .map(String::as_str)
        .unwrap_or(DEFAULT_AUTH_MODULE);
    let dry_run = args.get_flag("dry-run");

    if !root.is_dir() {
        eprintln!("✗ Pages directory not found: {}", root.display());
        std::process::exit(1);
    }

    let map = match load_module_map(args.get_one::<PathBuf>("map").map(PathBuf::as_path)) {
        Ok(map) => map,
        Err(e) => {
            eprintln!("✗ {}", e);
            std::process::exit(1);
        }
    };

    if !quiet {
        print_divider();
        println!("{}", "  PERMISSION ANNOTATION".bright_white().bold());
        print_divider();
        println!(
            "{} Pages: {}",
            "→".blue(),
            root.display().to_string().bright_white()
        );
        println!("{} Modules mapped: {}", "→".blue(), map.len());
        if dry_run {
            println!("{} Dry run, no files will be written", "⚠".yellow().bold());
        }
        println!();
    }

    let progress: RunProgressCallback = Arc::new(move |outcome: &FileOutcome| {
        if !quiet || outcome.changed {
            print_outcome(outcome, dry_run);
        }
    });

    let summary = match run_annotate(&root, &map, auth_module, dry_run, Some(progress)) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("✗ {}", e);
            std::process::exit(1);
        }
    };

    println!();
    print!("{}", generate_run_report(&summary, dry_run));
}

/// Email and password from the arguments, prompting for whatever is missing
pub fn credentials(args: &ArgMatches) -> io::Result<(String, String)> {
    let email = match args.get_one::<String>("email") {
        Some(email) => email.clone(),
        None => print_prompt("Email:")?,
    };
    let password = match args.get_one::<String>("password") {
        Some(password) => password.clone(),
        None => print_prompt("Password:")?,
    };
    Ok((email, password))
}

fn login_summary(session: &Session) -> String {
    let mut line = format!("Logged in as {} (ID: {}", session.user.name, session.user.id);
    if let Some(role) = &session.user.role {
        line.push_str(&format!(", role: {}", role));
    }
    match (&session.tenant, session.user.tenant_id) {
        (Some(tenant), _) => line.push_str(&format!(", tenant: {}", tenant.name)),
        (None, Some(tenant_id)) => line.push_str(&format!(", tenant: {}", tenant_id)),
        (None, None) => {}
    }
    line.push(')');
    line
}

pub async fn handle_smoke(suite_name: &str, args: &ArgMatches) {
    let Some(suite) = Suite::from_name(suite_name) else {
        unreachable!("clap should ensure we don't get here");
    };

    let Some(api_url) = args.get_one::<Url>("api-url") else {
        eprintln!("✗ --api-url is required");
        std::process::exit(1);
    };
    let timeout = *args.get_one::<u64>("timeout").unwrap_or(&30);

    let (email, password) = match credentials(args) {
        Ok(credentials) => credentials,
        Err(e) => {
            eprintln!("✗ Could not read credentials: {}", e);
            std::process::exit(1);
        }
    };

    let mut client = match ApiClient::with_timeout(api_url.as_str(), timeout) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("✗ {}", e);
            std::process::exit(1);
        }
    };

    print_divider();
    println!(
        "{}",
        format!("  {}", suite.title().to_uppercase()).bright_white().bold()
    );
    print_divider();

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!("Logging in to {}", client.base_url()));

    let session = match client.login(&email, &password).await {
        Ok(session) => session,
        Err(e) => {
            spinner.finish_and_clear();
            eprintln!("✗ {}", e);
            std::process::exit(1);
        }
    };
    spinner.println(format!("{} {}", "✓".green().bold(), login_summary(&session)));

    let step_spinner = spinner.clone();
    let callback: StepCallback = Arc::new(move |step: &str| {
        step_spinner.set_message(format!("Testing {}", step));
    });
    let ctx = SuiteContext::new(&client, &session).with_progress_callback(callback);

    let report = match suite {
        Suite::Modules => run_modules(&ctx).await,
        Suite::System => run_system(&ctx).await,
        Suite::Exams => {
            let patient_id = *args.get_one::<i64>("patient-id").unwrap_or(&1);
            run_exams(&ctx, patient_id).await
        }
        Suite::Menu => {
            spinner.finish_and_clear();
            match check_menu(&session.token, session.user.role.as_deref()) {
                Ok(check) => {
                    println!();
                    print!("{}", generate_menu_report(&check));
                }
                Err(e) => {
                    eprintln!("✗ {}", e);
                    std::process::exit(1);
                }
            }
            return;
        }
    };

    spinner.finish_and_clear();

    let marker = if report.is_clean() {
        "✓".green().bold()
    } else {
        "⚠".yellow().bold()
    };
    println!("\n{} {} complete!\n", marker, suite.title());
    print!("{}", generate_smoke_report(suite.title(), &report));
}
