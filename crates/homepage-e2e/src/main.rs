//! End-to-end runner for the personal homepage
//!
//! Runs every scenario sequentially against one site and prints a
//! PASS/FAIL line per scenario.
//!
//! Usage:
//!   `homepage-e2e [OPTIONS] [FILTER]`
//!
//! Environment variables:
//!   HOMEPAGE_BASE_URL  - URL of a running site (used when neither
//!                        --base-url nor --serve is given)
//!   HOMEPAGE_BROWSER   - Page engine: auto, chrome or static
//!   CHROME             - Chrome/Chromium executable
//!   HOMEPAGE_SHOW_LOGS - Print harness logs for passing scenarios too
//!   HOMEPAGE_RETRIES   - Attempts per request on connection reset

use camino::Utf8PathBuf;
use eyre::{Result, eyre};
use homepage_config::SiteData;
use homepage_e2e::runner::{Outcome, ScenarioReport, SiteTarget, run_scenario};
use homepage_e2e::scenarios::{self, Scenario};
use homepage_e2e::{Checklist, Engine, Expectations, TestSite};
use owo_colors::OwoColorize;
use std::panic;
use std::path::PathBuf;
use std::time::Duration;

/// How long a remote site gets to answer before any scenario runs
const STARTUP_TIMEOUT: Duration = Duration::from_secs(30);

struct Args {
    filter: Option<String>,
    list_only: bool,
    fail_fast: bool,
    base_url: Option<String>,
    serve: Option<PathBuf>,
    checklist: Option<Utf8PathBuf>,
    engine: Engine,
}

fn print_help() {
    println!("End-to-end checks for the personal homepage");
    println!();
    println!("Usage: homepage-e2e [OPTIONS] [FILTER]");
    println!();
    println!("Options:");
    println!("  -l, --list             List all scenarios without running them");
    println!("  -f, --filter NAME      Only run scenarios containing NAME");
    println!("      --base-url URL     Check the site running at URL");
    println!("      --serve DIR        Serve DIR locally and check it");
    println!("      --checklist FILE   Read expectations from FILE");
    println!("      --browser ENGINE   Page engine: auto, chrome or static");
    println!("      --fail-fast        Stop at the first failing scenario");
    println!("  -h, --help             Show this help");
    println!();
    println!("Environment variables:");
    println!("  HOMEPAGE_BASE_URL      Site URL when neither --base-url nor --serve is given");
    println!("  HOMEPAGE_SHOW_LOGS     Print harness logs for passing scenarios too");
    println!("  HOMEPAGE_RETRIES       Attempts per request on connection reset");
    println!("  HOMEPAGE_BROWSER       Page engine when --browser is not given");
    println!("  CHROME                 Chrome/Chromium executable");
}

fn parse_args() -> Result<Option<Args>> {
    let mut args = Args {
        filter: None,
        list_only: false,
        fail_fast: false,
        base_url: None,
        serve: None,
        checklist: None,
        engine: Engine::from_env()?,
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .ok_or_else(|| eyre!("{flag} requires a value"))
        };
        match arg.as_str() {
            "--list" | "-l" => args.list_only = true,
            "--fail-fast" => args.fail_fast = true,
            "--filter" | "-f" => args.filter = Some(value(&arg)?),
            "--base-url" => args.base_url = Some(value(&arg)?),
            "--serve" => args.serve = Some(PathBuf::from(value(&arg)?)),
            "--checklist" => args.checklist = Some(Utf8PathBuf::from(value(&arg)?)),
            "--browser" => args.engine = value(&arg)?.parse()?,
            "--help" | "-h" => {
                print_help();
                return Ok(None);
            }
            other if !other.starts_with('-') => args.filter = Some(other.to_string()),
            other => return Err(eyre!("unknown argument: {other}")),
        }
    }

    if args.base_url.is_some() && args.serve.is_some() {
        return Err(eyre!("--base-url and --serve are mutually exclusive"));
    }
    Ok(Some(args))
}

fn selected<'a>(scenarios: &'a [Scenario], filter: Option<&str>) -> Vec<&'a Scenario> {
    scenarios
        .iter()
        .filter(|s| filter.is_none_or(|f| s.full_name().contains(f)))
        .collect()
}

fn show_logs() -> bool {
    std::env::var("HOMEPAGE_SHOW_LOGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn print_report(report: &ScenarioReport) {
    let elapsed = report.elapsed.as_secs_f64();
    let print_logs = match &report.outcome {
        Outcome::Passed => {
            println!("{} ({elapsed:.2}s)", "PASS".green());
            show_logs()
        }
        Outcome::Failed(msg) => {
            println!("{} ({elapsed:.2}s)", "FAIL".red());
            println!("  {}", msg.red());
            if !report.captured.is_empty() {
                println!("  {} ({}):", "Captured errors".yellow(), report.captured.len());
                for error in &report.captured {
                    println!("    {error}");
                }
            }
            true
        }
    };

    if print_logs && !report.logs.is_empty() {
        println!("  {} ({} lines):", "Site logs".yellow(), report.logs.len());
        for line in &report.logs {
            println!("    {line}");
        }
    }
}

fn load_expectations(args: &Args) -> Result<Expectations> {
    let cwd = Utf8PathBuf::try_from(std::env::current_dir()?).map_err(|e| {
        eyre!(
            "Current directory is not valid UTF-8: {}",
            e.as_path().display()
        )
    })?;
    let site = SiteData::discover_from(&cwd)?;
    let checklist = match &args.checklist {
        Some(path) => Checklist::load(path)?,
        None => Checklist::discover_from(&cwd)?,
    };
    Ok(Expectations { site, checklist })
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("homepage_e2e=info".parse()?),
        )
        .init();

    let Some(args) = parse_args()? else {
        return Ok(());
    };

    let all = scenarios::all();
    let scenarios = selected(&all, args.filter.as_deref());

    if args.list_only {
        for scenario in &scenarios {
            println!("{}", scenario.full_name());
        }
        return Ok(());
    }

    let target = match (&args.base_url, &args.serve) {
        (Some(url), _) => SiteTarget::Remote(url.clone()),
        (None, Some(dir)) => SiteTarget::Dir(dir.clone()),
        (None, None) => match std::env::var("HOMEPAGE_BASE_URL") {
            Ok(url) => SiteTarget::Remote(url),
            Err(_) => {
                eprintln!(
                    "{}: no site to check",
                    "error".red().bold()
                );
                eprintln!("  Pass --serve DIR or --base-url URL, or set HOMEPAGE_BASE_URL, e.g.:");
                eprintln!("    export HOMEPAGE_BASE_URL=http://localhost:4321");
                std::process::exit(1);
            }
        },
    };
    let expectations = load_expectations(&args)?;

    if let SiteTarget::Remote(url) = &target {
        let site = TestSite::connect(url)?;
        if let Err(err) = site.wait_until_up("/", STARTUP_TIMEOUT) {
            eprintln!("{}: {url} is not answering: {err}", "error".red().bold());
            std::process::exit(1);
        }
    }

    println!();
    println!(
        "{} {}",
        "Running homepage scenarios...".bold(),
        format!("(browser: {})", args.engine).dimmed()
    );
    println!();

    // Failures are reported below; keep the default hook from printing
    // panics on top of that.
    let prev_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));

    let mut passed = 0;
    let mut failed = 0;
    for scenario in &scenarios {
        print!("{} {} ... ", "test".bold(), scenario.full_name());
        let report = run_scenario(scenario, &target, args.engine, &expectations);
        print_report(&report);
        if report.outcome.is_passed() {
            passed += 1;
        } else {
            failed += 1;
            if args.fail_fast {
                break;
            }
        }
    }

    panic::set_hook(prev_hook);

    let skipped = scenarios.len() - passed - failed;
    println!();
    if failed > 0 {
        println!(
            "Results: {} passed, {} failed, {} skipped",
            passed.to_string().green(),
            failed.to_string().red(),
            skipped.to_string().yellow()
        );
        std::process::exit(1);
    }
    println!(
        "Results: {} passed, {} failed, {} skipped",
        passed.to_string().green(),
        failed,
        skipped.to_string().yellow()
    );
    Ok(())
}
