//! Print the homepage header/footer data as JSON for the renderer.
//!
//! Usage:
//!   `homepage-config [OPTIONS] [FILE]`
//!
//! Without FILE, `.config/homepage.yaml` is looked up from the current
//! directory upwards, and the built-in data is used when none exists.

use camino::Utf8PathBuf;
use eyre::{Result, eyre};
use homepage_config::SiteData;
use owo_colors::OwoColorize;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("homepage_config=info".parse()?),
        )
        .init();

    let mut check_only = false;
    let mut file: Option<Utf8PathBuf> = None;

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--check" | "-c" => check_only = true,
            "--help" | "-h" => {
                println!("Print the homepage site data as JSON");
                println!();
                println!("Usage: homepage-config [OPTIONS] [FILE]");
                println!();
                println!("Options:");
                println!("  -c, --check   Validate only, print nothing on success");
                println!("  -h, --help    Show this help");
                return Ok(());
            }
            other if !other.starts_with('-') => file = Some(Utf8PathBuf::from(other)),
            other => return Err(eyre!("unknown argument: {other}")),
        }
    }

    let data = match &file {
        Some(path) => SiteData::load(path)?,
        None => {
            let cwd = Utf8PathBuf::try_from(std::env::current_dir()?).map_err(|e| {
                eyre!(
                    "Current directory is not valid UTF-8: {}",
                    e.as_path().display()
                )
            })?;
            SiteData::discover_from(&cwd)?
        }
    };

    if check_only {
        eprintln!(
            "{} {} header links, {} footer groups",
            "ok".green().bold(),
            data.header.links.len(),
            data.footer.links.len()
        );
        return Ok(());
    }

    println!("{}", data.to_json_pretty()?);
    Ok(())
}
