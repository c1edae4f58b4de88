use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use notion_mdx::output::{is_published, output_file_name, write_page};
use notion_mdx::{Config, Flavor, Severity, parse_page, render_page};

#[derive(Parser)]
#[command(name = "notion-mdx")]
#[command(about = "Convert Notion page JSON to Markdown or MDX with frontmatter")]
struct Cli {
    /// Page JSON files (page object with materialized `children`)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Directory the rendered files are written to
    #[arg(short, long, default_value = "content")]
    output_dir: PathBuf,

    /// Config file (TOML); bundled defaults are used if absent
    #[arg(short, long, default_value = "notion-mdx.toml")]
    config: PathBuf,

    /// Output flavor, overriding the config file
    #[arg(short, long, value_enum)]
    flavor: Option<Flavor>,

    /// Fail when any page has error-severity diagnostics
    #[arg(long)]
    strict: bool,
}

enum Outcome {
    Written(PathBuf),
    Skipped,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(flavor) = cli.flavor {
        config.render.flavor = flavor;
    }

    let mut failed = false;
    for input in &cli.inputs {
        match convert(input, &cli.output_dir, &config, cli.strict) {
            Ok(Outcome::Written(path)) => println!("{}", path.display()),
            Ok(Outcome::Skipped) => {}
            Err(e) => {
                tracing::error!("{}: {e}", input.display());
                failed = true;
            }
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn convert(
    input: &Path,
    output_dir: &Path,
    config: &Config,
    strict: bool,
) -> Result<Outcome, String> {
    let json = fs::read_to_string(input).map_err(|e| format!("cannot read: {e}"))?;
    let page = parse_page(&json).map_err(|e| e.to_string())?;

    if !is_published(&page.properties, &config.output) {
        tracing::info!("{}: not published, skipping", input.display());
        return Ok(Outcome::Skipped);
    }

    let rendered = render_page(&page, config);
    let errors = rendered
        .diagnostics
        .iter()
        .filter(|d| d.severity() == Severity::Error)
        .count();
    if strict && errors > 0 {
        return Err(format!("{errors} error diagnostic(s), not writing"));
    }

    let file_name = output_file_name(&page.properties, &config.output);
    let path = write_page(output_dir, &file_name, &rendered.text).map_err(|e| e.to_string())?;
    tracing::info!(
        diagnostics = rendered.diagnostics.len(),
        "{} -> {}",
        input.display(),
        path.display()
    );
    Ok(Outcome::Written(path))
}
