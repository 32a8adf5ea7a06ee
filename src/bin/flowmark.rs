use clap::{Parser, Subcommand};
use flowmark::loader::load_workflow;
use flowmark::markup::MarkupFormat;
use flowmark::properties::PropertyLoader;
use flowmark::WorkflowManager;
use std::path::PathBuf;
use anyhow::{bail, Context, Result};
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a workflow document between JSON and YAML
    Convert {
        /// Path to the workflow markup (JSON or YAML)
        #[arg(long, short)]
        file: PathBuf,

        /// Output syntax
        #[arg(long, default_value = "yaml")]
        to: MarkupFormat,

        /// Property file used to resolve ${name} placeholders
        #[arg(long, short)]
        properties: Option<PathBuf>,

        /// Property overrides (key=value)
        #[arg(long = "define", short = 'D', value_parser = parse_key_val)]
        defines: Vec<(String, String)>,
    },

    /// Validate a workflow document and list every issue found
    Validate {
        /// Path to the workflow markup (JSON or YAML)
        #[arg(long, short)]
        file: PathBuf,

        /// Property file used to resolve ${name} placeholders
        #[arg(long, short)]
        properties: Option<PathBuf>,

        /// Property overrides (key=value)
        #[arg(long = "define", short = 'D', value_parser = parse_key_val)]
        defines: Vec<(String, String)>,
    },
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=value: no `=` found in `{}`", s))?;
    Ok((key.to_string(), value.to_string()))
}

fn build_manager(properties: Option<PathBuf>, defines: Vec<(String, String)>) -> Result<WorkflowManager> {
    let mut loader = PropertyLoader::new().with_environment();
    if let Some(path) = properties {
        loader = loader.with_file(path);
    }
    for (key, value) in &defines {
        loader = loader
            .with_override(key, value)
            .with_context(|| format!("Invalid property override {}={}", key, value))?;
    }
    let source = loader.build().context("Failed to load properties")?;
    Ok(WorkflowManager::new().with_property_source(source))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Convert { file, to, properties, defines } => {
            let mut manager = build_manager(properties, defines)?;
            let report = load_workflow(&mut manager, &file)?;
            if !report.is_valid() {
                info!(issues = report.issues.len(), "Converting a workflow with validation issues");
            }
            let markup = manager.to_markup(to)?;
            print!("{}", markup);
            if !markup.ends_with('\n') {
                println!();
            }
        }

        Commands::Validate { file, properties, defines } => {
            let mut manager = build_manager(properties, defines)?;
            let report = load_workflow(&mut manager, &file)?;
            if report.is_valid() {
                println!("{}: valid", file.display());
            } else {
                for issue in &report.issues {
                    println!("{}", issue);
                }
                bail!("{} has {} validation issue(s)", file.display(), report.issues.len());
            }
        }
    }

    Ok(())
}
