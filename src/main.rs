//! Strata - declarative ECS stack definitions synthesized to templates

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use strata::config::{Environment, StackConfig};
use strata::stack::StackDefinition;
use strata::synth::{synthesize, OutputFormat};

/// Strata - define an ECS Fargate stack and synthesize its template
#[derive(Parser, Debug)]
#[command(name = "strata", version, about, long_about = None)]
struct Cli {
    /// Print the stack configuration JSON schema and exit
    #[arg(long)]
    schema: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Synthesize a stack into a deployable template (default mode)
    ///
    /// Builds the full resource graph for the selected configuration,
    /// validates it, and renders the template. Nothing is deployed;
    /// deployment is the provider's job.
    Synth(StackArgs),

    /// Validate a stack configuration without rendering anything
    ///
    /// Runs the same declaration pipeline as synth and reports the first
    /// error, so a broken config fails here instead of at deploy time.
    Validate(StackArgs),
}

/// Stack selection arguments shared by synth and validate
#[derive(Parser, Debug)]
struct StackArgs {
    /// Named configuration preset
    ///
    /// One of: baseline, tls, service-discovery, network-only. Ignored when
    /// a config file is given.
    #[arg(long, default_value = "tls", conflicts_with = "config")]
    preset: String,

    /// Path to a YAML stack configuration file
    #[arg(short = 'f', long = "config")]
    config: Option<PathBuf>,

    /// Stack name
    #[arg(long, default_value = "ecs-demo")]
    name: String,

    /// Target account identifier
    #[arg(long, env = "STRATA_ACCOUNT", default_value = "310181001400")]
    account: String,

    /// Target region identifier
    #[arg(long, env = "STRATA_REGION", default_value = "us-west-2")]
    region: String,

    /// Template output format (json or yaml)
    #[arg(long, default_value = "json")]
    format: String,

    /// Write the template to a file instead of stdout
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,
}

impl StackArgs {
    fn load_config(&self) -> anyhow::Result<StackConfig> {
        match &self.config {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .map_err(|e| anyhow::anyhow!("Failed to read config file {:?}: {}", path, e))?;
                serde_yaml::from_str(&content)
                    .map_err(|e| anyhow::anyhow!("Failed to parse stack config: {}", e))
            }
            None => Ok(StackConfig::preset(&self.preset)?),
        }
    }

    fn define(&self) -> anyhow::Result<StackDefinition> {
        let config = self.load_config()?;
        let environment = Environment::new(&self.account, &self.region);
        Ok(StackDefinition::new(&self.name, environment, config)?)
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.schema {
        let schema = schemars::schema_for!(StackConfig);
        let rendered = serde_json::to_string_pretty(&schema)
            .map_err(|e| anyhow::anyhow!("Failed to serialize schema: {}", e))?;
        println!("{rendered}");
        return Ok(());
    }

    match cli.command {
        Some(Commands::Validate(args)) => run_validate(args),
        Some(Commands::Synth(args)) => run_synth(args),
        None => run_synth(StackArgs::parse_from(["strata"])),
    }
}

/// Validate a configuration end to end without rendering
fn run_validate(args: StackArgs) -> anyhow::Result<()> {
    let stack = args.define()?;
    stack.graph().validate()?;
    println!(
        "{}: valid ({} resources, {} outputs)",
        stack.name(),
        stack.graph().len(),
        stack.graph().outputs().count()
    );
    Ok(())
}

/// Synthesize and render a template
fn run_synth(args: StackArgs) -> anyhow::Result<()> {
    let stack = args.define()?;
    let format: OutputFormat = args.format.parse()?;
    let template = synthesize(&stack)?;
    let rendered = template.render(format)?;

    match &args.output {
        Some(path) => {
            let mut file = std::fs::File::create(path)
                .map_err(|e| anyhow::anyhow!("Failed to create {:?}: {}", path, e))?;
            file.write_all(rendered.as_bytes())
                .map_err(|e| anyhow::anyhow!("Failed to write {:?}: {}", path, e))?;
            tracing::info!(path = %path.display(), "template written");
        }
        None => println!("{rendered}"),
    }
    Ok(())
}
