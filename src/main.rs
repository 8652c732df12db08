use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use prose_humanizer::{
    load_config, load_config_file, Emotion, HumanizeRequest, HumanizeResponse, Humanizer,
    HumanizerConfig, Mode, NoopObserver,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(
    name = "humanize",
    about = "Rewrite AI-generated prose into casual, human-sounding text",
    version
)]
struct Cli {
    /// File paths to rewrite (reads stdin if none provided)
    files: Vec<PathBuf>,

    /// Rewrite intensity
    #[arg(short, long, value_enum)]
    mode: Option<Mode>,

    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Treat each file (or each stdin line) as a separate item
    #[arg(long)]
    batch: bool,

    /// Extra emotional tone to apply
    #[arg(long, value_enum)]
    emotion: Option<Emotion>,

    /// Occasionally prefix a sentence with a first-person aside
    #[arg(long)]
    personal_touch: bool,

    /// Print JSON instead of plain text
    #[arg(long)]
    json: bool,

    /// Config file (defaults to ./humanizer.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn read_inputs(cli: &Cli) -> Result<Vec<String>> {
    if cli.files.is_empty() {
        let mut input = String::new();
        std::io::stdin()
            .read_to_string(&mut input)
            .context("Failed to read stdin")?;
        if cli.batch {
            return Ok(input.lines().map(str::to_string).collect());
        }
        return Ok(vec![input]);
    }
    cli.files
        .iter()
        .map(|path| {
            std::fs::read_to_string(path).with_context(|| format!("Error reading {}", path.display()))
        })
        .collect()
}

/// Request options shared by every input; the text is filled in per item.
fn request_template(cli: &Cli, config: &HumanizerConfig, mode: Mode) -> HumanizeRequest {
    let mut request = HumanizeRequest::new(String::new(), mode)
        .with_personal_touch(cli.personal_touch || config.personal_touch);
    if let Some(emotion) = cli.emotion.or(config.emotion) {
        request = request.with_emotion(emotion);
    }
    request
}

fn print_response(response: &HumanizeResponse, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(response)?);
    } else {
        println!("{}", response.text);
        if let Some(analysis) = &response.analysis {
            eprintln!(
                "perplexity {:.2} | burstiness {:.2} | readability {:.1} | context {}",
                analysis.perplexity, analysis.burstiness, analysis.readability, analysis.context
            );
        }
        if let Some(failure) = &response.failure {
            eprintln!("warning: {failure}");
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config_file(path)?,
        None => load_config(&std::env::current_dir()?)?,
    };
    let humanizer: Humanizer = config.build()?;

    let mode = cli.mode.unwrap_or(config.mode);
    let mut rng = match cli.seed.or(config.seed) {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };

    let inputs = read_inputs(&cli)?;
    let template = request_template(&cli, &config, mode);

    if cli.batch {
        let outputs = humanizer.run_batch_observed(&inputs, &template, &mut rng, &mut NoopObserver)?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&outputs)?);
        } else {
            for line in outputs {
                println!("{line}");
            }
        }
        return Ok(());
    }

    for text in inputs {
        let request = HumanizeRequest {
            text,
            ..template.clone()
        };
        let response = humanizer.humanize(&request, &mut rng)?;
        print_response(&response, cli.json)?;
    }
    Ok(())
}
