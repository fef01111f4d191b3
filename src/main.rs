use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vision_artisan::app::App;
use vision_artisan::diagnostics;
use vision_artisan::models::Config;
use vision_artisan::presets::{self, PERSPECTIVE_OPTIONS, SCENE_OPTIONS};
use vision_artisan::shell;
use vision_artisan::state::Action;

#[derive(Debug, Parser)]
#[command(name = "vision-artisan")]
#[command(about = "Generate four AI variants of a photo from a plain-language request")]
struct CliArgs {
    /// Directory downloads are written to (overrides OUTPUT_DIR).
    #[arg(long, global = true, value_name = "DIR")]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one generation and download every variant.
    Generate(GenerateArgs),
    /// Step through upload, describe and generate from a prompt.
    Interactive,
}

#[derive(Debug, Args)]
struct GenerateArgs {
    /// Image to modify (JPG, PNG or WebP).
    #[arg(long)]
    image: PathBuf,

    /// What to change, in any language.
    #[arg(long)]
    prompt: String,

    /// Perspective preset: number or label.
    #[arg(long, value_parser = parse_perspective)]
    perspective: Option<OptionChoice>,

    /// Scene preset: number or label.
    #[arg(long, value_parser = parse_scene)]
    scene: Option<OptionChoice>,

    /// 0-100, or Subtle / Medium / Strong / Extreme.
    #[arg(long, value_parser = parse_intensity)]
    intensity: Option<u32>,
}

/// A resolved preset; `None` inside means the preset's default.
#[derive(Debug, Clone, PartialEq)]
struct OptionChoice(Option<String>);

fn parse_perspective(input: &str) -> std::result::Result<OptionChoice, String> {
    presets::resolve_option(PERSPECTIVE_OPTIONS, input)
        .map(OptionChoice)
        .ok_or_else(|| format!("Unknown perspective '{}'", input))
}

fn parse_scene(input: &str) -> std::result::Result<OptionChoice, String> {
    presets::resolve_option(SCENE_OPTIONS, input)
        .map(OptionChoice)
        .ok_or_else(|| format!("Unknown scene '{}'", input))
}

fn parse_intensity(input: &str) -> std::result::Result<u32, String> {
    presets::resolve_intensity(input).ok_or_else(|| {
        format!(
            "Invalid intensity '{}'. Expected 0-100 or Subtle/Medium/Strong/Extreme",
            input
        )
    })
}

async fn run_generate(app: &mut App, args: GenerateArgs) -> vision_artisan::Result<bool> {
    app.upload_file(&args.image).await?;
    app.dispatch(Action::SetPrompt(args.prompt));
    if let Some(OptionChoice(value)) = args.perspective {
        app.dispatch(Action::SetPerspective(value));
    }
    if let Some(OptionChoice(value)) = args.scene {
        app.dispatch(Action::SetScene(value));
    }
    if let Some(intensity) = args.intensity {
        app.dispatch(Action::SetIntensity(intensity));
    }

    app.generate()?;
    app.wait_for_generation().await;
    print!("{}", shell::render_state(app.state()));

    if app.state().error.is_some() {
        return Ok(false);
    }
    for path in app.download_all().await? {
        println!("Saved {}", path.display());
    }
    Ok(true)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vision_artisan=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting vision-artisan");

    let args = CliArgs::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    let output_dir = args.output.unwrap_or_else(|| config.output_dir.clone());

    let mut app = match App::new(&config, &output_dir) {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    let outcome = match args.command {
        Command::Generate(generate) => run_generate(&mut app, generate).await,
        Command::Interactive => shell::run_interactive(&mut app).await.map(|_| true),
    };

    match outcome {
        Ok(true) => {
            info!("Done");
            Ok(())
        }
        Ok(false) => {
            error!("Generation failed");
            std::process::exit(1);
        }
        Err(e) => {
            error!("{}", diagnostics::diagnose(&e));
            std::process::exit(1);
        }
    }
}
