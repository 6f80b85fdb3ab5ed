use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use hatchlight_render::DebugTextRenderer;
use hatchlight_shading::{
    NagaBackend, ShaderBackend, ShaderProgramBinding, ShaderSource, shaders,
};
use hatchlight_stage::{FrameDriver, LifecycleController, LogProgress, StageConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hatchlight-cli", about = "Headless hatchlight stage runner")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Stage config (YAML); built-in defaults when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and the default stage layout
    Info,
    /// Print the effective config as YAML
    Config,
    /// Validate the config and compile every configured program
    Check,
    /// Set up the stage and drive frames on a simulated clock
    Run {
        /// Number of frames to drive
        #[arg(short, long, default_value = "60")]
        frames: u64,
        /// Simulated refresh interval in milliseconds
        #[arg(short, long, default_value = "16.6667")]
        interval: f64,
        /// Print a text frame every N frames (0: last frame only)
        #[arg(long, default_value = "0")]
        every: u64,
        /// Print a JSON summary instead of text frames
        #[arg(long)]
        json: bool,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<StageConfig> {
    let config = match path {
        Some(path) => StageConfig::load(path)?,
        None => StageConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Info => {
            println!("hatchlight-cli v{}", env!("CARGO_PKG_VERSION"));
            println!(
                "program: {} ({} uniforms)",
                shaders::TOON_HATCH_LABEL,
                shaders::toon_hatch_schema().len()
            );
            for node in &config.nodes {
                println!(
                    "node {}: palette={} pos=({:.0}, {:.0}, {:.0}) spin={:.4} rad/s",
                    node.name,
                    node.palette,
                    node.position.x,
                    node.position.y,
                    node.position.z,
                    node.spin.y
                );
            }
        }
        Commands::Config => {
            print!("{}", config.to_yaml()?);
        }
        Commands::Check => {
            let backend = NagaBackend::new();
            let mut sources = vec![shaders::toon_hatch_source()];
            sources.extend(config.shaders.iter().map(|(name, s)| {
                ShaderSource::new(name.as_str(), s.vertex.as_str(), s.fragment.as_str())
            }));
            let mut failed = 0;
            for source in sources {
                let label = source.label.clone();
                let schema = shaders::toon_hatch_schema();
                match pollster::block_on(ShaderProgramBinding::compile(&backend, source, schema)) {
                    Ok(binding) => {
                        println!("{label}: ok ({:?})", binding.compiled().fragment_entry);
                    }
                    Err(err) => {
                        failed += 1;
                        println!("{label}: {err}");
                    }
                }
            }
            if failed > 0 {
                anyhow::bail!("{failed} program(s) failed to compile");
            }
        }
        Commands::Run {
            frames,
            interval,
            every,
            json,
        } => run(config, frames, interval, every, json)?,
    }

    Ok(())
}

fn run(
    config: StageConfig,
    frames: u64,
    interval_ms: f64,
    every: u64,
    json: bool,
) -> anyhow::Result<()> {
    if !(interval_ms.is_finite() && interval_ms >= 0.0) {
        anyhow::bail!("interval must be a non-negative number of milliseconds");
    }
    let driver_config = config.driver;
    let controller =
        LifecycleController::new(NagaBackend::new(), config).with_progress(LogProgress);
    pollster::block_on(controller.initialize())?;

    let mut driver = FrameDriver::new(driver_config);
    let mut renderer = DebugTextRenderer::new();
    let start = Instant::now();
    let step = Duration::from_secs_f64(interval_ms / 1000.0);

    let mut last_frame = String::new();
    for i in 0..frames {
        let now = start + step * u32::try_from(i)?;
        let time = driver.tick_at(&controller, now)?;
        last_frame = controller.render_with(&mut renderer);
        if !json && every > 0 && time.frame % every == 0 {
            print!("{last_frame}");
        }
    }

    if json {
        run_summary(&controller, &driver, &renderer)?;
    } else if every == 0 && !last_frame.is_empty() {
        print!("{last_frame}");
    }

    controller.dispose();
    Ok(())
}

fn run_summary<B: ShaderBackend + 'static>(
    controller: &LifecycleController<B>,
    driver: &FrameDriver,
    renderer: &DebugTextRenderer,
) -> anyhow::Result<()> {
    let scene = controller.scene();
    let nodes: Vec<_> = scene
        .nodes()
        .map(|(id, node)| {
            let r = node.rotation();
            serde_json::json!({
                "id": id.0,
                "name": node.name(),
                "rotation": [r.x, r.y, r.z],
            })
        })
        .collect();
    let summary = serde_json::json!({
        "state": controller.state().to_string(),
        "frames": driver.frame(),
        "elapsed": driver.elapsed(),
        "fps": controller.fps(),
        "uploads": renderer.uploads(),
        "state_hash": format!("{:#018x}", scene.state_hash()),
        "nodes": nodes,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
