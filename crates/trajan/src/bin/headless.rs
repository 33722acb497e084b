//! # Trajan Headless Demo
//!
//! Spawns a grid of spinning, drifting sprites and runs them through the
//! headless renderer. No window, no GPU.
//!
//! ```bash
//! # Defaults: built-in config, 300 frames
//! trajan-headless
//!
//! # Custom config and frame count
//! RUST_LOG=trajan=debug trajan-headless engine.toml 600
//!
//! # Also write plain-text logs to a file, truncated on start
//! trajan-headless --log-file trajan.log engine.toml
//! ```

use std::fs::File;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;

use tracing::{error, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};
use trajan::core::{System, SystemFrame};
use trajan::{
    Engine, EngineConfig, EngineContext, EngineResult, HeadlessPlatform, HeadlessRenderer,
    ShaderDescriptor, Sprite, Transform2D, Vec2, Velocity2D,
};

const GRID: u32 = 10;
const DEFAULT_FRAMES: u64 = 300;
/// Sprites leaving this square re-enter on the opposite side.
const ARENA_HALF_EXTENT: f32 = 20.0;

const FLAT_VERTEX: &str = r"
#version 450
layout(location = 0) in vec3 a_position;
uniform mat4 u_model;
void main() { gl_Position = u_model * vec4(a_position, 1.0); }
";

const FLAT_FRAGMENT: &str = r"
#version 450
out vec4 o_color;
void main() { o_color = vec4(1.0); }
";

/// Keeps sprites inside the arena.
#[derive(Default)]
struct WrapSystem;

impl System<EngineContext> for WrapSystem {
    fn name(&self) -> &'static str {
        "wrap"
    }

    fn update(&mut self, mut frame: SystemFrame<'_, EngineContext>) {
        let wrap = |v: f32| {
            if v.abs() > ARENA_HALF_EXTENT {
                -v.signum() * ARENA_HALF_EXTENT
            } else {
                v
            }
        };
        for &entity in frame.entities {
            if let Ok(transform) = frame.components.get_mut::<Transform2D>(entity) {
                let Vec2 { x, y } = transform.position;
                transform.position = Vec2::new(wrap(x), wrap(y));
            }
        }
    }
}

fn spawn_grid(engine: &mut Engine<HeadlessPlatform>) -> EngineResult<()> {
    let ctx = engine.context_mut();
    let quad = ctx.load_quad()?;
    let shader = ctx.load_shader(
        "flat",
        &ShaderDescriptor {
            vertex_source: FLAT_VERTEX.to_owned(),
            fragment_source: FLAT_FRAGMENT.to_owned(),
        },
    )?;

    let ecs = engine.ecs_mut();
    for row in 0..GRID {
        for col in 0..GRID {
            let x = col as f32 - GRID as f32 / 2.0;
            let y = row as f32 - GRID as f32 / 2.0;

            let e = ecs.create_entity()?;
            ecs.add_component(e, Transform2D::at(Vec2::new(x * 2.0, y * 2.0)))?;
            ecs.add_component(
                e,
                Velocity2D {
                    linear: Vec2::new(y * 0.5, -x * 0.5),
                    angular: 1.0,
                },
            )?;
            ecs.add_component(e, Sprite::new(quad, shader))?;
        }
    }
    info!(sprites = GRID * GRID, "grid spawned");
    Ok(())
}

fn run(args: Vec<String>) -> EngineResult<()> {
    let mut args = args.into_iter();
    let config = match args.next() {
        Some(path) => {
            info!(%path, "loading configuration");
            EngineConfig::load(path)?
        }
        None => EngineConfig::default(),
    };
    let frames = args
        .next()
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(DEFAULT_FRAMES);

    let platform =
        HeadlessPlatform::new(config.window.width, config.window.height).with_frame_limit(frames);
    let mut engine = Engine::with_config(config, platform)?;
    engine.add_system::<WrapSystem, (Transform2D,)>(WrapSystem)?;
    engine.initialize()?;
    spawn_grid(&mut engine)?;

    let completed = engine.run()?;

    let draws = engine
        .context()
        .renderer_as::<HeadlessRenderer>()
        .and_then(HeadlessRenderer::last_frame)
        .map_or(0, |frame| frame.commands.len());
    info!(frames = completed, draws_per_frame = draws, "headless run complete");
    Ok(())
}

/// Removes `flag` and its value from `args`.
fn take_flag(args: &mut Vec<String>, flag: &str) -> Option<String> {
    let at = args.iter().position(|arg| arg == flag)?;
    args.remove(at);
    (at < args.len()).then(|| args.remove(at))
}

/// Console logging, plus a plain-text copy in `log_file` when given.
fn init_logging(log_file: Option<&Path>) -> std::io::Result<()> {
    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path)?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .with(file_layer)
        .init();
    Ok(())
}

fn main() -> ExitCode {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let log_file = take_flag(&mut args, "--log-file");

    if let Err(e) = init_logging(log_file.as_deref().map(Path::new)) {
        eprintln!("trajan-headless: cannot open log file: {e}");
        return ExitCode::FAILURE;
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "trajan-headless failed");
            ExitCode::FAILURE
        }
    }
}
