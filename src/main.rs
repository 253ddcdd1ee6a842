// robot-scene: an articulated robot in a room, drawn through a scene graph

use std::path::PathBuf;

use clap::Parser;
use winit::event_loop::EventLoop;

use robot_scene::app::Application;
use robot_scene::assets;
use robot_scene::config::Config;
use robot_scene::error::{AppError, RenderError};
use robot_scene::renderer::Renderer;

/// Articulated robot viewer.
///
/// Free camera: W/S/A/D and mouse. Head: Z/X turn, C/V tilt. Torso: I/K walk,
/// J/L turn. Arms: 1-4. Wrists: 5-8. 0 toggles the robot's view, [ and ]
/// change the ambient light, Escape quits.
#[derive(Parser, Debug)]
#[command(name = "robot-scene", version)]
struct Args {
    /// JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding RoomModel.obj, RobotModel.obj and any textures.
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Initial window width in pixels.
    #[arg(long)]
    width: Option<u32>,

    /// Initial window height in pixels.
    #[arg(long)]
    height: Option<u32>,
}

impl Args {
    fn load_config(&self) -> Result<Config, AppError> {
        let mut config = match &self.config {
            Some(path) => {
                log::info!("loading config from {}", path.display());
                Config::load(path)?
            }
            None => Config::default(),
        };
        if let Some(assets) = &self.assets {
            config.asset_dir = assets.clone();
        }
        if let Some(width) = self.width {
            config.window_width = width;
        }
        if let Some(height) = self.height {
            config.window_height = height;
        }
        config.validate()?;
        Ok(config)
    }
}

async fn run(args: Args) -> Result<(), AppError> {
    let config = args.load_config()?;
    let models = assets::load_models(&config)?;
    let app = Application::new(config, models)?;

    let event_loop = EventLoop::new().map_err(|e| RenderError::Window(e.to_string()))?;
    let renderer = Renderer::new(&event_loop, app).await?;
    renderer.run(event_loop)?;
    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run(Args::parse()).await {
        log::error!("{err}");
        std::process::exit(1);
    }
}
