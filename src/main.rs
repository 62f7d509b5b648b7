//! Iris overlay application: live iris recoloring on a webcam feed.

use anyhow::{Context, Result};
use clap::Parser;
use iris_overlay::{app::OverlayApp, color::Tint, config::Config};
use log::info;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Camera index to use
    #[arg(long)]
    cam: Option<i32>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Iris texture image
    #[arg(short, long)]
    texture: Option<PathBuf>,

    /// Initial tint (#rrggbb, #rgb, r,g,b or rgb(r,g,b))
    #[arg(long)]
    tint: Option<Tint>,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Draw eyelid and iris contours
    #[arg(long)]
    debug_contours: bool,

    /// Start the camera immediately
    #[arg(long)]
    autostart: bool,

    /// Mirror the camera image
    #[arg(long)]
    flip: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logger
    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    info!("Iris Overlay v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Config::from_file(path).with_context(|| format!("loading {}", path.display()))?
        }
        None => Config::default(),
    };

    // Command line overrides
    if let Some(cam) = args.cam {
        config.camera.device_index = cam;
    }
    if args.flip {
        config.camera.mirror = true;
    }
    if let Some(texture) = args.texture {
        config.render.texture = Some(texture);
    }
    if args.debug_contours {
        config.render.debug_contours = true;
    }
    if let Some(tint) = args.tint {
        let spec = tint.to_string();
        let index = config.tints.palette.iter().position(|s| Tint::parse(s).ok() == Some(tint));
        config.tints.selected = index.unwrap_or_else(|| {
            config.tints.palette.push(spec);
            config.tints.palette.len() - 1
        });
    }

    config.validate().context("invalid configuration")?;
    config.validate_assets().context("missing model files")?;

    let mut app = OverlayApp::new(&config)?;
    if args.autostart {
        app.toggle()?;
    }
    app.run()?;

    Ok(())
}
