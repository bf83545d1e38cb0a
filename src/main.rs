//! Saka3D - Headless procedural avatar animation service
//!
//! Main entry point for the CLI application.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use saka3d::{
    animation::Animator,
    avatar::{Scene, TalkMode},
    chat::ChatMessage,
    config::{AvatarConfig, Config},
    web::WebServer,
    AppState,
};

/// Saka3D - Procedural avatar animation service for chat companions
#[derive(Parser, Debug)]
#[command(name = "saka3d", version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Disable HTTP server
    #[arg(long)]
    no_http: bool,

    /// HTTP server port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Animation frame rate (overrides config)
    #[arg(long)]
    fps: Option<u32>,

    /// Send one chat message, print the reply and exit
    #[arg(long)]
    prompt: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(log_level.into())
                .from_env_lossy(),
        )
        .init();

    info!("Starting {} v{}", saka3d::NAME, saka3d::VERSION);

    let runtime = tokio::runtime::Runtime::new()?;

    if let Some(ref prompt) = args.prompt {
        return runtime.block_on(run_prompt(&args, prompt));
    }

    let state = runtime.block_on(async { setup_and_spawn_services(&args).await })?;

    // Headless mode: wait for Ctrl+C / SIGTERM
    runtime.block_on(async {
        shutdown_signal().await;
        info!("Shutdown signal received");
        state.shutdown();

        // Give tasks a moment to clean up
        tokio::time::sleep(Duration::from_millis(500)).await;
    });

    info!("Saka3D stopped");
    Ok(())
}

/// Load configuration and apply CLI overrides
fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = if let Some(ref path) = args.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    if args.no_http {
        config.http.enabled = false;
    }
    if let Some(port) = args.port {
        config.http.port = port;
    }
    if let Some(fps) = args.fps {
        config.render.fps = fps;
    }

    config.validate()?;
    Ok(config)
}

/// Setup config, create AppState, and spawn all background services.
async fn setup_and_spawn_services(args: &Args) -> anyhow::Result<Arc<AppState>> {
    let config = load_config(args)?;

    info!("Chat endpoint: {} ({})", config.chat.base_url, config.chat.model);
    info!("Frame rate: {} fps", config.render.fps);
    info!("HTTP server: {}", config.http.enabled);

    let scene = load_scene(&config.avatar)?;

    // Create shared application state
    let state = AppState::new(config.clone())?;

    // Start animation loop
    let frame_state = Arc::clone(&state);
    tokio::spawn(async move {
        if let Err(e) = run_frame_loop(frame_state, scene).await {
            error!("Frame loop error: {}", e);
        }
    });

    // Start HTTP server if enabled
    if config.http.enabled {
        let http_state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = run_http_server(http_state).await {
                error!("HTTP server error: {}", e);
            }
        });
    } else {
        info!("HTTP server disabled");
    }

    Ok(state)
}

fn load_scene(config: &AvatarConfig) -> anyhow::Result<Scene> {
    match config.rig_path {
        Some(ref path) if path.exists() => {
            info!("Loading rig manifest from {}", path.display());
            Ok(Scene::load_manifest(path)?)
        }
        _ => {
            info!("Using built-in humanoid rig");
            Ok(Scene::humanoid())
        }
    }
}

async fn run_frame_loop(state: Arc<AppState>, mut scene: Scene) -> anyhow::Result<()> {
    let config = state.config.read().await;
    let fps = config.render.fps.max(1);
    let mut animator = Animator::new(&scene, &config.pose, &config.animation);
    drop(config);

    animator.apply_static_pose(&mut scene);

    let mut shutdown_rx = state.subscribe_shutdown();
    let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / fps as f64));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut last_tick = Instant::now();
    let mut last_mode = TalkMode::default();

    info!("Frame loop started at {} fps", fps);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = Instant::now();
                let dt = now.duration_since(last_tick).as_secs_f32();
                last_tick = now;

                let report = animator.update(&mut scene, dt, &state.frame_input());
                if report.mode != last_mode {
                    info!("Talk mode: {} -> {}", last_mode, report.mode);
                    last_mode = report.mode;
                }
                state.publish_frame(report).await;
            }
            _ = shutdown_rx.recv() => {
                info!("Frame loop shutting down");
                break;
            }
        }
    }

    Ok(())
}

async fn run_http_server(state: Arc<AppState>) -> saka3d::Result<()> {
    let http_config = state.config.read().await.http.clone();

    let web_server = WebServer::new(state.clone(), &http_config);

    let listener = web_server.bind().await?;
    info!("HTTP server listening on {}", listener.local_addr()?);

    let mut shutdown_rx = state.subscribe_shutdown();

    web_server
        .serve(listener, async move {
            let _ = shutdown_rx.recv().await;
        })
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

/// One-shot chat: send `prompt`, print the reply
async fn run_prompt(args: &Args, prompt: &str) -> anyhow::Result<()> {
    let config = load_config(args)?;
    let state = AppState::new(config)?;

    let reply = state.send_chat(&[ChatMessage::user(prompt)]).await?;
    println!("{}", reply);
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
