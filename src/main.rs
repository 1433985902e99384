use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use log::info;

use jyuzau::graph::{Attachment, NodeSummary};
use jyuzau::{
    Application, AssetKind, CharacterSelectionState, Core, EngineConfig, SceneViewState,
    SceneWalkState, State,
};

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let mut config = match &options.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(assets) = &options.assets {
        config.assets_root = assets.clone();
    }
    let frames = options.frames;

    let mut core = Core::new(config);
    let location = core
        .context()
        .assets()
        .locate(AssetKind::Scene, &options.scene);
    if !location.path.is_file() {
        bail!(
            "scene `{}` not found at {}",
            options.scene,
            location.path.display()
        );
    }

    let mut viewer = Viewer {
        scene: options.scene.clone(),
        walk: options.walk,
    };
    core.init(&mut viewer)?;
    let attached = core
        .state()
        .and_then(|state| state.base().scene())
        .is_some();
    if !attached {
        core.cleanup();
        bail!("failed to load scene `{}`", options.scene);
    }

    let interval = core.config().frame_interval;
    let mut rendered = 0;
    while rendered < frames && core.render(interval) {
        rendered += 1;
    }
    info!("rendered {rendered} frame(s)");

    let manager = core
        .scene_manager()
        .ok_or_else(|| anyhow!("no scene manager after rendering"))?;
    let nodes = manager.describe();
    println!(
        "Scene {} with {} node(s) after {rendered} frame(s)",
        options.scene,
        nodes.len()
    );
    for node in &nodes {
        print_node(node);
    }
    if let Some(state) = core.state() {
        for actor in state.base().actors() {
            println!("Player {} ({})", actor.id(), actor.name());
        }
    }
    core.cleanup();
    Ok(())
}

fn print_node(node: &NodeSummary) {
    let position = node.world_position;
    let attachments: Vec<String> = node
        .attachments
        .iter()
        .map(|attachment| match attachment {
            Attachment::Entity(entity) => format!("entity {}", entity.name),
            Attachment::Light { name } => format!("light {name}"),
            Attachment::Camera { name } => format!("camera {name}"),
        })
        .collect();
    println!(
        "{:indent$} - {} at ({:.1}, {:.1}, {:.1}){}",
        "",
        node.name,
        position.x,
        position.y,
        position.z,
        if attachments.is_empty() {
            String::new()
        } else {
            format!(" [{}]", attachments.join(", "))
        },
        indent = node.depth * 2
    );
}

/// Shows one scene, either through a free camera or walked by the players.
struct Viewer {
    scene: String,
    walk: bool,
}

impl Application for Viewer {
    fn create_initial_state(&mut self, core: &mut Core) {
        if self.walk {
            let mut walk = SceneWalkState::new(&self.scene);
            let camera_type = core.config().player_camera;
            walk.base_mut().set_player_camera(camera_type);
            core.push_state(Box::new(walk));
            core.push_state(Box::new(CharacterSelectionState::new()));
        } else {
            core.push_state(Box::new(SceneViewState::new(&self.scene)));
        }
    }
}

struct CliOptions {
    scene: String,
    assets: Option<PathBuf>,
    config: Option<PathBuf>,
    frames: u64,
    walk: bool,
}

const USAGE: &str =
    "Usage: jyuzau <scene> [--assets DIR] [--config FILE] [--frames N] [--walk]";

impl CliOptions {
    fn parse() -> Result<Self> {
        let mut args = env::args().skip(1);
        let mut scene = None;
        let mut assets = None;
        let mut config = None;
        let mut frames = 1;
        let mut walk = false;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--assets" => {
                    let dir = args.next().ok_or_else(|| anyhow!("--assets needs a directory"))?;
                    assets = Some(PathBuf::from(dir));
                }
                "--config" => {
                    let file = args.next().ok_or_else(|| anyhow!("--config needs a file"))?;
                    config = Some(PathBuf::from(file));
                }
                "--frames" => {
                    let count = args.next().ok_or_else(|| anyhow!("--frames needs a count"))?;
                    frames = count
                        .parse()
                        .with_context(|| format!("invalid frame count `{count}`"))?;
                }
                "--walk" => walk = true,
                other if other.starts_with("--") => {
                    return Err(anyhow!("Unknown argument: {other}. {USAGE}"));
                }
                other if scene.is_none() => scene = Some(other.to_string()),
                other => return Err(anyhow!("Unexpected argument: {other}. {USAGE}")),
            }
        }
        let Some(scene) = scene else {
            return Err(anyhow!(USAGE));
        };
        Ok(Self {
            scene,
            assets,
            config,
            frames,
            walk,
        })
    }
}
