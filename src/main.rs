use std::path::PathBuf;

use brickfit::{BrickWorld, EngineConfig, Scene};

const DEMO_SCENE: &str = include_str!("../scenes/wall.toml");

fn main() {
    env_logger::init();

    let config = EngineConfig::load();
    let scene = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => Scene::load(&path),
        None => Scene::from_toml(DEMO_SCENE),
    };
    let scene = match scene {
        Ok(scene) => scene,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };

    let mut world = BrickWorld::new(config);
    if let Err(e) = scene.build(&mut world) {
        log::error!("{e}");
        std::process::exit(1);
    }

    let touched = world.detect_all();
    let links = world.link_count();
    log::info!("{} bricks, {} fields linked, {links} links", world.brick_count(), touched.len());

    let again = world.detect_all();
    if !again.is_empty() || world.link_count() != links {
        log::warn!("second detection pass changed {} fields", again.len());
    }

    for (i, component) in world.connected_components().iter().enumerate() {
        let mut names: Vec<&str> = component
            .iter()
            .filter_map(|&b| world.brick(b).map(|brick| brick.name.as_str()))
            .collect();
        names.sort_unstable();
        log::info!("group {i}: {}", names.join(", "));
    }
}
