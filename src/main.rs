use fell_ngin::{config::SceneConfig, flow, scene::Forest};

/// Walk the forest; click a tree to fell it.
///
/// Usage: `forest [scene.toml]`. Without an argument the stock scene is used.
fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => SceneConfig::load(path)?,
        None => SceneConfig::default(),
    };
    let window = config.window.clone();
    flow::run(window, vec![Forest::constructor(config)])
}
