#[cfg(not(target_arch = "wasm32"))]
use clap::Parser;

#[cfg(not(target_arch = "wasm32"))]
#[derive(Parser)]
#[command(name = "model-viewer")]
#[command(about = "Orbit around a glTF model lit by a shadow-casting spot light")]
struct Cli {
    /// Directory the entry file and its buffers/images are resolved against
    #[arg(long, default_value = "assets/model/")]
    base_path: String,

    /// glTF (.gltf or .glb) file inside the base path
    #[arg(long, default_value = "scene.gltf")]
    entry: String,

    /// Log at debug level (RUST_LOG still takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = model_viewer::ViewerConfig::default();
    config.asset.base_path = cli.base_path;
    config.asset.entry = cli.entry;
    if cli.verbose {
        config.log_level = log::LevelFilter::Debug;
    }
    model_viewer::run(config)
}

// The web build starts through the library's `#[wasm_bindgen(start)]` entry.
#[cfg(target_arch = "wasm32")]
fn main() {}
