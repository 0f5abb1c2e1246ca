//! patchbay - terminal synth with live modulation routing
//!
//! Run with: cargo run --bin patchbay

mod audio;
mod ui;

use color_eyre::eyre::Result as EyreResult;
use patchbay::{EngineConfig, SynthEngine};
use tracing::Level;

use ui::PatchApp;

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    // The terminal belongs to the UI; only warnings make it to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::WARN)
        .init();

    let device = audio::OutputDevice::open_default()?;
    let config = EngineConfig::default()
        .sample_rate(device.sample_rate())
        .channels(device.channels());
    let (engine, handles) = SynthEngine::new(config)?;
    let _stream = device.start(engine)?;

    let mut terminal = ratatui::init();
    let result = PatchApp::new(handles).run(&mut terminal);
    ratatui::restore();
    result
}
