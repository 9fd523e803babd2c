//! Print live controller state.
//!
//! `cargo run --example watch [config.toml]`

use std::sync::Arc;
use std::time::Duration;

use joylink::{ChangeKind, Config, Enumerator, Extreme3dPro, Xbox360};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_path(path)?,
        None => Config::default(),
    };
    let enumerator = Arc::new(Enumerator::from_config(&config));
    enumerator.subscribe(|change| match change.kind {
        ChangeKind::Added => info!(id = %change.id, descriptor = %change.descriptor, "connected"),
        ChangeKind::Removed => info!(id = %change.id, descriptor = %change.descriptor, "disconnected"),
    });

    let sticks = Extreme3dPro::new(Arc::clone(&enumerator));
    let pads = Xbox360::new(Arc::clone(&enumerator));
    sticks.initialize()?;
    pads.initialize()?;

    loop {
        for id in sticks.ids() {
            if let Some(state) = sticks.read(id) {
                println!(
                    "stick {id}: x={:4} y={:4} twist={:4} slider={:3} pov={}",
                    state.x, state.y, state.z_rot, state.slider, state.pov
                );
            }
        }
        for id in pads.ids() {
            if let Some(state) = pads.read(id) {
                println!(
                    "pad {id}: left=({:4},{:4}) right=({:4},{:4}) lt={:3} rt={:3} dpad={}",
                    state.left_x,
                    state.left_y,
                    state.right_x,
                    state.right_y,
                    state.left_trigger,
                    state.right_trigger,
                    state.dpad
                );
            }
        }
        std::thread::sleep(Duration::from_millis(250));
    }
}
