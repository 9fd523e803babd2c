//! Dump what the platform backend sees as JSON.
//!
//! `cargo run --example diagnose [--profiles]`

use joylink::{builtin_profiles, Config, Enumerator};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    if std::env::args().any(|a| a == "--profiles") {
        for profile in builtin_profiles() {
            println!("# {}\n{}", profile.name, profile.to_toml_string()?);
        }
        return Ok(());
    }

    let enumerator = Enumerator::from_config(&Config::default());
    enumerator.start()?;
    println!("{}", enumerator.snapshot().to_json()?);
    for info in enumerator.devices().iter().filter(|d| !d.alive) {
        println!("dormant: {} {} {}", info.id, info.descriptor, info.identity);
    }
    Ok(())
}
