use std::sync::Arc;
use std::time::Duration;

use joylink::codes::{ABS_THROTTLE, ABS_X, ABS_Y};
use joylink::models::extreme_3d_pro::DESCRIPTOR;
use joylink::{
    Enumerator, EnumeratorConfig, Extreme3dPro, Extreme3dProButton, HatInput, VirtualBackend,
};

fn wait_for(sticks: &Extreme3dPro, count: usize) {
    while sticks.connected_count() != count {
        std::thread::sleep(Duration::from_millis(5));
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let backend = VirtualBackend::new();
    let stick = backend.attach(DESCRIPTOR, "demo-stick");

    let enumerator = Arc::new(Enumerator::new(backend.clone(), EnumeratorConfig::default()));
    let sticks = Extreme3dPro::new(Arc::clone(&enumerator));
    sticks.initialize()?;
    let id = sticks.ids()[0];

    stick.set_axis(ABS_X, 768);
    stick.set_axis(ABS_Y, 256);
    stick.set_axis(ABS_THROTTLE, 0);
    stick.set_hat(HatInput::Angle(Some(4500)));
    stick.press_button(Extreme3dProButton::Trigger.code());
    println!("(Virtual) {id}: {:?}", sticks.read(id));

    stick.detach();
    wait_for(&sticks, 0);
    println!("(Virtual) {id} valid after unplug: {}", sticks.is_valid_id(id));

    stick.reattach();
    wait_for(&sticks, 1);
    println!("(Virtual) replugged as {}", sticks.ids()[0]);

    enumerator.shutdown();
    Ok(())
}
