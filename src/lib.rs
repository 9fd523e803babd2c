//! Joylink: hotplug-aware game controller enumeration.
//!
//! An [`Enumerator`] owns one platform backend, assigns every physical controller a stable
//! [`DeviceId`] (reused when the same unit is reconnected, never handed to a different one),
//! caches each device's raw input state, and notifies subscribers when devices come and go.
//!
//! Per-model [`DeviceService`]s sit on top of a shared enumerator, track the ids of their
//! model, and decode cached state into normalized values through a [`ModelProfile`].
//! [`Extreme3dPro`] and [`Xbox360`] are ready-made typed facades over such services.
//!
//! ```no_run
//! use std::sync::Arc;
//! use joylink::{Enumerator, Extreme3dPro};
//!
//! let enumerator = Arc::new(Enumerator::from_config(&Default::default()));
//! let stick = Extreme3dPro::new(Arc::clone(&enumerator));
//! stick.initialize()?;
//! for id in stick.ids() {
//!     println!("{id}: x={:?} pov={:?}", stick.x(id), stick.pov(id));
//! }
//! # Ok::<(), joylink::EnumeratorError>(())
//! ```

pub mod backends;
pub mod codes;
pub mod config;
pub mod decode;
pub mod device;
pub mod enumerator;
pub mod error;
pub mod event;
pub mod eventbus;
pub mod metadata;
pub mod models;
pub mod profile;
pub mod report;
pub mod service;
pub mod snapshot;
pub mod state;

mod table;

pub use backends::virtual_input::{VirtualBackend, VirtualController};
pub use backends::{default_backend, Backend, HotplugEvent};
pub use config::{Config, EnumeratorConfig};
pub use decode::{Compass, Pov};
pub use device::{DeviceDescriptor, DeviceId, DeviceIdentity, Presence, RawDevice, ReadError};
pub use enumerator::Enumerator;
pub use error::{BackendError, ConfigError, EnumeratorError};
pub use event::{ChangeKind, DeviceStateChange, HatInput, RawEvent};
pub use eventbus::SubscriptionId;
pub use metadata::DeviceMeta;
pub use models::{builtin_profiles, Extreme3dPro, Extreme3dProButton, Xbox360, Xbox360Button};
pub use profile::{AxisKind, AxisSpec, ButtonSpec, ModelProfile};
pub use service::DeviceService;
pub use snapshot::{DeviceInfo, Snapshot};
pub use state::CachedState;
