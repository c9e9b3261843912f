pub mod adb;
pub mod channel;
pub mod connection;
pub mod control;
pub mod ecp;
mod error;
pub mod keymap;
pub mod preview;
pub mod router;
pub mod selection;
pub mod settings;
pub mod transport;

pub use crate::connection::{AdbSession, ConnectionManager};
pub use crate::control::ControlSurface;
pub use crate::error::{Error, Result};
pub use crate::keymap::{KeyEvent, KeyPhase, KeyStroke, Keymap, Modifiers, Platform};
pub use crate::router::{CommandRouter, Delivery, DropReason};
pub use crate::selection::DeviceSelection;
pub use crate::settings::{JsonFileStore, MemoryStore, Settings, SettingsStore, SharedSettings};
pub use crate::transport::{
    HttpTransport, Outbound, Recorder, ShellTransport, TransportConfig, Transports,
};

pub use tvlink_protocol::{
    BorderStyle, DeviceFamily, DeviceId, DeviceRecord, LogicalCommand, NamedKey, Resolution,
    VideoSource, WindowMessage,
};
