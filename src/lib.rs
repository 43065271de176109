pub mod commands;
pub mod config;
pub mod constants;
pub mod controller;
pub mod error;
pub mod poller;
pub mod session;
pub mod toggle;
pub mod transport;

pub use commands::*;
pub use config::{ChannelConfig, DeviceConfig};
pub use controller::DeviceController;
pub use error::{ReolinkError, Result};
pub use poller::OnlinePoller;
pub use session::{Command, SessionClient};
pub use toggle::{ChannelState, ChannelStates, ChannelToggle, MaskSnapshot};
pub use transport::{CommandTransport, HttpTransport};
