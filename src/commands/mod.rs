pub mod encoding;
pub mod mask;
pub mod ptz;
pub mod system_info;

pub use encoding::{Enc, EncStream, Encoding};
pub use mask::{MaskArea, MaskBlock, MaskConfig, MaskControl, ScreenSize};
pub use ptz::{Ptz, PtzGuard};
pub use system_info::{ChannelStatus, ChannelStatusList, DevInfo, SystemInfo};

use crate::error::{ReolinkError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Pull a named object out of a command's `value` and deserialize it.
pub(crate) fn parse_field<T: DeserializeOwned>(value: &Value, field: &str) -> Result<T> {
    let inner = value
        .get(field)
        .cloned()
        .ok_or_else(|| ReolinkError::Protocol(format!("Response missing {field}")))?;
    serde_json::from_value(inner)
        .map_err(|e| ReolinkError::Protocol(format!("Failed to parse {field}: {e}")))
}

pub(crate) fn parse_value<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| ReolinkError::Protocol(format!("Failed to parse response: {e}")))
}
