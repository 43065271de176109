use crate::commands::parse_field;
use crate::constants::{BLACKOUT_HEIGHT, BLACKOUT_WIDTH};
use crate::error::Result;
use crate::session::{Command, SessionClient};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskBlock {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// One blacked-out rectangle, expressed against a reference screen size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskArea {
    pub screen: ScreenSize,
    pub block: MaskBlock,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaskConfig {
    pub channel: u8,
    pub enable: i32,
    #[serde(default)]
    pub area: Vec<MaskArea>,
}

impl MaskConfig {
    pub fn enabled(&self) -> bool {
        self.enable == 1
    }
}

#[async_trait]
pub trait MaskControl: Send + Sync {
    /// Get the privacy mask configuration for a channel
    async fn get_mask(&self, channel: u8) -> Result<MaskConfig>;

    /// Replace the privacy mask; the area list goes out unchanged
    async fn set_mask(&self, channel: u8, enabled: bool, areas: &[MaskArea]) -> Result<()>;

    /// Black out the whole frame with a single full-screen area. Assumes a
    /// 1280x720 frame; the live resolution is not queried first (known
    /// limitation).
    async fn set_mask_black_out(&self, channel: u8) -> Result<()>;
}

#[async_trait]
impl MaskControl for SessionClient {
    async fn get_mask(&self, channel: u8) -> Result<MaskConfig> {
        let value = self
            .dispatch(Command::GetMask, Some(json!({ "channel": channel })))
            .await?;
        parse_field(&value, "Mask")
    }

    async fn set_mask(&self, channel: u8, enabled: bool, areas: &[MaskArea]) -> Result<()> {
        let param = json!({ "Mask": {
            "channel": channel,
            "enable": if enabled { 1 } else { 0 },
            "area": areas,
        }});
        self.dispatch(Command::SetMask, Some(param)).await?;
        Ok(())
    }

    async fn set_mask_black_out(&self, channel: u8) -> Result<()> {
        let full_frame = MaskArea {
            screen: ScreenSize {
                width: BLACKOUT_WIDTH,
                height: BLACKOUT_HEIGHT,
            },
            block: MaskBlock {
                x: 0,
                y: 0,
                width: BLACKOUT_WIDTH,
                height: BLACKOUT_HEIGHT,
            },
        };
        self.set_mask(channel, true, &[full_frame]).await
    }
}
