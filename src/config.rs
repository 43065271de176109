use serde::Deserialize;

/// Static configuration for one recorder. Loading and validating the file it
/// comes from is the host's concern.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfig {
    pub ip_address: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub cameras: Vec<ChannelConfig>,
}

/// Per-channel simulation capabilities. A channel with none of the three
/// capability flags has nothing to toggle.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelConfig {
    #[serde(default)]
    pub name: String,
    pub channel: u8,
    #[serde(default)]
    pub disable_audio: bool,
    #[serde(default)]
    pub mask_black_out: bool,
    #[serde(default)]
    pub disabled_ptz_preset_id: Option<u32>,
    /// Seconds until a disabled channel re-enables itself.
    #[serde(default)]
    pub disabled_timeout: Option<u64>,
}

impl ChannelConfig {
    pub fn has_capability(&self) -> bool {
        self.disable_audio || self.mask_black_out || self.disabled_ptz_preset_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_the_original_schema() {
        let config: DeviceConfig = serde_json::from_str(
            r#"{
                "ipAddress": "192.168.1.10",
                "username": "admin",
                "password": "secret",
                "cameras": [
                    { "name": "Yard", "channel": 3, "maskBlackOut": true,
                      "disabledPtzPresetId": 5, "disabledTimeout": 60 },
                    { "name": "Door", "channel": 0 }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.cameras.len(), 2);
        let yard = &config.cameras[0];
        assert!(yard.mask_black_out);
        assert!(!yard.disable_audio);
        assert_eq!(yard.disabled_ptz_preset_id, Some(5));
        assert_eq!(yard.disabled_timeout, Some(60));
        assert!(yard.has_capability());
        assert!(!config.cameras[1].has_capability());
    }
}
