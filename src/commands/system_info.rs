use crate::commands::{parse_field, parse_value};
use crate::error::Result;
use crate::session::{Command, SessionClient};
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevInfo {
    pub model: String,
    pub name: String,
    /// Used as the serial identifier on newer firmware; `serial` is a bare
    /// counter on NVRs.
    pub detail: String,
    #[serde(default)]
    pub serial: i64,
    #[serde(default)]
    pub channel_num: u32,
    #[serde(default)]
    pub firm_ver: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelStatusList {
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub status: Vec<ChannelStatus>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStatus {
    pub channel: u8,
    #[serde(default)]
    pub name: String,
    pub online: i32,
    #[serde(default)]
    pub type_info: String,
}

#[async_trait]
pub trait SystemInfo: Send + Sync {
    /// Get device model/serial metadata
    async fn get_device_info(&self) -> Result<DevInfo>;

    /// Get the status list for every channel on the recorder
    async fn get_channel_statuses(&self) -> Result<ChannelStatusList>;

    /// Whether a channel is currently reachable; ids missing from the status
    /// list count as offline
    async fn get_channel_online(&self, channel: u8) -> Result<bool>;
}

#[async_trait]
impl SystemInfo for SessionClient {
    async fn get_device_info(&self) -> Result<DevInfo> {
        let value = self.dispatch(Command::GetDevInfo, None).await?;
        parse_field(&value, "DevInfo")
    }

    async fn get_channel_statuses(&self) -> Result<ChannelStatusList> {
        let value = self.dispatch(Command::GetChannelStatus, None).await?;
        parse_value(value)
    }

    async fn get_channel_online(&self, channel: u8) -> Result<bool> {
        let statuses = self.get_channel_statuses().await?;
        Ok(statuses
            .status
            .iter()
            .find(|info| info.channel == channel)
            .is_some_and(|info| info.online == 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::{FakeTransport, value_reply};
    use serde_json::json;
    use std::sync::Arc;

    fn client(transport: &Arc<FakeTransport>) -> SessionClient {
        SessionClient::with_transport(transport.clone(), "admin", "secret")
    }

    fn status_reply() -> serde_json::Value {
        value_reply(json!({
            "count": 2,
            "status": [
                { "channel": 0, "name": "Front", "online": 1, "typeInfo": "IPC" },
                { "channel": 3, "name": "Yard", "online": 0, "typeInfo": "IPC" },
            ],
        }))
    }

    #[tokio::test]
    async fn device_info_is_parsed() {
        let transport = Arc::new(FakeTransport::new());
        transport.push(
            "GetDevInfo",
            value_reply(json!({ "DevInfo": {
                "model": "RLN8-410",
                "name": "NVR",
                "detail": "N7MB01",
                "serial": 42,
                "channelNum": 8,
                "firmVer": "v3.0.0",
            }})),
        );

        let info = client(&transport).get_device_info().await.unwrap();
        assert_eq!(info.model, "RLN8-410");
        assert_eq!(info.channel_num, 8);
        assert_eq!(info.detail, "N7MB01");
    }

    #[tokio::test]
    async fn online_lookup_by_channel_id() {
        let transport = Arc::new(FakeTransport::new());
        transport.push("GetchannelStatus", status_reply());
        transport.push("GetchannelStatus", status_reply());

        let client = client(&transport);
        assert!(client.get_channel_online(0).await.unwrap());
        assert!(!client.get_channel_online(3).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_channel_counts_as_offline() {
        let transport = Arc::new(FakeTransport::new());
        transport.push("GetchannelStatus", status_reply());

        assert!(!client(&transport).get_channel_online(7).await.unwrap());
    }
}
