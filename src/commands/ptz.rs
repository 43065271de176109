use crate::commands::parse_field;
use crate::error::{ReolinkError, Result};
use crate::session::{Command, SessionClient};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use strum_macros::AsRefStr;

/// `cmdStr` values accepted by SetPtzGuard.
#[derive(Debug, Clone, Copy, AsRefStr)]
pub enum GuardCommand {
    #[strum(serialize = "setPos")]
    SetPos,
    #[strum(serialize = "toPos")]
    ToPos,
}

/// The camera's home ("monitor point") configuration. `bexist_pos == 1` means
/// a position has been saved; nothing guard-related works without one.
#[derive(Debug, Clone, Deserialize)]
pub struct PtzGuard {
    pub benable: i32,
    #[serde(rename = "bexistPos")]
    pub bexist_pos: i32,
    pub channel: u8,
    pub timeout: u32,
}

impl PtzGuard {
    pub fn exists(&self) -> bool {
        self.bexist_pos == 1
    }

    pub fn auto_enabled(&self) -> bool {
        self.benable == 1
    }
}

#[async_trait]
pub trait Ptz: Send + Sync {
    /// Command the camera to a stored preset position. Fire-and-forget:
    /// success means the command was accepted, not that the move finished.
    async fn activate_preset(&self, channel: u8, preset_id: u32) -> Result<()>;

    /// Get the monitor point (PTZ guard) configuration
    async fn get_monitor_point(&self, channel: u8) -> Result<PtzGuard>;

    /// Enable or disable automatic return to the monitor point. Fails with
    /// `NoMonitorPoint` when no position has been saved on the camera.
    async fn set_monitor_point_auto(&self, channel: u8, enabled: bool) -> Result<()>;

    /// Command a move back to the monitor point. Fails with `NoMonitorPoint`
    /// when no position has been saved on the camera.
    async fn return_to_monitor_point(&self, channel: u8) -> Result<()>;
}

#[async_trait]
impl Ptz for SessionClient {
    async fn activate_preset(&self, channel: u8, preset_id: u32) -> Result<()> {
        let param = json!({
            "channel": channel,
            "op": "ToPos",
            "id": preset_id,
        });
        self.dispatch(Command::PtzCtrl, Some(param)).await?;
        Ok(())
    }

    async fn get_monitor_point(&self, channel: u8) -> Result<PtzGuard> {
        let value = self
            .dispatch(Command::GetPtzGuard, Some(json!({ "channel": channel })))
            .await?;
        parse_field(&value, "PtzGuard")
    }

    async fn set_monitor_point_auto(&self, channel: u8, enabled: bool) -> Result<()> {
        let existing = self.get_monitor_point(channel).await?;
        if !existing.exists() {
            return Err(ReolinkError::NoMonitorPoint(channel));
        }

        let param = guard_param(
            channel,
            GuardCommand::SetPos,
            if enabled { 1 } else { 0 },
            &existing,
        );
        self.dispatch(Command::SetPtzGuard, Some(param)).await?;
        Ok(())
    }

    async fn return_to_monitor_point(&self, channel: u8) -> Result<()> {
        let existing = self.get_monitor_point(channel).await?;
        if !existing.exists() {
            return Err(ReolinkError::NoMonitorPoint(channel));
        }

        let param = guard_param(channel, GuardCommand::ToPos, existing.benable, &existing);
        self.dispatch(Command::SetPtzGuard, Some(param)).await?;
        Ok(())
    }
}

fn guard_param(channel: u8, cmd: GuardCommand, benable: i32, existing: &PtzGuard) -> Value {
    json!({ "PtzGuard": {
        "channel": channel,
        "cmdStr": cmd.as_ref(),
        "benable": benable,
        "timeout": existing.timeout,
        "bexistPos": existing.bexist_pos,
        "bSaveCurrentPos": 0,
    }})
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::{FakeTransport, value_reply};
    use std::sync::Arc;

    fn guard_reply(benable: i32, bexist_pos: i32) -> serde_json::Value {
        value_reply(json!({ "PtzGuard": {
            "benable": benable,
            "bexistPos": bexist_pos,
            "channel": 3,
            "timeout": 60,
        }}))
    }

    fn client(transport: &Arc<FakeTransport>) -> SessionClient {
        SessionClient::with_transport(transport.clone(), "admin", "secret")
    }

    #[tokio::test]
    async fn preset_activation_sends_to_pos() {
        let transport = Arc::new(FakeTransport::new());
        client(&transport).activate_preset(3, 5).await.unwrap();

        let params = transport.params("PtzCtrl");
        assert_eq!(params[0]["op"], "ToPos");
        assert_eq!(params[0]["id"], 5);
        assert_eq!(params[0]["channel"], 3);
    }

    #[tokio::test]
    async fn missing_monitor_point_blocks_mutation() {
        let transport = Arc::new(FakeTransport::new());
        transport.push("GetPtzGuard", guard_reply(0, 0));
        transport.push("GetPtzGuard", guard_reply(0, 0));
        let client = client(&transport);

        let result = client.set_monitor_point_auto(3, true).await;
        assert_eq!(result, Err(ReolinkError::NoMonitorPoint(3)));

        let result = client.return_to_monitor_point(3).await;
        assert_eq!(result, Err(ReolinkError::NoMonitorPoint(3)));

        assert_eq!(transport.count("SetPtzGuard"), 0);
    }

    #[tokio::test]
    async fn guard_settings_travel_back_unchanged() {
        let transport = Arc::new(FakeTransport::new());
        transport.push("GetPtzGuard", guard_reply(1, 1));
        transport.push("GetPtzGuard", guard_reply(1, 1));
        let client = client(&transport);

        client.set_monitor_point_auto(3, false).await.unwrap();
        client.return_to_monitor_point(3).await.unwrap();

        let params = transport.params("SetPtzGuard");
        assert_eq!(params[0]["PtzGuard"]["cmdStr"], "setPos");
        assert_eq!(params[0]["PtzGuard"]["benable"], 0);
        assert_eq!(params[0]["PtzGuard"]["timeout"], 60);
        assert_eq!(params[0]["PtzGuard"]["bSaveCurrentPos"], 0);
        assert_eq!(params[1]["PtzGuard"]["cmdStr"], "toPos");
        // toPos keeps whatever auto-return state the camera already had
        assert_eq!(params[1]["PtzGuard"]["benable"], 1);
    }
}
