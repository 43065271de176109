use crate::commands::parse_field;
use crate::error::Result;
use crate::session::{Command, SessionClient};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncStream {
    pub bit_rate: u32,
    pub frame_rate: u32,
    #[serde(default)]
    pub gop: u32,
    #[serde(default)]
    pub height: u32,
    pub profile: String,
    pub size: String,
    #[serde(default)]
    pub v_type: String,
    #[serde(default)]
    pub width: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enc {
    pub audio: i32,
    pub channel: u8,
    pub main_stream: EncStream,
    pub sub_stream: EncStream,
}

#[async_trait]
pub trait Encoding: Send + Sync {
    /// Get the current encoder settings for a channel
    async fn get_enc(&self, channel: u8) -> Result<Enc>;

    /// Flip the audio flag without touching the stream settings. SetEnc
    /// replaces the whole record, so this re-submits the current streams.
    async fn set_audio_enabled(&self, channel: u8, enabled: bool) -> Result<()>;
}

#[async_trait]
impl Encoding for SessionClient {
    async fn get_enc(&self, channel: u8) -> Result<Enc> {
        let value = self
            .dispatch(Command::GetEnc, Some(json!({ "channel": channel })))
            .await?;
        parse_field(&value, "Enc")
    }

    async fn set_audio_enabled(&self, channel: u8, enabled: bool) -> Result<()> {
        let existing = self.get_enc(channel).await?;

        let param = json!({ "Enc": {
            "channel": channel,
            "audio": if enabled { 1 } else { 0 },
            "mainStream": stream_param(&existing.main_stream),
            "subStream": stream_param(&existing.sub_stream),
        }});
        self.dispatch(Command::SetEnc, Some(param)).await?;
        Ok(())
    }
}

/// SetEnc accepts only these four stream fields; the rest are read-only.
fn stream_param(stream: &EncStream) -> Value {
    json!({
        "size": stream.size,
        "frameRate": stream.frame_rate,
        "bitRate": stream.bit_rate,
        "profile": stream.profile,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::{FakeTransport, value_reply};
    use std::sync::Arc;

    fn enc_reply() -> serde_json::Value {
        value_reply(json!({ "Enc": {
            "audio": 1,
            "channel": 2,
            "mainStream": {
                "bitRate": 6144, "frameRate": 25, "gop": 2, "height": 1440,
                "profile": "High", "size": "2560*1440", "vType": "h265", "width": 2560,
            },
            "subStream": {
                "bitRate": 512, "frameRate": 10, "gop": 2, "height": 480,
                "profile": "High", "size": "640*480", "vType": "h264", "width": 640,
            },
        }}))
    }

    #[tokio::test]
    async fn audio_toggle_preserves_stream_settings() {
        let transport = Arc::new(FakeTransport::new());
        transport.push("GetEnc", enc_reply());
        let client = SessionClient::with_transport(transport.clone(), "admin", "secret");

        client.set_audio_enabled(2, false).await.unwrap();

        let params = transport.params("SetEnc");
        assert_eq!(params.len(), 1);
        let enc = &params[0]["Enc"];
        assert_eq!(enc["audio"], 0);
        assert_eq!(enc["channel"], 2);
        // read-modify-write: stream fields travel back unchanged
        assert_eq!(enc["mainStream"]["bitRate"], 6144);
        assert_eq!(enc["mainStream"]["size"], "2560*1440");
        assert_eq!(enc["subStream"]["frameRate"], 10);
        assert_eq!(enc["subStream"]["profile"], "High");
        // and the read-only fields are not echoed at all
        assert!(enc["mainStream"].get("gop").is_none());
        assert!(enc["mainStream"].get("vType").is_none());
    }
}
