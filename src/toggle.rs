use crate::commands::{Encoding, MaskArea, MaskControl, Ptz, SystemInfo};
use crate::config::ChannelConfig;
use crate::constants::PTZ_SETTLE_DELAY;
use crate::error::{ReolinkError, Result};
use crate::session::SessionClient;
use dashmap::DashMap;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Duration, sleep};
use tracing::{debug, error};

/// Mask settings captured at disable-time and replayed at enable-time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskSnapshot {
    pub enabled: bool,
    pub areas: Vec<MaskArea>,
}

#[derive(Debug, Clone)]
pub struct ChannelState {
    pub on: bool,
    pub mask: Option<MaskSnapshot>,
    pub ptz_auto_was_on: bool,
    pub online: bool,
}

impl Default for ChannelState {
    fn default() -> Self {
        Self {
            // physical state is unknown at boot and assumed enabled
            on: true,
            mask: None,
            ptz_auto_was_on: false,
            online: true,
        }
    }
}

/// One state table per device, keyed by channel id, shared between the
/// toggles and the coordinator that owns it.
pub type ChannelStates = Arc<DashMap<u8, ChannelState>>;

/// Per-channel on/off state machine over the device's mask, audio and PTZ
/// subsystems. Transitions run their steps strictly in order but nothing
/// serializes overlapping triggers; the host must not start a second
/// transition on a channel before the first resolves.
pub struct ChannelToggle {
    client: Arc<SessionClient>,
    config: ChannelConfig,
    states: ChannelStates,
    reenable: Mutex<Option<JoinHandle<()>>>,
    settle: Duration,
}

impl ChannelToggle {
    pub fn new(client: Arc<SessionClient>, config: ChannelConfig, states: ChannelStates) -> Self {
        states.entry(config.channel).or_default();
        Self {
            client,
            config,
            states,
            reenable: Mutex::new(None),
            settle: PTZ_SETTLE_DELAY,
        }
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn channel(&self) -> u8 {
        self.config.channel
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Whether the simulation switch is logically on. Refuses to answer while
    /// the channel is unreachable rather than reporting a stale value.
    pub fn is_on(&self) -> Result<bool> {
        let (on, online) = self.with_state(|s| (s.on, s.online));
        if !online {
            error!("Camera {} appears to be offline", self.config.name);
            return Err(ReolinkError::ChannelOffline(self.config.name.clone()));
        }
        debug!("Camera {} is {}", self.config.name, if on { "on" } else { "off" });
        Ok(on)
    }

    pub fn online(&self) -> bool {
        self.with_state(|s| s.online)
    }

    pub fn set_online(&self, online: bool) {
        self.with_state(|s| s.online = online);
    }

    /// Poll the device once and update the availability gate. The previous
    /// value stays in place on failure.
    pub async fn refresh_online(&self) -> Result<()> {
        let online = self.client.get_channel_online(self.config.channel).await?;
        self.set_online(online);
        Ok(())
    }

    /// Enabled -> Disabled: black out the mask (remembering the old one),
    /// mute audio, park the camera at the disabled preset. With a timeout
    /// configured, schedules exactly one deferred `enable`.
    pub async fn disable(self: &Arc<Self>) -> Result<()> {
        self.check_capability()?;
        let channel = self.config.channel;

        if self.config.mask_black_out {
            let mask = self.client.get_mask(channel).await?;
            self.with_state(|s| {
                s.mask = Some(MaskSnapshot {
                    enabled: mask.enabled(),
                    areas: mask.area.clone(),
                })
            });
            self.client.set_mask_black_out(channel).await?;
        }

        if self.config.disable_audio {
            self.client.set_audio_enabled(channel, false).await?;
        }

        if let Some(preset) = self.config.disabled_ptz_preset_id {
            let guard = self.client.get_monitor_point(channel).await?;
            if guard.auto_enabled() {
                // remember to turn auto-return back on at enable-time
                self.with_state(|s| s.ptz_auto_was_on = true);
                self.client.set_monitor_point_auto(channel, false).await?;
            }
            self.client.activate_preset(channel, preset).await?;
            sleep(self.settle).await;
        }

        self.with_state(|s| s.on = false);

        if let Some(timeout) = self.config.disabled_timeout {
            self.schedule_reenable(Duration::from_secs(timeout));
        }
        Ok(())
    }

    /// Disabled -> Enabled: restore the captured mask (no-op if never
    /// disabled), unmute audio, return the camera to its monitor point.
    /// Cancels any pending deferred re-enable first.
    pub async fn enable(&self) -> Result<()> {
        self.check_capability()?;
        self.cancel_reenable();
        let channel = self.config.channel;

        if self.config.mask_black_out
            && let Some(snapshot) = self.with_state(|s| s.mask.clone())
        {
            self.client
                .set_mask(channel, snapshot.enabled, &snapshot.areas)
                .await?;
        }

        if self.config.disable_audio {
            self.client.set_audio_enabled(channel, true).await?;
        }

        if self.config.disabled_ptz_preset_id.is_some() {
            if self.with_state(|s| std::mem::take(&mut s.ptz_auto_was_on)) {
                self.client.set_monitor_point_auto(channel, true).await?;
            }
            self.client.return_to_monitor_point(channel).await?;
            sleep(self.settle).await;
        }

        self.with_state(|s| s.on = true);
        Ok(())
    }

    /// Cancel the pending auto re-enable. In-flight requests are not touched.
    pub fn shutdown(&self) {
        self.cancel_reenable();
    }

    fn check_capability(&self) -> Result<()> {
        if !self.config.has_capability() {
            error!("Camera {} has nothing to do!", self.config.name);
            return Err(ReolinkError::Configuration(format!(
                "camera {} has no disable capability configured",
                self.config.name
            )));
        }
        Ok(())
    }

    fn schedule_reenable(self: &Arc<Self>, delay: Duration) {
        let toggle = Arc::clone(self);
        let mut pending = self.reenable.lock().unwrap();
        if let Some(handle) = pending.take() {
            handle.abort();
        }
        *pending = Some(tokio::spawn(async move {
            sleep(delay).await;
            debug!("Enabling {} back after timeout", toggle.config.name);
            // drop our own handle before enabling, so the cancel inside
            // enable() cannot abort the task that is running it
            toggle.reenable.lock().unwrap().take();
            if let Err(e) = toggle.enable().await {
                error!("Failed to re-enable {}: {e}", toggle.config.name);
            }
        }));
    }

    fn cancel_reenable(&self) {
        if let Some(handle) = self.reenable.lock().unwrap().take() {
            handle.abort();
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut ChannelState) -> R) -> R {
        let mut entry = self.states.entry(self.config.channel).or_default();
        f(entry.value_mut())
    }
}
