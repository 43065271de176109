use crate::commands::{DevInfo, Ptz, SystemInfo};
use crate::config::{ChannelConfig, DeviceConfig};
use crate::error::Result;
use crate::poller::OnlinePoller;
use crate::session::SessionClient;
use crate::toggle::{ChannelStates, ChannelToggle};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

struct Channel {
    toggle: Arc<ChannelToggle>,
    poller: OnlinePoller,
}

/// Device-level coordinator: connects, registers a toggle and a poller per
/// configured camera, owns the shared channel-state table, and tears
/// everything down on shutdown.
pub struct DeviceController {
    client: Arc<SessionClient>,
    device_info: DevInfo,
    states: ChannelStates,
    channels: Vec<Channel>,
}

impl DeviceController {
    /// Connect to the recorder and register every configured camera. A failed
    /// device-info fetch is fatal: the device is unreachable or the
    /// credentials are wrong, and nothing downstream can work.
    pub async fn connect(config: DeviceConfig) -> Result<Self> {
        let client = Arc::new(SessionClient::new(
            &config.ip_address,
            config.username,
            config.password,
        )?);
        Self::with_client(client, config.cameras).await
    }

    pub async fn with_client(
        client: Arc<SessionClient>,
        cameras: Vec<ChannelConfig>,
    ) -> Result<Self> {
        let device_info = match client.get_device_info().await {
            Ok(info) => info,
            Err(e) => {
                error!("Could not get device info, please check config: {e}");
                return Err(e);
            }
        };
        info!("Logged in to {} ({})", device_info.model, device_info.detail);

        let states: ChannelStates = Arc::new(DashMap::new());
        let mut channels = Vec::new();
        for camera in cameras {
            if camera.disabled_ptz_preset_id.is_some() {
                Self::check_monitor_point(&client, &camera).await;
            }

            let toggle = Arc::new(ChannelToggle::new(
                client.clone(),
                camera,
                states.clone(),
            ));
            let poller = OnlinePoller::spawn(toggle.clone());
            channels.push(Channel { toggle, poller });
        }

        Ok(Self {
            client,
            device_info,
            states,
            channels,
        })
    }

    /// Warn early when disabling goes through a PTZ preset but the camera has
    /// no saved home position to come back to.
    async fn check_monitor_point(client: &SessionClient, camera: &ChannelConfig) {
        match client.get_monitor_point(camera.channel).await {
            Ok(guard) if guard.exists() => {
                debug!("Camera {} monitor point OK", camera.name);
            }
            Ok(_) => {
                warn!(
                    "Camera {} has no monitor point configured! Configure one so the \
                     camera can return to its original position.",
                    camera.name
                );
            }
            Err(e) => {
                warn!("Camera {}: could not check monitor point: {e}", camera.name);
            }
        }
    }

    pub fn device_info(&self) -> &DevInfo {
        &self.device_info
    }

    pub fn states(&self) -> &ChannelStates {
        &self.states
    }

    pub fn toggles(&self) -> impl Iterator<Item = &Arc<ChannelToggle>> {
        self.channels.iter().map(|channel| &channel.toggle)
    }

    pub fn toggle(&self, channel: u8) -> Option<&Arc<ChannelToggle>> {
        self.channels
            .iter()
            .find(|c| c.toggle.channel() == channel)
            .map(|c| &c.toggle)
    }

    /// Stop the pollers, cancel pending re-enable timers and invalidate the
    /// session. In-flight requests are left to finish on their own.
    pub async fn shutdown(&self) {
        for channel in &self.channels {
            channel.poller.shutdown();
            channel.toggle.shutdown();
        }
        self.client.logout().await;
    }
}
