use crate::constants::ONLINE_POLL_INTERVAL;
use crate::toggle::ChannelToggle;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Background task keeping a toggle's availability gate current. Checks once
/// immediately, then every five seconds until shut down.
pub struct OnlinePoller {
    handle: JoinHandle<()>,
}

impl OnlinePoller {
    pub fn spawn(toggle: Arc<ChannelToggle>) -> Self {
        let handle = tokio::spawn(async move {
            let mut initial = true;
            loop {
                // a failed poll keeps the previous online value
                if let Err(e) = toggle.refresh_online().await {
                    error!("Camera {} failed to update status: {e}", toggle.name());
                }
                if initial {
                    if toggle.online() {
                        info!("Camera {} is online", toggle.name());
                    } else {
                        warn!("Camera {} is offline", toggle.name());
                    }
                    initial = false;
                }
                sleep(ONLINE_POLL_INTERVAL).await;
            }
        });
        Self { handle }
    }

    pub fn shutdown(&self) {
        self.handle.abort();
    }
}
