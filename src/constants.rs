use phf::phf_map;
use tokio::time::Duration;

/// Known `rspCode` values returned by the command endpoint.
pub static RSP_CODES: phf::Map<i32, &'static str> = phf_map! {
    -1i32 => "Missing parameters",
    -2i32 => "Out of memory",
    -3i32 => "Data check error",
    -4i32 => "Parameter error",
    -5i32 => "Reached the maximum number of sessions",
    -6i32 => "Login required or password error",
    -7i32 => "Login failed",
    -8i32 => "Operation timeout",
    -9i32 => "Not supported",
};

/// Session invalid/expired, or wrong credentials when returned by `Login`.
pub const SESSION_INVALID_CODE: i32 = -6;

/// A token older than this is refreshed before the next command goes out.
pub const TOKEN_LIFETIME_SECS: i64 = 3599;

/// Logout is only worth a round trip while the token can still be valid.
pub const LOGOUT_WINDOW_SECS: i64 = 3600;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// How long to wait for the camera to physically reach a commanded position.
pub const PTZ_SETTLE_DELAY: Duration = Duration::from_secs(3);

pub const ONLINE_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Blackout mask dimensions. The live stream resolution is not queried first;
/// a full 1280x720 frame is assumed (known limitation).
pub const BLACKOUT_WIDTH: u32 = 1280;
pub const BLACKOUT_HEIGHT: u32 = 720;

pub fn rsp_code_message(code: i32) -> &'static str {
    RSP_CODES.get(&code).copied().unwrap_or("Unknown device error")
}
