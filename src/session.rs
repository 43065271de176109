use crate::constants::{
    LOGOUT_WINDOW_SECS, SESSION_INVALID_CODE, TOKEN_LIFETIME_SECS, rsp_code_message,
};
use crate::error::{ReolinkError, Result};
use crate::transport::{CommandTransport, HttpTransport};
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use strum_macros::AsRefStr;
use tokio::sync::watch;
use tracing::{debug, error, warn};

/// Commands understood by the recorder's HTTP API, with the vendor's exact
/// capitalization on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
pub enum Command {
    Login,
    Logout,
    GetDevInfo,
    PtzCtrl,
    GetEnc,
    SetEnc,
    GetPtzGuard,
    SetPtzGuard,
    GetMask,
    SetMask,
    #[strum(serialize = "GetchannelStatus")]
    GetChannelStatus,
}

type LoginBroadcast = watch::Receiver<Option<Result<String>>>;

struct SessionState {
    token: Option<String>,
    issued_at: Option<DateTime<Utc>>,
    /// Present while a login is in flight; waiters clone it instead of
    /// starting a second login.
    refresh: Option<LoginBroadcast>,
}

impl SessionState {
    /// The cached token, if it is still young enough to use.
    fn current(&self) -> Option<String> {
        let issued_at = self.issued_at?;
        let age = Utc::now().signed_duration_since(issued_at).num_seconds();
        if age > TOKEN_LIFETIME_SECS {
            return None;
        }
        self.token.clone()
    }
}

enum RefreshRole {
    Ready(String),
    Lead(watch::Sender<Option<Result<String>>>),
    Wait(LoginBroadcast),
}

/// Owns the token lifecycle for one credential pair and dispatches raw
/// commands. Concurrent dispatches during a refresh all wait for the same
/// in-flight login; an expired-token response is retried exactly once.
pub struct SessionClient {
    transport: Arc<dyn CommandTransport>,
    username: String,
    password: String,
    state: Mutex<SessionState>,
    logging_out: AtomicBool,
}

impl SessionClient {
    pub fn new(
        host: impl AsRef<str>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self::with_transport(
            Arc::new(HttpTransport::new(host)?),
            username,
            password,
        ))
    }

    pub fn with_transport(
        transport: Arc<dyn CommandTransport>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            username: username.into(),
            password: password.into(),
            state: Mutex::new(SessionState {
                token: None,
                issued_at: None,
                refresh: None,
            }),
            logging_out: AtomicBool::new(false),
        }
    }

    /// Send one command and return its `value` object. Ensures a valid
    /// session first and retries once on an expired-token response.
    pub async fn dispatch(&self, cmd: Command, param: Option<Value>) -> Result<Value> {
        if self.logging_out.load(Ordering::Acquire) && cmd != Command::Logout {
            debug!("Terminating {} request, logging out is in progress", cmd.as_ref());
            return Err(ReolinkError::LogoutInProgress);
        }

        let mut retried = false;
        loop {
            let token = if cmd == Command::Logout {
                self.state.lock().unwrap().token.clone().unwrap_or_default()
            } else {
                self.ensure_token().await?
            };

            let query = format!("cmd={}&token={}", cmd.as_ref(), token);
            let body = match &param {
                Some(p) => json!([{ "cmd": cmd.as_ref(), "param": p }]),
                None => json!([{ "cmd": cmd.as_ref() }]),
            };

            let reply = self.transport.post(&query, &body).await?;
            let first = first_entry(&reply)?;

            if let Some(err) = first.get("error") {
                let code = rsp_code(err);
                if code == SESSION_INVALID_CODE && cmd != Command::Logout {
                    if !retried {
                        retried = true;
                        debug!("Token rejected, retrying {} after refresh", cmd.as_ref());
                        self.invalidate_token();
                        continue;
                    }
                    return Err(ReolinkError::SessionExpired);
                }
                error!("Failed executing {} command: {}", cmd.as_ref(), rsp_code_message(code));
                return Err(command_error(err));
            }

            debug!("Command {} success", cmd.as_ref());
            return Ok(first.get("value").cloned().unwrap_or(Value::Null));
        }
    }

    /// Invalidate the session. Skips the network round trip when the token
    /// cannot still be valid anyway; failures are logged, never escalated.
    pub async fn logout(&self) {
        self.logging_out.store(true, Ordering::Release);

        let recent = {
            let state = self.state.lock().unwrap();
            state.issued_at.is_some_and(|issued_at| {
                Utc::now().signed_duration_since(issued_at).num_seconds() < LOGOUT_WINDOW_SECS
            })
        };
        if !recent {
            return;
        }

        if let Err(e) = self.dispatch(Command::Logout, None).await {
            warn!("Logout failed: {e}");
        }
    }

    /// Return a usable token, refreshing single-flight when needed: the first
    /// caller performs the login, everyone else waits on its broadcast result.
    /// A leader cancelled mid-login drops its sender; waiters notice, clear
    /// the stale broadcast and contend for leadership again.
    async fn ensure_token(&self) -> Result<String> {
        loop {
            let role = {
                let mut state = self.state.lock().unwrap();
                if let Some(token) = state.current() {
                    RefreshRole::Ready(token)
                } else if let Some(rx) = &state.refresh {
                    RefreshRole::Wait(rx.clone())
                } else {
                    let (tx, rx) = watch::channel(None);
                    state.refresh = Some(rx);
                    RefreshRole::Lead(tx)
                }
            };

            match role {
                RefreshRole::Ready(token) => return Ok(token),
                RefreshRole::Wait(mut rx) => {
                    let outcome = loop {
                        if let Some(result) = rx.borrow_and_update().clone() {
                            break Some(result);
                        }
                        if rx.changed().await.is_err() {
                            break None;
                        }
                    };
                    match outcome {
                        Some(result) => return result,
                        None => {
                            // the leader went away without reporting a result
                            let mut state = self.state.lock().unwrap();
                            if state.refresh.as_ref().is_some_and(|r| r.same_channel(&rx)) {
                                state.refresh = None;
                            }
                        }
                    }
                }
                RefreshRole::Lead(tx) => {
                    let result = self.login().await;
                    {
                        let mut state = self.state.lock().unwrap();
                        state.refresh = None;
                        if let Ok(token) = &result {
                            state.token = Some(token.clone());
                            state.issued_at = Some(Utc::now());
                        }
                    }
                    let _ = tx.send(Some(result.clone()));
                    return result;
                }
            }
        }
    }

    async fn login(&self) -> Result<String> {
        let query = format!("cmd={}", Command::Login.as_ref());
        let body = json!([{
            "cmd": Command::Login.as_ref(),
            "param": {
                "User": {
                    "Version": "0",
                    "userName": self.username,
                    "password": self.password,
                },
            },
        }]);

        let reply = self.transport.post(&query, &body).await?;
        let first = first_entry(&reply)?;

        if let Some(err) = first.get("error") {
            let code = rsp_code(err);
            if code == SESSION_INVALID_CODE {
                error!("Could not refresh token, likely wrong username or password");
                return Err(ReolinkError::AuthFailure);
            }
            error!("Could not refresh token: {}", rsp_code_message(code));
            return Err(command_error(err));
        }

        let token = first
            .pointer("/value/Token/name")
            .and_then(Value::as_str)
            .ok_or_else(|| ReolinkError::Protocol("Login response missing token".to_string()))?;
        debug!("Login success");
        Ok(token.to_string())
    }

    fn invalidate_token(&self) {
        let mut state = self.state.lock().unwrap();
        state.token = None;
        state.issued_at = None;
    }

    #[cfg(test)]
    fn force_session(&self, token: &str, issued_at: DateTime<Utc>) {
        let mut state = self.state.lock().unwrap();
        state.token = Some(token.to_string());
        state.issued_at = Some(issued_at);
    }
}

fn first_entry(reply: &Value) -> Result<&Value> {
    reply
        .get(0)
        .ok_or_else(|| ReolinkError::Protocol("Empty response".to_string()))
}

fn rsp_code(err: &Value) -> i32 {
    err.get("rspCode").and_then(Value::as_i64).unwrap_or(0) as i32
}

fn command_error(err: &Value) -> ReolinkError {
    let code = rsp_code(err);
    let detail = err
        .get("detail")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| rsp_code_message(code).to_string());
    ReolinkError::Command { code, detail }
}
