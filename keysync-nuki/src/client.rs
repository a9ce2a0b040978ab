//! Blocking Nuki Web API client implementing [`LockGateway`].

use std::time::Duration;

use chrono::{Local, TimeZone};
use serde::Serialize;

use keysync_core::{CodeSlot, GatewayError, LockCodeState, LockGateway, LockId, ValidityWindow};

use crate::wire::{
    find_shared, lock_id_value, pin_value, to_remote, AuthEntry, CreateAuth, UpdateAuth,
    ALL_WEEK_DAYS, KEYPAD_CODE,
};

/// Longest slice of an error body carried into a message.
const MAX_BODY_IN_ERROR: usize = 200;

/// Map an HTTP status to the gateway error taxonomy.
pub fn status_error(status: u16, message: String) -> GatewayError {
    match status {
        401 | 403 => GatewayError::Auth(message),
        404 => GatewayError::Conflict(format!("{message} (lock or code not found)")),
        408 | 429 | 500..=599 => GatewayError::Unreachable(message),
        _ => GatewayError::Conflict(message),
    }
}

fn call_error(what: &str, err: ureq::Error) -> GatewayError {
    match err {
        ureq::Error::Status(status, response) => {
            let body = response.into_string().unwrap_or_default();
            let body: String = body.trim().chars().take(MAX_BODY_IN_ERROR).collect();
            let message = if body.is_empty() {
                format!("{what}: HTTP {status}")
            } else {
                format!("{what}: HTTP {status}: {body}")
            };
            status_error(status, message)
        }
        ureq::Error::Transport(transport) => {
            GatewayError::Unreachable(format!("{what}: {transport}"))
        }
    }
}

pub struct NukiClient<Tz: TimeZone = Local> {
    agent: ureq::Agent,
    base_url: String,
    token: String,
    tz: Tz,
}

impl NukiClient<Local> {
    /// Client for `base_url` converting times in the process time zone.
    /// `timeout` bounds every single HTTP call.
    pub fn new(base_url: &str, token: impl Into<String>, timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            tz: Local,
        }
    }
}

impl<Tz: TimeZone> NukiClient<Tz> {
    /// Same client, converting local times in `tz` instead.
    pub fn with_timezone<T: TimeZone>(self, tz: T) -> NukiClient<T> {
        NukiClient {
            agent: self.agent,
            base_url: self.base_url,
            token: self.token,
            tz,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// All authorizations of a lock. No content means none.
    fn list_auths(&self, lock_id: &LockId) -> Result<Vec<AuthEntry>, GatewayError> {
        let what = format!("list codes of lock {lock_id}");
        let response = self
            .agent
            .get(&self.url(&format!("/smartlock/{lock_id}/auth")))
            .set("Authorization", &self.bearer())
            .set("Accept", "application/json")
            .call()
            .map_err(|e| call_error(&what, e))?;

        if response.status() == 204 {
            return Ok(vec![]);
        }
        let body = response
            .into_string()
            .map_err(|e| GatewayError::Unreachable(format!("{what}: {e}")))?;
        if body.trim().is_empty() {
            return Ok(vec![]);
        }
        serde_json::from_str(&body)
            .map_err(|e| GatewayError::Unreachable(format!("{what}: undecodable response: {e}")))
    }

    fn send<B: Serialize>(
        &self,
        method: &str,
        path: &str,
        body: &B,
        what: &str,
    ) -> Result<(), GatewayError> {
        self.agent
            .request(method, &self.url(path))
            .set("Authorization", &self.bearer())
            .send_json(body)
            .map_err(|e| call_error(what, e))?;
        Ok(())
    }

    fn update(
        &self,
        slot: &CodeSlot,
        entry: &AuthEntry,
        window: Option<&ValidityWindow>,
    ) -> Result<(), GatewayError> {
        let auth_id = entry.auth_id().ok_or_else(|| {
            GatewayError::Conflict(format!(
                "code '{}' on lock {} has no auth id",
                slot.code_name, slot.lock_id
            ))
        })?;
        let body = UpdateAuth {
            enabled: window.is_some(),
            allowed_from_date: window.map(|w| to_remote(w.from, &self.tz)),
            allowed_until_date: window.map(|w| to_remote(w.until, &self.tz)),
            allowed_week_days: ALL_WEEK_DAYS,
        };
        self.send(
            "POST",
            &format!("/smartlock/{}/auth/{auth_id}", slot.lock_id),
            &body,
            &format!("update code '{}' on lock {}", slot.code_name, slot.lock_id),
        )
    }

    fn create(&self, slot: &CodeSlot, window: &ValidityWindow) -> Result<(), GatewayError> {
        let pin = slot.pin.as_ref().ok_or_else(|| {
            GatewayError::Conflict(format!(
                "code '{}' does not exist on lock {} and no pin is configured",
                slot.code_name, slot.lock_id
            ))
        })?;
        let body = CreateAuth {
            name: slot.code_name.clone(),
            kind: KEYPAD_CODE,
            code: pin_value(pin)?,
            smartlock_ids: vec![lock_id_value(&slot.lock_id)],
            allowed_week_days: ALL_WEEK_DAYS,
            allowed_from_date: to_remote(window.from, &self.tz),
            allowed_until_date: to_remote(window.until, &self.tz),
        };
        // A 409 here usually means the code was created concurrently; the
        // next run finds it and updates it.
        self.send(
            "PUT",
            "/smartlock/auth",
            &body,
            &format!("create code '{}' on lock {}", slot.code_name, slot.lock_id),
        )
    }
}

impl<Tz> LockGateway for NukiClient<Tz>
where
    Tz: TimeZone + Send + Sync,
{
    fn get_state(&self, slot: &CodeSlot) -> Result<LockCodeState, GatewayError> {
        let auths = self.list_auths(&slot.lock_id)?;
        Ok(find_shared(&auths, &slot.code_name)
            .map(|entry| entry.state(&self.tz))
            .unwrap_or_default())
    }

    fn set_window(
        &self,
        slot: &CodeSlot,
        window: Option<&ValidityWindow>,
    ) -> Result<(), GatewayError> {
        // The auth id is looked up again right before writing.
        let auths = self.list_auths(&slot.lock_id)?;
        match (find_shared(&auths, &slot.code_name), window) {
            (Some(entry), window) => self.update(slot, entry, window),
            (None, Some(window)) => {
                tracing::info!(lock = %slot.lock_id, code = %slot.code_name, "creating shared code");
                self.create(slot, window)
            }
            (None, None) => {
                tracing::debug!(lock = %slot.lock_id, code = %slot.code_name, "code absent, nothing to deactivate");
                Ok(())
            }
        }
    }

    fn request_sync(&self, lock_id: &LockId) -> Result<(), GatewayError> {
        self.agent
            .post(&self.url(&format!("/smartlock/{lock_id}/sync")))
            .set("Authorization", &self.bearer())
            .call()
            .map_err(|e| call_error(&format!("sync lock {lock_id}"), e))?;
        Ok(())
    }
}
