//! Client for the alerts backend, plus login input helpers.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::db::{KeyValueStore, SESSION_KEY};
use crate::error::{NaaradError, Result};
use crate::payload::CreateAlertRequest;

const API_TIMEOUT_SECS: u64 = 30;

/// Prefixes tried in order before falling back to pattern matching
const KNOWN_COUNTRY_CODES: [&str; 14] = [
    "+91", "+1", "+44", "+61", "+86", "+81", "+33", "+49", "+39", "+7", "+971", "+966", "+92",
    "+880",
];

const DEFAULT_COUNTRY_CODE: &str = "+91";

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+@\S+\.\S+").expect("Invalid email regex"));

static WHATSAPP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[1-9]\d{1,14}$").expect("Invalid WhatsApp number regex"));

static PHONE_SPLIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+(\d{1,4})(\d{7,})$").expect("Invalid phone split regex"));

static API_AGENT: Lazy<ureq::Agent> = Lazy::new(|| {
    ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(API_TIMEOUT_SECS)))
        .http_status_as_error(false)
        .build()
        .into()
});

pub fn validate_email(value: &str) -> std::result::Result<(), &'static str> {
    if value.is_empty() {
        return Err("Email is required.");
    }
    if !EMAIL_RE.is_match(value) {
        return Err("Please enter a valid email address.");
    }
    Ok(())
}

pub fn validate_whatsapp_number(value: &str) -> std::result::Result<(), &'static str> {
    if value.is_empty() {
        return Err("WhatsApp number is required.");
    }
    if !WHATSAPP_RE.is_match(value) {
        return Err("Please enter a valid WhatsApp number (e.g., +1234567890).");
    }
    Ok(())
}

/// Split a number into `(country_code, phone_number)`
pub fn split_phone_number(number: &str) -> (String, String) {
    let cleaned: String = number.chars().filter(|c| !c.is_whitespace()).collect();

    if !cleaned.starts_with('+') {
        return (DEFAULT_COUNTRY_CODE.to_string(), cleaned);
    }

    if let Some(code) = KNOWN_COUNTRY_CODES.iter().find(|c| cleaned.starts_with(**c)) {
        return (code.to_string(), cleaned[code.len()..].to_string());
    }

    if let Some(caps) = PHONE_SPLIT_RE.captures(&cleaned) {
        return (format!("+{}", &caps[1]), caps[2].to_string());
    }

    // Input may be unvalidated; char_indices keeps the split on a char boundary
    let split = cleaned.char_indices().nth(3).map(|(i, _)| i).unwrap_or(cleaned.len());
    (cleaned[..split].to_string(), cleaned[split..].to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub country_code: String,
    pub phone_number: String,
}

impl LoginRequest {
    pub fn new(email: &str, whatsapp_number: &str) -> Self {
        let (country_code, phone_number) = split_phone_number(whatsapp_number);
        Self {
            email: email.trim().to_string(),
            country_code,
            phone_number,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub user_id: String,
    pub token: Option<String>,
    pub message: Option<String>,
}

/// Alert as returned by `GET /alerts/alerts/{user_id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertItem {
    #[serde(alias = "id", deserialize_with = "id_string")]
    pub alert_id: String,
    #[serde(default)]
    pub main_category: String,
    #[serde(default)]
    pub sub_categories: Vec<String>,
    #[serde(default)]
    pub followup_questions: Vec<String>,
    #[serde(default)]
    pub custom_question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(default, rename = "customFrequencyTime", skip_serializing_if = "Option::is_none")]
    pub custom_frequency_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedAlert {
    pub alert_id: Option<String>,
    pub message: Option<String>,
}

/// Backend login session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Session {
    pub fn load(kv: &impl KeyValueStore) -> Result<Option<Self>> {
        match kv.get(SESSION_KEY)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Load or fail with `NotLoggedIn`
    pub fn require(kv: &impl KeyValueStore) -> Result<Self> {
        Self::load(kv)?.ok_or(NaaradError::NotLoggedIn)
    }

    pub fn save(&self, kv: &impl KeyValueStore) -> Result<()> {
        kv.put(SESSION_KEY, &serde_json::to_string(self)?)
    }
}

/// Backend calls needed to keep saved alerts in sync
pub trait AlertBackend {
    fn create_alert(&self, request: &CreateAlertRequest) -> Result<CreatedAlert>;
    fn delete_alert(&self, user_id: &str, alert_id: &str) -> Result<String>;
}

pub struct BackendClient {
    base_url: String,
    token: Option<String>,
}

impl BackendClient {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.clone();
        for segment in segments {
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
        url
    }

    fn bearer(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("Bearer {}", t))
    }

    pub fn login(&self, request: &LoginRequest) -> Result<LoginOutcome> {
        let url = self.url(&["auth", "login"]);
        tracing::debug!(%url, country_code = %request.country_code, "logging in");

        let response = API_AGENT
            .post(&url)
            .header("Content-Type", "application/json")
            .send_json(request)?;
        let ok = response.status().is_success();
        let body = response.into_body().read_to_string()?;
        parse_login_response(ok, &body)
    }

    pub fn create_alert(&self, request: &CreateAlertRequest) -> Result<CreatedAlert> {
        let url = self.url(&["alerts", "alerts"]);
        tracing::debug!(%url, main_category = request.payload.main_category.as_str(), "creating alert");

        let mut builder = API_AGENT.post(&url).header("Content-Type", "application/json");
        if let Some(auth) = self.bearer() {
            builder = builder.header("Authorization", &auth);
        }
        let response = builder.send_json(request)?;
        let ok = response.status().is_success();
        let body = response.into_body().read_to_string()?;
        parse_create_response(ok, &body)
    }

    pub fn list_alerts(&self, user_id: &str) -> Result<Vec<AlertItem>> {
        let url = self.url(&["alerts", "alerts", user_id]);
        tracing::debug!(%url, "listing alerts");

        let mut builder = API_AGENT.get(&url).header("Content-Type", "application/json");
        if let Some(auth) = self.bearer() {
            builder = builder.header("Authorization", &auth);
        }
        let response = builder.call()?;
        let ok = response.status().is_success();
        let body = response.into_body().read_to_string()?;
        if !ok {
            return Err(NaaradError::ApiError(error_message(&body, "Failed to fetch alerts")));
        }
        parse_alert_list(&body)
    }

    pub fn delete_alert(&self, user_id: &str, alert_id: &str) -> Result<String> {
        let url = self.url(&["alerts", "alerts", user_id, alert_id]);
        tracing::debug!(%url, "deleting alert");

        let mut builder = API_AGENT.delete(&url).header("Content-Type", "application/json");
        if let Some(auth) = self.bearer() {
            builder = builder.header("Authorization", &auth);
        }
        let response = builder.call()?;
        let ok = response.status().is_success();
        let body = response.into_body().read_to_string()?;
        if !ok {
            return Err(NaaradError::ApiError(error_message(&body, "Failed to delete alert")));
        }
        Ok(serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v["message"].as_str().map(String::from))
            .unwrap_or_else(|| "Alert deleted successfully".to_string()))
    }
}

impl AlertBackend for BackendClient {
    fn create_alert(&self, request: &CreateAlertRequest) -> Result<CreatedAlert> {
        BackendClient::create_alert(self, request)
    }

    fn delete_alert(&self, user_id: &str, alert_id: &str) -> Result<String> {
        BackendClient::delete_alert(self, user_id, alert_id)
    }
}

/// Best human-readable message in an error body
pub fn error_message(body: &str, default: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        let raw = body.trim();
        return if raw.is_empty() { default.to_string() } else { raw.to_string() };
    };

    for field in ["message", "error", "detail"] {
        match &value[field] {
            Value::String(s) if !s.is_empty() => return s.clone(),
            Value::Null => {}
            other if !other.is_string() => return other.to_string(),
            _ => {}
        }
    }

    match value {
        Value::Null => default.to_string(),
        other => other.to_string(),
    }
}

fn id_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    id_value(&value).ok_or_else(|| serde::de::Error::custom("alert id must be a string or number"))
}

pub fn parse_login_response(ok: bool, body: &str) -> Result<LoginOutcome> {
    if !ok {
        return Err(NaaradError::ApiError(error_message(body, "Login failed")));
    }
    let value: Value = serde_json::from_str(body)?;

    let user = &value["user"];
    let user_id = [&user["user_id"], &user["id"], &value["user_id"], &value["id"]]
        .into_iter()
        .find_map(id_value)
        .ok_or_else(|| {
            NaaradError::ApiError(
                "Login successful but user ID not received. Please contact support.".into(),
            )
        })?;

    Ok(LoginOutcome {
        user_id,
        token: user["token"].as_str().map(String::from),
        message: value["message"].as_str().map(String::from),
    })
}

pub fn parse_create_response(ok: bool, body: &str) -> Result<CreatedAlert> {
    if !ok {
        return Err(NaaradError::ApiError(error_message(body, "Failed to create alert")));
    }
    let value: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let alert = if value["alert"].is_object() { &value["alert"] } else { &value };
    Ok(CreatedAlert {
        alert_id: id_value(&alert["alert_id"]).or_else(|| id_value(&alert["id"])),
        message: value["message"].as_str().map(String::from),
    })
}

/// Accepts a bare array or `{"alerts": [...]}`; anything else is empty
pub fn parse_alert_list(body: &str) -> Result<Vec<AlertItem>> {
    let value: Value = serde_json::from_str(body)?;
    let list = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("alerts") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    list.into_iter()
        .map(|item| serde_json::from_value(item).map_err(NaaradError::from))
        .collect()
}
