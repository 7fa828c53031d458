//! JSON records exchanged with the wallet/betting REST backend.
//!
//! Response records are lenient: every field has a default so a partially
//! populated object still decodes. Ids are accepted as strings or numbers and
//! arrive either as `id` or Mongo-style `_id` (see [`crate::codec::normalize_record`]).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ==================== Requests ====================

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct RegisterRequest<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct VerifyEmailRequest<'a> {
    pub email: &'a str,
    pub code: &'a str,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ResendCodeRequest<'a> {
    pub email: &'a str,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Partial profile update; absent fields are left untouched by the backend.
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct UpdateProfileRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<&'a str>,
}

impl UpdateProfileRequest<'_> {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none()
    }
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest<'a> {
    pub current_password: &'a str,
    pub new_password: &'a str,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct DeleteAccountRequest<'a> {
    pub password: &'a str,
}

/// Body for `/wallet/deposit` and `/wallet/withdraw`.
#[derive(Clone, Copy, Debug, Serialize, PartialEq)]
pub struct WalletAmountRequest {
    pub amount: f64,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct CreateTicketRequest<'a> {
    pub subject: &'a str,
    pub message: &'a str,
}

// ==================== Responses ====================

/// Payload returned by login and verify-email.
///
/// `token` is optional because verify-email may confirm the address without
/// opening a session.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct AuthPayload {
    pub token: Option<String>,
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Option<String>,
    pub is_verified: Option<bool>,
    pub profile_picture: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Balance {
    #[serde(deserialize_with = "flexible_amount")]
    pub balance: f64,
    pub currency: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Transaction {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(deserialize_with = "flexible_amount")]
    pub amount: f64,
    pub status: String,
    pub reference: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Bet {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    pub event_name: String,
    #[serde(deserialize_with = "flexible_amount")]
    pub amount: f64,
    pub pick: String,
    #[serde(deserialize_with = "flexible_amount")]
    pub odds: f64,
    pub status: Option<String>,
    pub created_at: Option<String>,
}

impl Bet {
    /// Settlement status; bets without one are still pending.
    pub fn status_label(&self) -> &str {
        self.status.as_deref().unwrap_or("pending")
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Notification {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    pub title: Option<String>,
    pub message: String,
    pub read: bool,
    pub created_at: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct SupportTicket {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    pub subject: String,
    pub message: String,
    pub status: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct AdminUser {
    #[serde(deserialize_with = "flexible_id")]
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Option<String>,
    #[serde(alias = "isDisabled")]
    pub disabled: bool,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HealthStatus {
    pub status: Option<String>,
    pub uptime: Option<f64>,
}

/// JSON form of the profile-picture endpoint, used when the backend answers
/// with a pointer instead of streaming the image.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProfilePictureRef {
    #[serde(alias = "profilePicture", alias = "imageUrl")]
    pub url: String,
}

/// Accepts `"abc"`, `42` or `null` for identifiers.
fn flexible_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(id) => Ok(id),
        Value::Number(id) => Ok(id.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "invalid id: {}",
            crate::codec::value_kind(&other)
        ))),
    }
}

/// Accepts numbers, numeric strings (`"1500.50"`) and `null` for amounts.
fn flexible_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| serde::de::Error::custom("amount out of range")),
        Value::String(raw) => raw
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid amount: {raw}"))),
        Value::Null => Ok(0.0),
        other => Err(serde::de::Error::custom(format!(
            "invalid amount: {}",
            crate::codec::value_kind(&other)
        ))),
    }
}
