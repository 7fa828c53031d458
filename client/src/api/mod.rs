//! Typed wrappers over the backend routes.
//!
//! Each method is a single gateway call. Reads decode through
//! `protocol::codec`; writes hand back the raw acknowledgement body since the
//! backend is not consistent about what it echoes.

use serde::Serialize;
use serde_json::Value;

use protocol::{
    AdminUser, AuthPayload, Balance, Bet, CodecError, CreateTicketRequest, DeleteAccountRequest,
    HealthStatus, LoginRequest, Notification, ProfilePictureRef, RegisterRequest, ResendCodeRequest,
    SupportTicket, Transaction, UpdatePasswordRequest, UpdateProfileRequest, UserProfile,
    VerifyEmailRequest, WalletAmountRequest, decode_list_lenient, decode_record, unwrap_named,
};

use crate::config::{ClientConfig, EndpointConfig, PictureFormat};
use crate::error::{ClientError, Result};
use crate::gateway::{
    Method, MultipartUpload, Payload, RequestBody, RequestGateway, RequestOptions,
};

const REGISTER: &str = "/auth/register";
const VERIFY_EMAIL: &str = "/auth/verify-email";
const RESEND_CODE: &str = "/auth/resend-code";
const LOGIN: &str = "/auth/login";
const ME: &str = "/users/me";
const UPDATE_PROFILE: &str = "/users/update-profile";
const UPDATE_PASSWORD: &str = "/users/update-password";
const DELETE_ACCOUNT: &str = "/users/delete-account";
const BALANCE: &str = "/account/balance";
const TRANSACTIONS: &str = "/account/transactions";
const DEPOSIT: &str = "/wallet/deposit";
const WITHDRAW: &str = "/wallet/withdraw";
const WALLET_HISTORY: &str = "/wallet/history";
const BETS: &str = "/bets";
const NOTIFICATIONS: &str = "/notifications";
const READ_ALL_NOTIFICATIONS: &str = "/notifications/read-all";
const SUPPORT_TICKETS: &str = "/support/tickets";
const ADMIN_USERS: &str = "/admin/users";
const HEALTH: &str = "/health";

/// Multipart field the upload route reads the image from.
pub const PROFILE_PICTURE_FIELD: &str = "profilePicture";

/// The signed-in user's avatar, in whichever form the backend serves it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfilePicture {
    Image {
        content_type: Option<String>,
        bytes: Vec<u8>,
    },
    Url(String),
}

impl ProfilePicture {
    /// Interprets a picture payload. `Ok(None)` means the user has no picture.
    pub fn from_payload(format: PictureFormat, payload: Payload) -> Result<Option<Self>> {
        match (format, payload) {
            (_, Payload::Binary { bytes, .. }) if bytes.is_empty() => Ok(None),
            (_, Payload::Binary { content_type, bytes }) => {
                Ok(Some(ProfilePicture::Image { content_type, bytes }))
            }
            (_, Payload::Json(Value::Null)) => Ok(None),
            (PictureFormat::JsonUrl, Payload::Json(value)) => {
                let pointer: ProfilePictureRef = decode_record(value)?;
                Ok(match pointer.url.trim() {
                    "" => None,
                    url => Some(ProfilePicture::Url(url.to_string())),
                })
            }
            (PictureFormat::Binary, Payload::Json(value)) => Err(CodecError::NotARecord {
                found: protocol::value_kind(&value),
            }
            .into()),
        }
    }
}

#[derive(Clone)]
pub struct Api {
    gateway: RequestGateway,
    endpoints: EndpointConfig,
    picture_format: PictureFormat,
}

impl Api {
    pub fn new(gateway: RequestGateway, config: &ClientConfig) -> Self {
        Self {
            gateway,
            endpoints: config.endpoints.clone(),
            picture_format: config.profile_picture,
        }
    }

    pub fn gateway(&self) -> &RequestGateway {
        &self.gateway
    }

    pub fn picture_format(&self) -> PictureFormat {
        self.picture_format
    }

    // ==================== Auth ====================

    pub async fn register(&self, request: &RegisterRequest<'_>) -> Result<Value> {
        self.anonymous_post(REGISTER, request).await
    }

    /// May or may not carry a token, depending on backend revision.
    pub async fn verify_email(&self, request: &VerifyEmailRequest<'_>) -> Result<AuthPayload> {
        let body = self.anonymous_post(VERIFY_EMAIL, request).await?;
        decode_auth(body)
    }

    pub async fn resend_code(&self, request: &ResendCodeRequest<'_>) -> Result<Value> {
        self.anonymous_post(RESEND_CODE, request).await
    }

    pub async fn login(&self, request: &LoginRequest<'_>) -> Result<AuthPayload> {
        let body = self.anonymous_post(LOGIN, request).await?;
        decode_auth(body)
    }

    // ==================== Users ====================

    pub async fn me(&self) -> Result<UserProfile> {
        Ok(decode_record(self.gateway.get(ME).await?)?)
    }

    pub async fn profile(&self, user_id: &str) -> Result<UserProfile> {
        Ok(decode_record(self.profile_payload(user_id).await?.into_json()?)?)
    }

    pub async fn profile_payload(&self, user_id: &str) -> Result<Payload> {
        let path = self.profile_path(user_id)?;
        self.gateway
            .send(Method::GET, &path, None, RequestOptions::default())
            .await
    }

    pub async fn update_profile(&self, request: &UpdateProfileRequest<'_>) -> Result<Value> {
        if request.is_empty() {
            return Err(ClientError::Validation("Nothing to update.".to_string()));
        }
        let body = RequestBody::json(request)?;
        self.gateway.put(UPDATE_PROFILE, Some(body)).await
    }

    pub async fn update_password(&self, request: &UpdatePasswordRequest<'_>) -> Result<Value> {
        if request.current_password.is_empty() || request.new_password.is_empty() {
            return Err(ClientError::Validation(
                "Current and new password are required.".to_string(),
            ));
        }
        let body = RequestBody::json(request)?;
        self.gateway.put(UPDATE_PASSWORD, Some(body)).await
    }

    pub async fn delete_account(&self, request: &DeleteAccountRequest<'_>) -> Result<Value> {
        if request.password.is_empty() {
            return Err(ClientError::Validation("Password is required.".to_string()));
        }
        let body = RequestBody::json(request)?;
        self.gateway.delete(DELETE_ACCOUNT, Some(body)).await
    }

    pub async fn profile_picture(&self) -> Result<Option<ProfilePicture>> {
        let payload = self.profile_picture_payload().await?;
        ProfilePicture::from_payload(self.picture_format, payload)
    }

    pub async fn profile_picture_payload(&self) -> Result<Payload> {
        let options = match self.picture_format {
            PictureFormat::Binary => RequestOptions::binary(),
            PictureFormat::JsonUrl => RequestOptions::default(),
        };
        self.gateway
            .send(Method::GET, &self.endpoints.profile_picture, None, options)
            .await
    }

    pub async fn upload_profile_picture(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<Value> {
        if bytes.is_empty() {
            return Err(ClientError::Validation("Please choose an image.".to_string()));
        }
        let upload = MultipartUpload {
            field: PROFILE_PICTURE_FIELD.to_string(),
            file_name: file_name.to_string(),
            content_type: content_type.map(str::to_string),
            bytes,
        };
        self.gateway
            .send(
                Method::POST,
                &self.endpoints.upload_profile_picture,
                Some(RequestBody::Multipart(upload)),
                RequestOptions::default(),
            )
            .await?
            .into_json()
    }

    // ==================== Account / wallet ====================

    pub async fn balance(&self) -> Result<Balance> {
        Ok(decode_record(self.balance_payload().await?.into_json()?)?)
    }

    pub async fn balance_payload(&self) -> Result<Payload> {
        self.gateway
            .send(Method::GET, BALANCE, None, RequestOptions::default())
            .await
    }

    pub async fn transactions(&self) -> Result<Vec<Transaction>> {
        read_list(TRANSACTIONS, self.transactions_payload().await?.into_json()?)
    }

    /// Always fetched uncached.
    pub async fn transactions_payload(&self) -> Result<Payload> {
        self.gateway
            .send(
                Method::GET,
                TRANSACTIONS,
                None,
                RequestOptions::default().no_store(),
            )
            .await
    }

    pub async fn deposit(&self, amount: f64) -> Result<Value> {
        let body = WalletAmountRequest {
            amount: checked_amount(amount)?,
        };
        self.gateway.post(DEPOSIT, &body).await
    }

    pub async fn withdraw(&self, amount: f64) -> Result<Value> {
        let body = WalletAmountRequest {
            amount: checked_amount(amount)?,
        };
        self.gateway.post(WITHDRAW, &body).await
    }

    pub async fn wallet_history(&self) -> Result<Vec<Transaction>> {
        read_list(WALLET_HISTORY, self.gateway.get(WALLET_HISTORY).await?)
    }

    /// Bets arrive under a `bets` key; an absent key means no bets.
    pub async fn bets(&self) -> Result<Vec<Bet>> {
        match unwrap_named(self.gateway.get(BETS).await?, "bets") {
            Value::Null => Ok(Vec::new()),
            list => read_list(BETS, list),
        }
    }

    // ==================== Notifications ====================

    pub async fn notifications(&self) -> Result<Vec<Notification>> {
        read_list(NOTIFICATIONS, self.notifications_payload().await?.into_json()?)
    }

    pub async fn notifications_payload(&self) -> Result<Payload> {
        self.gateway
            .send(Method::GET, NOTIFICATIONS, None, RequestOptions::default())
            .await
    }

    pub async fn mark_notification_read(&self, id: &str) -> Result<Value> {
        let path = format!("{}/read/{}", NOTIFICATIONS, path_segment(id)?);
        self.gateway.put(&path, None).await
    }

    pub async fn mark_all_notifications_read(&self) -> Result<Value> {
        self.gateway.put(READ_ALL_NOTIFICATIONS, None).await
    }

    // ==================== Support ====================

    pub async fn support_tickets(&self) -> Result<Vec<SupportTicket>> {
        read_list(SUPPORT_TICKETS, self.gateway.get(SUPPORT_TICKETS).await?)
    }

    pub async fn create_ticket(&self, subject: &str, message: &str) -> Result<Value> {
        let (subject, message) = (subject.trim(), message.trim());
        if subject.is_empty() || message.is_empty() {
            return Err(ClientError::Validation(
                "Subject and message are required.".to_string(),
            ));
        }
        self.gateway
            .post(SUPPORT_TICKETS, &CreateTicketRequest { subject, message })
            .await
    }

    // ==================== Admin ====================

    pub async fn admin_users(&self) -> Result<Vec<AdminUser>> {
        read_list(ADMIN_USERS, self.gateway.get(ADMIN_USERS).await?)
    }

    pub async fn disable_user(&self, user_id: &str) -> Result<Value> {
        let path = format!("/admin/disable/{}", path_segment(user_id)?);
        self.gateway.put(&path, None).await
    }

    pub async fn enable_user(&self, user_id: &str) -> Result<Value> {
        let path = format!("/admin/enable/{}", path_segment(user_id)?);
        self.gateway.put(&path, None).await
    }

    pub async fn delete_user(&self, user_id: &str) -> Result<Value> {
        let path = format!("/admin/delete/{}", path_segment(user_id)?);
        self.gateway.delete(&path, None).await
    }

    // ==================== System ====================

    /// Raw health document, as served.
    pub async fn health(&self) -> Result<Value> {
        self.gateway
            .send(Method::GET, HEALTH, None, RequestOptions::anonymous())
            .await?
            .into_json()
    }

    pub async fn health_status(&self) -> Result<HealthStatus> {
        Ok(decode_record(self.health().await?)?)
    }

    async fn anonymous_post<B: Serialize>(&self, path: &str, body: &B) -> Result<Value> {
        self.gateway
            .send(
                Method::POST,
                path,
                Some(RequestBody::json(body)?),
                RequestOptions::anonymous(),
            )
            .await?
            .into_json()
    }

    fn profile_path(&self, user_id: &str) -> Result<String> {
        Ok(self.endpoints.profile_path(path_segment(user_id)?))
    }
}

/// Auth bodies may be empty (`null`) when the backend only acknowledges.
fn decode_auth(body: Value) -> Result<AuthPayload> {
    match body {
        Value::Null => Ok(AuthPayload::default()),
        body => Ok(decode_record(body)?),
    }
}

fn read_list<T: serde::de::DeserializeOwned>(path: &str, body: Value) -> Result<Vec<T>> {
    let decoded = decode_list_lenient(body)?;
    if decoded.skipped > 0 {
        log::warn!(
            "{}: skipped {} item(s) that did not decode",
            path,
            decoded.skipped
        );
    }
    Ok(decoded.items)
}

fn checked_amount(amount: f64) -> Result<f64> {
    if amount.is_finite() && amount > 0.0 {
        Ok(amount)
    } else {
        Err(ClientError::Validation(
            "Amount must be a positive number.".to_string(),
        ))
    }
}

/// Ids are interpolated into paths, so they must be a single non-empty segment.
fn path_segment(id: &str) -> Result<&str> {
    let id = id.trim();
    if id.is_empty() || id.contains(['/', '?', '#']) {
        return Err(ClientError::Validation(format!("Invalid id '{}'", id)));
    }
    Ok(id)
}
