//! Signed-in landing view: five independent sources loaded in one pass.

use serde::de::DeserializeOwned;
use serde_json::Value;

use protocol::{
    Balance, Notification, Transaction, UserProfile, decode_list_lenient, decode_record,
};

use crate::aggregate::{AggregateWarning, AggregationLoader, FetchOutcome, FetchSpec};
use crate::api::{Api, ProfilePicture};
use crate::error::{ClientError, Result};
use crate::gateway::Payload;

pub const PROFILE: &str = "profile";
pub const PICTURE: &str = "picture";
pub const BALANCE: &str = "balance";
pub const TRANSACTIONS: &str = "transactions";
pub const NOTIFICATIONS: &str = "notifications";

/// Everything the dashboard shows. Sections that failed or came back
/// malformed hold their empty default and are listed in `failed_sections` or
/// `warnings`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardView {
    pub profile: Option<UserProfile>,
    pub picture: Option<ProfilePicture>,
    pub balance: f64,
    pub transactions: Vec<Transaction>,
    pub notifications: Vec<Notification>,
    pub failed_sections: Vec<String>,
    pub warnings: Vec<AggregateWarning>,
}

impl DashboardView {
    pub fn is_complete(&self) -> bool {
        self.failed_sections.is_empty() && self.warnings.is_empty()
    }

    pub fn unread_notifications(&self) -> usize {
        self.notifications.iter().filter(|n| !n.read).count()
    }
}

pub struct Dashboard {
    api: Api,
    loader: AggregationLoader,
}

impl Dashboard {
    pub fn new(api: Api) -> Self {
        Self {
            api,
            loader: AggregationLoader::new(),
        }
    }

    pub async fn load(&self) -> Result<DashboardView> {
        let session = self.api.gateway().session().get();
        if !session.is_authenticated() {
            return Err(ClientError::AuthExpired);
        }
        let user_id = session
            .user_id()
            .map(str::to_string)
            .ok_or_else(|| ClientError::Auth("Failed to load user data.".to_string()))?;

        let specs = vec![
            FetchSpec::record(PROFILE, self.api.profile_payload(&user_id)),
            FetchSpec::opaque(PICTURE, self.api.profile_picture_payload()),
            FetchSpec::record(BALANCE, self.api.balance_payload()),
            FetchSpec::list(TRANSACTIONS, self.api.transactions_payload()),
            FetchSpec::list(NOTIFICATIONS, self.api.notifications_payload()),
        ];

        let (entries, warnings) = self.loader.load_all(specs).await.into_parts();

        let mut view = DashboardView {
            warnings,
            ..DashboardView::default()
        };

        for (name, outcome) in entries {
            let payload = match outcome {
                FetchOutcome::Loaded(payload) => payload,
                FetchOutcome::Failed(failure) => {
                    view.failed_sections.push(failure.name);
                    continue;
                }
            };

            match name.as_str() {
                PROFILE => view.profile = read_record(&name, payload, &mut view.warnings),
                PICTURE => {
                    view.picture = match ProfilePicture::from_payload(self.api.picture_format(), payload) {
                        Ok(picture) => picture,
                        Err(err) => {
                            view.warnings.push(warning(&name, err.to_string()));
                            None
                        }
                    }
                }
                BALANCE => {
                    view.balance = read_record::<Balance>(&name, payload, &mut view.warnings)
                        .map(|b| b.balance)
                        .unwrap_or_default()
                }
                TRANSACTIONS => {
                    view.transactions = read_items(&name, payload, &mut view.warnings)
                }
                NOTIFICATIONS => {
                    view.notifications = read_items(&name, payload, &mut view.warnings)
                }
                _ => {}
            }
        }

        if !view.failed_sections.is_empty() {
            log::warn!(
                "Dashboard loaded with failed sections: {}",
                view.failed_sections.join(", ")
            );
        }

        Ok(view)
    }
}

fn read_record<T: DeserializeOwned>(
    name: &str,
    payload: Payload,
    warnings: &mut Vec<AggregateWarning>,
) -> Option<T> {
    match payload {
        Payload::Json(Value::Null) => None,
        Payload::Json(value) => match decode_record(value) {
            Ok(record) => Some(record),
            Err(err) => {
                warnings.push(warning(name, err.to_string()));
                None
            }
        },
        Payload::Binary { .. } => {
            warnings.push(warning(name, "unexpected binary body".to_string()));
            None
        }
    }
}

fn read_items<T: DeserializeOwned>(
    name: &str,
    payload: Payload,
    warnings: &mut Vec<AggregateWarning>,
) -> Vec<T> {
    let Payload::Json(value) = payload else {
        warnings.push(warning(name, "unexpected binary body".to_string()));
        return Vec::new();
    };

    match decode_list_lenient(value) {
        Ok(list) => {
            if list.skipped > 0 {
                warnings.push(warning(
                    name,
                    format!("skipped {} item(s) that did not decode", list.skipped),
                ));
            }
            list.items
        }
        Err(err) => {
            warnings.push(warning(name, err.to_string()));
            Vec::new()
        }
    }
}

fn warning(name: &str, reason: String) -> AggregateWarning {
    log::warn!("{}: {}", name, reason);
    AggregateWarning {
        name: name.to_string(),
        reason,
    }
}
