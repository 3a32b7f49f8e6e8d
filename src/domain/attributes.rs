//! Signup attribute bags.
//!
//! The collaborator hands signups over with a free-form JSON bag. It is parsed
//! once here into a tagged variant per activity kind, so the engines never
//! re-read raw keys.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::domain::model::ActivityKind;
use crate::utils::error::{FillError, Result};
use crate::utils::validation::require_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportRole {
    Fighter,
    Transporter,
}

impl fmt::Display for TransportRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportRole::Fighter => f.write_str("Fighter"),
            TransportRole::Transporter => f.write_str("Transporter"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportSignup {
    pub role: TransportRole,
    pub origin: String,
    pub destination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_partner: Option<String>,
}

impl TransportSignup {
    /// 去除空白後的偏好夥伴提示；空字串視為沒有提示
    pub fn partner_hint(&self) -> Option<&str> {
        self.preferred_partner
            .as_deref()
            .map(str::trim)
            .filter(|hint| !hint.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignupAttributes {
    Transport(TransportSignup),
    General { fields: Map<String, Value> },
}

impl SignupAttributes {
    /// 依活動類型解析外部傳入的屬性包
    pub fn from_raw(kind: ActivityKind, raw: &Value) -> Result<Self> {
        let fields = match raw {
            Value::Object(map) => map,
            Value::Null => {
                return match kind {
                    ActivityKind::Transport => Err(FillError::validation(
                        "Transport signups require role, origin and destination",
                    )),
                    _ => Ok(SignupAttributes::General { fields: Map::new() }),
                }
            }
            other => {
                return Err(FillError::validation(format!(
                    "Signup attributes must be an object, got {}",
                    other
                )))
            }
        };

        match kind {
            ActivityKind::Transport => Ok(SignupAttributes::Transport(parse_transport(fields)?)),
            _ => Ok(SignupAttributes::General {
                fields: fields.clone(),
            }),
        }
    }

    pub fn transport(&self) -> Option<&TransportSignup> {
        match self {
            SignupAttributes::Transport(transport) => Some(transport),
            SignupAttributes::General { .. } => None,
        }
    }

    pub fn role(&self) -> Option<TransportRole> {
        self.transport().map(|t| t.role)
    }
}

fn parse_transport(fields: &Map<String, Value>) -> Result<TransportSignup> {
    let role = match string_field(fields, "role")?.as_str() {
        "Fighter" => TransportRole::Fighter,
        "Transporter" => TransportRole::Transporter,
        other => {
            return Err(FillError::validation(format!(
                "Unknown transport role '{}', expected Fighter or Transporter",
                other
            )))
        }
    };

    let origin = require_text("origin", &string_field(fields, "origin")?)?;
    let destination = require_text("destination", &string_field(fields, "destination")?)?;

    let preferred_partner = match fields.get("preferredPartner") {
        None | Some(Value::Null) => None,
        Some(Value::String(hint)) => Some(hint.clone()),
        Some(other) => {
            return Err(FillError::validation(format!(
                "preferredPartner must be text, got {}",
                other
            )))
        }
    };

    Ok(TransportSignup {
        role,
        origin,
        destination,
        preferred_partner,
    })
}

fn string_field(fields: &Map<String, Value>, key: &str) -> Result<String> {
    match fields.get(key) {
        Some(Value::String(value)) => Ok(value.clone()),
        Some(other) => Err(FillError::validation(format!(
            "{} must be text, got {}",
            key, other
        ))),
        None => Err(FillError::validation(format!(
            "Transport signups require '{}'",
            key
        ))),
    }
}
