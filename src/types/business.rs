//! Business registry records as returned by the API.

use serde::{Deserialize, Serialize};

use super::filters::{AbnStatus, AustralianState, EntityType};
use crate::{LookupError, Result};

/// Number of digits in an Australian Business Number.
pub const ABN_LEN: usize = 11;

/// Canonical form of an ABN: whitespace removed, exactly 11 ASCII digits.
///
/// `"51 824 753 556"` becomes `"51824753556"`.
pub fn normalize_abn(raw: &str) -> Result<String> {
    let abn: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if abn.len() != ABN_LEN || !abn.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LookupError::InvalidInput(format!(
            "ABN must be {ABN_LEN} digits, got '{}'",
            raw.trim()
        )));
    }
    Ok(abn)
}

/// A registered business (one ABN).
///
/// Code fields are kept as the raw strings the registry sends; use the typed
/// accessors to interpret them against the known option sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Business {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub abn: String,
    pub abn_status: String,
    #[serde(default)]
    pub abn_status_from: Option<String>,
    pub entity_type_code: String,
    pub entity_type_text: String,
    pub entity_name: String,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postcode: Option<String>,
    #[serde(default)]
    pub gst_status: Option<String>,
    #[serde(default)]
    pub gst_from_date: Option<String>,
    #[serde(default)]
    pub acn: Option<String>,
    #[serde(default)]
    pub record_last_updated: Option<String>,
    /// Trading and other names, present on detail lookups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_names: Option<Vec<BusinessName>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Business {
    /// Name to show for the business.
    ///
    /// Falls back to "given family" for individuals registered without an
    /// entity name.
    pub fn display_name(&self) -> String {
        if !self.entity_name.trim().is_empty() {
            return self.entity_name.clone();
        }
        [self.given_name.as_deref(), self.family_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Registration status, if it is one of the known codes.
    pub fn status(&self) -> Option<AbnStatus> {
        AbnStatus::from_code(&self.abn_status)
    }

    /// Entity type, if it is one of the known codes.
    pub fn entity_type(&self) -> Option<EntityType> {
        EntityType::from_code(&self.entity_type_code)
    }

    /// State of the main business address, if known.
    pub fn australian_state(&self) -> Option<AustralianState> {
        self.state.as_deref().and_then(AustralianState::from_code)
    }

    /// Names attached to the ABN (empty when the record carries none).
    pub fn names(&self) -> &[BusinessName] {
        self.business_names.as_deref().unwrap_or_default()
    }
}

/// A trading or other name registered against an ABN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessName {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_id: Option<u64>,
    pub name_type: String,
    pub name_text: String,
}
