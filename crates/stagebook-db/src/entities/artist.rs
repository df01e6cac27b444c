use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_CATEGORY: &str = "Other";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApprovalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("unknown status: {other}")),
        }
    }
}

/// A performer's profile together with its application status.
///
/// This is both the stored and the wire representation. Reading is lenient
/// so that older or hand-edited collections can still be loaded; see
/// [`Model::from_stored`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub category: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub city: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub bio: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub experience: String,
    #[serde(default, deserialize_with = "lenient_languages")]
    pub languages: Vec<String>,
    #[serde(default, deserialize_with = "lenient_fee")]
    pub fee: u64,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub status: ApprovalStatus,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "lenient_opt_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_opt_timestamp")]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub reviewed_by: Option<String>,
}

impl Model {
    /// Parses one stored collection entry. Entries that are not objects, lack
    /// a string `id` or `name`, carry an unknown status or have no valid
    /// `createdAt` are rejected.
    pub fn from_stored(entry: &Value) -> Option<Self> {
        let obj = entry.as_object()?;
        let id = obj.get("id")?.as_str()?;
        obj.get("name")?.as_str()?;
        if id.trim().is_empty() {
            return None;
        }

        match serde_json::from_value::<Self>(entry.clone()) {
            Ok(mut model) => {
                model.sanitize();
                // A rejection without a reason cannot stand; send it back to review.
                if model.status == ApprovalStatus::Rejected && model.rejection_reason.is_none() {
                    tracing::warn!(id, "rejected artist has no reason, reopening as pending");
                    model.status = ApprovalStatus::Pending;
                }
                Some(model)
            }
            Err(e) => {
                tracing::warn!(id, "dropping unreadable artist entry: {e}");
                None
            }
        }
    }

    /// Restores the record invariants: trimmed languages, a category, no
    /// empty image URL, and a rejection reason only on rejected records.
    pub fn sanitize(&mut self) {
        self.languages = normalize_languages(std::mem::take(&mut self.languages));
        if self.category.trim().is_empty() {
            self.category = DEFAULT_CATEGORY.to_string();
        }
        self.image_url = non_empty(self.image_url.take());
        self.rejection_reason = match self.status {
            ApprovalStatus::Rejected => non_empty(self.rejection_reason.take()),
            _ => None,
        };
    }

    pub(crate) fn apply(&mut self, changes: ArtistUpdate, now: DateTime<Utc>) {
        if let Some(name) = non_empty(changes.name) {
            self.name = name;
        }
        if let Some(email) = non_empty(changes.email) {
            self.email = email;
        }
        if let Some(phone) = changes.phone {
            self.phone = phone.trim().to_string();
        }
        if let Some(category) = changes.category {
            self.category = category.trim().to_string();
        }
        if let Some(city) = changes.city {
            self.city = city.trim().to_string();
        }
        if let Some(bio) = changes.bio {
            self.bio = bio;
        }
        if let Some(experience) = changes.experience {
            self.experience = experience;
        }
        if let Some(languages) = changes.languages {
            self.languages = languages;
        }
        if let Some(fee) = changes.fee {
            self.fee = fee;
        }
        if let Some(url) = changes.image_url {
            self.image_url = Some(url);
        }
        if let Some(status) = changes.status {
            self.status = status;
            if status != ApprovalStatus::Pending {
                self.reviewed_at = Some(now);
                if let Some(reviewer) = non_empty(changes.reviewed_by) {
                    self.reviewed_by = Some(reviewer);
                }
            }
        }
        if let Some(reason) = changes.rejection_reason {
            self.rejection_reason = Some(reason);
        }
        self.updated_at = Some(now);
        self.sanitize();
    }

    pub fn matches(&self, filter: &ArtistFilter) -> bool {
        if let Some(status) = filter.status {
            if self.status != status {
                return false;
            }
        }
        if let Some(category) = filter.category.as_deref().map(str::trim) {
            if !category.is_empty() && !self.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }
        if let Some(city) = filter.city.as_deref().map(str::trim) {
            if !city.is_empty() && !self.city.eq_ignore_ascii_case(city) {
                return false;
            }
        }
        if let Some(q) = filter.q.as_deref().map(str::trim) {
            if !q.is_empty() {
                let q = q.to_lowercase();
                return [&self.name, &self.category, &self.city, &self.bio]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&q));
            }
        }
        true
    }
}

/// Input of the create operation.
///
/// Deserializes leniently from a JSON request body: `languages` may be an
/// array or a comma-separated string and `fee` a number or a formatted
/// string such as `"1,200.50"`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewArtist {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub category: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub city: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub bio: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub experience: String,
    #[serde(default, deserialize_with = "lenient_languages")]
    pub languages: Vec<String>,
    #[serde(default, deserialize_with = "lenient_fee")]
    pub fee: u64,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl NewArtist {
    pub(crate) fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.email = self.email.trim().to_string();
        self.phone = self.phone.trim().to_string();
        self.category = self.category.trim().to_string();
        self.city = self.city.trim().to_string();
        self.languages = normalize_languages(self.languages);
        self.image_url = non_empty(self.image_url);
        self
    }

    /// Names of the required fields that are empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push("name");
        }
        if self.email.trim().is_empty() {
            missing.push("email");
        }
        missing
    }
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArtistUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub category: Option<String>,
    pub city: Option<String>,
    pub bio: Option<String>,
    pub experience: Option<String>,
    pub languages: Option<Vec<String>>,
    pub fee: Option<u64>,
    pub image_url: Option<String>,
    pub status: Option<ApprovalStatus>,
    pub rejection_reason: Option<String>,
    pub reviewed_by: Option<String>,
}

impl ArtistUpdate {
    /// An approve/reject/reopen decision.
    pub fn review(
        status: ApprovalStatus,
        rejection_reason: Option<String>,
        reviewed_by: impl Into<String>,
    ) -> Self {
        Self {
            status: Some(status),
            rejection_reason,
            reviewed_by: Some(reviewed_by.into()),
            ..Default::default()
        }
    }
}

/// Linear-scan filter used for public browsing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ArtistFilter {
    #[serde(default, deserialize_with = "status_filter")]
    pub status: Option<ApprovalStatus>,
    pub category: Option<String>,
    pub city: Option<String>,
    pub q: Option<String>,
}

impl ArtistFilter {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.category.is_none() && self.city.is_none() && self.q.is_none()
    }
}

// ─── Normalization helpers ─────────────────────────────────────────

/// Strips every character except digits and `.`, floors the result and
/// clamps it at zero. Fees are kept in whole currency units.
pub fn parse_fee(raw: &str) -> u64 {
    let numeric: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    numeric.parse::<f64>().map(fee_from_f64).unwrap_or(0)
}

fn fee_from_f64(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.floor() as u64
    } else {
        0
    }
}

/// Splits a comma-separated language list.
pub fn parse_languages(raw: &str) -> Vec<String> {
    normalize_languages(raw.split(',').map(str::to_string).collect())
}

pub fn normalize_languages(languages: Vec<String>) -> Vec<String> {
    languages
        .into_iter()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_opt_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Query-string status: case-insensitive, empty means no filter.
fn status_filter<'de, D>(deserializer: D) -> Result<Option<ApprovalStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => {
            raw.parse().map(Some).map_err(serde::de::Error::custom)
        }
        _ => Ok(None),
    }
}

fn lenient_languages<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => normalize_languages(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
        ),
        Value::String(s) => parse_languages(&s),
        _ => Vec::new(),
    })
}

fn lenient_fee<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().unwrap_or_else(|| n.as_f64().map(fee_from_f64).unwrap_or(0)),
        Value::String(s) => parse_fee(&s),
        _ => 0,
    })
}
