//! Record types exchanged with the REST API.
//!
//! The wire format is camelCase JSON with Mongo-style `_id` identifiers.
//! Fee and rank fields arrive as strings or numbers depending on who created
//! the record, so they are normalized to `Option<String>` here. Fields this
//! client does not know about are kept in `extra` and posted back verbatim.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::identity::Role;

fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

fn lenient_rating<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u8>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().map(|f| f.round() as u64))
            .and_then(|v| u8::try_from(v).ok()),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().map(|f| f.round() as u8),
        _ => None,
    })
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scholarship {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub scholarship_name: String,
    #[serde(default)]
    pub university_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degree: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scholarship_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_category: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub world_rank: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub tuition_fees: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub application_fee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Any subset of scholarship fields, sent as a PATCH body.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScholarshipPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scholarship_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub university_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degree: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scholarship_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world_rank: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tuition_fees: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_fee: Option<String>,
}

impl ScholarshipPatch {
    pub fn is_empty(&self) -> bool {
        self == &ScholarshipPatch::default()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub scholarship_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default)]
    pub user_email: String,
    #[serde(default)]
    pub scholarship_name: String,
    #[serde(default)]
    pub university_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scholarship_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degree: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub application_fee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrollment_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Application {
    pub fn is_paid(&self) -> bool {
        self.payment_status.as_deref() == Some("paid")
    }

    /// Build the application a student submits for `scholarship`.
    pub fn for_scholarship(
        scholarship: &Scholarship,
        scholarship_id: impl Into<String>,
        user_email: impl Into<String>,
        user_name: Option<String>,
    ) -> Self {
        Self {
            scholarship_id: scholarship_id.into(),
            user_name,
            user_email: user_email.into(),
            scholarship_name: scholarship.scholarship_name.clone(),
            university_name: scholarship.university_name.clone(),
            city: scholarship.city.clone(),
            country: scholarship.country.clone(),
            scholarship_category: scholarship.scholarship_category.clone(),
            degree: scholarship.degree.clone(),
            application_fee: scholarship.application_fee.clone(),
            ..Default::default()
        }
    }
}

/// Moderator-side changes to an application.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrollment_status: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub scholarship_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub university_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "imageURL", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_rating", skip_serializing_if = "Option::is_none")]
    pub rating_point: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPatch {
    pub rating_point: u8,
    pub review_comment: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "photoURL", default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserRecord {
    /// The parsed role, if the record carries a known one.
    pub fn role(&self) -> Option<Role> {
        self.role.as_deref().and_then(|r| Role::parse(r).ok())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePatch {
    pub role: Role,
}

/// Body of the role lookup endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct RoleLookup {
    #[serde(default)]
    pub role: Option<String>,
}

/// Checkout session creation request sent to the payment gateway endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub application_fee: Option<String>,
    pub id: String,
    pub email: String,
    pub scholarship_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    #[serde(default)]
    pub url: Option<String>,
}

/// Acknowledgement returned by create endpoints.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertResult {
    #[serde(default)]
    pub inserted_id: Option<String>,
    #[serde(default)]
    pub acknowledged: Option<bool>,
}

/// Acknowledgement returned by patch/delete endpoints.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteResult {
    #[serde(default)]
    pub modified_count: Option<u64>,
    #[serde(default)]
    pub deleted_count: Option<u64>,
    #[serde(default)]
    pub acknowledged: Option<bool>,
}
