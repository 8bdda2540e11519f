//! Decoded submissions and their projection onto the fixed lead fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Body member consulted when no idempotency key header is supplied.
pub const IDEMPOTENCY_KEY_MEMBER: &str = "idempotencyKey";

#[derive(Debug, Error)]
#[error("submission body must be a JSON object, got {0}")]
pub struct NotAnObject(&'static str);

/// A decoded submission body.
///
/// Any JSON object is accepted. Members are not validated; unknown members
/// survive only in the raw capture.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission(Map<String, Value>);

impl Submission {
    /// Accept a decoded JSON value, rejecting arrays and scalars.
    pub fn from_value(value: Value) -> Result<Self, NotAnObject> {
        match value {
            Value::Object(members) => Ok(Self(members)),
            Value::Array(_) => Err(NotAnObject("array")),
            Value::String(_) => Err(NotAnObject("string")),
            Value::Number(_) => Err(NotAnObject("number")),
            Value::Bool(_) => Err(NotAnObject("boolean")),
            Value::Null => Err(NotAnObject("null")),
        }
    }

    /// String member lookup. Absent, `null`, and non-string members are `None`.
    pub fn string_member(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// The body's own `idempotencyKey`, if it carries a string one.
    pub fn idempotency_key_hint(&self) -> Option<&str> {
        self.string_member(IDEMPOTENCY_KEY_MEMBER)
    }

    /// The verbatim payload as stored in the raw capture.
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

/// The fixed set of nullable descriptive fields of a normalized lead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadFields {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub source: Option<String>,
    pub campaign: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_term: Option<String>,
    pub utm_content: Option<String>,
    pub landing_page: Option<String>,
    pub referrer: Option<String>,
    pub description: Option<String>,
}

/// `(column, body member)` pairs in table column order.
pub const FIELD_NAMES: [(&str, &str); 16] = [
    ("first_name", "firstName"),
    ("last_name", "lastName"),
    ("email", "email"),
    ("phone", "phone"),
    ("company", "company"),
    ("job_title", "jobTitle"),
    ("source", "source"),
    ("campaign", "campaign"),
    ("utm_source", "utmSource"),
    ("utm_medium", "utmMedium"),
    ("utm_campaign", "utmCampaign"),
    ("utm_term", "utmTerm"),
    ("utm_content", "utmContent"),
    ("landing_page", "landingPage"),
    ("referrer", "referrer"),
    ("description", "description"),
];

impl LeadFields {
    /// Project a submission field by field.
    ///
    /// A field is set only when its member is present and holds a string.
    /// There is no coercion: numbers, booleans, objects and `null` all
    /// project to `None`. Empty strings are kept.
    pub fn from_submission(submission: &Submission) -> Self {
        let [
            first_name,
            last_name,
            email,
            phone,
            company,
            job_title,
            source,
            campaign,
            utm_source,
            utm_medium,
            utm_campaign,
            utm_term,
            utm_content,
            landing_page,
            referrer,
            description,
        ] = FIELD_NAMES.map(|(_, member)| submission.string_member(member).map(str::to_owned));

        Self {
            first_name,
            last_name,
            email,
            phone,
            company,
            job_title,
            source,
            campaign,
            utm_source,
            utm_medium,
            utm_campaign,
            utm_term,
            utm_content,
            landing_page,
            referrer,
            description,
        }
    }

    /// Field values in [`FIELD_NAMES`] order.
    pub fn values(&self) -> [Option<&str>; 16] {
        [
            self.first_name.as_deref(),
            self.last_name.as_deref(),
            self.email.as_deref(),
            self.phone.as_deref(),
            self.company.as_deref(),
            self.job_title.as_deref(),
            self.source.as_deref(),
            self.campaign.as_deref(),
            self.utm_source.as_deref(),
            self.utm_medium.as_deref(),
            self.utm_campaign.as_deref(),
            self.utm_term.as_deref(),
            self.utm_content.as_deref(),
            self.landing_page.as_deref(),
            self.referrer.as_deref(),
            self.description.as_deref(),
        ]
    }

    /// Rebuild from values in [`FIELD_NAMES`] order.
    pub fn from_values(values: [Option<String>; 16]) -> Self {
        let [
            first_name,
            last_name,
            email,
            phone,
            company,
            job_title,
            source,
            campaign,
            utm_source,
            utm_medium,
            utm_campaign,
            utm_term,
            utm_content,
            landing_page,
            referrer,
            description,
        ] = values;

        Self {
            first_name,
            last_name,
            email,
            phone,
            company,
            job_title,
            source,
            campaign,
            utm_source,
            utm_medium,
            utm_campaign,
            utm_term,
            utm_content,
            landing_page,
            referrer,
            description,
        }
    }
}
