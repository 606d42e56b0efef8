//! Intervention domain model.
//!
//! # Responsibility
//! - Define the canonical intervention record and its wire shape.
//! - Define `InterventionDraft`, the pre-identity form state.
//! - Enforce required-field validation before any store call.
//!
//! # Invariants
//! - `brand`, `model` and `fault` are non-empty at creation time.
//! - Optional text fields are empty strings, never absent.
//! - `date` is kept as text; no calendar arithmetic is performed.

use serde::{Deserialize, Deserializer, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Opaque record identifier.
///
/// UUID text when assigned client-side; whatever the backend returns when
/// assigned server-side.
pub type InterventionId = String;

/// Persisted intervention fields, excluding the identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Date,
    Brand,
    Model,
    SerialNumber,
    MeterReading,
    Fault,
    Resolution,
    Comment,
}

impl Field {
    /// All fields in canonical display/export order.
    pub const ALL: [Field; 8] = [
        Field::Date,
        Field::Brand,
        Field::Model,
        Field::SerialNumber,
        Field::MeterReading,
        Field::Fault,
        Field::Resolution,
        Field::Comment,
    ];

    /// Wire name used in JSON payloads and configuration.
    pub fn name(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Brand => "brand",
            Self::Model => "model",
            Self::SerialNumber => "serialNumber",
            Self::MeterReading => "meterReading",
            Self::Fault => "fault",
            Self::Resolution => "resolution",
            Self::Comment => "comment",
        }
    }

    /// Human-readable column label used by the CSV export.
    pub fn label(self) -> &'static str {
        match self {
            Self::Date => "Date",
            Self::Brand => "Marque",
            Self::Model => "Modèle",
            Self::SerialNumber => "N° Série",
            Self::MeterReading => "Horamètre",
            Self::Fault => "Panne",
            Self::Resolution => "Résolution",
            Self::Comment => "Commentaire",
        }
    }

    /// Resolves a wire name. Matching ignores ASCII case and surrounding
    /// whitespace.
    pub fn parse(name: &str) -> Option<Field> {
        let trimmed = name.trim();
        Self::ALL
            .into_iter()
            .find(|field| field.name().eq_ignore_ascii_case(trimmed))
    }

    fn is_required(self) -> bool {
        matches!(self, Self::Brand | Self::Model | Self::Fault)
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Draft validation errors, raised before any store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is empty or whitespace-only.
    MissingField(Field),
    /// A field name did not resolve to any known field.
    UnknownField(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "required field `{field}` is empty"),
            Self::UnknownField(name) => write!(f, "unknown intervention field `{name}`"),
        }
    }
}

impl Error for ValidationError {}

/// Canonical persisted intervention record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intervention {
    /// Stable identifier, immutable once assigned.
    pub id: InterventionId,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub date: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub brand: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub model: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub serial_number: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub meter_reading: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub fault: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub resolution: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub comment: String,
}

impl Intervention {
    /// Builds a record from a draft and an identifier.
    ///
    /// Does not validate; callers run `InterventionDraft::validate` first.
    pub fn from_draft(id: impl Into<InterventionId>, draft: InterventionDraft) -> Self {
        Self {
            id: id.into(),
            date: draft.date,
            brand: draft.brand,
            model: draft.model,
            serial_number: draft.serial_number,
            meter_reading: draft.meter_reading,
            fault: draft.fault,
            resolution: draft.resolution,
            comment: draft.comment,
        }
    }

    /// Returns the text stored in `field`.
    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::Date => &self.date,
            Field::Brand => &self.brand,
            Field::Model => &self.model,
            Field::SerialNumber => &self.serial_number,
            Field::MeterReading => &self.meter_reading,
            Field::Fault => &self.fault,
            Field::Resolution => &self.resolution,
            Field::Comment => &self.comment,
        }
    }
}

/// Form state for a not-yet-created intervention.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InterventionDraft {
    pub date: String,
    pub brand: String,
    pub model: String,
    pub serial_number: String,
    pub meter_reading: String,
    pub fault: String,
    pub resolution: String,
    pub comment: String,
}

impl InterventionDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of this draft with `field` replaced by `value`.
    pub fn with_field(mut self, field: Field, value: impl Into<String>) -> Self {
        let value = value.into();
        match field {
            Field::Date => self.date = value,
            Field::Brand => self.brand = value,
            Field::Model => self.model = value,
            Field::SerialNumber => self.serial_number = value,
            Field::MeterReading => self.meter_reading = value,
            Field::Fault => self.fault = value,
            Field::Resolution => self.resolution = value,
            Field::Comment => self.comment = value,
        }
        self
    }

    /// Same as [`InterventionDraft::with_field`], keyed by wire name.
    ///
    /// # Errors
    /// - `ValidationError::UnknownField` when `name` is not a field name.
    pub fn with_named_field(
        self,
        name: &str,
        value: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let field =
            Field::parse(name).ok_or_else(|| ValidationError::UnknownField(name.to_string()))?;
        Ok(self.with_field(field, value))
    }

    /// Returns the text stored in `field`.
    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::Date => &self.date,
            Field::Brand => &self.brand,
            Field::Model => &self.model,
            Field::SerialNumber => &self.serial_number,
            Field::MeterReading => &self.meter_reading,
            Field::Fault => &self.fault,
            Field::Resolution => &self.resolution,
            Field::Comment => &self.comment,
        }
    }

    /// Checks required fields in canonical order.
    ///
    /// # Errors
    /// - `ValidationError::MissingField` naming the first empty required field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match Field::ALL
            .into_iter()
            .filter(|field| field.is_required())
            .find(|field| self.value(*field).trim().is_empty())
        {
            Some(field) => Err(ValidationError::MissingField(field)),
            None => Ok(()),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::{Field, Intervention, InterventionDraft, ValidationError};

    fn komatsu_draft() -> InterventionDraft {
        InterventionDraft::new()
            .with_field(Field::Date, "2024-01-01")
            .with_field(Field::Brand, "Komatsu")
            .with_field(Field::Model, "PC200")
            .with_field(Field::Fault, "oil leak")
    }

    #[test]
    fn with_field_leaves_original_untouched() {
        let base = komatsu_draft();
        let changed = base.clone().with_field(Field::Comment, "checked seals");
        assert_eq!(base.comment, "");
        assert_eq!(changed.comment, "checked seals");
        assert_eq!(changed.brand, "Komatsu");
    }

    #[test]
    fn with_named_field_resolves_wire_names() {
        let draft = InterventionDraft::new()
            .with_named_field("serialNumber", "SN-1")
            .unwrap()
            .with_named_field(" METERREADING ", "1200 h")
            .unwrap();
        assert_eq!(draft.serial_number, "SN-1");
        assert_eq!(draft.meter_reading, "1200 h");

        let err = InterventionDraft::new()
            .with_named_field("owner", "x")
            .unwrap_err();
        assert_eq!(err, ValidationError::UnknownField("owner".to_string()));
    }

    #[test]
    fn validate_reports_first_missing_required_field() {
        assert!(komatsu_draft().validate().is_ok());

        let no_model = komatsu_draft().with_field(Field::Model, "");
        assert_eq!(
            no_model.validate(),
            Err(ValidationError::MissingField(Field::Model))
        );

        let blank_brand = komatsu_draft()
            .with_field(Field::Brand, "   ")
            .with_field(Field::Fault, "");
        assert_eq!(
            blank_brand.validate(),
            Err(ValidationError::MissingField(Field::Brand))
        );
    }

    #[test]
    fn optional_fields_may_stay_empty() {
        let draft = komatsu_draft().with_field(Field::Date, "");
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn serde_uses_camel_case_and_fills_missing_or_null_fields() {
        let record = Intervention::from_draft("id-1", komatsu_draft());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["serialNumber"], "");
        assert_eq!(json["fault"], "oil leak");

        let parsed: Intervention = serde_json::from_str(
            r#"{"id":"id-2","brand":"CAT","model":"320","fault":"hydraulics","comment":null}"#,
        )
        .unwrap();
        assert_eq!(parsed.comment, "");
        assert_eq!(parsed.date, "");
        assert_eq!(parsed.value(Field::Fault), "hydraulics");
    }

    #[test]
    fn field_parse_round_trips_every_name() {
        for field in Field::ALL {
            assert_eq!(Field::parse(field.name()), Some(field));
        }
        assert_eq!(Field::parse("id"), None);
    }
}
