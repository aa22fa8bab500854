//! Intervention entity model and DTOs.

use coldline_core::access::Participants;
use coldline_core::change::InterventionSnapshot;
use coldline_core::types::{DbId, Timestamp};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::user::UserRef;

/// A row from the `interventions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Intervention {
    pub id: DbId,
    pub client_id: DbId,
    pub equipment_category: String,
    pub urgency: String,
    pub description: String,
    pub temperature_reading: Option<f64>,
    pub energy_source: Option<String>,
    pub haccp_compliant: bool,
    pub photos: Vec<String>,
    pub status: String,
    pub technician_id: Option<DbId>,
    pub created_by: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Intervention {
    pub fn participants(&self) -> Participants {
        Participants {
            created_by: self.created_by,
            technician_id: self.technician_id,
        }
    }

    pub fn snapshot(&self) -> InterventionSnapshot<'_> {
        InterventionSnapshot {
            client_id: self.client_id,
            status: &self.status,
            temperature_reading: self.temperature_reading,
            haccp_compliant: self.haccp_compliant,
        }
    }
}

/// Deserialize a field that was present in the body, `null` included.
///
/// Paired with `#[serde(default)]`, an absent field stays `None` while an
/// explicit `null` becomes `Some(null)` (or `Some(None)` for an optional
/// inner type).
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Request body for creating an intervention.
///
/// Required fields are optional here so a missing one is reported as a
/// field-level validation error rather than a body rejection. `photos` is
/// captured only so its presence can be rejected, even as `null`: photos are
/// attached after creation.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateIntervention {
    pub client_id: Option<DbId>,
    pub equipment_category: Option<String>,
    pub urgency: Option<String>,
    #[validate(length(
        min = 1,
        max = 5000,
        message = "must be between 1 and 5000 characters"
    ))]
    pub description: Option<String>,
    #[validate(range(
        min = -60.0,
        max = 60.0,
        message = "must be between -60 and 60 °C"
    ))]
    pub temperature_reading: Option<f64>,
    pub energy_source: Option<String>,
    pub haccp_compliant: Option<bool>,
    #[serde(default, deserialize_with = "present")]
    pub photos: Option<serde_json::Value>,
}

/// Validated, normalised input for a new row.
#[derive(Debug, Clone)]
pub struct NewIntervention {
    pub client_id: DbId,
    pub equipment_category: String,
    pub urgency: String,
    pub description: String,
    pub temperature_reading: Option<f64>,
    pub energy_source: Option<String>,
    pub haccp_compliant: bool,
    pub created_by: DbId,
}

/// Partial update. Absent fields are left unchanged; `photos` replaces the
/// whole list.
///
/// `temperature_reading` and `technician_id` can be cleared: `Some(None)`
/// is an explicit `null` in the body.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateIntervention {
    pub client_id: Option<DbId>,
    pub equipment_category: Option<String>,
    pub urgency: Option<String>,
    #[validate(length(
        min = 1,
        max = 5000,
        message = "must be between 1 and 5000 characters"
    ))]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub temperature_reading: Option<Option<f64>>,
    pub energy_source: Option<String>,
    pub haccp_compliant: Option<bool>,
    #[validate(length(max = 3, message = "at most 3 photos"))]
    pub photos: Option<Vec<String>>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub technician_id: Option<Option<DbId>>,
}

/// Request body for the single-field status change.
#[derive(Debug, Deserialize)]
pub struct ChangeInterventionStatus {
    pub status: String,
}

/// Query parameters for listing interventions.
#[derive(Debug, Default, Deserialize)]
pub struct InterventionListParams {
    pub status: Option<String>,
    pub client_id: Option<DbId>,
    pub technician_id: Option<DbId>,
    pub equipment_category: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Normalised list filter handed to the store.
///
/// `participant` restricts results to records the user created or is
/// assigned to; it is set for every non-admin caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterventionFilter {
    pub status: Option<String>,
    pub client_id: Option<DbId>,
    pub technician_id: Option<DbId>,
    pub equipment_category: Option<String>,
    pub participant: Option<DbId>,
    pub limit: i64,
    pub offset: i64,
}

impl InterventionFilter {
    /// Whether `record` satisfies every set criterion (pagination aside).
    pub fn matches(&self, record: &Intervention) -> bool {
        self.status.as_deref().map_or(true, |s| record.status == s)
            && self.client_id.map_or(true, |c| record.client_id == c)
            && self.technician_id.map_or(true, |t| record.technician_id == Some(t))
            && self
                .equipment_category
                .as_deref()
                .map_or(true, |e| record.equipment_category == e)
            && self
                .participant
                .map_or(true, |p| record.created_by == p || record.technician_id == Some(p))
    }
}

/// Lightweight reference to the equipment category.
#[derive(Debug, Clone, Serialize)]
pub struct EquipmentRef {
    pub code: String,
    pub label: String,
}

/// An intervention with its references populated for single-record reads.
#[derive(Debug, Clone, Serialize)]
pub struct InterventionDetail {
    #[serde(flatten)]
    pub intervention: Intervention,
    pub client: Option<UserRef>,
    pub technician: Option<UserRef>,
    pub equipment: EquipmentRef,
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn record() -> Intervention {
        Intervention {
            id: 1,
            client_id: 2,
            equipment_category: "ventilation".into(),
            urgency: "scheduled".into(),
            description: "Fan noise".into(),
            temperature_reading: None,
            energy_source: None,
            haccp_compliant: false,
            photos: vec![],
            status: "pending".into(),
            technician_id: Some(9),
            created_by: 3,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(InterventionFilter::default().matches(&record()));
    }

    #[test]
    fn participant_filter_accepts_creator_and_technician() {
        let r = record();
        let creator = InterventionFilter { participant: Some(3), ..Default::default() };
        let tech = InterventionFilter { participant: Some(9), ..Default::default() };
        let other = InterventionFilter { participant: Some(2), ..Default::default() };
        assert!(creator.matches(&r));
        assert!(tech.matches(&r));
        assert!(!other.matches(&r), "client who did not create the record is not a participant");
    }

    #[test]
    fn field_filters_combine() {
        let r = record();
        let f = InterventionFilter {
            status: Some("pending".into()),
            equipment_category: Some("ventilation".into()),
            ..Default::default()
        };
        assert!(f.matches(&r));
        let f = InterventionFilter { status: Some("completed".into()), ..f };
        assert!(!f.matches(&r));
    }

    #[test]
    fn update_rejects_more_than_three_photos() {
        let patch = UpdateIntervention {
            photos: Some(vec!["a".into(), "b".into(), "c".into(), "d".into()]),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
    }

    #[test]
    fn null_photos_on_create_is_kept_as_present() {
        let absent: CreateIntervention = serde_json::from_str(r#"{"description":"x"}"#).unwrap();
        let null: CreateIntervention =
            serde_json::from_str(r#"{"description":"x","photos":null}"#).unwrap();
        assert!(absent.photos.is_none());
        assert_eq!(null.photos, Some(serde_json::Value::Null));
    }

    #[test]
    fn update_distinguishes_null_from_absent() {
        let patch: UpdateIntervention =
            serde_json::from_str(r#"{"temperature_reading":null,"technician_id":7}"#).unwrap();
        assert_eq!(patch.temperature_reading, Some(None));
        assert_eq!(patch.technician_id, Some(Some(7)));

        let patch: UpdateIntervention = serde_json::from_str(r#"{"description":"y"}"#).unwrap();
        assert_eq!(patch.temperature_reading, None);
        assert_eq!(patch.technician_id, None);
    }

    #[test]
    fn create_rejects_out_of_range_temperature() {
        let input = CreateIntervention {
            equipment_category: Some("ventilation".into()),
            description: Some("x".into()),
            temperature_reading: Some(120.0),
            ..Default::default()
        };
        assert!(input.validate().is_err());
    }
}
