//! Intervention field enumerations, status transitions, and photo rules.
//!
//! Every enumerated column on the `interventions` table is stored as its
//! string code; the enums here parse and render those codes and carry the
//! human-readable labels shown in detail views.

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Equipment category constants
// ---------------------------------------------------------------------------

pub const EQUIPMENT_POSITIVE_COLD_ROOM: &str = "positive_cold_room";
pub const EQUIPMENT_NEGATIVE_COLD_ROOM: &str = "negative_cold_room";
pub const EQUIPMENT_REFRIGERATED_DISPLAY: &str = "refrigerated_display";
pub const EQUIPMENT_REFRIGERATION_PLANT: &str = "refrigeration_plant";
pub const EQUIPMENT_VENTILATION: &str = "ventilation";

/// All valid equipment categories.
pub const VALID_EQUIPMENT_CATEGORIES: &[&str] = &[
    EQUIPMENT_POSITIVE_COLD_ROOM,
    EQUIPMENT_NEGATIVE_COLD_ROOM,
    EQUIPMENT_REFRIGERATED_DISPLAY,
    EQUIPMENT_REFRIGERATION_PLANT,
    EQUIPMENT_VENTILATION,
];

// ---------------------------------------------------------------------------
// Urgency constants
// ---------------------------------------------------------------------------

pub const URGENCY_UNDER_4H: &str = "under_4h";
pub const URGENCY_UNDER_24H: &str = "under_24h";
pub const URGENCY_SCHEDULED: &str = "scheduled";

/// All valid urgency levels.
pub const VALID_URGENCIES: &[&str] = &[URGENCY_UNDER_4H, URGENCY_UNDER_24H, URGENCY_SCHEDULED];

// ---------------------------------------------------------------------------
// Energy source constants
// ---------------------------------------------------------------------------

pub const ENERGY_ELECTRICITY: &str = "electricity";
pub const ENERGY_GAS: &str = "gas";
pub const ENERGY_FLUIDS: &str = "fluids";

/// All valid energy sources.
pub const VALID_ENERGY_SOURCES: &[&str] = &[ENERGY_ELECTRICITY, ENERGY_GAS, ENERGY_FLUIDS];

// ---------------------------------------------------------------------------
// Status constants
// ---------------------------------------------------------------------------

/// Initial status for a newly created intervention.
pub const STATUS_PENDING: &str = "pending";
pub const STATUS_CONFIRMED: &str = "confirmed";
pub const STATUS_IN_PROGRESS: &str = "in_progress";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_CANCELLED: &str = "cancelled";

/// All valid intervention statuses.
pub const VALID_STATUSES: &[&str] = &[
    STATUS_PENDING,
    STATUS_CONFIRMED,
    STATUS_IN_PROGRESS,
    STATUS_COMPLETED,
    STATUS_CANCELLED,
];

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Maximum number of evidence photos attached to one intervention.
pub const MAX_PHOTOS: usize = 3;

/// Maximum length for the free-text description (characters).
pub const MAX_DESCRIPTION_LENGTH: usize = 5_000;

/// Plausible bounds for a refrigeration temperature reading (°C).
pub const MIN_TEMPERATURE_C: f64 = -60.0;
pub const MAX_TEMPERATURE_C: f64 = 60.0;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Kind of refrigeration equipment an intervention targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquipmentCategory {
    PositiveColdRoom,
    NegativeColdRoom,
    RefrigeratedDisplay,
    RefrigerationPlant,
    Ventilation,
}

impl EquipmentCategory {
    /// Return the database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PositiveColdRoom => EQUIPMENT_POSITIVE_COLD_ROOM,
            Self::NegativeColdRoom => EQUIPMENT_NEGATIVE_COLD_ROOM,
            Self::RefrigeratedDisplay => EQUIPMENT_REFRIGERATED_DISPLAY,
            Self::RefrigerationPlant => EQUIPMENT_REFRIGERATION_PLANT,
            Self::Ventilation => EQUIPMENT_VENTILATION,
        }
    }

    /// Parse from a string, returning an error for unknown categories.
    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            EQUIPMENT_POSITIVE_COLD_ROOM => Ok(Self::PositiveColdRoom),
            EQUIPMENT_NEGATIVE_COLD_ROOM => Ok(Self::NegativeColdRoom),
            EQUIPMENT_REFRIGERATED_DISPLAY => Ok(Self::RefrigeratedDisplay),
            EQUIPMENT_REFRIGERATION_PLANT => Ok(Self::RefrigerationPlant),
            EQUIPMENT_VENTILATION => Ok(Self::Ventilation),
            other => Err(invalid_choice("equipment_category", other, VALID_EQUIPMENT_CATEGORIES)),
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::PositiveColdRoom => "Positive cold room",
            Self::NegativeColdRoom => "Negative cold room",
            Self::RefrigeratedDisplay => "Refrigerated display",
            Self::RefrigerationPlant => "Refrigeration plant",
            Self::Ventilation => "Ventilation",
        }
    }
}

/// How quickly the customer needs a technician on site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Urgency {
    Under4h,
    Under24h,
    #[default]
    Scheduled,
}

impl Urgency {
    /// Return the database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Under4h => URGENCY_UNDER_4H,
            Self::Under24h => URGENCY_UNDER_24H,
            Self::Scheduled => URGENCY_SCHEDULED,
        }
    }

    /// Parse from a string, returning an error for unknown urgencies.
    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            URGENCY_UNDER_4H => Ok(Self::Under4h),
            URGENCY_UNDER_24H => Ok(Self::Under24h),
            URGENCY_SCHEDULED => Ok(Self::Scheduled),
            other => Err(invalid_choice("urgency", other, VALID_URGENCIES)),
        }
    }
}

/// Energy source powering the equipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnergySource {
    Electricity,
    Gas,
    Fluids,
}

impl EnergySource {
    /// Return the database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Electricity => ENERGY_ELECTRICITY,
            Self::Gas => ENERGY_GAS,
            Self::Fluids => ENERGY_FLUIDS,
        }
    }

    /// Parse from a string, returning an error for unknown sources.
    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            ENERGY_ELECTRICITY => Ok(Self::Electricity),
            ENERGY_GAS => Ok(Self::Gas),
            ENERGY_FLUIDS => Ok(Self::Fluids),
            other => Err(invalid_choice("energy_source", other, VALID_ENERGY_SOURCES)),
        }
    }
}

/// Lifecycle status of an intervention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterventionStatus {
    #[default]
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl InterventionStatus {
    /// Return the database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => STATUS_PENDING,
            Self::Confirmed => STATUS_CONFIRMED,
            Self::InProgress => STATUS_IN_PROGRESS,
            Self::Completed => STATUS_COMPLETED,
            Self::Cancelled => STATUS_CANCELLED,
        }
    }

    /// Parse from a string, returning an error for unknown statuses.
    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            STATUS_PENDING => Ok(Self::Pending),
            STATUS_CONFIRMED => Ok(Self::Confirmed),
            STATUS_IN_PROGRESS => Ok(Self::InProgress),
            STATUS_COMPLETED => Ok(Self::Completed),
            STATUS_CANCELLED => Ok(Self::Cancelled),
            other => Err(invalid_choice("status", other, VALID_STATUSES)),
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Statuses reachable from `self` in one step (excluding `self`).
    ///
    /// - `pending`     -> `confirmed`, `in_progress`, `cancelled`
    /// - `confirmed`   -> `pending`, `in_progress`, `cancelled`
    /// - `in_progress` -> `completed`, `cancelled`
    /// - `completed`, `cancelled` -> nothing
    pub fn allowed_targets(self) -> &'static [InterventionStatus] {
        use InterventionStatus::*;
        match self {
            Pending => &[Confirmed, InProgress, Cancelled],
            Confirmed => &[Pending, InProgress, Cancelled],
            InProgress => &[Completed, Cancelled],
            Completed | Cancelled => &[],
        }
    }
}

// ---------------------------------------------------------------------------
// Validation functions
// ---------------------------------------------------------------------------

fn invalid_choice(field: &str, value: &str, valid: &[&str]) -> CoreError {
    CoreError::Validation(format!(
        "{field}: invalid value '{value}'. Must be one of: {}",
        valid.join(", ")
    ))
}

/// Validate that a status move from `current` to `next` is allowed.
///
/// Requesting the current status again is accepted as a no-op.
pub fn validate_transition(
    current: InterventionStatus,
    next: InterventionStatus,
) -> Result<(), CoreError> {
    if current == next || current.allowed_targets().contains(&next) {
        return Ok(());
    }
    let allowed: Vec<&str> = current.allowed_targets().iter().map(|s| s.as_str()).collect();
    Err(CoreError::Validation(format!(
        "status: cannot move intervention from '{}' to '{}'. Allowed: [{}]",
        current.as_str(),
        next.as_str(),
        allowed.join(", ")
    )))
}

/// Validate that the description carries visible text.
pub fn validate_description(description: &str) -> Result<(), CoreError> {
    if description.trim().is_empty() {
        return Err(CoreError::Validation(
            "description: must not be empty".into(),
        ));
    }
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(CoreError::Validation(format!(
            "description: exceeds maximum length of {MAX_DESCRIPTION_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Validate that a temperature reading is within the plausible range.
pub fn validate_temperature(reading: f64) -> Result<(), CoreError> {
    if !(MIN_TEMPERATURE_C..=MAX_TEMPERATURE_C).contains(&reading) {
        return Err(CoreError::Validation(format!(
            "temperature_reading: must be between {MIN_TEMPERATURE_C} and {MAX_TEMPERATURE_C} °C"
        )));
    }
    Ok(())
}

/// The single photo-cap rule, shared by full-list replacement and attachment.
///
/// `existing` is the number of photos that remain on the record and `adding`
/// the number about to be appended.
pub fn ensure_photo_capacity(existing: usize, adding: usize) -> Result<(), CoreError> {
    let total = existing.saturating_add(adding);
    if total > MAX_PHOTOS {
        return Err(CoreError::Validation(format!(
            "photos: an intervention holds at most {MAX_PHOTOS} photos \
             ({existing} present, {adding} requested)"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn all_statuses_parse() {
        for s in VALID_STATUSES {
            assert_eq!(InterventionStatus::from_str(s).unwrap().as_str(), *s);
        }
    }

    #[test]
    fn unknown_enum_values_are_rejected_with_field_name() {
        let err = InterventionStatus::from_str("archived").unwrap_err();
        assert_matches!(err, CoreError::Validation(ref msg) if msg.starts_with("status:"));
        assert!(Urgency::from_str("asap").is_err());
        assert!(EnergySource::from_str("solar").is_err());
        assert!(EquipmentCategory::from_str("freezer").is_err());
    }

    #[test]
    fn defaults_match_new_record_values() {
        assert_eq!(Urgency::default(), Urgency::Scheduled);
        assert_eq!(InterventionStatus::default(), InterventionStatus::Pending);
    }

    #[test]
    fn same_status_is_a_noop_transition() {
        for s in VALID_STATUSES {
            let status = InterventionStatus::from_str(s).unwrap();
            assert!(validate_transition(status, status).is_ok());
        }
    }

    #[test]
    fn pending_moves_forward_or_cancels() {
        use InterventionStatus::*;
        assert!(validate_transition(Pending, Confirmed).is_ok());
        assert!(validate_transition(Pending, InProgress).is_ok());
        assert!(validate_transition(Pending, Cancelled).is_ok());
        assert!(validate_transition(Pending, Completed).is_err());
    }

    #[test]
    fn terminal_statuses_cannot_be_reopened() {
        use InterventionStatus::*;
        assert!(Completed.is_terminal());
        assert!(Cancelled.is_terminal());
        assert!(validate_transition(Completed, Pending).is_err());
        assert!(validate_transition(Cancelled, Confirmed).is_err());
    }

    #[test]
    fn cancelled_is_reachable_from_every_non_terminal_status() {
        use InterventionStatus::*;
        for status in [Pending, Confirmed, InProgress] {
            assert!(validate_transition(status, Cancelled).is_ok());
        }
    }

    #[test]
    fn blank_description_is_invalid() {
        assert!(validate_description("   ").is_err());
        assert!(validate_description("Compressor trips on start").is_ok());
        let long = "a".repeat(MAX_DESCRIPTION_LENGTH + 1);
        assert!(validate_description(&long).is_err());
    }

    #[test]
    fn temperature_bounds_are_inclusive() {
        assert!(validate_temperature(MIN_TEMPERATURE_C).is_ok());
        assert!(validate_temperature(MAX_TEMPERATURE_C).is_ok());
        assert_matches!(
            validate_temperature(60.5),
            Err(CoreError::Validation(msg)) if msg.starts_with("temperature_reading:")
        );
        assert!(validate_temperature(f64::NAN).is_err());
    }

    #[test]
    fn photo_capacity_boundary() {
        assert!(ensure_photo_capacity(0, 3).is_ok());
        assert!(ensure_photo_capacity(2, 1).is_ok());
        assert!(ensure_photo_capacity(3, 1).is_err());
        assert!(ensure_photo_capacity(0, 4).is_err());
    }

    #[test]
    fn equipment_labels_are_human_readable() {
        assert_eq!(
            EquipmentCategory::NegativeColdRoom.label(),
            "Negative cold room"
        );
    }
}
