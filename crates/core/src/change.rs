//! ChangeDetector: which side effects a persisted mutation triggers.
//!
//! [`detect_changes`] is a pure comparison of the state before and after a
//! mutation. Its output is stored in the outbox together with the record
//! write and executed later by the outbox worker.

use serde::{Deserialize, Serialize};

use crate::types::DbId;

/// The fields of an intervention that drive side effects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterventionSnapshot<'a> {
    pub client_id: DbId,
    pub status: &'a str,
    pub temperature_reading: Option<f64>,
    pub haccp_compliant: bool,
}

/// A side effect owed after a committed intervention write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SideEffect {
    /// Fan out a NEW_INTERVENTION notification to all staff.
    NewIntervention {
        equipment_category: String,
        urgency: String,
    },
    /// Tell the client their request moved to another status.
    StatusChanged {
        client_id: DbId,
        from: String,
        to: String,
    },
    /// Record a compliance report for an unfavourable conformance change.
    ComplianceAlert {
        client_id: DbId,
        temperature_reading: Option<f64>,
        haccp_compliant: bool,
    },
}

impl SideEffect {
    /// Short name used in logs and the outbox `kind` column.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NewIntervention { .. } => "new_intervention",
            Self::StatusChanged { .. } => "status_changed",
            Self::ComplianceAlert { .. } => "compliance_alert",
        }
    }
}

/// Compare two states of the same intervention.
///
/// - A status change notifies the (post-mutation) client.
/// - A change to the temperature reading or the HACCP flag that leaves the
///   record non-compliant raises a compliance alert, independently of any
///   status change.
pub fn detect_changes(
    before: &InterventionSnapshot<'_>,
    after: &InterventionSnapshot<'_>,
) -> Vec<SideEffect> {
    let mut effects = Vec::new();

    if before.status != after.status {
        effects.push(SideEffect::StatusChanged {
            client_id: after.client_id,
            from: before.status.to_string(),
            to: after.status.to_string(),
        });
    }

    let conformance_changed = before.temperature_reading != after.temperature_reading
        || before.haccp_compliant != after.haccp_compliant;
    if conformance_changed && !after.haccp_compliant {
        effects.push(SideEffect::ComplianceAlert {
            client_id: after.client_id,
            temperature_reading: after.temperature_reading,
            haccp_compliant: after.haccp_compliant,
        });
    }

    effects
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn snapshot(status: &str, temp: Option<f64>, haccp: bool) -> InterventionSnapshot<'_> {
        InterventionSnapshot {
            client_id: 5,
            status,
            temperature_reading: temp,
            haccp_compliant: haccp,
        }
    }

    #[test]
    fn identical_states_emit_nothing() {
        let s = snapshot("pending", Some(3.0), true);
        assert!(detect_changes(&s, &s).is_empty());
    }

    #[test]
    fn status_change_notifies_client() {
        let effects = detect_changes(
            &snapshot("pending", None, false),
            &snapshot("confirmed", None, false),
        );
        assert_eq!(effects.len(), 1);
        assert_matches!(
            &effects[0],
            SideEffect::StatusChanged { client_id: 5, from, to } if from == "pending" && to == "confirmed"
        );
    }

    #[test]
    fn haccp_loss_triggers_compliance_alert() {
        let effects = detect_changes(
            &snapshot("pending", None, true),
            &snapshot("pending", None, false),
        );
        assert_eq!(effects.len(), 1);
        assert_matches!(effects[0], SideEffect::ComplianceAlert { client_id: 5, .. });
    }

    #[test]
    fn haccp_gain_is_silent() {
        let effects = detect_changes(
            &snapshot("pending", None, false),
            &snapshot("pending", None, true),
        );
        assert!(effects.is_empty());
    }

    #[test]
    fn temperature_change_on_non_compliant_record_alerts() {
        let effects = detect_changes(
            &snapshot("in_progress", Some(4.0), false),
            &snapshot("in_progress", Some(9.5), false),
        );
        assert_matches!(
            effects.as_slice(),
            [SideEffect::ComplianceAlert { temperature_reading: Some(t), .. }] if *t == 9.5
        );
    }

    #[test]
    fn status_and_compliance_fire_together() {
        let effects = detect_changes(
            &snapshot("confirmed", Some(2.0), true),
            &snapshot("in_progress", Some(12.0), false),
        );
        assert_eq!(effects.len(), 2);
        assert_eq!(effects[0].name(), "status_changed");
        assert_eq!(effects[1].name(), "compliance_alert");
    }

    #[test]
    fn side_effects_survive_json_encoding() {
        let effect = SideEffect::NewIntervention {
            equipment_category: "ventilation".into(),
            urgency: "under_4h".into(),
        };
        let json = serde_json::to_value(&effect).unwrap();
        assert_eq!(json["kind"], "new_intervention");
        let back: SideEffect = serde_json::from_value(json).unwrap();
        assert_eq!(back, effect);
    }
}
