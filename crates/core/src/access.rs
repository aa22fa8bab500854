//! AccessGuard: who may read or mutate an intervention.
//!
//! Authorization is a declarative table mapping each [`Operation`] to a
//! [`Rule`]; [`authorize`] is the only place that evaluates it. List
//! endpoints do not evaluate per-record rules and instead narrow their query
//! with [`list_scope`].

use crate::error::CoreError;
use crate::roles::Role;
use crate::types::DbId;

/// The authenticated caller of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: DbId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: DbId, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// The people attached to an intervention who are entitled to act on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Participants {
    pub created_by: DbId,
    pub technician_id: Option<DbId>,
}

impl Participants {
    fn includes(&self, user_id: DbId) -> bool {
        self.created_by == user_id || self.technician_id == Some(user_id)
    }
}

/// Every guarded lifecycle operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    ChangeStatus,
    AttachPhotos,
    Delete,
}

/// Authorization rule attached to an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Any authenticated actor.
    AnyActor,
    /// Admins, the creator, or the assigned technician.
    AdminOrParticipant,
    /// Admins only.
    AdminOnly,
}

/// Operation to rule mapping.
pub const POLICY: &[(Operation, Rule)] = &[
    (Operation::Create, Rule::AnyActor),
    (Operation::Read, Rule::AdminOrParticipant),
    (Operation::Update, Rule::AdminOrParticipant),
    (Operation::ChangeStatus, Rule::AdminOrParticipant),
    (Operation::AttachPhotos, Rule::AdminOrParticipant),
    (Operation::Delete, Rule::AdminOnly),
];

/// Look up the rule for `op`. Operations missing from [`POLICY`] are admin-only.
pub fn rule_for(op: Operation) -> Rule {
    POLICY
        .iter()
        .find(|(candidate, _)| *candidate == op)
        .map(|(_, rule)| *rule)
        .unwrap_or(Rule::AdminOnly)
}

/// Decide whether `actor` may perform `op` on a record with `participants`.
///
/// `participants` is `None` when the operation does not target an existing
/// record (creation) or when the record has not been loaded yet; a
/// participant rule then only admits admins.
pub fn authorize(
    actor: &Actor,
    op: Operation,
    participants: Option<&Participants>,
) -> Result<(), CoreError> {
    let allowed = match rule_for(op) {
        Rule::AnyActor => true,
        Rule::AdminOnly => actor.is_admin(),
        Rule::AdminOrParticipant => {
            actor.is_admin() || participants.is_some_and(|p| p.includes(actor.id))
        }
    };

    if allowed {
        Ok(())
    } else {
        Err(CoreError::Forbidden(denial_reason(op).into()))
    }
}

fn denial_reason(op: Operation) -> &'static str {
    match rule_for(op) {
        Rule::AdminOnly => "Admin role required",
        _ => "Only the creator, the assigned technician, or an admin may access this intervention",
    }
}

/// Which interventions a list query may return for an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope {
    /// Every record.
    All,
    /// Records the user created or is assigned to.
    Participant(DbId),
}

pub fn list_scope(actor: &Actor) -> ListScope {
    if actor.is_admin() {
        ListScope::All
    } else {
        ListScope::Participant(actor.id)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const CREATOR: DbId = 10;
    const TECHNICIAN: DbId = 20;
    const STRANGER: DbId = 30;

    fn participants() -> Participants {
        Participants {
            created_by: CREATOR,
            technician_id: Some(TECHNICIAN),
        }
    }

    #[test]
    fn every_operation_has_a_policy_entry() {
        for op in [
            Operation::Create,
            Operation::Read,
            Operation::Update,
            Operation::ChangeStatus,
            Operation::AttachPhotos,
            Operation::Delete,
        ] {
            assert!(POLICY.iter().any(|(o, _)| *o == op), "{op:?} missing");
        }
    }

    #[test]
    fn admin_is_always_allowed() {
        let admin = Actor::new(STRANGER, Role::Admin);
        for (op, _) in POLICY {
            assert!(authorize(&admin, *op, Some(&participants())).is_ok());
        }
    }

    #[test]
    fn creator_and_technician_may_mutate() {
        let p = participants();
        let creator = Actor::new(CREATOR, Role::Client);
        let tech = Actor::new(TECHNICIAN, Role::Technician);
        for op in [Operation::Read, Operation::Update, Operation::ChangeStatus, Operation::AttachPhotos] {
            assert!(authorize(&creator, op, Some(&p)).is_ok());
            assert!(authorize(&tech, op, Some(&p)).is_ok());
        }
    }

    #[test]
    fn stranger_is_forbidden_even_with_technician_role() {
        let stranger = Actor::new(STRANGER, Role::Technician);
        let err = authorize(&stranger, Operation::Read, Some(&participants())).unwrap_err();
        assert_matches!(err, CoreError::Forbidden(_));
    }

    #[test]
    fn delete_requires_admin_even_for_creator() {
        let creator = Actor::new(CREATOR, Role::Client);
        let err = authorize(&creator, Operation::Delete, Some(&participants())).unwrap_err();
        assert_matches!(err, CoreError::Forbidden(ref msg) if msg == "Admin role required");
    }

    #[test]
    fn anyone_may_create() {
        let client = Actor::new(STRANGER, Role::Client);
        assert!(authorize(&client, Operation::Create, None).is_ok());
    }

    #[test]
    fn list_scope_narrows_non_admins() {
        assert_eq!(list_scope(&Actor::new(1, Role::Admin)), ListScope::All);
        assert_eq!(
            list_scope(&Actor::new(7, Role::Technician)),
            ListScope::Participant(7)
        );
    }
}
