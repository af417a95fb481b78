//! Identifier wrappers shared by the competency and continuing-education workflows.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> u64 {
                id.0
            }
        }
    };
}

record_id!(
    /// Lab member account.
    UserId
);
record_id!(
    /// Procedural skill in the catalogue.
    SkillId
);
record_id!(SpeciesId);
record_id!(CompetencyId);
record_id!(
    /// Supervised training session that produced an evaluation.
    SessionId
);
record_id!(
    /// External training submission whose claims were approved.
    ExternalTrainingId
);
record_id!(PracticeEventId);
record_id!(
    /// Continuing-education event.
    EventId
);
record_id!(
    /// A user's attendance at a continuing-education event.
    AttendanceId
);
record_id!(FacilityId);
