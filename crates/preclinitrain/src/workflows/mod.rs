pub mod competency;
pub mod continuous_training;
pub mod error;
pub mod ids;
pub mod memory;
pub mod store;
pub mod time;

pub use error::EngineError;
pub use ids::{
    AttendanceId, CompetencyId, EventId, ExternalTrainingId, FacilityId, PracticeEventId,
    SessionId, SkillId, SpeciesId, UserId,
};
pub use store::{RepositoryError, UserDirectory};
