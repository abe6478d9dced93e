pub mod access;
pub mod domain;
pub mod error;
pub mod memory;
pub mod ports;
pub mod progress;
pub mod quiz;
pub mod validation;

pub use access::{AccessGrant, AccessService};
pub use domain::{
    AuthorizationEntry, Identity, LeaderboardEntry, ProgressState, QuizRecord, QuizStanding,
    SlideId, SlideVisit, TrainingStatus, UserRecord,
};
pub use error::{TrainingError, TrainingResult};
pub use ports::{
    AuthorizationStore, IssuedToken, PortError, PortResult, TokenService, UserMutation,
    UserRecordStore,
};
pub use progress::{ProgressReport, ProgressTracker};
pub use quiz::QuizLedger;
