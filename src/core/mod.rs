pub mod errors;
pub mod models;
pub mod settings;

pub use errors::BoardError;
pub use models::{
    DeviceSample,
    SessionStatus,
    SummarySession,
    Zone,
};
pub use settings::DisplaySettings;
