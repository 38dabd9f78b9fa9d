pub mod agent;
pub mod config;
pub mod errors;
pub mod executor;
pub mod perception;
pub mod types;
pub mod vision;

pub use agent::{Agent, AutomationReport, CancelFlag};
pub use config::{load_config, AppConfig};
pub use errors::{ActionFailure, FailureKind, ScreenPilotError, ScreenPilotResult};
pub use executor::{ActionExecutor, ExecutorConfig};
pub use types::{ActionResult, AnalysisResult, ElementLocation, ImageInput, ScreenshotMeta};
