pub mod confirm;
pub mod engine;
pub mod history;
pub mod interpreter;

pub use confirm::{AutoApprove, Confirmer, StdinConfirmer};
pub use engine::{Agent, CancelFlag};
pub use history::{AutomationReport, AutomationStep, RunStatus};
pub use interpreter::{parse_instruction, ActionRequest};
