use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::agent::confirm::Confirmer;
use crate::agent::history::{AutomationReport, AutomationStep, RunStatus};
use crate::agent::interpreter::{parse_instruction, ActionRequest};
use crate::config::AgentSettings;
use crate::errors::{ActionFailure, FailureKind, ScreenPilotError, ScreenPilotResult};
use crate::executor::safety::check_point;
use crate::executor::ActionExecutor;
use crate::perception::ScreenshotSource;
use crate::types::{ActionResult, AnalysisResult, ElementLocation, ImageInput};
use crate::vision::VisionProvider;

/// Cancel signal for a running automation, checked between steps.
/// Primitive actions are atomic and never interrupted mid-flight.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The orchestration core: turns a natural-language instruction into at
/// most one executor dispatch, and drives multi-step runs sequentially on
/// one shared session.
///
/// Precondition: the display is a process-wide singleton. Do not drive two
/// automation runs against the same screen at once; the input library is
/// not built for concurrent access.
pub struct Agent {
    vision: Arc<dyn VisionProvider>,
    screenshots: Arc<dyn ScreenshotSource>,
    executor: ActionExecutor,
    confirmer: Arc<dyn Confirmer>,
    settings: AgentSettings,
    cancel: CancelFlag,
}

impl Agent {
    pub fn new(
        vision: Arc<dyn VisionProvider>,
        screenshots: Arc<dyn ScreenshotSource>,
        executor: ActionExecutor,
        confirmer: Arc<dyn Confirmer>,
        settings: AgentSettings,
    ) -> Self {
        Self {
            vision,
            screenshots,
            executor,
            confirmer,
            settings,
            cancel: CancelFlag::default(),
        }
    }

    /// Handle for cancelling a run from another task.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub async fn analyze(&self, image: &ImageInput) -> ScreenPilotResult<AnalysisResult> {
        tracing::info!(provider = %self.vision.name(), "analyzing screenshot");
        let result = self.vision.describe(image).await?;
        tracing::info!(elements = result.elements.len(), "analysis complete");
        Ok(result)
    }

    /// Locates an element, applying the configured confidence floor. A hit
    /// below `min_confidence` counts as not found.
    pub async fn find_element(
        &self,
        description: &str,
        image: Option<&ImageInput>,
    ) -> ScreenPilotResult<Option<ElementLocation>> {
        let captured;
        let image = match image {
            Some(img) => img,
            None => {
                captured = self.screenshots.capture().await?;
                &captured
            }
        };

        tracing::info!(target = %description, "locating element");
        match self.vision.locate(description, image).await? {
            Some(el) if el.confidence >= self.settings.min_confidence => {
                tracing::info!(x = el.x, y = el.y, confidence = el.confidence, "element found");
                Ok(Some(el))
            }
            Some(el) => {
                tracing::info!(
                    confidence = el.confidence,
                    floor = self.settings.min_confidence,
                    "element below confidence floor, treating as not found"
                );
                Ok(None)
            }
            None => {
                tracing::info!(target = %description, "element not found");
                Ok(None)
            }
        }
    }

    /// Executes one natural-language instruction: parse, ground, validate,
    /// confirm, then dispatch exactly once. Every failure comes back as a
    /// result value carrying the original instruction text.
    pub async fn do_command(
        &mut self,
        instruction: &str,
        screenshot: Option<&ImageInput>,
    ) -> ActionResult {
        tracing::info!(%instruction, "command received");

        let request = match parse_instruction(instruction) {
            Ok(req) => req,
            Err(failure) => return ActionResult::failed(instruction, failure),
        };

        let request = match self.ground(request, screenshot).await {
            Ok(req) => req,
            Err(failure) => return ActionResult::failed(instruction, failure),
        };

        // Resolved coordinates are validated before the confirmation gate
        // so nobody is asked to approve an action that cannot run.
        if let Err(failure) = self.validate(&request) {
            return ActionResult::failed(instruction, failure);
        }

        if self.settings.confirm_actions {
            if let Err(failure) = self.confirmation_gate(&request).await {
                return ActionResult::failed(instruction, failure);
            }
        }

        let mut result = self.dispatch(request).await;
        result.action = instruction.to_string();
        result
    }

    /// Grounding: resolve a target description to coordinates via the
    /// vision provider, recapturing the screen when none was supplied.
    async fn ground(
        &self,
        request: ActionRequest,
        screenshot: Option<&ImageInput>,
    ) -> Result<ActionRequest, ActionFailure> {
        let Some(target) = request.grounding_target().map(str::to_string) else {
            return Ok(request);
        };

        let element = self
            .find_element(&target, screenshot)
            .await
            .map_err(|e| match e {
                ScreenPilotError::VisionParse(msg) => {
                    ActionFailure::new(FailureKind::VisionParse, msg)
                }
                other => ActionFailure::new(FailureKind::VisionError, other.to_string()),
            })?
            .ok_or_else(|| {
                ActionFailure::new(
                    FailureKind::ElementNotFound,
                    format!("no element matching \"{target}\" was found on screen"),
                )
            })?;

        Ok(match request {
            ActionRequest::ClickTarget { button, .. } => ActionRequest::ClickAt {
                x: element.x,
                y: element.y,
                button,
            },
            ActionRequest::MoveTarget { .. } => ActionRequest::MoveTo {
                x: element.x,
                y: element.y,
            },
            other => other,
        })
    }

    fn validate(&self, request: &ActionRequest) -> Result<(), ActionFailure> {
        let bounds = self.executor.bounds();
        let zones = self.executor.safe_zones();
        match request {
            ActionRequest::ClickAt { x, y, .. } | ActionRequest::MoveTo { x, y } => {
                check_point(*x, *y, &bounds, zones)
            }
            ActionRequest::Drag { from, to } => {
                check_point(from.0, from.1, &bounds, zones)?;
                check_point(to.0, to.1, &bounds, zones)
            }
            _ => Ok(()),
        }
    }

    async fn confirmation_gate(&self, request: &ActionRequest) -> Result<(), ActionFailure> {
        let prompt = request.describe();
        let approved = match self.settings.confirmation_timeout_secs {
            Some(secs) => tokio::time::timeout(
                Duration::from_secs(secs),
                self.confirmer.confirm(&prompt),
            )
            .await
            .map_err(|_| {
                ActionFailure::new(
                    FailureKind::ConfirmationTimeout,
                    format!("no confirmation for \"{prompt}\" within {secs}s"),
                )
            })?,
            None => self.confirmer.confirm(&prompt).await,
        };

        if approved {
            Ok(())
        } else {
            Err(ActionFailure::new(
                FailureKind::UserDeclined,
                format!("user declined: {prompt}"),
            ))
        }
    }

    /// Exactly one executor call per command.
    async fn dispatch(&mut self, request: ActionRequest) -> ActionResult {
        match request {
            ActionRequest::ClickAt { x, y, button } => self.executor.click(x, y, button).await,
            ActionRequest::MoveTo { x, y } => self.executor.move_to(x, y).await,
            ActionRequest::TypeText { text } => self.executor.type_text(&text).await,
            ActionRequest::Scroll { direction, amount } => {
                self.executor.scroll(&direction, amount).await
            }
            ActionRequest::PressKey { key } => self.executor.press_key(&key).await,
            ActionRequest::Hotkey { keys } => self.executor.hotkey(&keys).await,
            ActionRequest::Drag { from, to } => self.executor.drag(from, to).await,
            ActionRequest::Wait { seconds } => self.executor.wait(seconds).await,
            // Grounding replaced these before dispatch.
            ActionRequest::ClickTarget { target, .. } | ActionRequest::MoveTarget { target } => {
                ActionResult::failed(
                    format!("ungrounded({target})"),
                    ActionFailure::new(
                        FailureKind::ElementNotFound,
                        format!("\"{target}\" was never resolved to coordinates"),
                    ),
                )
            }
        }
    }

    /// Runs instructions strictly in order on this session. Each grounding
    /// step recaptures the screen, since earlier steps may have changed it.
    /// By default the run continues past failed steps and reports the full
    /// record; `abort_on_failure` stops at the first failure instead.
    pub async fn automate(&mut self, instructions: &[String]) -> AutomationReport {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        let total = instructions.len();
        tracing::info!(%run_id, total, "automation run started");

        let mut steps = Vec::with_capacity(total);
        let mut succeeded = 0;
        let mut status = RunStatus::Completed;

        for (i, instruction) in instructions.iter().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::warn!(%run_id, step = i + 1, "run cancelled");
                status = RunStatus::Cancelled;
                // The step at the cancel point is recorded as cancelled,
                // and the signal is consumed so the agent can run again.
                steps.push(AutomationStep {
                    step_number: i + 1,
                    instruction: instruction.clone(),
                    result: ActionResult::failed(
                        instruction.clone(),
                        ActionFailure::new(
                            FailureKind::Cancelled,
                            "run cancelled before this step",
                        ),
                    ),
                    timestamp: chrono::Utc::now(),
                });
                self.cancel.reset();
                break;
            }

            tracing::info!(step = i + 1, total, %instruction, "running step");
            let result = self.do_command(instruction, None).await;
            if result.success {
                succeeded += 1;
            } else {
                tracing::warn!(
                    step = i + 1,
                    error = ?result.error,
                    "step failed"
                );
            }
            let failed = !result.success;

            steps.push(AutomationStep {
                step_number: i + 1,
                instruction: instruction.clone(),
                result,
                timestamp: chrono::Utc::now(),
            });

            if failed && self.settings.abort_on_failure {
                status = RunStatus::Aborted;
                break;
            }

            if i + 1 < total && self.settings.step_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.settings.step_delay_ms)).await;
            }
        }

        let report = AutomationReport {
            run_id,
            status,
            succeeded,
            total,
            steps,
            duration_seconds: started.elapsed().as_secs_f64(),
        };
        tracing::info!(%run_id, summary = %report.summary(), "automation run finished");
        report
    }
}
