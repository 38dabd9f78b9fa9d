pub mod input;
pub mod safety;

use std::time::Duration;

use crate::config::AppConfig;
use crate::errors::{ActionFailure, FailureKind};
use crate::executor::input::{InputBackend, MouseButton, ScrollDirection};
use crate::executor::safety::{check_point, Rect};
use crate::types::{ActionResult, ScreenshotMeta};

/// Longest prefix of the typed text echoed back in dry-run details.
const DRY_RUN_PREVIEW_CHARS: usize = 50;

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub dry_run: bool,
    pub bounds: ScreenshotMeta,
    pub safe_zones: Vec<Rect>,
    pub click_delay: Duration,
    pub type_delay: Duration,
    pub default_scroll_amount: i32,
}

impl ExecutorConfig {
    pub fn from_config(cfg: &AppConfig, bounds: ScreenshotMeta) -> Self {
        Self {
            dry_run: cfg.agent.dry_run,
            bounds,
            safe_zones: cfg.agent.safe_zones.clone(),
            click_delay: Duration::from_millis(cfg.agent.click_delay_ms),
            type_delay: Duration::from_millis(cfg.agent.type_delay_ms),
            default_scroll_amount: cfg.agent.default_scroll_amount,
        }
    }
}

/// Performs or simulates exactly one primitive action per call. Every
/// failure comes back as an [`ActionResult`] value; nothing raises past
/// this boundary and nothing is retried here. Dry-run returns before the
/// input backend is ever touched.
pub struct ActionExecutor {
    backend: Box<dyn InputBackend>,
    cfg: ExecutorConfig,
}

impl ActionExecutor {
    pub fn new(backend: Box<dyn InputBackend>, cfg: ExecutorConfig) -> Self {
        Self { backend, cfg }
    }

    pub fn dry_run(&self) -> bool {
        self.cfg.dry_run
    }

    pub fn bounds(&self) -> ScreenshotMeta {
        self.cfg.bounds
    }

    pub fn safe_zones(&self) -> &[Rect] {
        &self.cfg.safe_zones
    }

    /// Bounds and safe-zone gate, applied in every mode.
    fn validate_point(&self, x: i32, y: i32) -> Result<(), ActionFailure> {
        check_point(x, y, &self.cfg.bounds, &self.cfg.safe_zones)
    }

    async fn pace(&self) {
        if !self.cfg.click_delay.is_zero() {
            tokio::time::sleep(self.cfg.click_delay).await;
        }
    }

    pub async fn click(&mut self, x: i32, y: i32, button: MouseButton) -> ActionResult {
        let action = format!("click({x}, {y}, {button})");
        if let Err(failure) = self.validate_point(x, y) {
            tracing::warn!(%action, error = %failure, "click rejected");
            return ActionResult::failed(action, failure);
        }

        if self.cfg.dry_run {
            return ActionResult::ok(action, format!("[dry run] would {button}-click at ({x}, {y})"));
        }

        match self.backend.click(x, y, button) {
            Ok(()) => {
                self.pace().await;
                tracing::debug!(%action, "clicked");
                ActionResult::ok(action, format!("{button}-clicked at ({x}, {y})"))
            }
            Err(e) => ActionResult::failed(
                action,
                ActionFailure::new(FailureKind::InputBackend, e.to_string()),
            ),
        }
    }

    pub async fn move_to(&mut self, x: i32, y: i32) -> ActionResult {
        let action = format!("move_to({x}, {y})");
        if let Err(failure) = self.validate_point(x, y) {
            tracing::warn!(%action, error = %failure, "move rejected");
            return ActionResult::failed(action, failure);
        }

        if self.cfg.dry_run {
            return ActionResult::ok(action, format!("[dry run] would move to ({x}, {y})"));
        }

        match self.backend.move_to(x, y) {
            Ok(()) => {
                self.pace().await;
                ActionResult::ok(action, format!("moved to ({x}, {y})"))
            }
            Err(e) => ActionResult::failed(
                action,
                ActionFailure::new(FailureKind::InputBackend, e.to_string()),
            ),
        }
    }

    pub async fn drag(&mut self, from: (i32, i32), to: (i32, i32)) -> ActionResult {
        let action = format!("drag({}, {} -> {}, {})", from.0, from.1, to.0, to.1);
        // Both endpoints gate the drag; the path between them does not.
        for (x, y) in [from, to] {
            if let Err(failure) = self.validate_point(x, y) {
                tracing::warn!(%action, error = %failure, "drag rejected");
                return ActionResult::failed(action, failure);
            }
        }

        if self.cfg.dry_run {
            return ActionResult::ok(
                action,
                format!(
                    "[dry run] would drag from ({}, {}) to ({}, {})",
                    from.0, from.1, to.0, to.1
                ),
            );
        }

        match self.backend.drag(from, to) {
            Ok(()) => {
                self.pace().await;
                ActionResult::ok(action, format!("dragged to ({}, {})", to.0, to.1))
            }
            Err(e) => ActionResult::failed(
                action,
                ActionFailure::new(FailureKind::InputBackend, e.to_string()),
            ),
        }
    }

    /// Empty text is a no-op success: a plan step resolving to nothing to
    /// type should not fail the run.
    pub async fn type_text(&mut self, text: &str) -> ActionResult {
        let preview = truncate_preview(text);
        let action = format!("type({preview:?})");

        if text.is_empty() {
            return ActionResult::ok(action, "nothing to type");
        }

        if self.cfg.dry_run {
            return ActionResult::ok(action, format!("[dry run] would type: {preview}"));
        }

        // One keystroke per backend call, paced here without blocking the
        // runtime between characters.
        let mut buf = [0u8; 4];
        for c in text.chars() {
            if let Err(e) = self.backend.type_text(c.encode_utf8(&mut buf)) {
                return ActionResult::failed(
                    action,
                    ActionFailure::new(FailureKind::InputBackend, e.to_string()),
                );
            }
            if !self.cfg.type_delay.is_zero() {
                tokio::time::sleep(self.cfg.type_delay).await;
            }
        }
        ActionResult::ok(action, format!("typed {} characters", text.chars().count()))
    }

    pub async fn scroll(&mut self, direction: &str, amount: Option<i32>) -> ActionResult {
        let amount = amount.unwrap_or(self.cfg.default_scroll_amount);
        let action = format!("scroll({direction}, {amount})");

        let Ok(dir) = direction.parse::<ScrollDirection>() else {
            return ActionResult::failed(
                action,
                ActionFailure::new(
                    FailureKind::InvalidDirection,
                    format!("unknown scroll direction {direction:?}, expected up/down/left/right"),
                ),
            );
        };

        if self.cfg.dry_run {
            return ActionResult::ok(action, format!("[dry run] would scroll {dir} by {amount}"));
        }

        match self.backend.scroll(dir, amount) {
            Ok(()) => {
                self.pace().await;
                ActionResult::ok(action, format!("scrolled {dir} by {amount}"))
            }
            Err(e) => ActionResult::failed(
                action,
                ActionFailure::new(FailureKind::InputBackend, e.to_string()),
            ),
        }
    }

    pub async fn press_key(&mut self, key: &str) -> ActionResult {
        let action = format!("press({key})");
        if !input::is_supported_key(key) {
            return ActionResult::failed(
                action,
                ActionFailure::new(FailureKind::InvalidKey, format!("unsupported key: {key:?}")),
            );
        }

        if self.cfg.dry_run {
            return ActionResult::ok(action, format!("[dry run] would press {key}"));
        }

        match self.backend.press_key(key) {
            Ok(()) => ActionResult::ok(action, format!("pressed {key}")),
            Err(e) => ActionResult::failed(
                action,
                ActionFailure::new(FailureKind::InputBackend, e.to_string()),
            ),
        }
    }

    pub async fn hotkey(&mut self, keys: &[String]) -> ActionResult {
        let combo = keys.join("+");
        let action = format!("hotkey({combo})");
        if keys.is_empty() {
            return ActionResult::failed(
                action,
                ActionFailure::new(FailureKind::InvalidKey, "empty key combination"),
            );
        }
        for key in keys {
            if !input::is_supported_key(key) {
                return ActionResult::failed(
                    action,
                    ActionFailure::new(
                        FailureKind::InvalidKey,
                        format!("unsupported key in combination: {key:?}"),
                    ),
                );
            }
        }

        if self.cfg.dry_run {
            return ActionResult::ok(action, format!("[dry run] would press {combo}"));
        }

        match self.backend.hotkey(keys) {
            Ok(()) => ActionResult::ok(action, format!("pressed {combo}")),
            Err(e) => ActionResult::failed(
                action,
                ActionFailure::new(FailureKind::InputBackend, e.to_string()),
            ),
        }
    }

    pub async fn wait(&mut self, seconds: f64) -> ActionResult {
        let action = format!("wait({seconds}s)");
        if self.cfg.dry_run {
            return ActionResult::ok(action, format!("[dry run] would wait {seconds}s"));
        }
        tokio::time::sleep(Duration::from_secs_f64(seconds)).await;
        ActionResult::ok(action, format!("waited {seconds}s"))
    }
}

fn truncate_preview(text: &str) -> String {
    if text.chars().count() <= DRY_RUN_PREVIEW_CHARS {
        text.to_string()
    } else {
        let head: String = text.chars().take(DRY_RUN_PREVIEW_CHARS).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::errors::ScreenPilotResult;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Counts every call that reaches the input layer. Dry-run and
    /// validation failures must leave the count untouched.
    pub(crate) struct FakeBackend {
        pub calls: Arc<AtomicUsize>,
    }

    impl FakeBackend {
        pub fn new() -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    calls: calls.clone(),
                },
                calls,
            )
        }

        fn record(&self) -> ScreenPilotResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    impl InputBackend for FakeBackend {
        fn click(&mut self, _x: i32, _y: i32, _button: MouseButton) -> ScreenPilotResult<()> {
            self.record()
        }
        fn move_to(&mut self, _x: i32, _y: i32) -> ScreenPilotResult<()> {
            self.record()
        }
        fn drag(&mut self, _from: (i32, i32), _to: (i32, i32)) -> ScreenPilotResult<()> {
            self.record()
        }
        fn type_text(&mut self, _text: &str) -> ScreenPilotResult<()> {
            self.record()
        }
        fn press_key(&mut self, _key: &str) -> ScreenPilotResult<()> {
            self.record()
        }
        fn hotkey(&mut self, _keys: &[String]) -> ScreenPilotResult<()> {
            self.record()
        }
        fn scroll(&mut self, _direction: ScrollDirection, _amount: i32) -> ScreenPilotResult<()> {
            self.record()
        }
    }

    pub(crate) fn executor(dry_run: bool, safe_zones: Vec<Rect>) -> (ActionExecutor, Arc<AtomicUsize>) {
        let (backend, calls) = FakeBackend::new();
        let cfg = ExecutorConfig {
            dry_run,
            bounds: ScreenshotMeta {
                width: 1920,
                height: 1080,
            },
            safe_zones,
            click_delay: Duration::ZERO,
            type_delay: Duration::ZERO,
            default_scroll_amount: 3,
        };
        (ActionExecutor::new(Box::new(backend), cfg), calls)
    }

    #[tokio::test]
    async fn out_of_bounds_click_never_reaches_backend() {
        for dry_run in [false, true] {
            let (mut ex, calls) = executor(dry_run, vec![]);
            let result = ex.click(5000, 300, MouseButton::Left).await;
            assert!(!result.success);
            assert_eq!(result.error.as_ref().unwrap().kind, FailureKind::OutOfBounds);
            assert_eq!(calls.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn safe_zone_click_fails_regardless_of_dry_run() {
        let zone = Rect {
            x: 0,
            y: 0,
            width: 200,
            height: 200,
        };
        for dry_run in [false, true] {
            let (mut ex, calls) = executor(dry_run, vec![zone]);
            let result = ex.click(100, 100, MouseButton::Left).await;
            assert!(!result.success);
            assert_eq!(
                result.error.as_ref().unwrap().kind,
                FailureKind::SafeZoneViolation
            );
            assert_eq!(calls.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn dry_run_click_reports_what_would_happen() {
        let (mut ex, calls) = executor(true, vec![]);
        let result = ex.click(500, 300, MouseButton::Left).await;
        assert!(result.success);
        assert!(result.details.contains("would"));
        assert!(result.details.contains("click"));
        assert!(result.details.contains("500"));
        assert!(result.details.contains("300"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn dry_run_is_idempotent() {
        let (mut ex, calls) = executor(true, vec![]);
        let first = ex.click(500, 300, MouseButton::Left).await;
        let second = ex.click(500, 300, MouseButton::Left).await;
        assert!(first.success && second.success);
        assert_eq!(first.details, second.details);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn live_click_reaches_backend_once() {
        let (mut ex, calls) = executor(false, vec![]);
        let result = ex.click(500, 300, MouseButton::Left).await;
        assert!(result.success);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn scroll_dry_run_mentions_direction_and_amount() {
        let (mut ex, _) = executor(true, vec![]);
        let result = ex.scroll("down", Some(3)).await;
        assert!(result.success);
        assert!(result.details.contains("down"));
        assert!(result.details.contains('3'));
    }

    #[tokio::test]
    async fn diagonal_scroll_is_invalid() {
        let (mut ex, calls) = executor(false, vec![]);
        let result = ex.scroll("diagonal", Some(1)).await;
        assert!(!result.success);
        assert_eq!(
            result.error.as_ref().unwrap().kind,
            FailureKind::InvalidDirection
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn scroll_without_amount_uses_configured_default() {
        let (mut ex, _) = executor(true, vec![]);
        let result = ex.scroll("up", None).await;
        assert!(result.success);
        assert!(result.details.contains('3'));
    }

    #[tokio::test]
    async fn empty_type_text_is_noop_success() {
        let (mut ex, calls) = executor(false, vec![]);
        let result = ex.type_text("").await;
        assert!(result.success);
        assert!(result.details.contains("nothing to type"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn live_type_emits_one_keystroke_per_character() {
        let (mut ex, calls) = executor(false, vec![]);
        let result = ex.type_text("abc").await;
        assert!(result.success);
        assert!(result.details.contains("3 characters"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn dry_run_type_truncates_long_text() {
        let (mut ex, _) = executor(true, vec![]);
        let long = "x".repeat(120);
        let result = ex.type_text(&long).await;
        assert!(result.success);
        assert!(result.details.contains("..."));
        assert!(!result.details.contains(&long));
    }

    #[tokio::test]
    async fn unknown_key_is_rejected_before_backend() {
        let (mut ex, calls) = executor(false, vec![]);
        let result = ex.press_key("notakey").await;
        assert!(!result.success);
        assert_eq!(result.error.as_ref().unwrap().kind, FailureKind::InvalidKey);

        let result = ex
            .hotkey(&["ctrl".to_string(), "banana".to_string()])
            .await;
        assert!(!result.success);
        assert_eq!(result.error.as_ref().unwrap().kind, FailureKind::InvalidKey);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn hotkey_live_reaches_backend() {
        let (mut ex, calls) = executor(false, vec![]);
        let result = ex.hotkey(&["ctrl".to_string(), "c".to_string()]).await;
        assert!(result.success);
        assert!(result.details.contains("ctrl+c"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn drag_validates_both_endpoints() {
        let (mut ex, calls) = executor(false, vec![]);
        let result = ex.drag((10, 10), (5000, 10)).await;
        assert!(!result.success);
        assert_eq!(result.error.as_ref().unwrap().kind, FailureKind::OutOfBounds);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
