use serde::{Deserialize, Serialize};

use crate::errors::{ActionFailure, FailureKind};
use crate::types::ScreenshotMeta;

/// A screen rectangle excluded from all targetable actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x
            && y >= self.y
            && x < self.x + self.width as i32
            && y < self.y + self.height as i32
    }
}

/// Bounds and safe-zone gate shared by the executor and the interpreter's
/// pre-dispatch validation. Checked before any physical action, in every mode.
pub fn check_point(
    x: i32,
    y: i32,
    bounds: &ScreenshotMeta,
    safe_zones: &[Rect],
) -> Result<(), ActionFailure> {
    if x < 0 || y < 0 || x >= bounds.width as i32 || y >= bounds.height as i32 {
        return Err(ActionFailure::new(
            FailureKind::OutOfBounds,
            format!(
                "({x}, {y}) is outside the {}x{} screen",
                bounds.width, bounds.height
            ),
        ));
    }
    for zone in safe_zones {
        if zone.contains(x, y) {
            return Err(ActionFailure::new(
                FailureKind::SafeZoneViolation,
                format!(
                    "({x}, {y}) is inside protected region {}x{} at ({}, {})",
                    zone.width, zone.height, zone.x, zone.y
                ),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> ScreenshotMeta {
        ScreenshotMeta {
            width: 1920,
            height: 1080,
        }
    }

    #[test]
    fn rect_contains_is_half_open() {
        let r = Rect {
            x: 10,
            y: 10,
            width: 20,
            height: 20,
        };
        assert!(r.contains(10, 10));
        assert!(r.contains(29, 29));
        assert!(!r.contains(30, 30));
        assert!(!r.contains(9, 15));
    }

    #[test]
    fn out_of_bounds_points_are_rejected() {
        for (x, y) in [(-1, 50), (50, -1), (1920, 50), (50, 1080)] {
            let err = check_point(x, y, &bounds(), &[]).unwrap_err();
            assert_eq!(err.kind, FailureKind::OutOfBounds);
        }
        assert!(check_point(0, 0, &bounds(), &[]).is_ok());
        assert!(check_point(1919, 1079, &bounds(), &[]).is_ok());
    }

    #[test]
    fn safe_zone_points_are_rejected() {
        let zones = [Rect {
            x: 100,
            y: 100,
            width: 50,
            height: 50,
        }];
        let err = check_point(120, 120, &bounds(), &zones).unwrap_err();
        assert_eq!(err.kind, FailureKind::SafeZoneViolation);
        assert!(check_point(99, 99, &bounds(), &zones).is_ok());
    }
}
