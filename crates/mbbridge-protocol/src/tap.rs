//! Tap dispatch messages and coordinate computation.
//!
//! A tap request names a side of the screen. The executor turns it into a
//! single-point touch at a fixed fraction of the current screen bounds:
//! 18% of the width for the left side, 82% for the right, and half the
//! height. The fractions keep the tap clear of the physical border where
//! touch targets are easily missed.

use std::fmt;
use std::time::Duration;

/// Horizontal position of a left tap, in thousandths of the screen width.
pub const LEFT_X_PERMILLE: i64 = 180;

/// Horizontal position of a right tap, in thousandths of the screen width.
pub const RIGHT_X_PERMILLE: i64 = 820;

/// Vertical position of every tap, in thousandths of the screen height.
pub const CENTER_Y_PERMILLE: i64 = 500;

/// How long the synthesised touch is held.
pub const TAP_DURATION: Duration = Duration::from_millis(10);

/// Side of the screen a tap targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TapSide {
    /// Left edge region; turns to the previous page.
    Left,
    /// Right edge region; turns to the next page.
    Right,
}

impl TapSide {
    /// Lowercase label used in messages and logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    const fn x_permille(self) -> i64 {
        match self {
            Self::Left => LEFT_X_PERMILLE,
            Self::Right => RIGHT_X_PERMILLE,
        }
    }
}

impl fmt::Display for TapSide {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.label())
    }
}

/// Current screen rectangle reported by a geometry provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenBounds {
    /// Left edge in pixels.
    pub left: i32,
    /// Top edge in pixels.
    pub top: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl ScreenBounds {
    /// Bounds anchored at the origin.
    #[must_use]
    pub const fn from_size(width: u32, height: u32) -> Self {
        Self {
            left: 0,
            top: 0,
            width,
            height,
        }
    }
}

/// Screen coordinate a tap is delivered to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TapPoint {
    /// Horizontal pixel coordinate.
    pub x: i32,
    /// Vertical pixel coordinate.
    pub y: i32,
}

impl fmt::Display for TapPoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "x={} y={}", self.x, self.y)
    }
}

/// Computes where a tap on `side` lands within `bounds`.
#[must_use]
pub fn tap_point(bounds: ScreenBounds, side: TapSide) -> TapPoint {
    TapPoint {
        x: offset(bounds.left, bounds.width, side.x_permille()),
        y: offset(bounds.top, bounds.height, CENTER_Y_PERMILLE),
    }
}

#[expect(
    clippy::integer_division,
    reason = "pixel coordinates truncate towards the origin"
)]
fn offset(origin: i32, extent: u32, permille: i64) -> i32 {
    let scaled = i64::from(extent) * permille / 1000;
    let position = i64::from(origin) + scaled;
    i32::try_from(position).unwrap_or(if position < 0 { i32::MIN } else { i32::MAX })
}

/// Result of one tap request, as reported by the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TapOutcome {
    /// Side that was requested.
    pub side: TapSide,
    /// Whether the gesture completed.
    pub success: bool,
    /// Coordinate the gesture targeted.
    pub point: TapPoint,
}

impl fmt::Display for TapOutcome {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "tap {} at {} result={}",
            self.side, self.point, self.success
        )
    }
}

/// Messages carried on the tap dispatch bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TapMessage {
    /// Ask the executor to tap one side of the screen.
    Tap {
        /// Side to tap.
        side: TapSide,
    },
    /// Outcome of exactly one earlier [`TapMessage::Tap`].
    TapResult(TapOutcome),
}

impl TapMessage {
    /// Action name of the message (`TAP` or `TAP_RESULT`).
    #[must_use]
    pub const fn action(&self) -> &'static str {
        match self {
            Self::Tap { .. } => "TAP",
            Self::TapResult(_) => "TAP_RESULT",
        }
    }
}
