//! Easing curves applied by tweens to their local progress.
//!
//! Curves are plain data so they can be written in scene files:
//!
//! ```toml
//! easing = { type = "ease_out_back" }
//! easing = { type = "cubic_bezier", x1 = 0.4, y1 = 0.0, x2 = 0.2, y2 = 1.0 }
//! easing = { type = "steps", count = 4, position = "end" }
//! ```
//!
//! ```
//! use cascade_core::easing::EasingFunction;
//!
//! let curve = EasingFunction::cubic_bezier(0.4, 0.0, 0.2, 1.0);
//! assert!(curve.evaluate(0.5) > 0.5);
//! ```

use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/// Where the jumps of a stepped curve happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPosition {
    /// First jump right at progress 0.
    Start,
    /// Last jump right at progress 1.
    #[default]
    End,
    Both,
    None,
}

/// Easing curve mapping progress in `[0, 1]` to an intensity.
///
/// Every curve returns exactly 0 at 0 and 1 at 1. Back and elastic curves
/// leave the unit range in between.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EasingFunction {
    #[default]
    Linear,
    /// `cubic-bezier(0.25, 0.1, 0.25, 1.0)`
    Ease,
    /// `cubic-bezier(0.42, 0.0, 1.0, 1.0)`
    EaseIn,
    /// `cubic-bezier(0.0, 0.0, 0.58, 1.0)`
    EaseOut,
    /// `cubic-bezier(0.42, 0.0, 0.58, 1.0)`
    EaseInOut,
    EaseInBack,
    EaseOutBack,
    EaseOutElastic,
    EaseOutBounce,
    CubicBezier { x1: f32, y1: f32, x2: f32, y2: f32 },
    Steps {
        count: u32,
        #[serde(default)]
        position: StepPosition,
    },
}

/// Overshoot amount of the back curves.
const BACK_OVERSHOOT: f32 = 1.70158;

impl EasingFunction {
    /// Custom bezier curve. The x coordinates are clamped to `[0, 1]` so the
    /// curve stays a function of progress.
    pub fn cubic_bezier(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self::CubicBezier {
            x1: x1.clamp(0.0, 1.0),
            y1,
            x2: x2.clamp(0.0, 1.0),
            y2,
        }
    }

    /// Stepped curve with at least one step.
    pub fn steps(count: u32, position: StepPosition) -> Self {
        Self::Steps {
            count: count.max(1),
            position,
        }
    }

    /// Control points of the bezier-based curves.
    fn control_points(&self) -> Option<[f32; 4]> {
        match *self {
            Self::Ease => Some([0.25, 0.1, 0.25, 1.0]),
            Self::EaseIn => Some([0.42, 0.0, 1.0, 1.0]),
            Self::EaseOut => Some([0.0, 0.0, 0.58, 1.0]),
            Self::EaseInOut => Some([0.42, 0.0, 0.58, 1.0]),
            Self::CubicBezier { x1, y1, x2, y2 } => {
                Some([x1.clamp(0.0, 1.0), y1, x2.clamp(0.0, 1.0), y2])
            }
            _ => None,
        }
    }

    /// Intensity at `progress`, which is clamped to `[0, 1]` first.
    pub fn evaluate(&self, progress: f32) -> f32 {
        let t = progress.clamp(0.0, 1.0);
        if t == 0.0 || t == 1.0 {
            return t;
        }

        if let Some([x1, y1, x2, y2]) = self.control_points() {
            return UnitBezier::new(x1, y1, x2, y2).solve(t);
        }

        match *self {
            Self::EaseInBack => t * t * ((BACK_OVERSHOOT + 1.0) * t - BACK_OVERSHOOT),
            Self::EaseOutBack => {
                let u = t - 1.0;
                1.0 + u * u * ((BACK_OVERSHOOT + 1.0) * u + BACK_OVERSHOOT)
            }
            Self::EaseOutElastic => {
                let decay = (-10.0 * t).exp2();
                decay * ((10.0 * t - 0.75) * TAU / 3.0).sin() + 1.0
            }
            Self::EaseOutBounce => bounce(t),
            Self::Steps { count, position } => stepped(count, position, t),
            _ => t,
        }
    }
}

/// Bezier from (0, 0) to (1, 1) in polynomial form.
struct UnitBezier {
    ax: f32,
    bx: f32,
    cx: f32,
    ay: f32,
    by: f32,
    cy: f32,
}

impl UnitBezier {
    fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        let cx = 3.0 * x1;
        let bx = 3.0 * (x2 - x1) - cx;
        let cy = 3.0 * y1;
        let by = 3.0 * (y2 - y1) - cy;
        Self {
            ax: 1.0 - cx - bx,
            bx,
            cx,
            ay: 1.0 - cy - by,
            by,
            cy,
        }
    }

    fn x(&self, s: f32) -> f32 {
        ((self.ax * s + self.bx) * s + self.cx) * s
    }

    fn y(&self, s: f32) -> f32 {
        ((self.ay * s + self.by) * s + self.cy) * s
    }

    fn dx(&self, s: f32) -> f32 {
        (3.0 * self.ax * s + 2.0 * self.bx) * s + self.cx
    }

    /// Curve parameter whose x equals `x`: Newton first, bisection when the
    /// slope is too flat to converge.
    fn param_for(&self, x: f32) -> f32 {
        const TOLERANCE: f32 = 1e-6;

        let mut s = x;
        for _ in 0..8 {
            let err = self.x(s) - x;
            if err.abs() < TOLERANCE {
                return s;
            }
            let slope = self.dx(s);
            if slope.abs() < TOLERANCE {
                break;
            }
            s -= err / slope;
        }

        let (mut lo, mut hi) = (0.0_f32, 1.0_f32);
        s = x;
        for _ in 0..32 {
            let err = self.x(s) - x;
            if err.abs() < TOLERANCE {
                break;
            }
            if err > 0.0 {
                hi = s;
            } else {
                lo = s;
            }
            s = 0.5 * (lo + hi);
        }
        s
    }

    fn solve(&self, x: f32) -> f32 {
        self.y(self.param_for(x))
    }
}

/// Four parabolic arcs, each peak lower than the last.
fn bounce(t: f32) -> f32 {
    const K: f32 = 7.5625;
    const SEGMENTS: [(f32, f32, f32); 3] = [
        (2.0 / 2.75, 1.5 / 2.75, 0.75),
        (2.5 / 2.75, 2.25 / 2.75, 0.9375),
        (f32::INFINITY, 2.625 / 2.75, 0.984375),
    ];

    if t < 1.0 / 2.75 {
        return K * t * t;
    }
    SEGMENTS
        .iter()
        .find(|(end, _, _)| t < *end)
        .map(|(_, center, floor)| {
            let d = t - center;
            K * d * d + floor
        })
        .unwrap_or(1.0)
}

fn stepped(count: u32, position: StepPosition, t: f32) -> f32 {
    let count = count.max(1);
    let jumps = match position {
        StepPosition::Start | StepPosition::End => count,
        StepPosition::Both => count + 1,
        StepPosition::None => count - 1,
    };
    if jumps == 0 {
        return t;
    }

    let mut step = (t * count as f32).floor();
    if matches!(position, StepPosition::Start | StepPosition::Both) {
        step += 1.0;
    }
    (step / jumps as f32).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 0.001;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    fn named() -> Vec<EasingFunction> {
        vec![
            EasingFunction::Linear,
            EasingFunction::Ease,
            EasingFunction::EaseIn,
            EasingFunction::EaseOut,
            EasingFunction::EaseInOut,
            EasingFunction::EaseInBack,
            EasingFunction::EaseOutBack,
            EasingFunction::EaseOutElastic,
            EasingFunction::EaseOutBounce,
            EasingFunction::steps(3, StepPosition::Start),
        ]
    }

    #[test]
    fn test_curves_pin_their_ends() {
        for curve in named() {
            assert_eq!(curve.evaluate(0.0), 0.0, "{curve:?}");
            assert_eq!(curve.evaluate(1.0), 1.0, "{curve:?}");
            assert_eq!(curve.evaluate(-3.0), 0.0, "{curve:?}");
            assert_eq!(curve.evaluate(7.0), 1.0, "{curve:?}");
        }
    }

    #[test]
    fn test_ease_in_out_is_point_symmetric() {
        let curve = EasingFunction::EaseInOut;
        assert!(approx_eq(curve.evaluate(0.5), 0.5));
        for t in [0.1, 0.3, 0.45] {
            assert!(approx_eq(curve.evaluate(t) + curve.evaluate(1.0 - t), 1.0));
        }
    }

    #[test]
    fn test_bezier_presets_bend_the_right_way() {
        assert!(EasingFunction::EaseIn.evaluate(0.3) < 0.3);
        assert!(EasingFunction::EaseOut.evaluate(0.3) > 0.3);
        assert!(EasingFunction::Ease.evaluate(0.5) > 0.5);
    }

    #[test]
    fn test_linear_bezier_is_identity() {
        let curve = EasingFunction::cubic_bezier(1.0 / 3.0, 1.0 / 3.0, 2.0 / 3.0, 2.0 / 3.0);
        for t in [0.1, 0.5, 0.9] {
            assert!(approx_eq(curve.evaluate(t), t));
        }
    }

    #[test]
    fn test_cubic_bezier_clamps_x() {
        assert_eq!(
            EasingFunction::cubic_bezier(-1.0, 0.5, 2.0, 0.5),
            EasingFunction::CubicBezier { x1: 0.0, y1: 0.5, x2: 1.0, y2: 0.5 }
        );
    }

    #[test]
    fn test_back_curves_overshoot() {
        assert!(EasingFunction::EaseInBack.evaluate(0.2) < 0.0);
        assert!(EasingFunction::EaseOutBack.evaluate(0.8) > 1.0);
    }

    #[test]
    fn test_bounce_is_bounded_and_continuous() {
        let mut previous = 0.0;
        for i in 1..=200 {
            let v = EasingFunction::EaseOutBounce.evaluate(i as f32 / 200.0);
            assert!((0.0..=1.0 + EPSILON).contains(&v));
            assert!((v - previous).abs() < 0.1);
            previous = v;
        }
    }

    #[test]
    fn test_steps_positions() {
        let end = EasingFunction::steps(4, StepPosition::End);
        assert_eq!(end.evaluate(0.2), 0.0);
        assert_eq!(end.evaluate(0.25), 0.25);
        assert_eq!(end.evaluate(0.99), 0.75);

        let start = EasingFunction::steps(4, StepPosition::Start);
        assert_eq!(start.evaluate(0.1), 0.25);

        let both = EasingFunction::steps(3, StepPosition::Both);
        assert_eq!(both.evaluate(0.1), 0.25);

        let none = EasingFunction::steps(3, StepPosition::None);
        assert_eq!(none.evaluate(0.1), 0.0);
        assert_eq!(none.evaluate(0.9), 1.0);
    }

    #[test]
    fn test_zero_steps_become_one() {
        assert_eq!(
            EasingFunction::steps(0, StepPosition::End),
            EasingFunction::Steps { count: 1, position: StepPosition::End }
        );
    }

    #[test]
    fn test_toml_forms() {
        #[derive(Deserialize)]
        struct Holder {
            easing: EasingFunction,
        }

        let parsed: Holder = toml::from_str(r#"easing = { type = "steps", count = 2 }"#).unwrap();
        assert_eq!(parsed.easing, EasingFunction::steps(2, StepPosition::End));

        let parsed: Holder = toml::from_str(
            r#"easing = { type = "cubic_bezier", x1 = 0.5, y1 = 0.0, x2 = 0.5, y2 = 1.0 }"#,
        )
        .unwrap();
        assert!(approx_eq(parsed.easing.evaluate(0.5), 0.5));
    }
}
