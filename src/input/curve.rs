//! Axis shaping primitives: deadzones and response curves.
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Possible errors when building a curve from control point data
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CurveError {
    #[error("curve requires at least {0} control points, got {1}")]
    TooFewPoints(usize, usize),
    #[error("bezier curves need 3n+1 points (anchor, handle, handle, anchor, ...), got {0}")]
    BezierPointCount(usize),
    #[error("control point x values must be strictly increasing (at index {0})")]
    NotIncreasing(usize),
    #[error("control point {0} lies outside of [-1, 1]")]
    OutOfRange(usize),
    #[error("deadzone bounds must satisfy low < center_low <= center_high < high")]
    InvalidDeadzone,
}

/// Deadzone definition: `[low, center_low]` maps to `[-1, 0]`, the center
/// range maps to 0 and `[center_high, high]` maps to `[0, 1]`.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct Deadzone {
    pub low: f64,
    pub center_low: f64,
    pub center_high: f64,
    pub high: f64,
}

impl Default for Deadzone {
    fn default() -> Self {
        Self {
            low: -1.0,
            center_low: 0.0,
            center_high: 0.0,
            high: 1.0,
        }
    }
}

impl Deadzone {
    pub fn validate(&self) -> Result<(), CurveError> {
        let ordered = self.low < self.center_low
            && self.center_low <= self.center_high
            && self.center_high < self.high;
        if !ordered {
            return Err(CurveError::InvalidDeadzone);
        }
        Ok(())
    }

    /// Apply the deadzone to the given axis value
    pub fn apply(&self, value: f64) -> f64 {
        let result = if value < self.center_low {
            -(self.center_low - value) / (self.center_low - self.low)
        } else if value > self.center_high {
            (value - self.center_high) / (self.high - self.center_high)
        } else {
            0.0
        };
        result.clamp(-1.0, 1.0)
    }
}

/// Interpolation used between control points
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CurveKind {
    PiecewiseLinear,
    CubicSpline,
    CubicBezier,
}

/// A response curve as described in a profile
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct CurveConfig {
    pub kind: CurveKind,
    /// Control points as `[x, y]` pairs in [-1, 1]
    pub points: Vec<[f64; 2]>,
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            kind: CurveKind::PiecewiseLinear,
            points: vec![[-1.0, -1.0], [1.0, 1.0]],
        }
    }
}

/// A validated, ready to evaluate response curve
#[derive(Debug, Clone)]
pub enum Curve {
    PiecewiseLinear(PiecewiseLinear),
    CubicSpline(CubicSpline),
    CubicBezier(CubicBezier),
}

impl Curve {
    /// Build a curve from its profile definition
    pub fn from_config(config: &CurveConfig) -> Result<Curve, CurveError> {
        for (idx, [x, y]) in config.points.iter().enumerate() {
            if !(-1.0..=1.0).contains(x) || !(-1.0..=1.0).contains(y) {
                return Err(CurveError::OutOfRange(idx));
            }
        }
        let points: Vec<(f64, f64)> = config.points.iter().map(|[x, y]| (*x, *y)).collect();
        let curve = match config.kind {
            CurveKind::PiecewiseLinear => Curve::PiecewiseLinear(PiecewiseLinear::new(points)?),
            CurveKind::CubicSpline => Curve::CubicSpline(CubicSpline::new(points)?),
            CurveKind::CubicBezier => Curve::CubicBezier(CubicBezier::new(points)?),
        };
        Ok(curve)
    }

    /// Evaluate the curve at `x`. The result is clamped to [-1, 1].
    pub fn evaluate(&self, x: f64) -> f64 {
        let y = match self {
            Curve::PiecewiseLinear(curve) => curve.evaluate(x),
            Curve::CubicSpline(curve) => curve.evaluate(x),
            Curve::CubicBezier(curve) => curve.evaluate(x),
        };
        y.clamp(-1.0, 1.0)
    }
}

fn check_increasing(points: &[(f64, f64)]) -> Result<(), CurveError> {
    for (idx, pair) in points.windows(2).enumerate() {
        if pair[1].0 <= pair[0].0 {
            return Err(CurveError::NotIncreasing(idx + 1));
        }
    }
    Ok(())
}

/// Index of the segment `[points[i], points[i + 1]]` containing x
fn segment_index(xs: impl Iterator<Item = f64>, x: f64, segments: usize) -> usize {
    let mut idx = 0;
    for (i, start) in xs.enumerate().take(segments) {
        if x >= start {
            idx = i;
        }
    }
    idx
}

/// Straight lines between consecutive control points
#[derive(Debug, Clone)]
pub struct PiecewiseLinear {
    points: Vec<(f64, f64)>,
}

impl PiecewiseLinear {
    pub fn new(points: Vec<(f64, f64)>) -> Result<Self, CurveError> {
        if points.len() < 2 {
            return Err(CurveError::TooFewPoints(2, points.len()));
        }
        check_increasing(&points)?;
        Ok(Self { points })
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        let first = self.points[0];
        let last = self.points[self.points.len() - 1];
        if x <= first.0 {
            return first.1;
        }
        if x >= last.0 {
            return last.1;
        }
        let idx = segment_index(self.points.iter().map(|p| p.0), x, self.points.len() - 1);
        let (x0, y0) = self.points[idx];
        let (x1, y1) = self.points[idx + 1];
        y0 + (y1 - y0) * (x - x0) / (x1 - x0)
    }
}

/// Natural cubic spline through all control points
#[derive(Debug, Clone)]
pub struct CubicSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Second derivatives at each control point
    z: Vec<f64>,
}

impl CubicSpline {
    pub fn new(points: Vec<(f64, f64)>) -> Result<Self, CurveError> {
        if points.len() < 2 {
            return Err(CurveError::TooFewPoints(2, points.len()));
        }
        check_increasing(&points)?;
        let xs: Vec<f64> = points.iter().map(|p| p.0).collect();
        let ys: Vec<f64> = points.iter().map(|p| p.1).collect();
        let z = Self::second_derivatives(&xs, &ys);
        Ok(Self { xs, ys, z })
    }

    /// Solve the tridiagonal system for a natural spline (zero curvature at
    /// both ends).
    fn second_derivatives(xs: &[f64], ys: &[f64]) -> Vec<f64> {
        let n = xs.len();
        let mut z = vec![0.0; n];
        if n < 3 {
            return z;
        }
        let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();
        let mut diag = vec![0.0; n];
        let mut rhs = vec![0.0; n];
        for i in 1..n - 1 {
            diag[i] = 2.0 * (h[i - 1] + h[i]);
            rhs[i] = 6.0 * ((ys[i + 1] - ys[i]) / h[i] - (ys[i] - ys[i - 1]) / h[i - 1]);
        }
        // Forward elimination
        for i in 2..n - 1 {
            let factor = h[i - 1] / diag[i - 1];
            diag[i] -= factor * h[i - 1];
            rhs[i] -= factor * rhs[i - 1];
        }
        // Back substitution
        for i in (1..n - 1).rev() {
            let upper = if i + 1 < n - 1 { h[i] * z[i + 1] } else { 0.0 };
            z[i] = (rhs[i] - upper) / diag[i];
        }
        z
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        let n = self.xs.len();
        let x = x.clamp(self.xs[0], self.xs[n - 1]);
        let i = segment_index(self.xs.iter().copied(), x, n - 1);
        let h = self.xs[i + 1] - self.xs[i];
        let a = (self.xs[i + 1] - x) / h;
        let b = (x - self.xs[i]) / h;
        a * self.ys[i]
            + b * self.ys[i + 1]
            + ((a.powi(3) - a) * self.z[i] + (b.powi(3) - b) * self.z[i + 1]) * h * h / 6.0
    }
}

/// Chain of cubic bezier segments. Points are laid out as
/// `anchor, handle, handle, anchor, handle, handle, anchor, ...`
#[derive(Debug, Clone)]
pub struct CubicBezier {
    points: Vec<(f64, f64)>,
}

impl CubicBezier {
    const SEARCH_ITERATIONS: usize = 48;

    pub fn new(points: Vec<(f64, f64)>) -> Result<Self, CurveError> {
        if points.len() < 4 {
            return Err(CurveError::TooFewPoints(4, points.len()));
        }
        if (points.len() - 1) % 3 != 0 {
            return Err(CurveError::BezierPointCount(points.len()));
        }
        let anchors: Vec<(f64, f64)> = points.iter().step_by(3).copied().collect();
        if let Err(CurveError::NotIncreasing(idx)) = check_increasing(&anchors) {
            return Err(CurveError::NotIncreasing(idx * 3));
        }
        Ok(Self { points })
    }

    fn segments(&self) -> usize {
        (self.points.len() - 1) / 3
    }

    fn bezier(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
        let u = 1.0 - t;
        u * u * u * p0 + 3.0 * u * u * t * p1 + 3.0 * u * t * t * p2 + t * t * t * p3
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        let segments = self.segments();
        let first = self.points[0];
        let last = self.points[self.points.len() - 1];
        let x = x.clamp(first.0, last.0);
        let anchors = self.points.iter().step_by(3).map(|p| p.0);
        let seg = segment_index(anchors, x, segments);
        let p = &self.points[seg * 3..seg * 3 + 4];

        // x(t) is monotonic for well-formed handles, bisect for t
        let (mut lo, mut hi) = (0.0, 1.0);
        for _ in 0..Self::SEARCH_ITERATIONS {
            let mid = (lo + hi) / 2.0;
            let mid_x = Self::bezier(p[0].0, p[1].0, p[2].0, p[3].0, mid);
            if mid_x < x {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        let t = (lo + hi) / 2.0;
        Self::bezier(p[0].1, p[1].1, p[2].1, p[3].1, t)
    }
}
