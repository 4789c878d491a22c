use std::fmt;

use rand::Rng;

use super::array::DType;
use super::types::Action;

#[derive(Debug, Clone, PartialEq)]
pub enum Space {
    Discrete {
        n: i64,
        start: i64,
    },
    Box {
        low: Vec<f32>,
        high: Vec<f32>,
        shape: Vec<usize>,
        dtype: DType,
    },
}

impl Space {
    pub fn discrete(n: i64) -> Self {
        Space::Discrete { n, start: 0 }
    }

    /// Box space with per-element bounds. `low` and `high` must both hold
    /// `shape.iter().product()` values.
    pub fn bounded(low: Vec<f32>, high: Vec<f32>, shape: Vec<usize>) -> Self {
        debug_assert_eq!(low.len(), high.len());
        debug_assert_eq!(low.len(), shape.iter().product::<usize>());
        Space::Box {
            low,
            high,
            shape,
            dtype: DType::Float32,
        }
    }

    pub fn shape(&self) -> Vec<usize> {
        match self {
            Space::Discrete { .. } => Vec::new(),
            Space::Box { shape, .. } => shape.clone(),
        }
    }

    pub fn contains(&self, action: &Action) -> bool {
        match (self, action) {
            (Space::Discrete { n, start }, Action::Discrete(value)) => {
                *value >= *start && *value < start + n
            }
            (Space::Box { low, high, .. }, Action::Continuous(values)) => {
                values.len() == low.len()
                    && values
                        .iter()
                        .zip(low.iter().zip(high.iter()))
                        .all(|(v, (lo, hi))| v >= lo && v <= hi)
            }
            _ => false,
        }
    }

    pub fn sample(&self, rng: &mut impl Rng) -> Action {
        match self {
            Space::Discrete { n, start } => Action::Discrete(start + rng.gen_range(0..*n)),
            Space::Box { low, high, .. } => Action::Continuous(
                low.iter()
                    .zip(high.iter())
                    .map(|(&lo, &hi)| sample_interval(rng, lo, hi))
                    .collect(),
            ),
        }
    }
}

// Unbounded sides follow the usual convention: normal when both sides are
// open, shifted exponential when only one is.
fn sample_interval(rng: &mut impl Rng, low: f32, high: f32) -> f32 {
    let u: f64 = rng.gen_range(f64::EPSILON..1.0);
    match (low.is_finite(), high.is_finite()) {
        (true, true) => (low as f64 + (high as f64 - low as f64) * u) as f32,
        (true, false) => (low as f64 - u.ln()) as f32,
        (false, true) => (high as f64 + u.ln()) as f32,
        (false, false) => {
            let v: f64 = rng.gen_range(0.0..1.0);
            ((-2.0 * u.ln()).sqrt() * (std::f64::consts::TAU * v).cos()) as f32
        }
    }
}

fn fmt_scalar(value: f32) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value.is_infinite() {
        let sign = if value > 0.0 { "" } else { "-" };
        format!("{}inf", sign)
    } else if value != 0.0 && (value.abs() >= 1e16 || value.abs() < 1e-4) {
        let formatted = format!("{:e}", value);
        match formatted.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
            _ => formatted,
        }
    } else {
        format!("{}", value)
    }
}

fn fmt_values(values: &[f32]) -> String {
    let items: Vec<String> = values.iter().map(|v| fmt_scalar(*v)).collect();
    format!("[{}]", items.join(" "))
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Space::Discrete { n, start: 0 } => write!(f, "Discrete({})", n),
            Space::Discrete { n, start } => write!(f, "Discrete({}, start={})", n, start),
            Space::Box {
                low,
                high,
                shape,
                dtype,
            } => {
                let dims: Vec<String> = shape.iter().map(|d| d.to_string()).collect();
                let shape_str = if dims.len() == 1 {
                    format!("({},)", dims[0])
                } else {
                    format!("({})", dims.join(", "))
                };
                write!(
                    f,
                    "Box({}, {}, {}, {})",
                    fmt_values(low),
                    fmt_values(high),
                    shape_str,
                    dtype
                )
            }
        }
    }
}
