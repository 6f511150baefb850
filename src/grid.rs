//! Parameter grid: values, (σ, order, σ_noise) tuples, axes and the
//! Cartesian product that the launcher walks.
//!
//! Values are rendered exactly the way they are substituted into the
//! submission command and the log file name, so `Display` here is part of
//! the scheduler-facing format.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, Trim, WriterBuilder};

use crate::error::{Result, SweepError};

/// Tolerance used when deciding whether the last range point is inside `max`.
const RANGE_EPS: f64 = 1e-10;

/// Upper bound on the points a single range may expand to.
pub const MAX_RANGE_POINTS: usize = 1_000_000;

/// Largest integer every smaller one of which is exact in an f64 (2^53).
const MAX_EXACT: f64 = 9_007_199_254_740_992.0;

/// Powers of ten up to this are exact in an f64.
const MAX_DECIMALS: u32 = 22;

/// One coordinate of a grid point.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    /// Anything that is not a number. Substituted verbatim, never rejected.
    Text(String),
}

impl ParamValue {
    /// Integer first, then float, otherwise the trimmed text.
    pub fn parse(token: &str) -> Self {
        let token = token.trim();
        if let Ok(i) = token.parse::<i64>() {
            ParamValue::Int(i)
        } else if let Ok(x) = token.parse::<f64>() {
            ParamValue::Float(x)
        } else {
            ParamValue::Text(token.to_string())
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(v.into())
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(i) => write!(f, "{i}"),
            ParamValue::Float(x) => f.write_str(&format_float(*x)),
            ParamValue::Text(s) => f.write_str(s),
        }
    }
}

/// Shortest round-trip digits; integral floats keep a trailing `.0`, very
/// small or very large magnitudes switch to `1e-05` / `1e+16` notation.
fn format_float(x: f64) -> String {
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let sci = format!("{x:e}");
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if x != 0.0 && (exp < -4 || exp >= 16) {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exp.abs())
    } else {
        let plain = format!("{x}");
        if plain.contains('.') {
            plain
        } else {
            format!("{plain}.0")
        }
    }
}

/// Digits after the point in the shortest rendering of `x`.
fn fraction_digits(x: f64) -> u32 {
    let plain = format!("{x}");
    plain.split_once('.').map_or(0, |(_, frac)| frac.len() as u32)
}

/// One grid point.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamTuple {
    pub sigma: ParamValue,
    pub order: ParamValue,
    pub sigma_noise: ParamValue,
}

impl ParamTuple {
    pub fn new(
        sigma: impl Into<ParamValue>,
        order: impl Into<ParamValue>,
        sigma_noise: impl Into<ParamValue>,
    ) -> Self {
        Self {
            sigma: sigma.into(),
            order: order.into(),
            sigma_noise: sigma_noise.into(),
        }
    }

    /// The three values in template order.
    pub fn values(&self) -> [&ParamValue; 3] {
        [&self.sigma, &self.order, &self.sigma_noise]
    }
}

impl fmt::Display for ParamTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.sigma, self.order, self.sigma_noise)
    }
}

/// Ordered values for a single parameter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Axis(Vec<ParamValue>);

impl Axis {
    /// Comma separated tokens, e.g. `"0.1,0.2,0.5"`. Blank input is an empty axis.
    pub fn parse_list(list: &str) -> Self {
        if list.trim().is_empty() {
            return Self::default();
        }
        Self(list.split(',').map(ParamValue::parse).collect())
    }

    /// Inclusive `min..=max` in steps of `step`.
    ///
    /// Points are `min + i*step`, computed on integers scaled by the most
    /// decimals written in any of the three inputs, so `0.1 + 0.2` gives
    /// `0.3` and `10000.1 + 0.2` gives `10000.3`. If none has decimals the
    /// values are integers (`1,4,1` gives `1 2 3 4`, not `1.0 2.0 ...`), as
    /// long as they are exact in an f64; past 2^53 they stay floats.
    pub fn range(min: f64, max: f64, step: f64) -> Result<Self> {
        if !(min.is_finite() && max.is_finite() && step.is_finite()) {
            return Err(SweepError::InvalidRange(format!(
                "bounds must be finite (min={min}, max={max}, step={step})"
            )));
        }
        if step <= 0.0 {
            return Err(SweepError::InvalidRange(format!("step must be positive, got {step}")));
        }
        if min > max {
            return Err(SweepError::InvalidRange(format!("min {min} exceeds max {max}")));
        }

        let decimals = [min, max, step].into_iter().map(fraction_digits).max().unwrap_or(0);
        let scale = 10f64.powi(decimals as i32);
        let (min_s, max_s, step_s) =
            ((min * scale).round(), (max * scale).round(), (step * scale).round());
        let exact = decimals <= MAX_DECIMALS
            && step_s > 0.0
            && min_s.abs() <= MAX_EXACT
            && max_s.abs() <= MAX_EXACT;

        let count = if exact {
            ((max_s - min_s) / step_s).floor() + 1.0
        } else {
            ((max - min + RANGE_EPS) / step).floor() + 1.0
        };
        if count > MAX_RANGE_POINTS as f64 {
            return Err(SweepError::InvalidRange(format!(
                "{min}..{max} in steps of {step} is {count:.0} points, limit is {MAX_RANGE_POINTS}"
            )));
        }

        let values = (0..count as usize)
            .map(|i| {
                if !exact {
                    return ParamValue::Float(min + i as f64 * step);
                }
                let v = min_s + i as f64 * step_s;
                if decimals == 0 {
                    ParamValue::Int(v as i64)
                } else {
                    ParamValue::Float(v / scale)
                }
            })
            .collect();
        Ok(Self(values))
    }

    /// `[min, max, step]` as handed over by a comma separated CLI flag.
    pub fn from_range_slice(range: &[f64]) -> Result<Self> {
        match range {
            [min, max, step] => Self::range(*min, *max, *step),
            _ => Err(SweepError::InvalidRange(format!(
                "expected min,max,step but got {} value(s)",
                range.len()
            ))),
        }
    }

    pub fn values(&self) -> &[ParamValue] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The full sweep, in submission order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    points: Vec<ParamTuple>,
}

impl Grid {
    pub fn from_tuples(points: Vec<ParamTuple>) -> Self {
        Self { points }
    }

    /// Cartesian product, σ outermost and σ_noise innermost.
    pub fn product(sigma: &Axis, order: &Axis, sigma_noise: &Axis) -> Self {
        let mut points = Vec::with_capacity(sigma.len() * order.len() * sigma_noise.len());
        for s in sigma.values() {
            for o in order.values() {
                for n in sigma_noise.values() {
                    points.push(ParamTuple {
                        sigma: s.clone(),
                        order: o.clone(),
                        sigma_noise: n.clone(),
                    });
                }
            }
        }
        Self { points }
    }

    /// Reads `sigma,order,sigma_noise` rows. No header needed; a first row
    /// starting with `sigma` is treated as one and skipped.
    pub fn read_csv<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let mut points = Vec::new();
        for (idx, record) in rdr.records().enumerate() {
            let rec = record?;
            if idx == 0 && rec.get(0).is_some_and(|f| f.eq_ignore_ascii_case("sigma")) {
                continue;
            }
            if rec.len() != 3 {
                let line = rec.position().map(|p| p.line()).unwrap_or(idx as u64 + 1);
                return Err(SweepError::GridRow { line, found: rec.len() });
            }
            points.push(ParamTuple {
                sigma: ParamValue::parse(&rec[0]),
                order: ParamValue::parse(&rec[1]),
                sigma_noise: ParamValue::parse(&rec[2]),
            });
        }
        Ok(Self { points })
    }

    /// Writes the header-less format `read_csv` accepts.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = WriterBuilder::new().has_headers(false).from_writer(writer);
        for p in &self.points {
            wtr.write_record(p.values().map(|v| v.to_string()))?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::read_csv(BufReader::new(file))
    }

    pub fn to_path(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        self.write_csv(file)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParamTuple> {
        self.points.iter()
    }
}

impl IntoIterator for Grid {
    type Item = ParamTuple;
    type IntoIter = std::vec::IntoIter<ParamTuple>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.into_iter()
    }
}

impl<'a> IntoIterator for &'a Grid {
    type Item = &'a ParamTuple;
    type IntoIter = std::slice::Iter<'a, ParamTuple>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

impl FromIterator<ParamTuple> for Grid {
    fn from_iter<T: IntoIterator<Item = ParamTuple>>(iter: T) -> Self {
        Self { points: iter.into_iter().collect() }
    }
}
