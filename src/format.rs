use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

/// Shown wherever a value is absent or not a number.
pub const NOT_AVAILABLE: &str = "N/A";

pub const DEFAULT_DECIMAL_PLACES: u32 = 2;

const THOUSANDS_SEPARATOR: char = '.';
const DECIMAL_SEPARATOR: char = ',';
const CURRENCY_SYMBOL: &str = "R$";

/// Unit/formatting category of an asset's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Percentage,
    Currency,
    Points,
    Plain,
}

impl ValueKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Percentage => "percentual",
            Self::Currency => "moeda",
            Self::Points => "pontos",
            Self::Plain => "número",
        }
    }
}

/// Format a value with the pt-BR conventions used across the dashboard.
///
/// Missing, non-finite and out-of-range values return [`NOT_AVAILABLE`].
pub fn format_value(value: Option<f64>, kind: ValueKind, decimal_places: u32) -> String {
    NumberFormatter::new(decimal_places).format(value, kind)
}

/// Like [`format_value`] for untyped JSON input: numbers and numeric strings
/// are accepted, anything else is not available.
pub fn format_json_value(
    value: &serde_json::Value,
    kind: ValueKind,
    decimal_places: u32,
) -> String {
    format_value(numeric_json_value(value), kind, decimal_places)
}

/// Extract a number from a JSON value, accepting numeric strings.
pub fn numeric_json_value(value: &serde_json::Value) -> Option<f64> {
    let number = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|v| v.is_finite())
}

/// Shared number formatter; the single place displayed numbers come from
/// (chart ticks, tooltips, table cells, comparison totals).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberFormatter {
    decimal_places: u32,
    point_unit: Option<String>,
}

impl Default for NumberFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_DECIMAL_PLACES)
    }
}

impl NumberFormatter {
    pub fn new(decimal_places: u32) -> Self {
        Self {
            decimal_places,
            point_unit: None,
        }
    }

    /// Suffix appended to [`ValueKind::Points`] values, e.g. `"pts"`.
    pub fn with_point_unit(mut self, unit: Option<String>) -> Self {
        self.point_unit = unit.filter(|u| !u.trim().is_empty());
        self
    }

    pub fn decimal_places(&self) -> u32 {
        self.decimal_places
    }

    pub fn format(&self, value: Option<f64>, kind: ValueKind) -> String {
        let Some(rounded) = value.and_then(|v| self.round(v)) else {
            return NOT_AVAILABLE.to_string();
        };

        let negative = rounded.is_sign_negative() && !rounded.is_zero();
        let digits = localize_digits(rounded.abs(), self.decimal_places);
        let sign = if negative { "-" } else { "" };

        match kind {
            ValueKind::Percentage => format!("{sign}{digits}%"),
            ValueKind::Currency => format!("{sign}{CURRENCY_SYMBOL} {digits}"),
            ValueKind::Points => match &self.point_unit {
                Some(unit) => format!("{sign}{digits} {unit}"),
                None => format!("{sign}{digits}"),
            },
            ValueKind::Plain => format!("{sign}{digits}"),
        }
    }

    /// Axis tick label. `None` means the axis mixes value kinds, so no unit
    /// can be assumed and a bare number is shown.
    pub fn format_axis(&self, value: f64, kind: Option<ValueKind>) -> String {
        self.format(Some(value), kind.unwrap_or(ValueKind::Plain))
    }

    fn round(&self, value: f64) -> Option<Decimal> {
        if !value.is_finite() {
            return None;
        }
        Decimal::from_f64_retain(value).map(|d| {
            d.round_dp_with_strategy(self.decimal_places, RoundingStrategy::MidpointAwayFromZero)
        })
    }
}

/// Render a non-negative decimal as `1.234.567,89` with exactly `dp` fraction digits.
fn localize_digits(abs: Decimal, dp: u32) -> String {
    let plain = abs.normalize().to_string();
    let (int_part, frac_part) = plain.split_once('.').unwrap_or((plain.as_str(), ""));

    let mut out = group_int_digits(int_part);
    if dp > 0 {
        out.push(DECIMAL_SEPARATOR);
        let mut frac: String = frac_part.chars().take(dp as usize).collect();
        while frac.len() < dp as usize {
            frac.push('0');
        }
        out.push_str(&frac);
    }
    out
}

fn group_int_digits(int_part: &str) -> String {
    let len = int_part.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in int_part.chars().enumerate() {
        out.push(ch);
        let remaining = len.saturating_sub(i + 1);
        if remaining > 0 && remaining % 3 == 0 {
            out.push(THOUSANDS_SEPARATOR);
        }
    }
    out
}
