use chrono::{Duration as ChronoDuration, NaiveDate};
use rand::Rng;

use crate::generate::value::Value;
use crate::schema::types::{ColumnProfile, TypeKind};

/// Divisor applied to the largest magnitude a numeric column can hold before
/// drawing from it, so generated values stay clear of the column's limit.
pub const NUMERIC_SAFETY_MARGIN: f64 = 1.5;

/// Upper bound (inclusive) for integers drawn when a column's precision is unknown.
pub const UNKNOWN_PRECISION_MAX: i64 = 50_000;

/// Length bound for random words when a text column has no maximum length.
pub const DEFAULT_TEXT_LENGTH: usize = 50;

/// Fractional values are drawn below this magnitude so that rounding to the
/// column scale stays finite in `f64`.
const MAX_FRACTIONAL_MAGNITUDE: f64 = 1e15;

/// Earliest date generated for temporal columns.
pub fn history_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(1950, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Run-wide knobs shared by every generator.
#[derive(Debug, Clone, Copy)]
pub struct ProviderSettings {
    /// Latest date generated for temporal columns, pinned once per run.
    pub today: NaiveDate,
    pub numeric_safety_margin: f64,
    pub default_text_length: usize,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            today: chrono::Local::now().date_naive(),
            numeric_safety_margin: NUMERIC_SAFETY_MARGIN,
            default_text_length: DEFAULT_TEXT_LENGTH,
        }
    }
}

/// Declared precision of a numeric column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NumericSpec {
    pub precision: Option<u32>,
    pub radix: Option<u32>,
    pub scale: Option<u32>,
}

/// Live `MIN`/`MAX` of the source column, when known.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NumericBounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Type-default generator for a column without a value pool.
#[derive(Debug, Clone, PartialEq)]
pub enum Fallback {
    Numeric(NumericSpec),
    Temporal,
    Boolean,
    Text { max_length: Option<u32> },
}

impl Fallback {
    /// Returns `None` for columns whose type has no semantic kind.
    pub fn for_column(profile: &ColumnProfile) -> Option<Self> {
        match profile.kind {
            TypeKind::Numeric => Some(Fallback::Numeric(NumericSpec {
                precision: profile.numeric_precision,
                radix: profile.numeric_precision_radix,
                scale: profile.numeric_scale,
            })),
            TypeKind::Temporal => Some(Fallback::Temporal),
            TypeKind::Boolean => Some(Fallback::Boolean),
            TypeKind::Text => Some(Fallback::Text {
                max_length: profile.max_length,
            }),
            TypeKind::Unsupported => None,
        }
    }

    pub fn generate(&self, settings: &ProviderSettings, rng: &mut impl Rng) -> Value {
        match self {
            Fallback::Numeric(spec) => random_number(
                spec,
                NumericBounds::default(),
                settings.numeric_safety_margin,
                rng,
            ),
            Fallback::Temporal => Value::Date(random_date(history_start(), settings.today, rng)),
            Fallback::Boolean => Value::Bool(rng.random_bool(0.5)),
            Fallback::Text { max_length } => {
                let bound = max_length
                    .map(|m| m as usize)
                    .unwrap_or(settings.default_text_length);
                let word = random_word(rng.random_range(0..=bound), rng);
                Value::Text(truncate_chars(word, *max_length))
            }
        }
    }
}

/// Draw a number that fits the column's declared precision and scale.
///
/// - precision and a non-zero scale: uniform in
///   `[0, radix^(precision - scale - 1) / margin)`, rounded to `scale` digits
/// - precision with scale 0 or absent: uniform integer in
///   `[0, radix^(precision - 1) / margin)`
/// - no precision: uniform integer in `[0, UNKNOWN_PRECISION_MAX]`
///
/// Live bounds, when given, replace the lower and upper limits.
pub fn random_number(
    spec: &NumericSpec,
    bounds: NumericBounds,
    margin: f64,
    rng: &mut impl Rng,
) -> Value {
    let Some(precision) = spec.precision else {
        let lo = bounds.min.map(|m| m.ceil() as i64).unwrap_or(0);
        let hi = bounds.max.map(|m| m.floor() as i64).unwrap_or(UNKNOWN_PRECISION_MAX);
        return Value::Int(inclusive_int(lo, hi, rng));
    };
    let radix = f64::from(spec.radix.unwrap_or(10));

    match spec.scale {
        Some(scale) if scale != 0 => {
            let ceiling = (radix.powi(precision as i32 - scale as i32 - 1) / margin)
                .min(MAX_FRACTIONAL_MAGNITUDE);
            let lo = bounds.min.unwrap_or(0.0);
            let hi = bounds.max.unwrap_or(ceiling);
            let drawn = if hi > lo { rng.random_range(lo..hi) } else { lo };
            Value::Float(round_to_scale(drawn, scale))
        }
        _ => {
            let ceiling = (radix.powi(precision as i32 - 1) / margin).min(i64::MAX as f64);
            let lo = bounds.min.map(|m| m.ceil() as i64).unwrap_or(0);
            match bounds.max {
                Some(max) => Value::Int(inclusive_int(lo, max.floor() as i64, rng)),
                None => {
                    // Exclusive of the ceiling itself.
                    let hi = ceiling.ceil() as i64;
                    Value::Int(if hi > lo { rng.random_range(lo..hi) } else { lo })
                }
            }
        }
    }
}

fn inclusive_int(lo: i64, hi: i64, rng: &mut impl Rng) -> i64 {
    if hi > lo {
        rng.random_range(lo..=hi)
    } else {
        lo
    }
}

fn round_to_scale(value: f64, scale: u32) -> f64 {
    let factor = 10f64.powi(scale as i32);
    (value * factor).round() / factor
}

/// Uniform date in `[start, end]`.
pub fn random_date(start: NaiveDate, end: NaiveDate, rng: &mut impl Rng) -> NaiveDate {
    let span = (end - start).num_days();
    if span <= 0 {
        return start;
    }
    start + ChronoDuration::days(rng.random_range(0..=span))
}

/// Random lowercase ASCII word. A zero length yields a one-letter word.
pub fn random_word(length: usize, rng: &mut impl Rng) -> String {
    (0..length.max(1))
        .map(|_| char::from(rng.random_range(b'a'..=b'z')))
        .collect()
}

/// Letter casing observed on a common value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Casing {
    Upper,
    Capitalized,
    Lower,
}

impl Casing {
    pub fn of(template: &str) -> Self {
        let mut cased = template
            .chars()
            .filter(|c| c.is_uppercase() || c.is_lowercase())
            .peekable();
        if cased.peek().is_some() && cased.all(|c| c.is_uppercase()) {
            Casing::Upper
        } else if template.chars().next().is_some_and(|c| c.is_uppercase()) {
            Casing::Capitalized
        } else {
            Casing::Lower
        }
    }

    pub fn apply(self, word: &str) -> String {
        match self {
            Casing::Upper => word.to_uppercase(),
            Casing::Capitalized => {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            }
            Casing::Lower => word.to_string(),
        }
    }
}

/// Random word of `length` letters, cased like `template`, cut to `max_length`.
pub fn templated_word(
    length: usize,
    template: Option<&str>,
    max_length: Option<u32>,
    rng: &mut impl Rng,
) -> String {
    let word = random_word(length, rng);
    let cased = match template {
        Some(t) => Casing::of(t).apply(&word),
        None => word,
    };
    truncate_chars(cased, max_length)
}

fn truncate_chars(word: String, max_length: Option<u32>) -> String {
    match max_length {
        Some(max) if word.chars().count() > max as usize => {
            word.chars().take(max as usize).collect()
        }
        _ => word,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn settings() -> ProviderSettings {
        ProviderSettings {
            today: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            ..Default::default()
        }
    }

    #[test]
    fn test_integer_fallback_respects_precision_bound() {
        // smallint: precision 16, radix 2
        let spec = NumericSpec {
            precision: Some(16),
            radix: Some(2),
            scale: Some(0),
        };
        let ceiling = 2f64.powi(15) / 1.5;
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..5_000 {
            match random_number(&spec, NumericBounds::default(), NUMERIC_SAFETY_MARGIN, &mut rng) {
                Value::Int(i) => assert!(i >= 0 && (i as f64) < ceiling, "{} out of range", i),
                other => panic!("Expected Int, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_decimal_fallback_rounds_to_scale() {
        // numeric(5,2): values below 10^2 / 1.5
        let spec = NumericSpec {
            precision: Some(5),
            radix: Some(10),
            scale: Some(2),
        };
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..1_000 {
            match random_number(&spec, NumericBounds::default(), NUMERIC_SAFETY_MARGIN, &mut rng) {
                Value::Float(f) => {
                    assert!((0.0..=100.0 / 1.5).contains(&f), "{} out of range", f);
                    assert!(((f * 100.0).round() - f * 100.0).abs() < 1e-6);
                }
                other => panic!("Expected Float, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_unknown_precision_uses_default_range() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1_000 {
            match random_number(
                &NumericSpec::default(),
                NumericBounds::default(),
                NUMERIC_SAFETY_MARGIN,
                &mut rng,
            ) {
                Value::Int(i) => assert!((0..=UNKNOWN_PRECISION_MAX).contains(&i)),
                other => panic!("Expected Int, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_live_bounds_override_precision_range() {
        let spec = NumericSpec {
            precision: Some(32),
            radix: Some(2),
            scale: Some(0),
        };
        let bounds = NumericBounds {
            min: Some(10.0),
            max: Some(20.0),
        };
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..500 {
            let v = random_number(&spec, bounds, NUMERIC_SAFETY_MARGIN, &mut rng);
            assert!(matches!(v, Value::Int(i) if (10..=20).contains(&i)));
        }
    }

    #[test]
    fn test_huge_precision_stays_finite() {
        let spec = NumericSpec {
            precision: Some(1000),
            radix: Some(10),
            scale: Some(4),
        };
        let mut rng = StdRng::seed_from_u64(1);
        let v = random_number(&spec, NumericBounds::default(), NUMERIC_SAFETY_MARGIN, &mut rng);
        assert!(matches!(v, Value::Float(f) if f.is_finite()));
    }

    #[test]
    fn test_random_date_within_window() {
        let s = settings();
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..1_000 {
            let d = random_date(history_start(), s.today, &mut rng);
            assert!(d >= history_start() && d <= s.today);
        }
    }

    #[test]
    fn test_text_fallback_respects_max_length() {
        let fallback = Fallback::Text {
            max_length: Some(10),
        };
        let mut rng = StdRng::seed_from_u64(21);
        for _ in 0..1_000 {
            match fallback.generate(&settings(), &mut rng) {
                Value::Text(s) => {
                    assert!(s.len() <= 10, "{:?} too long", s);
                    assert!(s.chars().all(|c| c.is_ascii_lowercase()));
                }
                other => panic!("Expected Text, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_text_fallback_unbounded_uses_default_length() {
        let fallback = Fallback::Text { max_length: None };
        let mut rng = StdRng::seed_from_u64(22);
        for _ in 0..500 {
            if let Value::Text(s) = fallback.generate(&settings(), &mut rng) {
                assert!(!s.is_empty() && s.len() <= DEFAULT_TEXT_LENGTH);
            }
        }
    }

    #[test]
    fn test_boolean_fallback_produces_both_literals() {
        let mut rng = StdRng::seed_from_u64(4);
        let values: Vec<Value> = (0..200)
            .map(|_| Fallback::Boolean.generate(&settings(), &mut rng))
            .collect();
        assert!(values.contains(&Value::Bool(true)));
        assert!(values.contains(&Value::Bool(false)));
    }

    #[test]
    fn test_casing_detection() {
        assert_eq!(Casing::of("PENELOPE"), Casing::Upper);
        assert_eq!(Casing::of("PG-13"), Casing::Upper);
        assert_eq!(Casing::of("Lethbridge"), Casing::Capitalized);
        assert_eq!(Casing::of("deleted scenes"), Casing::Lower);
        assert_eq!(Casing::of("1234"), Casing::Lower);
    }

    #[test]
    fn test_templated_word_applies_casing_and_length() {
        let mut rng = StdRng::seed_from_u64(8);
        let upper = templated_word(6, Some("KENNETH"), None, &mut rng);
        assert_eq!(upper.len(), 6);
        assert_eq!(upper, upper.to_uppercase());

        let capital = templated_word(6, Some("Alberta"), None, &mut rng);
        assert!(capital.chars().next().unwrap().is_uppercase());
        assert!(capital.chars().skip(1).all(|c| c.is_lowercase()));

        let cut = templated_word(30, Some("x"), Some(5), &mut rng);
        assert_eq!(cut.len(), 5);
    }

    #[test]
    fn test_random_word_zero_length_is_one_letter() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(random_word(0, &mut rng).len(), 1);
    }
}
