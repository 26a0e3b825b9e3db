use crate::color::Rgb;
use crate::error::{MapError, Result};
use serde::{Deserialize, Serialize};

/// Fill used for regions without a value or without a matching range
pub const DEFAULT_COLOR: &str = "#cccccc";

/// One row of the tabular dataset, keyed by region name
#[derive(Clone, Debug, PartialEq)]
pub struct RegionValue {
    pub name: String,
    pub total: Option<f64>,
}

impl RegionValue {
    pub fn new(name: impl Into<String>, total: Option<f64>) -> Self {
        Self {
            name: name.into(),
            total,
        }
    }
}

/// Closed value interval `[min, max]` painted with `color`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
    pub color: String,
}

impl Range {
    pub fn new(min: f64, max: f64, color: impl Into<String>) -> Result<Self> {
        let range = Self {
            min,
            max,
            color: color.into(),
        };
        range.validate()?;
        Ok(range)
    }

    /// Check bounds are ordered numbers and the color is parseable.
    /// Overlap between ranges is not checked.
    pub fn validate(&self) -> Result<()> {
        if self.min.is_nan() || self.max.is_nan() {
            return Err(MapError::InvalidRange {
                reason: "bounds must be numbers".to_string(),
            });
        }
        if self.min > self.max {
            return Err(MapError::InvalidRange {
                reason: format!("min {} is greater than max {}", self.min, self.max),
            });
        }
        if Rgb::parse(&self.color).is_none() {
            return Err(MapError::InvalidRange {
                reason: format!("unrecognised color {:?}", self.color),
            });
        }
        Ok(())
    }

    #[inline(always)]
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// Zero, NaN and missing totals all count as "no value"
#[inline(always)]
fn has_value(total: Option<f64>) -> Option<f64> {
    total.filter(|v| *v != 0.0 && !v.is_nan())
}

/// Color for `total` under `ranges`: first match in list order wins
pub fn classify(total: Option<f64>, ranges: Option<&[Range]>) -> &str {
    let (Some(value), Some(ranges)) = (has_value(total), ranges) else {
        return DEFAULT_COLOR;
    };

    ranges
        .iter()
        .find(|r| r.contains(value))
        .map(|r| r.color.as_str())
        .unwrap_or(DEFAULT_COLOR)
}

/// Extent of the numeric field over a row set
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ValueBounds {
    pub min: f64,
    pub max: f64,
}

/// Min/max over rows that carry a value; null rows are skipped
pub fn value_bounds(rows: &[RegionValue]) -> Result<ValueBounds> {
    let bounds = rows
        .iter()
        .filter_map(|row| row.total)
        .filter(|v| !v.is_nan())
        .fold(None, |acc: Option<ValueBounds>, v| {
            Some(match acc {
                Some(b) => ValueBounds {
                    min: b.min.min(v),
                    max: b.max.max(v),
                },
                None => ValueBounds { min: v, max: v },
            })
        });

    bounds.ok_or(MapError::EmptyDataset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(min: f64, max: f64, color: &str) -> Range {
        Range {
            min,
            max,
            color: color.to_string(),
        }
    }

    #[test]
    fn test_two_ranges() {
        let ranges = vec![r(0.0, 10.0, "red"), r(11.0, 20.0, "blue")];
        assert_eq!(classify(Some(5.0), Some(&ranges)), "red");
        assert_eq!(classify(Some(15.0), Some(&ranges)), "blue");
        assert_eq!(classify(Some(25.0), Some(&ranges)), "#cccccc");
    }

    #[test]
    fn test_falsy_totals_use_default() {
        let ranges = vec![r(-100.0, 100.0, "red")];
        for total in [Some(0.0), Some(-0.0), None, Some(f64::NAN)] {
            assert_eq!(classify(total, Some(&ranges)), DEFAULT_COLOR);
        }
    }

    #[test]
    fn test_missing_ranges_use_default() {
        assert_eq!(classify(Some(5.0), None), DEFAULT_COLOR);
        assert_eq!(classify(Some(5.0), Some(&[])), DEFAULT_COLOR);
    }

    #[test]
    fn test_overlap_first_listed_wins() {
        let ranges = vec![r(0.0, 100.0, "wide"), r(40.0, 60.0, "narrow")];
        assert_eq!(classify(Some(50.0), Some(&ranges)), "wide");

        let ranges = vec![r(40.0, 60.0, "narrow"), r(0.0, 100.0, "wide")];
        assert_eq!(classify(Some(50.0), Some(&ranges)), "narrow");
    }

    #[test]
    fn test_bounds_inclusive() {
        let ranges = vec![r(1.0, 10.0, "a")];
        assert_eq!(classify(Some(1.0), Some(&ranges)), "a");
        assert_eq!(classify(Some(10.0), Some(&ranges)), "a");
        assert_eq!(classify(Some(10.5), Some(&ranges)), DEFAULT_COLOR);
    }

    #[test]
    fn test_value_bounds_skips_null() {
        let rows = vec![RegionValue::new("A", Some(5.0)), RegionValue::new("B", None)];
        assert_eq!(value_bounds(&rows).unwrap(), ValueBounds { min: 5.0, max: 5.0 });
    }

    #[test]
    fn test_value_bounds_spread() {
        let rows = vec![
            RegionValue::new("A", Some(12.0)),
            RegionValue::new("B", Some(-3.5)),
            RegionValue::new("C", Some(40.0)),
        ];
        assert_eq!(value_bounds(&rows).unwrap(), ValueBounds { min: -3.5, max: 40.0 });
    }

    #[test]
    fn test_value_bounds_empty() {
        assert!(matches!(value_bounds(&[]), Err(MapError::EmptyDataset)));
        let rows = vec![RegionValue::new("A", None)];
        assert!(matches!(value_bounds(&rows), Err(MapError::EmptyDataset)));
    }

    #[test]
    fn test_range_validation() {
        assert!(Range::new(0.0, 10.0, "#ff0000").is_ok());
        assert!(Range::new(10.0, 0.0, "#ff0000").is_err());
        assert!(Range::new(f64::NAN, 0.0, "#ff0000").is_err());
        assert!(Range::new(0.0, 1.0, "not-a-color").is_err());
    }
}
