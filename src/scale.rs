use crate::error::{PipelineError, Result};
use crate::types::CaseRecord;

/// Base-10 logarithmic colour axis over a set of case records.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    /// `log10(count)`, in record order.
    pub values: Vec<f64>,
    pub max_value: f64,
    /// `floor(max_value) + 1`, the number of decade ticks.
    pub max_log: u32,
    pub tick_values: Vec<u32>,
    pub tick_labels: Vec<u64>,
}

impl ColorScale {
    pub fn from_records(records: &[CaseRecord]) -> Result<Self> {
        if records.is_empty() {
            return Err(PipelineError::EmptyResult(
                "no case records to build a colour scale from".to_string(),
            ));
        }

        let mut values = Vec::with_capacity(records.len());
        for record in records {
            if record.count == 0 {
                return Err(PipelineError::DomainError {
                    zone: record.zone.clone(),
                    count: 0,
                });
            }
            values.push((record.count as f64).log10());
        }

        let max_value = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let max_log = max_value.floor() as u32 + 1;
        let tick_values: Vec<u32> = (0..max_log).collect();
        let tick_labels = tick_values.iter().map(|&v| 10u64.pow(v)).collect();

        Ok(Self {
            values,
            max_value,
            max_log,
            tick_values,
            tick_labels,
        })
    }

    /// Position of `value` on the `[0, max_value]` axis.
    pub fn normalize(&self, value: f64) -> f64 {
        if self.max_value <= 0.0 {
            return 0.0;
        }
        (value / self.max_value).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(counts: &[(&str, u64)]) -> Vec<CaseRecord> {
        counts
            .iter()
            .map(|(zone, count)| CaseRecord {
                zone: zone.to_string(),
                count: *count,
            })
            .collect()
    }

    #[test]
    fn two_zone_scenario() {
        let scale = ColorScale::from_records(&records(&[("A", 100), ("B", 5)])).unwrap();
        assert_eq!(scale.values[0], 2.0);
        assert!((scale.values[1] - 0.698_970_004_336_018_8).abs() < 1e-12);
        assert_eq!(scale.max_log, 3);
        assert_eq!(scale.tick_values, [0, 1, 2]);
        assert_eq!(scale.tick_labels, [1, 10, 100]);
    }

    #[test]
    fn exact_powers_of_ten_open_a_new_decade() {
        let scale = ColorScale::from_records(&records(&[("A", 1000)])).unwrap();
        assert_eq!(scale.max_log, 4);
        assert_eq!(scale.tick_labels, [1, 10, 100, 1000]);

        let scale = ColorScale::from_records(&records(&[("A", 999)])).unwrap();
        assert_eq!(scale.max_log, 3);
    }

    #[test]
    fn single_case_gives_one_tick() {
        let scale = ColorScale::from_records(&records(&[("A", 1)])).unwrap();
        assert_eq!(scale.values, [0.0]);
        assert_eq!(scale.tick_labels, [1]);
        assert_eq!(scale.normalize(0.0), 0.0);
    }

    #[test]
    fn values_increase_with_count() {
        let counts: Vec<(&str, u64)> = (1..2000u64).step_by(7).map(|c| ("z", c)).collect();
        let scale = ColorScale::from_records(&records(&counts)).unwrap();
        assert!(scale.values.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn ticks_cover_the_decade_of_the_largest_count() {
        for max in [3u64, 42, 100, 12_345, 9_999_999] {
            let scale = ColorScale::from_records(&records(&[("A", 2), ("B", max)])).unwrap();
            let top = *scale.tick_labels.last().unwrap();
            assert!(top <= max && max < top * 10, "max {max} top tick {top}");
        }
    }

    #[test]
    fn zero_count_is_a_domain_error() {
        let err = ColorScale::from_records(&records(&[("A", 10), ("B", 0)])).unwrap_err();
        assert!(matches!(err, PipelineError::DomainError { ref zone, count: 0 } if zone == "B"));
    }

    #[test]
    fn empty_input_is_rejected() {
        let err = ColorScale::from_records(&[]).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyResult(_)));
    }

    #[test]
    fn normalize_clamps() {
        let scale = ColorScale::from_records(&records(&[("A", 100)])).unwrap();
        assert_eq!(scale.normalize(1.0), 0.5);
        assert_eq!(scale.normalize(5.0), 1.0);
    }
}
