use crate::config::FilterConfig;
use crate::error::{PipelineError, Result};
use crate::types::CaseRecord;
use csv::ReaderBuilder;
use std::collections::BTreeMap;
use tracing::{debug, info};

const REQUIRED_COLUMNS: [&str; 4] = ["date", "category", "zone", "count"];

/// Parse the raw case table, keep the rows of one date and category and sum
/// the counts per zone.
///
/// Column names are matched case-insensitively. Rows with an empty zone are
/// skipped. Counts are signed so correction rows net out; a zone whose total
/// is negative is a `DomainError`. An empty result is not an error here; see
/// [`ensure_non_empty`].
pub fn load_cases(raw: &[u8], delimiter: char, filter: &FilterConfig) -> Result<Vec<CaseRecord>> {
    if !delimiter.is_ascii() {
        return Err(PipelineError::malformed(format!(
            "delimiter {:?} is not a single-byte character",
            delimiter
        )));
    }

    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .from_reader(raw);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| PipelineError::malformed(format!("unreadable header row: {}", e)))?
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_lowercase())
        .collect();

    let mut idx = [0usize; 4];
    for (slot, column) in idx.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| PipelineError::malformed(format!("column '{}' not found", column)))?;
    }
    let [date_idx, category_idx, zone_idx, count_idx] = idx;

    let mut totals: BTreeMap<String, i64> = BTreeMap::new();
    let mut rows = 0usize;
    let mut kept = 0usize;
    let mut unnamed = 0usize;

    for (i, result) in rdr.records().enumerate() {
        // Header is line 1
        let line = i + 2;
        let record =
            result.map_err(|e| PipelineError::malformed(format!("line {}: {}", line, e)))?;
        rows += 1;

        let field = |idx: usize, column: &str| {
            record.get(idx).ok_or_else(|| {
                PipelineError::malformed(format!("line {}: missing '{}' field", line, column))
            })
        };

        if field(date_idx, "date")? != filter.date {
            continue;
        }
        if field(category_idx, "category")? != filter.category {
            continue;
        }

        let zone = field(zone_idx, "zone")?;
        if zone.trim().is_empty() {
            unnamed += 1;
            continue;
        }
        let raw_count = field(count_idx, "count")?;
        let count = parse_count(raw_count).ok_or_else(|| {
            PipelineError::malformed(format!(
                "line {}: invalid count {:?} for zone '{}'",
                line, raw_count, zone
            ))
        })?;

        let total = totals.entry(zone.to_string()).or_insert(0);
        *total = total.checked_add(count).ok_or_else(|| {
            PipelineError::malformed(format!("count overflow while summing zone '{}'", zone))
        })?;
        kept += 1;
    }

    debug!(
        "Kept {} of {} rows, skipped {} without a zone",
        kept, rows, unnamed
    );
    info!(
        "Loaded {} zones for {} / {}",
        totals.len(),
        filter.date,
        filter.category
    );

    totals
        .into_iter()
        .map(|(zone, total)| match u64::try_from(total) {
            Ok(count) => Ok(CaseRecord { zone, count }),
            Err(_) => Err(PipelineError::DomainError { zone, count: total }),
        })
        .collect()
}

/// Signed integer, or a float with no fractional part (`"1234.0"`).
fn parse_count(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<i64>() {
        return Some(n);
    }
    let f = raw.parse::<f64>().ok()?;
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

pub fn ensure_non_empty(records: &[CaseRecord], filter: &FilterConfig) -> Result<()> {
    if records.is_empty() {
        return Err(PipelineError::EmptyResult(format!(
            "no records for date '{}' and category '{}'",
            filter.date, filter.category
        )));
    }
    Ok(())
}

/// Rejects the first zero total before it can reach the log scale.
/// Negative totals never get this far, `load_cases` reports them.
pub fn ensure_positive(records: &[CaseRecord]) -> Result<()> {
    match records.iter().find(|r| r.count == 0) {
        Some(r) => Err(PipelineError::DomainError {
            zone: r.zone.clone(),
            count: 0,
        }),
        None => Ok(()),
    }
}
