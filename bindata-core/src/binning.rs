//! Slicing a label's rows into bins and aggregating them
//!
//! A [`SliceStrategy`] partitions one label's range-sorted rows into groups;
//! the [`BinningEngine`] then aggregates every numeric value column of each
//! group by mean or sum and attaches the group's row count.
//!
//! `step` and `bin` intervals are built from the range column's own text
//! (`"<first row>-<first row of the next group>"`, the last group ending at
//! the label's maximum). `value` buckets are labelled with their numeric
//! bounds instead, whether or not any row sits on them.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::chunk::Row;
use crate::error::{Error, Result};
use crate::schema::Schema;

/// Upper bound on the buckets a single label may produce under `value`
pub const MAX_VALUE_BUCKETS: usize = 10_000_000;

/// Tolerance for a range value sitting on a bucket bound
const BUCKET_EPSILON: f64 = 1e-9;

/// Decimal places kept when printing `value` bucket bounds
const BOUND_PRECISION: u32 = 10;

/// Largest supported output precision
pub const MAX_PRECISION: u32 = 15;

/// How a group's numeric columns are reduced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    /// Arithmetic mean over the non-missing values
    #[default]
    #[serde(alias = "ave")]
    Mean,

    /// Sum over the non-missing values
    Sum,
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregation::Mean => f.write_str("mean"),
            Aggregation::Sum => f.write_str("sum"),
        }
    }
}

/// Slicing policy as named in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlicePolicy {
    /// Fixed number of rows per bin
    #[default]
    Step,

    /// Fixed number of bins per label
    Bin,

    /// Fixed width along the range column
    Value,
}

impl fmt::Display for SlicePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlicePolicy::Step => f.write_str("step"),
            SlicePolicy::Bin => f.write_str("bin"),
            SlicePolicy::Value => f.write_str("value"),
        }
    }
}

/// A slicing policy bound to its size, selected once per run
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SliceStrategy {
    /// Groups of exactly `n` rows, the last one possibly shorter
    Step(usize),

    /// `n` groups of `ceil(rows / n)` rows
    Bin(usize),

    /// Half-open buckets of this width starting at the label's minimum
    Value(f64),
}

impl SliceStrategy {
    /// Bind `policy` to `size`. Row counts truncate fractional sizes; every
    /// size must be positive.
    pub fn new(policy: SlicePolicy, size: f64) -> Result<Self> {
        if !size.is_finite() || size <= 0.0 {
            return Err(Error::InvalidArgument(format!(
                "slice size must be a positive number, got {size}"
            )));
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let rows = size as usize;
        match policy {
            SlicePolicy::Value => Ok(SliceStrategy::Value(size)),
            SlicePolicy::Step | SlicePolicy::Bin if rows == 0 => Err(Error::InvalidArgument(
                format!("{policy} slicing needs at least 1, got {size}"),
            )),
            SlicePolicy::Step => Ok(SliceStrategy::Step(rows)),
            SlicePolicy::Bin => Ok(SliceStrategy::Bin(rows)),
        }
    }

    /// Partition `rows` (sorted by the range column) into groups in
    /// ascending range order.
    pub fn partition(&self, label: &str, rows: &[Row], range_index: usize) -> Result<Vec<Partition>> {
        if rows.is_empty() {
            return Err(Error::aggregation(label, "label has no rows"));
        }

        match *self {
            SliceStrategy::Step(step) => {
                debug!(label, step, "slice data with constant number of rows in a slice");
                Ok(partition_by_step(rows, range_index, step))
            }
            SliceStrategy::Bin(bins) => {
                let step = rows.len().div_ceil(bins);
                debug!(label, bins, step, "slice data into a constant number of slices");
                Ok(partition_by_step(rows, range_index, step))
            }
            SliceStrategy::Value(width) => {
                debug!(label, width, "slice data with constant increment of values in ranges column");
                partition_by_value(label, rows, range_index, width)
            }
        }
    }
}

/// One group of rows and the interval it covers
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    interval: String,
    bounds: Option<(f64, f64)>,
    members: Vec<usize>,
}

impl Partition {
    /// Interval string `"start-end"`
    pub fn interval(&self) -> &str {
        &self.interval
    }

    /// Numeric bucket bounds, for `value` partitions
    pub fn bounds(&self) -> Option<(f64, f64)> {
        self.bounds
    }

    /// Indices of the member rows
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    /// Number of member rows
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether no row fell into this partition
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

fn range_text(row: &Row, range_index: usize) -> &str {
    row.get(range_index).unwrap_or_default().trim()
}

/// Text of the label's maximum range value: numeric maximum over the numeric
/// values when there are any, lexicographic otherwise.
fn max_range_text(rows: &[Row], range_index: usize) -> &str {
    let numeric_max = rows
        .iter()
        .filter_map(|r| r.number(range_index).map(|v| (v, r)))
        .max_by(|a, b| a.0.total_cmp(&b.0));
    match numeric_max {
        Some((_, row)) => range_text(row, range_index),
        None => rows
            .iter()
            .map(|r| range_text(r, range_index))
            .max()
            .unwrap_or_default(),
    }
}

fn partition_by_step(rows: &[Row], range_index: usize, step: usize) -> Vec<Partition> {
    let step = step.max(1);
    let last = max_range_text(rows, range_index);

    (0..rows.len())
        .step_by(step)
        .map(|start| {
            let end = (start + step).min(rows.len());
            let upper = rows
                .get(end)
                .map_or(last, |next| range_text(next, range_index));
            Partition {
                interval: format!("{}-{}", range_text(&rows[start], range_index), upper),
                bounds: None,
                members: (start..end).collect(),
            }
        })
        .collect()
}

fn partition_by_value(
    label: &str,
    rows: &[Row],
    range_index: usize,
    width: f64,
) -> Result<Vec<Partition>> {
    let mut values = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let value = row.number(range_index).ok_or_else(|| {
            Error::aggregation(
                label,
                format!(
                    "range value {:?} in row {} is not numeric",
                    range_text(row, range_index),
                    i
                ),
            )
        })?;
        values.push(value);
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let span = ((max - min) / width + BUCKET_EPSILON).floor();
    #[allow(clippy::cast_precision_loss)]
    let limit = MAX_VALUE_BUCKETS as f64;
    if !span.is_finite() || span >= limit {
        return Err(Error::aggregation(
            label,
            format!("width {width} over [{min}, {max}] needs more than {MAX_VALUE_BUCKETS} buckets"),
        ));
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let count = span as usize + 1;

    let mut partitions: Vec<Partition> = (0..count)
        .map(|k| {
            #[allow(clippy::cast_precision_loss)]
            let start = min + k as f64 * width;
            let end = start + width;
            Partition {
                interval: format!(
                    "{}-{}",
                    format_number(start, BOUND_PRECISION),
                    format_number(end, BOUND_PRECISION)
                ),
                bounds: Some((start, end)),
                members: Vec::new(),
            }
        })
        .collect();

    for (i, value) in values.into_iter().enumerate() {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let k = (((value - min) / width + BUCKET_EPSILON).floor() as usize).min(count - 1);
        partitions[k].members.push(i);
    }

    Ok(partitions)
}

/// Round half away from zero to `precision` decimal places
pub fn round_to(value: f64, precision: u32) -> f64 {
    if precision > MAX_PRECISION || !value.is_finite() {
        return value;
    }
    #[allow(clippy::cast_possible_wrap)]
    let scale = 10f64.powi(precision as i32);
    let scaled = value * scale;
    if !scaled.is_finite() {
        return value;
    }
    let rounded = scaled.round() / scale;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Round to `precision` places and print in shortest form (`6`, `0.25`)
pub fn format_number(value: f64, precision: u32) -> String {
    round_to(value, precision).to_string()
}

/// One aggregated group of a label's rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bin {
    label: String,
    interval: String,
    values: Vec<(String, Option<f64>)>,
    count: usize,
}

impl Bin {
    /// Create a bin
    pub fn new(
        label: impl Into<String>,
        interval: impl Into<String>,
        values: Vec<(String, Option<f64>)>,
        count: usize,
    ) -> Self {
        Self {
            label: label.into(),
            interval: interval.into(),
            values,
            count,
        }
    }

    /// Label value
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Interval string `"start-end"`
    pub fn interval(&self) -> &str {
        &self.interval
    }

    /// Aggregated values by column name, in column order. `None` is a mean
    /// over no values.
    pub fn values(&self) -> &[(String, Option<f64>)] {
        &self.values
    }

    /// Aggregated value of `column`
    pub fn value(&self, column: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .and_then(|(_, value)| *value)
    }

    /// Rows aggregated into this bin
    pub fn count(&self) -> usize {
        self.count
    }
}

/// Bins one label's rows with a fixed strategy, aggregation and precision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinningEngine {
    strategy: SliceStrategy,
    aggregation: Aggregation,
    precision: u32,
}

impl BinningEngine {
    /// Create an engine
    pub fn new(strategy: SliceStrategy, aggregation: Aggregation, precision: u32) -> Self {
        Self {
            strategy,
            aggregation,
            precision,
        }
    }

    /// Slicing strategy
    pub fn strategy(&self) -> SliceStrategy {
        self.strategy
    }

    /// Aggregation mode
    pub fn aggregation(&self) -> Aggregation {
        self.aggregation
    }

    /// Output precision
    pub fn precision(&self) -> u32 {
        self.precision
    }

    /// Bin `rows` of `label`, already sorted by the range column.
    ///
    /// Fails with [`Error::Aggregation`] on an empty row set or, under
    /// `value`, on a non-numeric range value.
    pub fn bin(&self, schema: &Schema, label: &str, rows: &[Row]) -> Result<Vec<Bin>> {
        let partitions = self.strategy.partition(label, rows, schema.range_index())?;
        let columns = schema.value_columns();

        info!(
            label,
            rows = rows.len(),
            bins = partitions.len(),
            aggregation = %self.aggregation,
            "resized dataframe for a label"
        );

        let bins = partitions
            .into_iter()
            .map(|partition| {
                let values = columns
                    .iter()
                    .map(|&col| {
                        let value = self.aggregate(rows, partition.members(), col);
                        (schema.field(col).name().to_string(), value)
                    })
                    .collect();
                Bin::new(label, partition.interval, values, partition.members.len())
            })
            .collect();

        Ok(bins)
    }

    fn aggregate(&self, rows: &[Row], members: &[usize], column: usize) -> Option<f64> {
        let mut sum = 0.0;
        let mut n = 0usize;
        for &i in members {
            if let Some(v) = rows[i].number(column) {
                sum += v;
                n += 1;
            }
        }

        let value = match self.aggregation {
            Aggregation::Sum => sum,
            Aggregation::Mean if n == 0 => return None,
            #[allow(clippy::cast_precision_loss)]
            Aggregation::Mean => sum / n as f64,
        };
        Some(round_to(value, self.precision))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DataType;
    use proptest::prelude::*;
    use test_case::test_case;

    fn schema() -> Schema {
        Schema::synthetic(b',', &[DataType::String, DataType::Int64, DataType::Float64], 0, 1).unwrap()
    }

    fn rows(label: &str, data: &[(i64, f64)]) -> Vec<Row> {
        data.iter()
            .map(|(pos, v)| Row::new(vec![label.to_string(), pos.to_string(), v.to_string()]))
            .collect()
    }

    fn summary(bins: &[Bin]) -> Vec<(String, Option<f64>, usize)> {
        bins.iter()
            .map(|b| (b.interval().to_string(), b.value("val-2"), b.count()))
            .collect()
    }

    #[test]
    fn test_step_mean_scenario() {
        let engine = BinningEngine::new(SliceStrategy::Step(2), Aggregation::Mean, 2);
        let a = engine
            .bin(&schema(), "A", &rows("A", &[(10, 5.0), (20, 7.0), (30, 9.0)]))
            .unwrap();
        let b = engine.bin(&schema(), "B", &rows("B", &[(5, 1.0)])).unwrap();

        assert_eq!(
            summary(&a),
            vec![("10-30".into(), Some(6.0), 2), ("30-30".into(), Some(9.0), 1)]
        );
        assert_eq!(summary(&b), vec![("5-5".into(), Some(1.0), 1)]);
        assert_eq!(a[0].label(), "A");
    }

    #[test]
    fn test_bin_policy_derives_step() {
        let engine = BinningEngine::new(SliceStrategy::Bin(2), Aggregation::Sum, 2);
        let data: Vec<(i64, f64)> = (1..=5).map(|i| (i * 10, 1.5)).collect();
        let bins = engine.bin(&schema(), "A", &rows("A", &data)).unwrap();

        assert_eq!(
            summary(&bins),
            vec![("10-40".into(), Some(4.5), 3), ("40-50".into(), Some(3.0), 2)]
        );
    }

    #[test]
    fn test_value_policy_buckets() {
        let engine = BinningEngine::new(SliceStrategy::Value(10.0), Aggregation::Mean, 2);
        let data = [(5, 1.0), (9, 3.0), (15, 5.0), (40, 7.0)];
        let bins = engine.bin(&schema(), "A", &rows("A", &data)).unwrap();

        assert_eq!(
            summary(&bins),
            vec![
                ("5-15".into(), Some(2.0), 2),
                ("15-25".into(), Some(5.0), 1),
                ("25-35".into(), None, 0),
                ("35-45".into(), Some(7.0), 1),
            ]
        );
    }

    #[test]
    fn test_value_policy_fractional_width() {
        let data: Vec<Row> = ["0", "0.1", "0.2", "0.3", "0.35"]
            .iter()
            .map(|p| Row::from(vec!["A", *p, "1"]))
            .collect();
        let partitions = SliceStrategy::Value(0.1).partition("A", &data, 1).unwrap();

        let intervals: Vec<(&str, usize)> = partitions.iter().map(|p| (p.interval(), p.len())).collect();
        assert_eq!(
            intervals,
            vec![("0-0.1", 1), ("0.1-0.2", 1), ("0.2-0.3", 1), ("0.3-0.4", 2)]
        );
    }

    #[test]
    fn test_value_policy_rejects_text_range() {
        let data = vec![Row::from(vec!["A", "10", "1"]), Row::from(vec!["A", "ten", "1"])];
        let err = SliceStrategy::Value(1.0).partition("A", &data, 1).unwrap_err();
        assert!(matches!(err, Error::Aggregation { ref label, .. } if label == "A"));
    }

    #[test]
    fn test_empty_rows_rejected() {
        let engine = BinningEngine::new(SliceStrategy::Step(2), Aggregation::Mean, 2);
        assert!(matches!(
            engine.bin(&schema(), "A", &[]),
            Err(Error::Aggregation { .. })
        ));
    }

    #[test]
    fn test_missing_values_skipped() {
        let data = vec![
            Row::from(vec!["A", "1", "2"]),
            Row::from(vec!["A", "2", ""]),
            Row::from(vec!["A", "3", "NA"]),
        ];
        let mean = BinningEngine::new(SliceStrategy::Step(3), Aggregation::Mean, 2)
            .bin(&schema(), "A", &data)
            .unwrap();
        assert_eq!(mean[0].value("val-2"), Some(2.0));
        assert_eq!(mean[0].count(), 3);
    }

    #[test_case(SlicePolicy::Step, 2.7, Some(SliceStrategy::Step(2)); "step truncates")]
    #[test_case(SlicePolicy::Bin, 4.0, Some(SliceStrategy::Bin(4)); "bin")]
    #[test_case(SlicePolicy::Value, 0.15, Some(SliceStrategy::Value(0.15)); "value keeps fraction")]
    #[test_case(SlicePolicy::Step, 0.5, None; "step below one")]
    #[test_case(SlicePolicy::Value, 0.0, None; "zero width")]
    #[test_case(SlicePolicy::Bin, -3.0, None; "negative")]
    fn test_strategy_new(policy: SlicePolicy, size: f64, expected: Option<SliceStrategy>) {
        assert_eq!(SliceStrategy::new(policy, size).ok(), expected);
    }

    #[test_case(6.0, 2, 6.0; "whole")]
    #[test_case(0.125, 2, 0.13; "half away from zero")]
    #[test_case(-0.001, 2, 0.0; "negative zero normalized")]
    #[test_case(1.23456, 0, 1.0; "zero places")]
    #[test_case(1e300, 15, 1e300; "scaled overflow left unchanged")]
    fn test_round_to(value: f64, precision: u32, expected: f64) {
        assert_eq!(round_to(value, precision), expected);
    }

    fn sorted_rows(positions: &[u32]) -> Vec<Row> {
        let mut positions = positions.to_vec();
        positions.sort_unstable();
        positions
            .iter()
            .map(|p| Row::new(vec!["A".into(), p.to_string(), "1".into()]))
            .collect()
    }

    proptest! {
        #[test]
        fn prop_counts_conserved(
            positions in prop::collection::vec(0u32..10_000, 1..300),
            size in 1usize..50,
            policy in prop_oneof![Just(SlicePolicy::Step), Just(SlicePolicy::Bin), Just(SlicePolicy::Value)],
        ) {
            let data = sorted_rows(&positions);
            #[allow(clippy::cast_precision_loss)]
            let strategy = SliceStrategy::new(policy, size as f64 * 7.0).unwrap();
            let bins = BinningEngine::new(strategy, Aggregation::Sum, 2)
                .bin(&schema(), "A", &data)
                .unwrap();
            let total: usize = bins.iter().map(Bin::count).sum();
            prop_assert_eq!(total, data.len());
            let sum: f64 = bins.iter().filter_map(|b| b.value("val-2")).sum();
            #[allow(clippy::cast_precision_loss)]
            let expected = data.len() as f64;
            prop_assert!((sum - expected).abs() < 1e-6);
        }

        #[test]
        fn prop_step_bin_counts(
            positions in prop::collection::vec(0u32..10_000, 1..300),
            k in 1usize..40,
        ) {
            let data = sorted_rows(&positions);
            let r = data.len();
            let partitions = SliceStrategy::Step(k).partition("A", &data, 1).unwrap();
            prop_assert_eq!(partitions.len(), r.div_ceil(k));
            for p in &partitions[..partitions.len() - 1] {
                prop_assert_eq!(p.len(), k);
            }
        }

        #[test]
        fn prop_bin_count_bounded(
            positions in prop::collection::vec(0u32..10_000, 1..300),
            b in 1usize..40,
        ) {
            let data = sorted_rows(&positions);
            let r = data.len();
            let partitions = SliceStrategy::Bin(b).partition("A", &data, 1).unwrap();
            prop_assert_eq!(partitions.len(), r.div_ceil(r.div_ceil(b)));
            prop_assert!(partitions.len() <= b);
            if r % b == 0 {
                prop_assert_eq!(partitions.len(), b);
            }
        }

        #[test]
        fn prop_value_buckets_cover_range(
            positions in prop::collection::vec(0u32..10_000, 1..300),
            width in 1u32..2_000,
        ) {
            let data = sorted_rows(&positions);
            let partitions = SliceStrategy::Value(f64::from(width)).partition("A", &data, 1).unwrap();
            let min = f64::from(*positions.iter().min().unwrap());
            let max = f64::from(*positions.iter().max().unwrap());

            let bounds: Vec<(f64, f64)> = partitions.iter().map(|p| p.bounds().unwrap()).collect();
            prop_assert_eq!(bounds[0].0, min);
            prop_assert!(bounds[bounds.len() - 1].1 > max);
            for pair in bounds.windows(2) {
                prop_assert_eq!(pair[0].1, pair[1].0);
            }
            for p in &partitions {
                let (lo, hi) = p.bounds().unwrap();
                for &i in p.members() {
                    let v = data[i].number(1).unwrap();
                    prop_assert!(v >= lo && v < hi);
                }
            }
            let total: usize = partitions.iter().map(Partition::len).sum();
            prop_assert_eq!(total, data.len());
        }
    }
}
