use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::model::{AlignedRow, CanonicalRecord, Metric, Source};

/// Full outer join of two canonical series on date.
///
/// One row per distinct date in either input, ascending. A date missing from
/// one side leaves that side's values unset. Should a side carry the same
/// date twice, its present values are summed so dates stay unique.
pub fn align(primary: &[CanonicalRecord], reference: &[CanonicalRecord]) -> Vec<AlignedRow> {
    let mut rows: BTreeMap<NaiveDate, AlignedRow> = BTreeMap::new();

    for (source, records) in [(Source::Primary, primary), (Source::Reference, reference)] {
        for record in records {
            let row = rows
                .entry(record.date)
                .or_insert_with(|| AlignedRow::empty(record.date));
            for metric in Metric::ALL {
                let Some(value) = record.value(metric) else {
                    continue;
                };
                let pair = row.metric_mut(metric);
                let slot = match source {
                    Source::Primary => &mut pair.primary,
                    Source::Reference => &mut pair.reference,
                };
                *slot = Some(slot.map_or(value, |existing| existing + value));
            }
        }
    }

    let aligned: Vec<AlignedRow> = rows.into_values().collect();
    tracing::info!(
        primary = primary.len(),
        reference = reference.len(),
        days = aligned.len(),
        "aligned sources"
    );
    aligned
}
