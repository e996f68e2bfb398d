use super::store::{CodeTotals, LineItemStore, NewCsvResult, ResultStore};
use crate::error::Result;
use chrono::Utc;
use log::debug;
use std::collections::BTreeSet;

/// How many codes are echoed back in a summary.
pub const PREVIEW_LIMIT: usize = 25;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AggregationSummary {
    pub created: usize,
    /// First codes of the input in ascending order, at most `PREVIEW_LIMIT`.
    pub codes_preview: Vec<String>,
}

pub struct Aggregator<'a> {
    line_items: &'a dyn LineItemStore,
    results: &'a dyn ResultStore,
}

impl<'a> Aggregator<'a> {
    pub fn new(line_items: &'a dyn LineItemStore, results: &'a dyn ResultStore) -> Self {
        Self {
            line_items,
            results,
        }
    }

    /// Builds one row per code, using `(0, 0.00)` for codes with no line
    /// items, and writes them in a single bulk call tagged with `source_file`.
    pub fn aggregate(
        &self,
        codes: &BTreeSet<String>,
        source_file: &str,
    ) -> Result<AggregationSummary> {
        let totals = self.line_items.totals_for_codes(codes)?;
        debug!("{} of {} codes matched line items", totals.len(), codes.len());

        let created_at = Utc::now();
        let rows: Vec<NewCsvResult> = codes
            .iter()
            .map(|code| {
                let found = totals.get(code).copied().unwrap_or_else(CodeTotals::zero);
                NewCsvResult {
                    stock_code: code.clone(),
                    number_quotes_found: found.count,
                    total_price: found.total_price,
                    file_uploaded: source_file.to_string(),
                    created_at,
                }
            })
            .collect();

        let created = self.results.bulk_create(&rows)?;

        Ok(AggregationSummary {
            created,
            codes_preview: codes.iter().take(PREVIEW_LIMIT).cloned().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JobError;
    use parking_lot::Mutex;
    use rust_decimal::Decimal;
    use std::collections::HashMap;
    use std::str::FromStr;

    #[derive(Default)]
    struct FakeLineItems {
        totals: HashMap<String, CodeTotals>,
        queries: Mutex<usize>,
        fail: bool,
    }

    impl LineItemStore for FakeLineItems {
        fn totals_for_codes(
            &self,
            codes: &BTreeSet<String>,
        ) -> Result<HashMap<String, CodeTotals>> {
            *self.queries.lock() += 1;
            if self.fail {
                return Err(JobError::StoreUnavailable("connection refused".into()));
            }
            Ok(self
                .totals
                .iter()
                .filter(|(code, _)| codes.contains(*code))
                .map(|(code, totals)| (code.clone(), *totals))
                .collect())
        }
    }

    #[derive(Default)]
    struct FakeResults {
        calls: Mutex<Vec<Vec<NewCsvResult>>>,
    }

    impl ResultStore for FakeResults {
        fn bulk_create(&self, rows: &[NewCsvResult]) -> Result<usize> {
            self.calls.lock().push(rows.to_vec());
            Ok(rows.len())
        }
    }

    fn price(text: &str) -> Decimal {
        Decimal::from_str(text).unwrap()
    }

    fn codes(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn matched_and_unmatched_codes_each_get_one_row() {
        let mut line_items = FakeLineItems::default();
        line_items.totals.insert(
            "AX123".into(),
            CodeTotals {
                count: 2,
                total_price: price("35.50"),
            },
        );
        let results = FakeResults::default();

        let summary = Aggregator::new(&line_items, &results)
            .aggregate(&codes(&["BX456", "AX123"]), "csv_uploads/a.csv")
            .unwrap();

        assert_eq!(summary.created, 2);
        assert_eq!(summary.codes_preview, vec!["AX123", "BX456"]);

        let calls = results.calls.lock();
        assert_eq!(calls.len(), 1);
        let rows = &calls[0];
        assert_eq!(rows[0].stock_code, "AX123");
        assert_eq!(rows[0].number_quotes_found, 2);
        assert_eq!(rows[0].total_price.to_string(), "35.50");
        assert_eq!(rows[1].stock_code, "BX456");
        assert_eq!(rows[1].number_quotes_found, 0);
        assert_eq!(rows[1].total_price.to_string(), "0.00");
        assert!(rows.iter().all(|r| r.file_uploaded == "csv_uploads/a.csv"));
    }

    #[test]
    fn store_is_queried_once_for_the_whole_set() {
        let line_items = FakeLineItems::default();
        let results = FakeResults::default();
        let many: BTreeSet<String> = (0..100).map(|i| format!("P{i:03}")).collect();

        let summary = Aggregator::new(&line_items, &results)
            .aggregate(&many, "csv_uploads/b.csv")
            .unwrap();

        assert_eq!(*line_items.queries.lock(), 1);
        assert_eq!(summary.created, 100);
        assert_eq!(summary.codes_preview.len(), PREVIEW_LIMIT);
        assert_eq!(summary.codes_preview.first().map(String::as_str), Some("P000"));
        assert_eq!(summary.codes_preview.last().map(String::as_str), Some("P024"));
    }

    #[test]
    fn query_failure_writes_nothing() {
        let line_items = FakeLineItems {
            fail: true,
            ..Default::default()
        };
        let results = FakeResults::default();

        let err = Aggregator::new(&line_items, &results)
            .aggregate(&codes(&["AX123"]), "csv_uploads/c.csv")
            .unwrap_err();

        assert!(matches!(err, JobError::StoreUnavailable(_)));
        assert!(results.calls.lock().is_empty());
    }
}
