//! Extraction of stock codes from an uploaded CSV.
//!
//! Rows are streamed one record at a time through a reused `StringRecord`,
//! so memory grows with the number of distinct codes, not with file size.

use crate::error::{JobError, Result};
use std::collections::BTreeSet;
use std::io::Read;

/// Header that must be present, matched exactly and case-sensitively.
pub const STOCK_CODE_COLUMN: &str = "stock_code";

/// Reads a comma-delimited CSV with a header row and returns the distinct,
/// trimmed, non-empty values of the `stock_code` column in ascending order.
///
/// Blank codes are skipped. A file with a valid header and no codes yields an
/// empty set; deciding what that means is up to the caller.
pub fn parse_stock_codes<R: Read>(input: R) -> Result<BTreeSet<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input);

    let column = reader
        .headers()?
        .iter()
        .position(|title| title == STOCK_CODE_COLUMN)
        .ok_or_else(|| JobError::MissingColumn {
            column: STOCK_CODE_COLUMN.to_string(),
        })?;

    let mut codes = BTreeSet::new();
    let mut record = csv::StringRecord::new();
    while reader.read_record(&mut record)? {
        let code = record.get(column).map(str::trim).unwrap_or_default();
        if !code.is_empty() && !codes.contains(code) {
            codes.insert(code.to_string());
        }
    }

    Ok(codes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<BTreeSet<String>> {
        parse_stock_codes(text.as_bytes())
    }

    fn set(codes: &[&str]) -> BTreeSet<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn blank_codes_are_skipped() {
        let codes = parse("stock_code\nAX123\nBX456\n\n  \n").unwrap();
        assert_eq!(codes, set(&["AX123", "BX456"]));
    }

    #[test]
    fn duplicates_collapse_and_values_are_trimmed() {
        let codes = parse("stock_code\nAX123\n AX123 \nBX456\nAX123\n").unwrap();
        assert_eq!(codes, set(&["AX123", "BX456"]));
    }

    #[test]
    fn codes_are_case_sensitive() {
        let codes = parse("stock_code\nAX123\nax123\n").unwrap();
        assert_eq!(codes.len(), 2);
    }

    #[test]
    fn other_columns_and_short_rows_are_tolerated() {
        let text = "description,stock_code,qty\nbolt,AX123,4\nnut\nwasher,\"CX 9\",1\n";
        let codes = parse(text).unwrap();
        assert_eq!(codes, set(&["AX123", "CX 9"]));
    }

    #[test]
    fn header_without_stock_code_fails() {
        let err = parse("code\nAX123\n").unwrap_err();
        assert!(matches!(err, JobError::MissingColumn { .. }));
        assert_eq!(err.to_string(), "CSV must include 'stock_code' column.");
    }

    #[test]
    fn header_match_is_exact() {
        let err = parse("Stock_Code\nAX123\n").unwrap_err();
        assert!(matches!(err, JobError::MissingColumn { .. }));
    }

    #[test]
    fn header_only_file_yields_no_codes() {
        assert!(parse("stock_code\n").unwrap().is_empty());
        assert!(parse("stock_code\n,\n \n").unwrap().is_empty());
    }

    #[test]
    fn empty_input_is_missing_the_column() {
        assert!(matches!(
            parse("").unwrap_err(),
            JobError::MissingColumn { .. }
        ));
    }

    #[test]
    fn invalid_utf8_is_a_validation_error() {
        let bytes: &[u8] = b"stock_code\n\xff\xfe\n";
        let err = parse_stock_codes(bytes).unwrap_err();
        assert!(matches!(err, JobError::Validation(_)));
    }
}
