//! Daily-reset document numbers.
//!
//! A document number is `prefix + YYMMDD + sequence`, where the sequence starts
//! at 1 each day and is zero-padded to at least four digits (`SL2610190007`).
//! Sequences past 9999 simply grow wider.

use chrono::NaiveDate;

use crate::DocumentKind;

/// Minimum width of the sequence part.
pub const SEQUENCE_WIDTH: usize = 4;

/// Counter bucket key for a calendar day (`YYMMDD`).
#[must_use]
pub fn date_key(date: NaiveDate) -> String {
    date.format("%y%m%d").to_string()
}

/// Format a document number.
#[must_use]
pub fn document_number(kind: DocumentKind, date_key: &str, sequence: i64) -> String {
    format!(
        "{}{date_key}{sequence:0width$}",
        kind.prefix(),
        width = SEQUENCE_WIDTH
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_date_key() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert_eq!(date_key(date), "261019");
        let date = NaiveDate::from_ymd_opt(2027, 1, 2).unwrap();
        assert_eq!(date_key(date), "270102");
    }

    #[test]
    fn test_document_number_padding() {
        assert_eq!(
            document_number(DocumentKind::Sale, "261019", 7),
            "SL2610190007"
        );
        assert_eq!(
            document_number(DocumentKind::Order, "261019", 123),
            "OD2610190123"
        );
    }

    #[test]
    fn test_document_number_grows_past_width() {
        assert_eq!(
            document_number(DocumentKind::Sale, "261019", 12_345),
            "SL26101912345"
        );
    }
}
