//! CSV ingestion and phone normalization for lead imports.
//!
//! The importer is column-order-independent: it locates the name and phone
//! columns by header token, tokenizes rows with a two-state automaton so
//! quoted fields may contain commas, and normalizes phone numbers into an
//! E.164-like form. Rows with missing or invalid data are skipped and
//! counted, never fatal; the whole import fails only when the input is
//! structurally unusable or yields zero leads.

use crate::domain::lead::{DEFAULT_TIME_ZONE, Lead};
use crate::error::{OutdialError, Result};

/// Template offered to operators for download. Demonstrates both plain and
/// scientific-notation phone formats.
pub const LEADS_TEMPLATE_CSV: &str = "name,number\njahid,8.8E+12\nsabbir,8.8E+12\nrahman,+8801555123456";

/// Header tokens accepted for the name column.
const NAME_TOKENS: &[&str] = &["name", "first", "firstname", "first_name"];

/// Header tokens accepted for the phone column.
const PHONE_TOKENS: &[&str] = &["phone", "number", "mobile", "tel", "contact"];

/// Result of one CSV import.
#[derive(Debug)]
pub struct IngestOutcome {
    /// Newly created leads, in input-row order.
    pub accepted: Vec<Lead>,
    /// Rows dropped for missing fields or unusable phone numbers.
    pub skipped: usize,
}

/// Tokenizer state for [`split_fields`].
#[derive(Clone, Copy, PartialEq)]
enum FieldState {
    Normal,
    InQuotes,
}

/// Split one CSV line into trimmed fields.
///
/// A `"` toggles between `Normal` and `InQuotes`; a `,` separates fields only
/// in `Normal` state, so quoted fields may contain commas. Quote characters
/// themselves are dropped.
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut state = FieldState::Normal;

    for ch in line.chars() {
        match (state, ch) {
            (FieldState::Normal, '"') => state = FieldState::InQuotes,
            (FieldState::InQuotes, '"') => state = FieldState::Normal,
            (FieldState::Normal, ',') => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

fn strip_quotes(value: &str) -> String {
    value.chars().filter(|c| *c != '"' && *c != '\'').collect()
}

/// Normalize a raw phone value into an E.164-like string.
///
/// In order: scientific-notation values (`E+`/`e+`) are parsed as floating
/// point and rounded to the nearest integer (a lossy, best-effort
/// conversion); whitespace, dashes, and parentheses are stripped; a `+`
/// prefix is added when the value doesn't start with one and is at least 10
/// characters long. Returns `None` when fewer than 10 digit characters
/// remain. Idempotent on already-normalized values.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let mut phone = raw.trim().to_string();

    if phone.contains("E+") || phone.contains("e+") {
        if let Ok(value) = phone.parse::<f64>() {
            if value.is_finite() {
                phone = format!("{}", value.round() as i128);
            }
        }
    }

    phone.retain(|c| !c.is_whitespace() && c != '-' && c != '(' && c != ')');

    if !phone.starts_with('+') && phone.len() >= 10 {
        phone.insert(0, '+');
    }

    let digits = phone.chars().filter(char::is_ascii_digit).count();
    if digits < 10 {
        return None;
    }
    Some(phone)
}

/// Parse raw CSV text into validated leads.
///
/// Accepted rows become pending leads stamped with the default time zone.
/// Returns the accepted leads plus a count of skipped rows; fails only on a
/// structurally unusable input (see [`OutdialError::CsvFormat`],
/// [`OutdialError::MissingNameColumn`], [`OutdialError::MissingPhoneColumn`])
/// or when no rows survive ([`OutdialError::NoValidRows`]).
#[tracing::instrument(skip(text), fields(len = text.len()))]
pub fn ingest_leads(text: &str) -> Result<IngestOutcome> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if lines.len() < 2 {
        return Err(OutdialError::CsvFormat);
    }

    let headers: Vec<String> = lines[0]
        .split(',')
        .map(|h| strip_quotes(&h.trim().to_lowercase()))
        .collect();

    let name_index = headers
        .iter()
        .position(|h| NAME_TOKENS.iter().any(|token| h.contains(token)))
        .ok_or_else(|| OutdialError::MissingNameColumn {
            headers: headers.clone(),
        })?;

    let phone_index = headers
        .iter()
        .position(|h| PHONE_TOKENS.iter().any(|token| h.contains(token)))
        .ok_or_else(|| OutdialError::MissingPhoneColumn {
            headers: headers.clone(),
        })?;

    let required_fields = name_index.max(phone_index) + 1;
    let mut accepted = Vec::new();
    let mut skipped = 0usize;

    for line in &lines[1..] {
        let fields = split_fields(line);
        if fields.len() < required_fields {
            skipped += 1;
            continue;
        }

        let name = strip_quotes(fields[name_index].trim());
        let raw_phone = strip_quotes(fields[phone_index].trim());
        if name.is_empty() || raw_phone.is_empty() {
            skipped += 1;
            continue;
        }

        match normalize_phone(&raw_phone) {
            Some(phone) => accepted.push(Lead::new(name, phone, DEFAULT_TIME_ZONE, None)),
            None => {
                tracing::debug!(phone = %raw_phone, "row skipped: too few digits");
                skipped += 1;
            }
        }
    }

    if accepted.is_empty() {
        return Err(OutdialError::NoValidRows);
    }

    tracing::info!(
        accepted = accepted.len(),
        skipped,
        "CSV ingestion completed"
    );
    Ok(IngestOutcome { accepted, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lead::LeadStatus;

    #[test]
    fn template_csv_imports_without_skips() {
        let outcome = ingest_leads(LEADS_TEMPLATE_CSV).unwrap();
        assert_eq!(outcome.accepted.len(), 3);
        assert_eq!(outcome.skipped, 0);

        // 8.8E+12 rounds to 8800000000000 and gains a + prefix
        assert_eq!(outcome.accepted[0].first_name, "jahid");
        assert_eq!(outcome.accepted[0].phone_number, "+8800000000000");
        assert_eq!(outcome.accepted[1].first_name, "sabbir");
        assert_eq!(outcome.accepted[1].phone_number, "+8800000000000");
        assert_eq!(outcome.accepted[2].first_name, "rahman");
        assert_eq!(outcome.accepted[2].phone_number, "+8801555123456");

        for lead in &outcome.accepted {
            assert_eq!(lead.status, LeadStatus::Pending);
            assert_eq!(lead.retry_count, 0);
            assert_eq!(lead.time_zone, DEFAULT_TIME_ZONE);
        }
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in ["8.8E+12", " +880 1555-123456 ", "(880) 1555 123456"] {
            let once = normalize_phone(raw).unwrap();
            let twice = normalize_phone(&once).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn normalization_strips_separators_and_prefixes_plus() {
        assert_eq!(
            normalize_phone("880 1555-123456").as_deref(),
            Some("+8801555123456")
        );
        assert_eq!(
            normalize_phone("(880)1555123456").as_deref(),
            Some("+8801555123456")
        );
        // already-prefixed numbers are untouched
        assert_eq!(
            normalize_phone("+8801555123456").as_deref(),
            Some("+8801555123456")
        );
    }

    #[test]
    fn short_numbers_are_rejected() {
        assert_eq!(normalize_phone("12345"), None);
        assert_eq!(normalize_phone("555-0199"), None);
    }

    #[test]
    fn columns_are_matched_by_header_token_not_position() {
        let csv = "Reference,\"Mobile Number\",First Name\nx1,+8801555123456,karim";
        let outcome = ingest_leads(csv).unwrap();
        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.accepted[0].first_name, "karim");
        assert_eq!(outcome.accepted[0].phone_number, "+8801555123456");
    }

    #[test]
    fn quoted_fields_may_contain_commas() {
        let csv = "name,number\n\"rahman, md\",+8801555123456";
        let outcome = ingest_leads(csv).unwrap();
        assert_eq!(outcome.accepted[0].first_name, "rahman, md");
    }

    #[test]
    fn crlf_and_blank_lines_are_tolerated() {
        let csv = "name,number\r\n\r\njahid,+8801555123456\r\n";
        let outcome = ingest_leads(csv).unwrap();
        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.skipped, 0);
    }

    #[test]
    fn header_only_input_is_a_format_error() {
        assert!(matches!(
            ingest_leads("name,number"),
            Err(OutdialError::CsvFormat)
        ));
        assert!(matches!(ingest_leads(""), Err(OutdialError::CsvFormat)));
    }

    #[test]
    fn missing_columns_report_the_headers_found() {
        let err = ingest_leads("foo,bar\na,b").unwrap_err();
        match &err {
            OutdialError::MissingNameColumn { headers } => {
                assert_eq!(headers, &["foo", "bar"]);
            }
            other => panic!("expected MissingNameColumn, got {other:?}"),
        }
        assert!(err.to_string().contains("foo, bar"));

        let err = ingest_leads("name,bar\na,b").unwrap_err();
        assert!(matches!(err, OutdialError::MissingPhoneColumn { .. }));
    }

    #[test]
    fn bad_rows_are_counted_not_fatal() {
        let csv = "name,number\n\
                   jahid,+8801555123456\n\
                   short,+123\n\
                   onlyname\n\
                   ,+8801555123456";
        let outcome = ingest_leads(csv).unwrap();
        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.skipped, 3);
    }

    #[test]
    fn all_rows_rejected_is_an_error() {
        let csv = "name,number\nshort,+123";
        assert!(matches!(
            ingest_leads(csv),
            Err(OutdialError::NoValidRows)
        ));
    }
}
