//! Parsing of operator-supplied correction lists.
//!
//! CSV inputs use named columns, checked before any record is processed so a
//! typo'd column name fails up front rather than mid-batch. Move lists are
//! plain text, one value per line, and are deliberately *not* trimmed beyond
//! the trailing newline: the mutation must mirror stored values exactly.

use std::io;

use anyhow::{Context, Result};
use mend_core::{correction::Correction, field::FieldId};

/// Find `column` in the CSV header, or fail naming the missing column.
fn column_index(headers: &csv::StringRecord, column: &str) -> Result<usize> {
  headers
    .iter()
    .position(|h| h == column)
    .with_context(|| format!("column {column:?} does not exist in the CSV"))
}

/// One delete record per row: the value to remove from `field`.
pub fn read_deletions(
  reader: impl io::Read,
  column: &str,
  field: FieldId,
) -> Result<Vec<Correction>> {
  let mut csv_reader = csv::Reader::from_reader(reader);
  let headers = csv_reader.headers().context("reading CSV header")?.clone();
  let idx = column_index(&headers, column)?;

  let mut out = Vec::new();
  for record in csv_reader.records() {
    let record = record.context("reading CSV row")?;
    out.push(Correction::Delete {
      field,
      value: record.get(idx).unwrap_or_default().to_owned(),
    });
  }
  Ok(out)
}

/// One replace record per row, from a "bad value" and a "good value" column.
pub fn read_replacements(
  reader: impl io::Read,
  from_column: &str,
  to_column: &str,
  field: FieldId,
) -> Result<Vec<Correction>> {
  let mut csv_reader = csv::Reader::from_reader(reader);
  let headers = csv_reader.headers().context("reading CSV header")?.clone();
  let from_idx = column_index(&headers, from_column)?;
  let to_idx = column_index(&headers, to_column)?;

  let mut out = Vec::new();
  for record in csv_reader.records() {
    let record = record.context("reading CSV row")?;
    out.push(Correction::Replace {
      field,
      from: record.get(from_idx).unwrap_or_default().to_owned(),
      to: record.get(to_idx).unwrap_or_default().to_owned(),
    });
  }
  Ok(out)
}

/// One link record per row: an author name and the assertion text carrying
/// the embedded identifier.
pub fn read_links(
  reader: impl io::Read,
  name_column: &str,
  assertion_column: &str,
  name_field: FieldId,
  assertion_field: FieldId,
) -> Result<Vec<Correction>> {
  let mut csv_reader = csv::Reader::from_reader(reader);
  let headers = csv_reader.headers().context("reading CSV header")?.clone();
  let name_idx = column_index(&headers, name_column)?;
  let assertion_idx = column_index(&headers, assertion_column)?;

  let mut out = Vec::new();
  for record in csv_reader.records() {
    let record = record.context("reading CSV row")?;
    out.push(Correction::Link {
      name_field,
      assertion_field,
      name: record.get(name_idx).unwrap_or_default().to_owned(),
      assertion: record.get(assertion_idx).unwrap_or_default().to_owned(),
    });
  }
  Ok(out)
}

/// One move record per line. Only the trailing newline is stripped; any
/// other whitespace is part of the value being matched.
pub fn read_moves(
  mut reader: impl io::BufRead,
  from_field: FieldId,
  to_field: FieldId,
) -> Result<Vec<Correction>> {
  let mut out = Vec::new();
  let mut buf = String::new();
  loop {
    buf.clear();
    if reader.read_line(&mut buf).context("reading input line")? == 0 {
      break;
    }
    let value = buf.strip_suffix('\n').unwrap_or(&buf);
    out.push(Correction::Move {
      from_field,
      to_field,
      value: value.to_owned(),
    });
  }
  Ok(out)
}

/// Unique keys (DOIs), one per line, fully trimmed and de-duplicated while
/// preserving first-seen order.
pub fn read_keys(reader: impl io::BufRead) -> Result<Vec<String>> {
  let mut keys: Vec<String> = Vec::new();
  for line in reader.lines() {
    let line = line.context("reading input line")?;
    let key = line.trim();
    if key.is_empty() {
      continue;
    }
    if !keys.iter().any(|k| k == key) {
      keys.push(key.to_owned());
    }
  }
  Ok(keys)
}

#[cfg(test)]
mod tests {
  use super::*;

  const AUTHOR: FieldId = FieldId(3);
  const SUBJECT: FieldId = FieldId(57);

  #[test]
  fn replacements_handle_quoted_commas() {
    let csv = "from,to\n\"Orth, Alan\",\"Orth, A.\"\n";
    let records =
      read_replacements(csv.as_bytes(), "from", "to", AUTHOR).unwrap();
    assert_eq!(records, vec![Correction::Replace {
      field: AUTHOR,
      from:  "Orth, Alan".into(),
      to:    "Orth, A.".into(),
    }]);
  }

  #[test]
  fn missing_column_is_reported_by_name() {
    let csv = "from,to\na,b\n";
    let err =
      read_replacements(csv.as_bytes(), "from", "correct", AUTHOR).unwrap_err();
    assert!(err.to_string().contains("\"correct\""));
  }

  #[test]
  fn deletions_read_the_named_column() {
    let csv = "delete\nFISH\nLIVESTOCK\n";
    let records = read_deletions(csv.as_bytes(), "delete", SUBJECT).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0], Correction::Delete {
      field: SUBJECT,
      value: "FISH".into(),
    });
  }

  #[test]
  fn links_carry_both_columns_and_fields() {
    let csv = "dc.contributor.author,cg.creator.id\n\
               \"Orth, Alan\",Alan S. Orth: 0000-0002-1735-7458\n";
    let records = read_links(
      csv.as_bytes(),
      "dc.contributor.author",
      "cg.creator.id",
      AUTHOR,
      FieldId(240),
    )
    .unwrap();
    assert_eq!(records, vec![Correction::Link {
      name_field:      AUTHOR,
      assertion_field: FieldId(240),
      name:            "Orth, Alan".into(),
      assertion:       "Alan S. Orth: 0000-0002-1735-7458".into(),
    }]);
  }

  #[test]
  fn moves_strip_only_the_trailing_newline() {
    let text = " padded value \nplain\n";
    let records =
      read_moves(text.as_bytes(), AUTHOR, SUBJECT).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0], Correction::Move {
      from_field: AUTHOR,
      to_field:   SUBJECT,
      value:      " padded value ".into(),
    });
  }

  #[test]
  fn keys_are_trimmed_and_deduplicated_in_order() {
    let text = " 10.1186/a \n10.1186/b\n\n10.1186/a\n";
    let keys = read_keys(text.as_bytes()).unwrap();
    assert_eq!(keys, vec!["10.1186/a", "10.1186/b"]);
  }
}
