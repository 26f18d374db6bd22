// Tolerant row-by-row CSV parsing.
//
// One bad record never aborts a file: it becomes an error row carrying its
// line number and a log message, and parsing continues with the next record.
// Columns bind by header name; every field is read as text and left for the
// translator to interpret.

use std::io::Read;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::UpsertAction;

// ---------------------------------------------------------------------------
// Row shapes
// ---------------------------------------------------------------------------

/// One line of a games file (pro-football-reference schedule layout).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRow {
    /// Week number or playoff round label. Absent in single-week exports.
    #[serde(rename = "Week", default)]
    pub week: Option<String>,
    #[serde(rename = "Day", default)]
    pub day: Option<String>,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Time")]
    pub time: String,
    #[serde(rename = "Winner/tie")]
    pub winner: String,
    /// Venue marker: `@` when the winner played away.
    #[serde(rename = "At", default)]
    pub at: Option<String>,
    #[serde(rename = "Loser/tie")]
    pub loser: String,
    #[serde(rename = "PtsW", default)]
    pub points_winner: Option<String>,
    #[serde(rename = "PtsL", default)]
    pub points_loser: Option<String>,
}

/// One line of a teams file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRow {
    /// Full display name ("New York Jets"), or the short name when a
    /// `Location` column is present.
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Division")]
    pub division: String,
    #[serde(rename = "Season", default)]
    pub season: Option<String>,
    #[serde(rename = "Location", default)]
    pub location: Option<String>,
}

// ---------------------------------------------------------------------------
// Row results
// ---------------------------------------------------------------------------

/// The outcome for one data record of an upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowResult<T> {
    /// 1-based position among data records (the header is not counted).
    pub line_number: usize,
    /// Decoded fields; `None` when the record could not be decoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<T>,
    /// What reconciliation did with this row, once committed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<UpsertAction>,
    /// Parse and translation diagnostics.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub log: Vec<String>,
}

impl<T> RowResult<T> {
    pub fn parsed(line_number: usize, record: T) -> Self {
        Self {
            line_number,
            record: Some(record),
            action: None,
            log: Vec::new(),
        }
    }

    pub fn failed(line_number: usize, message: String) -> Self {
        Self {
            line_number,
            record: None,
            action: None,
            log: vec![message],
        }
    }

    /// Record a row-level problem. The row will be skipped.
    pub fn reject(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("line {}: {message}", self.line_number);
        self.log.push(message);
    }

    /// Decoded without any diagnostics, so eligible for reconciliation.
    pub fn is_accepted(&self) -> bool {
        self.record.is_some() && self.log.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Iterator over the row results of one CSV stream.
pub struct RowParser<R, T> {
    records: csv::StringRecordsIntoIter<R>,
    headers: Option<csv::StringRecord>,
    line_number: usize,
    _shape: PhantomData<T>,
}

impl<R: Read, T: DeserializeOwned> RowParser<R, T> {
    pub fn new(rdr: R) -> Self {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(rdr);
        let headers = match reader.headers() {
            Ok(headers) => Some(headers.clone()),
            Err(e) => {
                warn!("unreadable CSV header: {e}");
                None
            }
        };
        Self {
            records: reader.into_records(),
            headers,
            line_number: 0,
            _shape: PhantomData,
        }
    }

    fn decode(&self, record: csv::Result<csv::StringRecord>) -> Result<T, String> {
        let headers = self
            .headers
            .as_ref()
            .ok_or_else(|| "the header line could not be read".to_string())?;
        let record = record.map_err(|e| e.to_string())?;
        record
            .deserialize(Some(headers))
            .map_err(|e| e.to_string())
    }
}

impl<R: Read, T: DeserializeOwned> Iterator for RowParser<R, T> {
    type Item = RowResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        self.line_number += 1;
        let n = self.line_number;
        Some(match self.decode(record) {
            Ok(row) => RowResult::parsed(n, row),
            Err(e) => {
                let message = format!("Error on line {n}: {e}");
                warn!("{message}");
                RowResult::failed(n, message)
            }
        })
    }
}

/// Parse a whole stream into row results.
pub fn parse_rows<T: DeserializeOwned, R: Read>(rdr: R) -> Vec<RowResult<T>> {
    RowParser::new(rdr).collect()
}
