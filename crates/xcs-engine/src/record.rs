//! Text persistence of populations.
//!
//! A population is stored as CSV, one row per macro-classifier:
//!
//! ```text
//! condition,action,prediction,error,fitness,experience,time_stamp,action_set_size,numerosity,accuracy
//! 1#0#,1,998.2,0.7,0.83,152,4410,12.3,7,1
//! ```
//!
//! Conditions use the text form of their genes (`0`, `1`, `#` for ternary
//! genes, `a:b` component pairs separated by spaces for intervals) and the
//! action column uses the action's `Display` / `FromStr` form. Neither may
//! contain a comma. The accuracy column is informational and ignored when
//! loading.

use std::{
    fmt,
    io::{self, BufRead, Write},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{
    classifier::{Action, Classifier},
    condition::Condition,
    config::XcsConfig,
    symbol::{ParseSymbolError, Symbol},
};

pub const CSV_HEADER: &str = "condition,action,prediction,error,fitness,experience,time_stamp,action_set_size,numerosity,accuracy";

/// How loaded statistics are treated.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum LoadMode {
    /// Keep conditions, actions and numerosities; reset the statistics to the
    /// configured initial values.
    #[default]
    Fresh,
    /// Keep everything and continue from the largest loaded time stamp.
    Resume,
}

/// Error returned when a population cannot be written or read back.
#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum PersistenceError {
    #[display("I/O error: {_0}")]
    #[from]
    Io(io::Error),
    #[display("missing or unexpected header line")]
    MissingHeader,
    #[display("line {line}: expected 10 fields, found {found}")]
    FieldCount { line: usize, found: usize },
    #[display("line {line}: invalid number in column `{field}`")]
    InvalidNumber { line: usize, field: &'static str },
    #[display("line {line}: {source}")]
    InvalidCondition {
        line: usize,
        source: ParseSymbolError,
    },
    #[display("line {line}: unknown action `{action}`")]
    UnknownAction { line: usize, action: String },
    #[display("line {line}: condition has {actual} genes, expected {expected}")]
    DimensionMismatch {
        line: usize,
        expected: usize,
        actual: usize,
    },
    #[display("line {line}: numerosity must be positive")]
    ZeroNumerosity { line: usize },
    #[display("text of `{text}` contains a comma")]
    UnencodableField { text: String },
}

/// Flat, serializable view of one macro-classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierRecord {
    pub condition: String,
    pub action: String,
    pub prediction: f64,
    pub error: f64,
    pub fitness: f64,
    pub experience: u64,
    pub time_stamp: u64,
    pub action_set_size: f64,
    pub numerosity: u32,
    pub accuracy: f64,
}

impl ClassifierRecord {
    #[must_use]
    pub fn new<S, A>(classifier: &Classifier<S, A>, config: &XcsConfig) -> Self
    where
        S: Symbol,
        A: Action + fmt::Display,
    {
        Self {
            condition: classifier.condition.to_string(),
            action: classifier.action.to_string(),
            prediction: classifier.prediction,
            error: classifier.error,
            fitness: classifier.fitness,
            experience: classifier.experience,
            time_stamp: classifier.time_stamp,
            action_set_size: classifier.action_set_size,
            numerosity: classifier.numerosity,
            accuracy: classifier.accuracy(config),
        }
    }

    fn write_row<W>(&self, writer: &mut W) -> Result<(), PersistenceError>
    where
        W: Write,
    {
        for text in [&self.condition, &self.action] {
            if text.contains([',', '\n', '\r']) {
                return Err(PersistenceError::UnencodableField { text: text.clone() });
            }
        }
        writeln!(
            writer,
            "{},{},{},{},{},{},{},{},{},{}",
            self.condition,
            self.action,
            self.prediction,
            self.error,
            self.fitness,
            self.experience,
            self.time_stamp,
            self.action_set_size,
            self.numerosity,
            self.accuracy
        )?;
        Ok(())
    }

    fn parse_row(line: usize, text: &str) -> Result<Self, PersistenceError> {
        let fields: Vec<&str> = text.split(',').map(str::trim).collect();
        let [
            condition,
            action,
            prediction,
            error,
            fitness,
            experience,
            time_stamp,
            action_set_size,
            numerosity,
            accuracy,
        ] = fields[..]
        else {
            return Err(PersistenceError::FieldCount {
                line,
                found: fields.len(),
            });
        };
        Ok(Self {
            condition: condition.to_owned(),
            action: action.to_owned(),
            prediction: parse_number(line, "prediction", prediction)?,
            error: parse_number(line, "error", error)?,
            fitness: parse_number(line, "fitness", fitness)?,
            experience: parse_number(line, "experience", experience)?,
            time_stamp: parse_number(line, "time_stamp", time_stamp)?,
            action_set_size: parse_number(line, "action_set_size", action_set_size)?,
            numerosity: parse_number(line, "numerosity", numerosity)?,
            accuracy: parse_number(line, "accuracy", accuracy)?,
        })
    }

    /// Rebuilds the classifier, checking the condition length and that the
    /// action is one of `actions`.
    fn to_classifier<S, A>(
        &self,
        line: usize,
        actions: &[A],
        situation_len: usize,
    ) -> Result<Classifier<S, A>, PersistenceError>
    where
        S: Symbol,
        A: Action + FromStr,
    {
        let condition: Condition<S> = self
            .condition
            .parse()
            .map_err(|source| PersistenceError::InvalidCondition { line, source })?;
        if condition.len() != situation_len {
            return Err(PersistenceError::DimensionMismatch {
                line,
                expected: situation_len,
                actual: condition.len(),
            });
        }
        let unknown = || PersistenceError::UnknownAction {
            line,
            action: self.action.clone(),
        };
        let action: A = self.action.parse().map_err(|_| unknown())?;
        if !actions.contains(&action) {
            return Err(unknown());
        }
        if self.numerosity == 0 {
            return Err(PersistenceError::ZeroNumerosity { line });
        }
        Ok(Classifier {
            condition,
            action,
            prediction: self.prediction,
            error: self.error,
            fitness: self.fitness,
            experience: self.experience,
            time_stamp: self.time_stamp,
            action_set_size: self.action_set_size,
            numerosity: self.numerosity,
        })
    }
}

fn parse_number<T>(line: usize, field: &'static str, text: &str) -> Result<T, PersistenceError>
where
    T: FromStr,
{
    text.parse()
        .map_err(|_| PersistenceError::InvalidNumber { line, field })
}

/// Writes the header and one row per record.
pub fn write_csv<'a, W, I>(writer: &mut W, records: I) -> Result<(), PersistenceError>
where
    W: Write,
    I: IntoIterator<Item = &'a ClassifierRecord>,
{
    writeln!(writer, "{CSV_HEADER}")?;
    for record in records {
        record.write_row(writer)?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads records written by [`write_csv`]. Blank lines are skipped.
pub fn read_csv<R>(reader: R) -> Result<Vec<(usize, ClassifierRecord)>, PersistenceError>
where
    R: BufRead,
{
    let mut lines = reader.lines().enumerate();
    let header = match lines.next() {
        Some((_, line)) => line?,
        None => return Err(PersistenceError::MissingHeader),
    };
    if header.trim() != CSV_HEADER {
        return Err(PersistenceError::MissingHeader);
    }
    let mut records = Vec::new();
    for (index, line) in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        // 1-based, header included
        let number = index + 1;
        records.push((number, ClassifierRecord::parse_row(number, &line)?));
    }
    Ok(records)
}

/// Reads a population, validating every row against the instance it will be
/// loaded into.
pub(crate) fn read_classifiers<S, A, R>(
    reader: R,
    actions: &[A],
    situation_len: usize,
) -> Result<Vec<Classifier<S, A>>, PersistenceError>
where
    S: Symbol,
    A: Action + FromStr,
    R: BufRead,
{
    read_csv(reader)?
        .iter()
        .map(|(line, record)| record.to_classifier(*line, actions, situation_len))
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::symbol::{CenterSpread, Ternary};

    use super::*;

    fn records() -> Vec<ClassifierRecord> {
        let config = XcsConfig::default();
        let mut cl = Classifier::<Ternary, u8>::new("1#0".parse().unwrap(), 1, 12, &config);
        cl.prediction = 1.0 / 3.0;
        cl.numerosity = 4;
        vec![ClassifierRecord::new(&cl, &config)]
    }

    #[test]
    fn test_csv_layout() {
        let mut out = Vec::new();
        write_csv(&mut out, &records()).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(CSV_HEADER));
        let row = lines.next().unwrap();
        assert!(row.starts_with("1#0,1,0.3333333333333333,0,0.01,0,12,1,4,1"));
        assert_eq!(lines.next(), None);

        let parsed = read_csv(text.as_bytes()).unwrap();
        assert_eq!(parsed, vec![(2, records().remove(0))]);
    }

    #[test]
    fn test_classifier_validation() {
        let text = format!("{CSV_HEADER}\n1#0,1,10,0,0.01,0,0,1,2,1\n\n1#,0,10,0,0.01,0,0,1,1,1\n");
        let err = read_classifiers::<Ternary, u8, _>(text.as_bytes(), &[0, 1], 3).unwrap_err();
        assert!(matches!(
            err,
            PersistenceError::DimensionMismatch {
                line: 4,
                expected: 3,
                actual: 2
            }
        ));

        let text = format!("{CSV_HEADER}\n1#0,7,10,0,0.01,0,0,1,2,1\n");
        let err = read_classifiers::<Ternary, u8, _>(text.as_bytes(), &[0, 1], 3).unwrap_err();
        assert!(matches!(err, PersistenceError::UnknownAction { line: 2, .. }));

        let text = format!("{CSV_HEADER}\n1x0,1,10,0,0.01,0,0,1,2,1\n");
        let err = read_classifiers::<Ternary, u8, _>(text.as_bytes(), &[0, 1], 3).unwrap_err();
        assert!(matches!(err, PersistenceError::InvalidCondition { line: 2, .. }));

        let text = format!("{CSV_HEADER}\n1#0,1,ten,0,0.01,0,0,1,2,1\n");
        let err = read_classifiers::<Ternary, u8, _>(text.as_bytes(), &[0, 1], 3).unwrap_err();
        assert!(matches!(
            err,
            PersistenceError::InvalidNumber {
                line: 2,
                field: "prediction"
            }
        ));

        let text = format!("{CSV_HEADER}\n1#0,1,10\n");
        let err = read_classifiers::<Ternary, u8, _>(text.as_bytes(), &[0, 1], 3).unwrap_err();
        assert!(matches!(err, PersistenceError::FieldCount { line: 2, found: 3 }));

        let err = read_classifiers::<Ternary, u8, _>("a,b\n".as_bytes(), &[0, 1], 3).unwrap_err();
        assert!(matches!(err, PersistenceError::MissingHeader));
    }

    #[test]
    fn test_interval_rows() {
        let text = format!("{CSV_HEADER}\n0.5:0.25 0.1:0.05,1,10,0,0.01,0,0,1,1,1\n");
        let classifiers = read_classifiers::<CenterSpread, u8, _>(text.as_bytes(), &[0, 1], 2).unwrap();
        assert_eq!(classifiers.len(), 1);
        assert!(classifiers[0].condition().matches(&[0.5, 0.1]));
        assert_eq!(classifiers[0].condition().to_string(), "0.5:0.25 0.1:0.05");
    }

    #[test]
    fn test_comma_in_action_is_rejected() {
        let mut record = records().remove(0);
        record.action = "a,b".to_owned();
        let err = write_csv(&mut Vec::<u8>::new(), [&record]).unwrap_err();
        assert!(matches!(err, PersistenceError::UnencodableField { .. }));
    }
}
