//! CSV result sink
//!
//! One row per completed trial, columns `Trial,Q1..Qn`. Numeric answers
//! are rendered to two decimals, letters verbatim, missing answers as
//! empty cells. The shape of the table never depends on how many
//! questions a trial actually answered.

use std::fs;
use std::io;
use std::path::Path;

use crate::runner::TrialRow;

/// Render rows into CSV text. The caller is expected to have sorted the
/// rows already (the executor returns them ascending by trial).
pub fn render_csv(rows: &[TrialRow], question_count: usize) -> String {
    let mut out = String::new();

    out.push_str("Trial");
    for q in 1..=question_count {
        out.push_str(&format!(",Q{}", q));
    }
    out.push('\n');

    for row in rows {
        out.push_str(&row.trial.to_string());
        for q in 0..question_count {
            out.push(',');
            if let Some(answer) = row.answers.get(q).copied().flatten() {
                out.push_str(&answer.csv_cell());
            }
        }
        out.push('\n');
    }

    out
}

/// Write the result table, creating parent directories as needed.
pub fn write_csv<P: AsRef<Path>>(
    path: P,
    rows: &[TrialRow],
    question_count: usize,
) -> io::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, render_csv(rows, question_count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Answer;

    fn row(trial: u32, answers: Vec<Option<Answer>>) -> TrialRow {
        let mut padded = answers;
        padded.resize(14, None);
        TrialRow {
            trial,
            answers: padded,
        }
    }

    #[test]
    fn test_header_shape() {
        let csv = render_csv(&[], 14);
        assert_eq!(
            csv,
            "Trial,Q1,Q2,Q3,Q4,Q5,Q6,Q7,Q8,Q9,Q10,Q11,Q12,Q13,Q14\n"
        );
    }

    #[test]
    fn test_cell_formatting() {
        let rows = vec![row(
            1,
            vec![
                Some(Answer::Letter('A')),
                Some(Answer::Number(110.0)),
                Some(Answer::Number(1250.5)),
                None,
            ],
        )];
        let csv = render_csv(&rows, 14);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "1,A,110.00,1250.50,,,,,,,,,,,");
    }

    #[test]
    fn test_column_count_fixed() {
        let rows = vec![row(7, vec![Some(Answer::Letter('B'))])];
        let csv = render_csv(&rows, 14);
        let data_line = csv.lines().nth(1).unwrap();
        assert_eq!(data_line.split(',').count(), 15); // Trial + Q1..Q14
    }

    #[test]
    fn test_multiple_rows_in_order() {
        let rows = vec![
            row(1, vec![Some(Answer::Letter('A'))]),
            row(3, vec![Some(Answer::Letter('B'))]),
            row(4, vec![Some(Answer::Number(42.0))]),
        ];
        let csv = render_csv(&rows, 14);
        let trials: Vec<&str> = csv
            .lines()
            .skip(1)
            .map(|l| l.split(',').next().unwrap())
            .collect();
        assert_eq!(trials, vec!["1", "3", "4"]);
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results").join("run.csv");

        write_csv(&path, &[row(1, vec![Some(Answer::Letter('A'))])], 14).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("Trial,Q1"));
        assert!(written.contains("1,A"));
    }

    #[test]
    fn test_empty_batch_still_well_formed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");

        write_csv(&path, &[], 14).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.lines().count(), 1);
        assert!(written.starts_with("Trial,Q1"));
    }
}
