//! Assembly of a runnable SQL statement from breakdown steps.

use crate::ai::types::BreakdownStep;
use crate::error::{Result, ServiceError};

/// Build the SQL that materializes a breakdown up to `cutoff` (inclusive),
/// or all steps when `cutoff` is `None`.
///
/// A single emitted step comes back as a comment-annotated bare statement.
/// Two or more become one `WITH` clause: every step but the last is a named
/// CTE (comma-separated, no trailing comma on the final definition) and the
/// last step is the un-wrapped trailing SQL. Each step body is preceded by
/// a comment line carrying its summary.
pub fn construct_cte_sql(steps: &[BreakdownStep], cutoff: Option<usize>) -> Result<String> {
    if steps.is_empty() {
        return Err(ServiceError::Validation("breakdown has no steps".into()));
    }
    if let Some(ix) = cutoff {
        if ix >= steps.len() {
            return Err(ServiceError::Validation(format!(
                "step index {ix} out of range 0..{}",
                steps.len()
            )));
        }
    }

    let emitted = match cutoff {
        Some(ix) => &steps[..=ix],
        None => steps,
    };

    if let [only] = emitted {
        return Ok(format!("-- {}\n{}", only.summary, only.sql));
    }

    let last = emitted.len() - 1;
    let mut out = String::from("WITH ");
    for (i, step) in emitted.iter().enumerate() {
        out.push('\n');
        out.push_str("-- ");
        out.push_str(&step.summary);
        out.push('\n');
        if i == last {
            out.push_str(&step.sql);
        } else {
            out.push_str(&step.cte_name);
            out.push_str(" AS (");
            out.push_str(&step.sql);
            out.push(')');
            if i < last - 1 {
                out.push(',');
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(name: &str, summary: &str, sql: &str) -> BreakdownStep {
        BreakdownStep {
            cte_name: name.into(),
            summary: summary.into(),
            sql: sql.into(),
        }
    }

    #[test]
    fn single_step_is_bare() {
        let steps = [step("a", "count rows", "SELECT COUNT(*) FROM t")];
        let sql = construct_cte_sql(&steps, None).unwrap();
        assert_eq!(sql, "-- count rows\nSELECT COUNT(*) FROM t");
        assert!(!sql.contains("WITH"));
    }

    #[test]
    fn multi_step_builds_with_clause() {
        let steps = [
            step("a", "first", "SELECT 1"),
            step("b", "second", "SELECT * FROM a"),
            step("c", "third", "SELECT * FROM b"),
        ];
        let sql = construct_cte_sql(&steps, None).unwrap();
        assert!(sql.starts_with("WITH "));
        assert!(sql.contains("a AS (SELECT 1),"));
        // no comma on the second-to-last definition
        assert!(sql.contains("b AS (SELECT * FROM a)\n"));
        assert!(sql.ends_with("SELECT * FROM b"));
        assert!(sql.contains("-- first"));
        assert!(sql.contains("-- second"));
        assert!(sql.contains("-- third"));
    }

    #[test]
    fn cutoff_truncates() {
        let steps = [
            step("a", "first", "SELECT 1"),
            step("b", "second", "SELECT 2"),
            step("c", "third", "SELECT 3"),
        ];
        let sql = construct_cte_sql(&steps, Some(1)).unwrap();
        assert!(sql.starts_with("WITH "));
        assert!(sql.contains("a AS (SELECT 1)"));
        assert!(sql.ends_with("SELECT 2"));
        assert!(!sql.contains("SELECT 3"));

        // cutoff 0 emits a single bare step
        let sql = construct_cte_sql(&steps, Some(0)).unwrap();
        assert_eq!(sql, "-- first\nSELECT 1");
    }

    #[test]
    fn out_of_range_cutoff_is_rejected() {
        let steps = [step("a", "first", "SELECT 1")];
        assert!(matches!(
            construct_cte_sql(&steps, Some(1)),
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            construct_cte_sql(&[], None),
            Err(ServiceError::Validation(_))
        ));
    }
}
