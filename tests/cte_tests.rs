//! Properties of the breakdown-to-SQL assembly.

use genbid::ai::types::BreakdownStep;
use genbid::asking::cte::construct_cte_sql;
use genbid::error::ServiceError;

fn steps(n: usize) -> Vec<BreakdownStep> {
    (0..n)
        .map(|i| BreakdownStep {
            cte_name: format!("step_{i}"),
            summary: format!("summary {i}"),
            sql: format!("SELECT {i}"),
        })
        .collect()
}

#[test]
fn single_step_lists_are_bare_statements() {
    let s = steps(1);
    let sql = construct_cte_sql(&s, None).unwrap();
    assert_eq!(sql, "-- summary 0\nSELECT 0");
}

#[test]
fn multi_step_lists_emit_one_with_clause() {
    for len in 2..6 {
        let s = steps(len);
        for cutoff in [None, Some(len - 1)] {
            let sql = construct_cte_sql(&s, cutoff).unwrap();
            assert!(sql.starts_with("WITH "), "len={len} cutoff={cutoff:?}");
            assert_eq!(sql.matches("WITH ").count(), 1);
            // every step body present, each with its summary comment
            for i in 0..len {
                assert!(sql.contains(&format!("-- summary {i}")));
                assert!(sql.contains(&format!("SELECT {i}")));
            }
            // commas on all but the final two emitted steps
            let expected_commas = len.saturating_sub(2);
            assert_eq!(
                sql.matches("),").count(),
                expected_commas,
                "len={len} cutoff={cutoff:?}"
            );
            // final step is un-wrapped trailing SQL
            assert!(sql.ends_with(&format!("SELECT {}", len - 1)));
        }
    }
}

#[test]
fn cutoff_bounds_the_emitted_steps() {
    let s = steps(4);
    let sql = construct_cte_sql(&s, Some(2)).unwrap();
    assert!(sql.contains("SELECT 2"));
    assert!(!sql.contains("SELECT 3"));
    // cutoff+1 bodies
    assert_eq!(sql.matches("SELECT ").count(), 3);
}

#[test]
fn invalid_cutoffs_are_validation_errors() {
    let s = steps(3);
    assert!(matches!(
        construct_cte_sql(&s, Some(3)),
        Err(ServiceError::Validation(_))
    ));
    assert!(matches!(
        construct_cte_sql(&s, Some(usize::MAX)),
        Err(ServiceError::Validation(_))
    ));
}
