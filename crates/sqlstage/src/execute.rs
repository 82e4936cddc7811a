//! Helpers around the `QueryExecutor` collaborator.

use sqlstage_core::{Cursor, Error, QueryExecutor, Result};

use crate::config::QueryFailurePolicy;

/// Run `statement` and build a result from its rows.
///
/// A `Query` error from the executor yields `default` under
/// [`QueryFailurePolicy::UseDefault`]. Every other error, including errors raised by
/// `handler`, is returned unchanged.
pub fn query_or_default<R>(
    executor: &dyn QueryExecutor,
    statement: &str,
    default: R,
    policy: QueryFailurePolicy,
    mut handler: impl FnMut(&mut dyn Cursor) -> Result<R>,
) -> Result<R> {
    let mut produced = None;
    let outcome = executor.execute_query(statement, &mut |cursor: &mut dyn Cursor| -> Result<()> {
        produced = Some(handler(cursor)?);
        Ok(())
    });

    match outcome {
        Ok(()) => Ok(produced.unwrap_or(default)),
        Err(Error::Query(err)) if policy == QueryFailurePolicy::UseDefault => {
            tracing::warn!(sql = %statement, error = %err, "Query failed; using default result");
            Ok(default)
        }
        Err(err) => Err(err),
    }
}

/// Run statements in order, returning the total affected row count.
///
/// Stops at the first failure.
pub fn run_updates(executor: &dyn QueryExecutor, statements: &[String]) -> Result<u64> {
    let mut affected = 0;
    for statement in statements {
        tracing::trace!(sql = %statement, "Executing statement");
        affected += executor.execute_update(statement)?;
    }
    Ok(affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlstage_core::{QueryError, Row, RowCursor, Value};
    use std::cell::RefCell;

    struct FixedExecutor {
        rows: Vec<Row>,
        fail: bool,
        updates: RefCell<Vec<String>>,
    }

    impl QueryExecutor for FixedExecutor {
        fn execute_query(
            &self,
            statement: &str,
            handler: &mut dyn FnMut(&mut dyn Cursor) -> Result<()>,
        ) -> Result<()> {
            if self.fail {
                return Err(QueryError::new("no such table").with_sql(statement).into());
            }
            let mut cursor = RowCursor::new(&self.rows);
            handler(&mut cursor)
        }

        fn execute_update(&self, statement: &str) -> Result<u64> {
            self.updates.borrow_mut().push(statement.to_string());
            Ok(1)
        }
    }

    fn executor(fail: bool) -> FixedExecutor {
        FixedExecutor {
            rows: vec![
                Row::from_pairs([("n", Value::Int(1))]),
                Row::from_pairs([("n", Value::Int(2))]),
            ],
            fail,
            updates: RefCell::new(Vec::new()),
        }
    }

    fn count_rows(cursor: &mut dyn Cursor) -> Result<usize> {
        let mut count = 0;
        while cursor.next()? {
            count += 1;
        }
        Ok(count)
    }

    #[test]
    fn test_rows_reach_handler() {
        let count = query_or_default(
            &executor(false),
            "SELECT * FROM t;",
            0,
            QueryFailurePolicy::Propagate,
            count_rows,
        )
        .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_query_failure_policies() {
        let count = query_or_default(
            &executor(true),
            "SELECT * FROM t;",
            0,
            QueryFailurePolicy::UseDefault,
            count_rows,
        )
        .unwrap();
        assert_eq!(count, 0);

        let err = query_or_default(
            &executor(true),
            "SELECT * FROM t;",
            0,
            QueryFailurePolicy::Propagate,
            count_rows,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Query(_)));
    }

    #[test]
    fn test_handler_errors_are_never_replaced() {
        let err = query_or_default(
            &executor(false),
            "SELECT * FROM t;",
            0,
            QueryFailurePolicy::UseDefault,
            |_| Err::<usize, _>(Error::stage_not_found("demo::Color")),
        )
        .unwrap_err();
        assert!(err.is_stage_error());
    }

    #[test]
    fn test_run_updates_in_order() {
        let executor = executor(false);
        let statements = vec!["A;".to_string(), "B;".to_string()];
        assert_eq!(run_updates(&executor, &statements).unwrap(), 2);
        assert_eq!(*executor.updates.borrow(), statements);
    }
}
