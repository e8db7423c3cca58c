//! Sequential document numbers (`VNT-000001`, `FAC-00000001`, ...).
//!
//! The latest number in a family is the greatest identifier string in
//! descending order; the next one parses the suffix after the last `-` and
//! adds one. Concurrent writers can race to the same number, so inserts go
//! through [`with_number_retry`], which retries the whole attempt when the
//! unique constraint on the number column fires.

use std::future::Future;

use sea_orm::SqlErr;
use tracing::warn;

use crate::errors::ServiceError;

pub const SALE_PREFIX: &str = "VNT";
pub const QUOTE_PREFIX: &str = "DEV";
pub const SUPPLIER_TX_PREFIX: &str = "TRN";
pub const DELIVERY_PREFIX: &str = "BL";

/// Suffix width for sale/quote/supplier/delivery numbers.
pub const SHORT_WIDTH: usize = 6;
/// Suffix width for invoice and credit-note numbers.
pub const LONG_WIDTH: usize = 8;

const MAX_NUMBER_RETRIES: u32 = 3;

pub fn format_number(prefix: &str, width: usize, value: u64) -> String {
    format!("{}-{:0width$}", prefix, value, width = width)
}

/// Next identifier in a family given the latest existing one (string-descending
/// order). A fresh family starts at 1; an unparsable suffix also restarts the
/// sequence rather than failing the insert.
pub fn next_in_sequence(latest: Option<&str>, prefix: &str, width: usize) -> String {
    let next = latest
        .and_then(|n| n.rsplit('-').next())
        .and_then(|suffix| suffix.parse::<u64>().ok())
        .unwrap_or(0)
        + 1;
    format_number(prefix, width, next)
}

/// Runs a numbered-insert attempt, retrying on unique-constraint collision.
/// The closure must recompute the candidate number on every call.
pub async fn with_number_retry<T, F, Fut>(family: &str, op: F) -> Result<T, ServiceError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Err(ServiceError::DatabaseError(db_err))
                if matches!(db_err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
                    && attempt + 1 < MAX_NUMBER_RETRIES =>
            {
                attempt += 1;
                warn!(family, attempt, "document number collision, retrying");
            }
            Err(ServiceError::DatabaseError(db_err))
                if matches!(db_err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) =>
            {
                return Err(ServiceError::Conflict(format!(
                    "Could not allocate a unique {} number after {} attempts",
                    family, MAX_NUMBER_RETRIES
                )));
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
    use std::sync::atomic::{AtomicU32, Ordering};
    use test_case::test_case;

    async fn db_with_unique_column() -> DatabaseConnection {
        let mut options = ConnectOptions::new("sqlite::memory:");
        options.max_connections(1).min_connections(1);
        let db = Database::connect(options).await.unwrap();
        db.execute_unprepared("CREATE TABLE numbers (value TEXT NOT NULL UNIQUE)")
            .await
            .unwrap();
        db.execute_unprepared("INSERT INTO numbers (value) VALUES ('VNT-000001')")
            .await
            .unwrap();
        db
    }

    #[test_case(None, "VNT", SHORT_WIDTH => "VNT-000001"; "fresh sale family")]
    #[test_case(Some("VNT-000041"), "VNT", SHORT_WIDTH => "VNT-000042"; "increments sale")]
    #[test_case(Some("VNT-999999"), "VNT", SHORT_WIDTH => "VNT-1000000"; "overflows width")]
    #[test_case(None, "FAC", LONG_WIDTH => "FAC-00000001"; "fresh invoice family")]
    #[test_case(Some("FAV-00000009"), "FAV", LONG_WIDTH => "FAV-00000010"; "increments credit note")]
    #[test_case(Some("VNT-garbage"), "VNT", SHORT_WIDTH => "VNT-000001"; "unparsable suffix restarts")]
    fn next_number(latest: Option<&str>, prefix: &str, width: usize) -> String {
        next_in_sequence(latest, prefix, width)
    }

    #[tokio::test]
    async fn retry_gives_up_after_bounded_attempts() {
        let db = db_with_unique_column().await;
        let calls = AtomicU32::new(0);
        let db_ref = &db;
        let calls_ref = &calls;

        // Every attempt collides with the seeded row.
        let result: Result<(), ServiceError> = with_number_retry("VNT", move || async move {
            calls_ref.fetch_add(1, Ordering::SeqCst);
            db_ref
                .execute_unprepared("INSERT INTO numbers (value) VALUES ('VNT-000001')")
                .await?;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(ServiceError::Conflict(_))));
        assert_eq!(calls.load(Ordering::SeqCst), MAX_NUMBER_RETRIES);
    }

    #[tokio::test]
    async fn retry_recovers_when_a_later_attempt_lands() {
        let db = db_with_unique_column().await;
        let calls = AtomicU32::new(0);
        let db_ref = &db;
        let calls_ref = &calls;

        let result = with_number_retry("VNT", move || async move {
            let attempt = calls_ref.fetch_add(1, Ordering::SeqCst);
            let value = if attempt == 0 { "VNT-000001" } else { "VNT-000002" };
            db_ref
                .execute_unprepared(&format!("INSERT INTO numbers (value) VALUES ('{value}')"))
                .await?;
            Ok(value.to_string())
        })
        .await;

        assert_eq!(result.unwrap(), "VNT-000002");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn non_conflict_errors_pass_through() {
        let result: Result<(), ServiceError> = with_number_retry("DEV", || async {
            Err(ServiceError::NotFound("customer".to_string()))
        })
        .await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }
}
