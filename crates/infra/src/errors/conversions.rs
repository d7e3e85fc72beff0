//! Conversions from external infrastructure errors into domain errors.

use dexsync_domain::DexError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub DexError);

impl From<InfraError> for DexError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<DexError> for InfraError {
    fn from(value: DexError) -> Self {
        InfraError(value)
    }
}

impl From<SqlError> for InfraError {
    fn from(err: SqlError) -> Self {
        use rusqlite::ffi::ErrorCode;

        let mapped = match err {
            SqlError::SqliteFailure(code, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match code.code {
                    ErrorCode::DatabaseBusy => DexError::Database("database is busy".into()),
                    ErrorCode::DatabaseLocked => DexError::Database("database is locked".into()),
                    ErrorCode::ConstraintViolation => {
                        DexError::Database(format!("constraint violation: {message}"))
                    }
                    _ => DexError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        code.code, code.extended_code, message
                    )),
                }
            }
            SqlError::QueryReturnedNoRows => {
                DexError::NotFound("no rows returned by query".into())
            }
            SqlError::FromSqlConversionFailure(_, _, cause) => {
                DexError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            SqlError::InvalidColumnType(_, _, ty) => {
                DexError::Database(format!("invalid column type: {ty}"))
            }
            other => DexError::Database(other.to_string()),
        };
        InfraError(mapped)
    }
}

impl From<r2d2::Error> for InfraError {
    fn from(err: r2d2::Error) -> Self {
        InfraError(DexError::Database(format!("connection pool error: {err}")))
    }
}

impl From<HttpError> for InfraError {
    fn from(err: HttpError) -> Self {
        let mapped = if err.is_timeout() {
            DexError::Network(format!("http request timed out: {err}"))
        } else if err.is_connect() {
            DexError::Network(format!("http connection failed: {err}"))
        } else if let Some(status) = err.status() {
            DexError::Upstream(status.as_u16())
        } else {
            DexError::Network(format!("http error: {err}"))
        };
        InfraError(mapped)
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(err: serde_json::Error) -> Self {
        InfraError(DexError::MalformedPayload(err.to_string()))
    }
}

impl From<tokio::task::JoinError> for InfraError {
    fn from(err: tokio::task::JoinError) -> Self {
        InfraError(DexError::Internal(format!("blocking task failed: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_rows_maps_to_not_found() {
        let err: InfraError = SqlError::QueryReturnedNoRows.into();
        assert!(matches!(DexError::from(err), DexError::NotFound(_)));
    }

    #[test]
    fn json_errors_map_to_malformed_payload() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: InfraError = parse_err.into();
        assert!(matches!(DexError::from(err), DexError::MalformedPayload(_)));
    }
}
