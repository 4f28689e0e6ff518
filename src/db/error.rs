use std::time::Duration;

use thiserror::Error;

/// Failure talking to one of the two databases.
///
/// `store` names the database involved (`"tank DB"` or `"user DB"`).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not connect to {store}")]
    Connect {
        store: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("connecting to {store} timed out after {}s", timeout.as_secs())]
    ConnectTimeout {
        store: &'static str,
        timeout: Duration,
    },

    #[error("query against {store} failed")]
    Query {
        store: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("unexpected data from {store}: {detail}")]
    DataShape { store: &'static str, detail: String },
}

impl StoreError {
    /// Classify an error raised while running a statement.
    ///
    /// Decoding problems mean the rows did not have the expected shape;
    /// everything else is treated as a failing query.
    pub fn from_query(store: &'static str, source: sqlx::Error) -> Self {
        match source {
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::Decode(_)
            | sqlx::Error::TypeNotFound { .. } => Self::DataShape {
                store,
                detail: source.to_string(),
            },
            other => Self::Query {
                store,
                source: other,
            },
        }
    }
}
