use thiserror::Error;

/// Errors returned by the installer core.
///
/// Every I/O-facing operation hands one of these back to its caller; nothing
/// in the library terminates the process except [`crate::upgrade::SelfUpdater::relaunch`].
#[derive(Debug, Error)]
pub enum Error {
    /// Connection, DNS or TLS failure before a response arrived.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{url} returned non-OK status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("failed to decode release metadata: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A filesystem or process operation failed; `context` says which.
    #[error("{context}: {source}")]
    IoContext {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// The transfer ended with a different byte count than the server declared.
    #[error("unexpected end of input: Content-Length was {}, but only read {actual}", declared(.expected))]
    LengthMismatch { expected: Option<u64>, actual: u64 },

    /// An operation was invoked while its preconditions did not hold.
    #[error("{0}")]
    State(String),

    #[error("did not find a matching asset in release {0}")]
    NoMatchingAsset(String),
}

impl Error {
    pub(crate) fn state(msg: impl Into<String>) -> Self {
        Error::State(msg.into())
    }

    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::IoContext {
            context: context.into(),
            source,
        }
    }
}

fn declared(expected: &Option<u64>) -> String {
    match expected {
        Some(n) => n.to_string(),
        None => "missing".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;
