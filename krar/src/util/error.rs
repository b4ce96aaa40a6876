/// Crate-wide error type. Variants line up with the error taxonomy: `Config` and
/// `Capability` are the only ones a caller should treat as fatal (non-zero exit);
/// everything else is meant to be caught and downgraded to a logged warning by the
/// component that produced it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("missing capability: {0}")]
    Capability(String),

    #[error("kubernetes API error: {source}")]
    Kube {
        #[from]
        source: kube::Error,
    },

    #[error("registry error: {0}")]
    Registry(String),

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

impl Error {
    /// True for the two error classes that §7 designates as fatal (pre-flight,
    /// non-recoverable) — everything else is recovered locally by its caller.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Config(_) | Error::Capability(_))
    }
}
