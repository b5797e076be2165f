use esodb_types::ObjectId;

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The remote confirmed the object does not exist.
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    /// No stored identifier starts with the given prefix.
    #[error("no object matches prefix {0}")]
    PrefixNotFound(String),

    /// A prefix lookup matched more than one object.
    #[error("prefix {prefix} is ambiguous ({matches} or more matches)")]
    Ambiguous { prefix: String, matches: u64 },

    /// Prefix length is outside `1..=20` bytes.
    #[error("invalid prefix length: {len} bytes")]
    InvalidPrefix { len: usize },

    /// Network, timeout or DNS failure; no reply reached the caller.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote answered with an unexpected HTTP status.
    #[error("remote rejected request with status {status}: {reason}")]
    Remote { status: u16, reason: String },

    /// The remote answered with JSON that lacks or mistypes expected fields.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The declared object size does not match the decoded content length.
    #[error("size mismatch for {id}: declared {declared}, decoded {actual}")]
    SizeMismatch {
        id: ObjectId,
        declared: u64,
        actual: u64,
    },

    /// The identifier already stores different content.
    #[error("consistency violation: {0} already stores different content")]
    ConsistencyViolation(ObjectId),

    /// The remote index could not be confirmed or created.
    #[error("index provisioning failed: {0}")]
    Provisioning(String),

    /// Local encoding failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid or unreadable backend configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Returns `true` for the recoverable "object is absent" outcomes.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::PrefixNotFound(_))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
