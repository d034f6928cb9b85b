//! Error types for the postloop core library.
//!
//! Each module has its own error enum to provide clear error boundaries.
//! The library uses `thiserror` for structured, typed errors.

/// Errors related to configuration loading, parsing, and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required configuration field is absent.
    #[error("missing required config field: {field}")]
    MissingField {
        /// The name of the missing field.
        field: String,
    },

    /// A configuration field has an unacceptable value.
    #[error("invalid value for config field '{field}': {message}")]
    InvalidValue {
        /// The name of the invalid field.
        field: String,
        /// A description of why the value is invalid.
        message: String,
    },

    /// The configuration file does not exist at the specified path.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// The path that was searched.
        path: String,
    },

    /// TOML deserialization failed.
    #[error("failed to parse config file: {source}")]
    ParseError {
        /// The underlying TOML parse error.
        #[source]
        source: toml::de::Error,
    },
}

/// Errors from the candidate queue state machine.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// A candidate with this `tweet_id` already exists in pending or processed.
    #[error("candidate {tweet_id} already present in the queue")]
    Duplicate {
        /// The duplicated tweet id.
        tweet_id: String,
    },

    /// The requested candidate does not exist in pending.
    #[error("candidate {tweet_id} not found in pending queue")]
    NotFound {
        /// The missing tweet id.
        tweet_id: String,
    },

    /// The candidate is not eligible for the requested transition.
    #[error("candidate {tweet_id} cannot transition from {from} to {to}")]
    InvalidTransition {
        /// The tweet id being transitioned.
        tweet_id: String,
        /// The current status.
        from: String,
        /// The attempted target status.
        to: String,
    },

    /// Posting preconditions (I5) were not satisfied.
    #[error("candidate {tweet_id} is not postable: {reason}")]
    NotPostable {
        /// The tweet id.
        tweet_id: String,
        /// Why the record cannot be posted yet.
        reason: String,
    },

    /// Underlying file I/O failed.
    #[error("queue store I/O error at {path}: {source}")]
    Io {
        /// The file path involved.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The store file (and its backup) could not be parsed as valid JSON.
    #[error("queue store at {path} is corrupt: {source}")]
    Corrupt {
        /// The file path involved.
        path: String,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Errors from the Tweet Normalizer.
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    /// The input did not parse as a recognized tweet URL.
    #[error("not a recognized tweet URL: {url}")]
    InvalidSource {
        /// The URL that failed to parse.
        url: String,
    },

    /// A search-API payload was missing a required field under every known shape.
    #[error("candidate payload missing required field: {field}")]
    MissingField {
        /// The field that could not be mapped from any known payload shape.
        field: String,
    },
}

/// Errors from the safety gate.
#[derive(Debug, thiserror::Error)]
pub enum SafetyError {
    /// The candidate text could not be evaluated (e.g. empty input).
    #[error("cannot evaluate safety of empty text")]
    EmptyText,

    /// The configured NG-word category file could not be loaded.
    #[error("failed to load NG-word category '{category}': {message}")]
    CategoryLoadFailed {
        /// The category name.
        category: String,
        /// Details about the failure.
        message: String,
    },
}

/// Errors from the generation orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The underlying LLM call failed even after retries.
    #[error("generation failed: {0}")]
    Llm(#[from] LlmError),

    /// No enabled templates remain for selection.
    #[error("no enabled templates available for generation")]
    NoTemplatesAvailable,

    /// The candidate failed safety/score gating after all retries.
    #[error("generated text for {tweet_id} failed quality gating after {attempts} attempts")]
    QualityGateExhausted {
        /// The candidate's tweet id.
        tweet_id: String,
        /// How many attempts were made.
        attempts: u32,
    },

    /// The template referenced by id does not exist on disk.
    #[error("template '{template_id}' not found")]
    TemplateNotFound {
        /// The requested template id.
        template_id: String,
    },

    /// Reading or writing the orchestrator's daily bookkeeping state failed.
    #[error("orchestrator state I/O failed: {0}")]
    StateIo(#[from] QueueError),

    /// Listing or reading the templates directory failed.
    #[error("templates directory I/O failed: {0}")]
    TemplatesDirIo(#[from] std::io::Error),
}

/// Errors from the posting backend (OAuth1 tweet-create RPC).
#[derive(Debug, thiserror::Error)]
pub enum PostingError {
    /// Posting backend returned HTTP 429.
    #[error("posting backend rate limited{}", match .retry_after {
        Some(secs) => format!(", retry after {secs}s"),
        None => String::new(),
    })]
    RateLimited {
        /// Seconds to wait before retrying, if provided by the API.
        retry_after: Option<u64>,
    },

    /// OAuth1 credentials are missing or invalid.
    #[error("posting backend authentication failed: {message}")]
    AuthFailed {
        /// Details about the authentication failure.
        message: String,
    },

    /// The target tweet cannot be quoted (deleted, protected, or restricted).
    #[error("cannot quote tweet {tweet_id}: {message}")]
    QuoteRejected {
        /// The tweet id that could not be quoted.
        tweet_id: String,
        /// Details from the API.
        message: String,
    },

    /// A Cloudflare-flavored HTML error page was returned instead of JSON.
    #[error("posting backend returned a non-JSON challenge page (status {status})")]
    ChallengePage {
        /// The HTTP status code.
        status: u16,
    },

    /// Network-level failure communicating with the posting backend.
    #[error("posting backend network error: {source}")]
    Network {
        /// The underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },

    /// Any other posting-backend error response.
    #[error("posting backend error (HTTP {status}): {message}")]
    Api {
        /// The HTTP status code.
        status: u16,
        /// The error message from the API.
        message: String,
    },
}

impl From<reqwest::Error> for PostingError {
    fn from(source: reqwest::Error) -> Self {
        Self::Network { source }
    }
}

/// Errors from the remote control-plane store.
#[derive(Debug, thiserror::Error)]
pub enum RemoteStoreError {
    /// The remote store is not configured (no credentials present).
    #[error("remote store not configured")]
    NotConfigured,

    /// Network/transport failure talking to the remote store.
    #[error("remote store network error: {source}")]
    Network {
        /// The underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },

    /// The remote store returned malformed data.
    #[error("remote store returned malformed data: {message}")]
    MalformedResponse {
        /// Details about the parse failure.
        message: String,
    },

    /// The remote store rejected the request (auth, permission, quota).
    #[error("remote store rejected request (HTTP {status}): {message}")]
    Rejected {
        /// The HTTP status code.
        status: u16,
        /// The error message from the store.
        message: String,
    },

    /// An operation-request subprocess exceeded its timeout.
    #[error("operation request '{command}' timed out after {seconds}s")]
    OperationTimeout {
        /// The command that timed out.
        command: String,
        /// The timeout in seconds.
        seconds: u64,
    },

    /// Applying a pulled decision or preference edit to local state failed.
    #[error("applying remote state locally failed: {0}")]
    LocalApply(#[from] QueueError),

    /// Spawning or waiting on an operation-request subprocess failed.
    #[error("operation request subprocess I/O failed: {0}")]
    SubprocessIo(#[from] std::io::Error),
}

impl From<reqwest::Error> for RemoteStoreError {
    fn from(source: reqwest::Error) -> Self {
        Self::Network { source }
    }
}

/// Errors from interacting with LLM providers (Anthropic and compatible).
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// HTTP request to the LLM endpoint failed.
    #[error("LLM HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// LLM API returned an error response.
    #[error("LLM API error (status {status}): {message}")]
    Api {
        /// The HTTP status code.
        status: u16,
        /// The error message from the API.
        message: String,
    },

    /// LLM provider rate limit hit.
    #[error("LLM rate limited, retry after {retry_after_secs} seconds")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// LLM response could not be parsed.
    #[error("failed to parse LLM response: {0}")]
    Parse(String),

    /// No LLM provider configured.
    #[error("no LLM provider configured")]
    NotConfigured,

    /// Content generation failed after retries.
    #[error("content generation failed: {0}")]
    GenerationFailed(String),
}

/// Errors from the Google Sheets mirror.
#[derive(Debug, thiserror::Error)]
pub enum SheetsError {
    /// Sheets access is not configured (no spreadsheet id or credentials).
    #[error("sheets mirror not configured")]
    NotConfigured,

    /// Network/transport failure talking to the Sheets API.
    #[error("sheets API network error: {source}")]
    Network {
        /// The underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },

    /// The configured spreadsheet or tab could not be found.
    #[error("sheet tab '{tab}' not found in spreadsheet {spreadsheet_id}")]
    TabNotFound {
        /// The spreadsheet id.
        spreadsheet_id: String,
        /// The missing tab name.
        tab: String,
    },

    /// A row in the sheet could not be parsed into the expected shape.
    #[error("malformed row {row} in tab '{tab}': {message}")]
    MalformedRow {
        /// The tab name.
        tab: String,
        /// The 1-based row number.
        row: u32,
        /// Details about the parse failure.
        message: String,
    },
}

impl From<reqwest::Error> for SheetsError {
    fn from(source: reqwest::Error) -> Self {
        Self::Network { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_missing_field_message() {
        let err = ConfigError::MissingField {
            field: "preferences.weekly_focus".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "missing required config field: preferences.weekly_focus"
        );
    }

    #[test]
    fn config_error_invalid_value_message() {
        let err = ConfigError::InvalidValue {
            field: "llm.provider".to_string(),
            message: "must be anthropic".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid value for config field 'llm.provider': must be anthropic"
        );
    }

    #[test]
    fn config_error_file_not_found_message() {
        let err = ConfigError::FileNotFound {
            path: "/home/user/.postloop/config.toml".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "config file not found: /home/user/.postloop/config.toml"
        );
    }

    #[test]
    fn queue_error_duplicate_message() {
        let err = QueueError::Duplicate {
            tweet_id: "123".to_string(),
        };
        assert_eq!(err.to_string(), "candidate 123 already present in the queue");
    }

    #[test]
    fn queue_error_invalid_transition_message() {
        let err = QueueError::InvalidTransition {
            tweet_id: "123".to_string(),
            from: "posted".to_string(),
            to: "pending".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "candidate 123 cannot transition from posted to pending"
        );
    }

    #[test]
    fn generation_error_quality_gate_exhausted_message() {
        let err = GenerationError::QualityGateExhausted {
            tweet_id: "123".to_string(),
            attempts: 3,
        };
        assert_eq!(
            err.to_string(),
            "generated text for 123 failed quality gating after 3 attempts"
        );
    }

    #[test]
    fn posting_error_rate_limited_with_retry() {
        let err = PostingError::RateLimited {
            retry_after: Some(30),
        };
        assert_eq!(
            err.to_string(),
            "posting backend rate limited, retry after 30s"
        );
    }

    #[test]
    fn posting_error_rate_limited_without_retry() {
        let err = PostingError::RateLimited { retry_after: None };
        assert_eq!(err.to_string(), "posting backend rate limited");
    }

    #[test]
    fn posting_error_quote_rejected_message() {
        let err = PostingError::QuoteRejected {
            tweet_id: "456".to_string(),
            message: "tweet is protected".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "cannot quote tweet 456: tweet is protected"
        );
    }

    #[test]
    fn llm_error_not_configured_message() {
        let err = LlmError::NotConfigured;
        assert_eq!(err.to_string(), "no LLM provider configured");
    }

    #[test]
    fn llm_error_rate_limited_message() {
        let err = LlmError::RateLimited {
            retry_after_secs: 30,
        };
        assert_eq!(err.to_string(), "LLM rate limited, retry after 30 seconds");
    }

    #[test]
    fn remote_store_error_operation_timeout_message() {
        let err = RemoteStoreError::OperationTimeout {
            command: "collect".to_string(),
            seconds: 300,
        };
        assert_eq!(
            err.to_string(),
            "operation request 'collect' timed out after 300s"
        );
    }

    #[test]
    fn sheets_error_tab_not_found_message() {
        let err = SheetsError::TabNotFound {
            spreadsheet_id: "sheet123".to_string(),
            tab: "Queue".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "sheet tab 'Queue' not found in spreadsheet sheet123"
        );
    }
}
