//! Sheets Mirror: an alternate, spreadsheet-based front end onto the Queue
//! Store and Preferences document, for operators who curate in a shared
//! spreadsheet rather than the dashboard.
//!
//! Never maintains its own copy of curation state — every read lands
//! through [`crate::queue::QueueStore`]/[`crate::preferences::PreferencesStore`]
//! the same way Control-Plane Sync's pull path does, so the two front ends
//! cannot drift into conflicting truths.

use serde_json::Value;

use crate::config::SheetsConfig;
use crate::error::{QueueError, SheetsError};
use crate::google_auth::GoogleAuthenticator;
use crate::normalize::{self, CandidateSource};
use crate::preferences::Preferences;
use crate::queue::QueueStore;
use crate::retry::{with_backoff, BackoffConfig};

const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const REQUEST_TIMEOUT_SECS: u64 = 30;

const QUEUE_TAB: &str = "Queue";
const SETTINGS_TAB: &str = "Settings";
const URLS_TAB: &str = "URLs";

const QUEUE_HEADER: &[&str] = &[
    "tweet_id",
    "author",
    "text",
    "status",
    "score",
    "matched_topics",
    "link",
    "edited",
];

/// One direction of `sync-queue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDirection {
    /// Push pending records to the sheet, overwriting rows for ids already present.
    ToSheet,
    /// Apply operator edits from the sheet, then clear their edit markers.
    FromSheet,
    /// [`SyncDirection::FromSheet`] then [`SyncDirection::ToSheet`].
    Full,
}

/// A thin client over the Google Sheets v4 `values` API, scoped to one
/// spreadsheet.
pub struct SheetsClient {
    client: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    authenticator: GoogleAuthenticator,
    backoff: BackoffConfig,
}

impl SheetsClient {
    /// Build a client from [`SheetsConfig`].
    ///
    /// Returns [`SheetsError::NotConfigured`] if `spreadsheet_id` is absent.
    pub fn new(config: &SheetsConfig) -> Result<Self, SheetsError> {
        let spreadsheet_id = config
            .spreadsheet_id
            .clone()
            .ok_or(SheetsError::NotConfigured)?;
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("sheets HTTP client must build");
        let authenticator =
            GoogleAuthenticator::new(client.clone(), config.credential.clone(), SHEETS_SCOPE);
        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            spreadsheet_id,
            authenticator,
            backoff: BackoffConfig::default(),
        })
    }

    /// Read every row of `tab` as raw string cells (header included).
    pub async fn get_values(&self, tab: &str) -> Result<Vec<Vec<String>>, SheetsError> {
        let token = self.authenticator.access_token().await.map_err(auth_failure)?;
        let url = format!("{}/{}/values/{}", self.base_url, self.spreadsheet_id, tab);
        let send = || async {
            self.client
                .get(&url)
                .bearer_auth(&token)
                .send()
                .await?
                .error_for_status()
        };
        let response = with_backoff(self.backoff, "sheets.get_values", send).await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(SheetsError::TabNotFound {
                spreadsheet_id: self.spreadsheet_id.clone(),
                tab: tab.to_string(),
            });
        }
        let body: Value = response.json().await?;
        let rows = body
            .get("values")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(rows
            .into_iter()
            .map(|row| {
                row.as_array()
                    .map(|cells| {
                        cells
                            .iter()
                            .map(|c| c.as_str().unwrap_or_default().to_string())
                            .collect()
                    })
                    .unwrap_or_default()
            })
            .collect())
    }

    /// Overwrite `tab` starting at `A1` with `rows` (header included).
    pub async fn update_values(
        &self,
        tab: &str,
        rows: &[Vec<String>],
    ) -> Result<(), SheetsError> {
        let token = self.authenticator.access_token().await.map_err(auth_failure)?;
        let url = format!(
            "{}/{}/values/{}!A1?valueInputOption=RAW",
            self.base_url, self.spreadsheet_id, tab
        );
        let body = serde_json::json!({ "values": rows });
        let send = || async {
            self.client
                .put(&url)
                .bearer_auth(&token)
                .json(&body)
                .send()
                .await?
                .error_for_status()
        };
        with_backoff(self.backoff, "sheets.update_values", send).await?;
        Ok(())
    }

    /// Append `row` after the last populated row of `tab`.
    pub async fn append_row(&self, tab: &str, row: &[String]) -> Result<(), SheetsError> {
        let token = self.authenticator.access_token().await.map_err(auth_failure)?;
        let url = format!(
            "{}/{}/values/{}!A1:append?valueInputOption=RAW",
            self.base_url, self.spreadsheet_id, tab
        );
        let body = serde_json::json!({ "values": [row] });
        let send = || async {
            self.client
                .post(&url)
                .bearer_auth(&token)
                .json(&body)
                .send()
                .await?
                .error_for_status()
        };
        with_backoff(self.backoff, "sheets.append_row", send).await?;
        Ok(())
    }

    /// Read the header row of `tab`; write [`QUEUE_HEADER`] if it's empty,
    /// used by `setup-sheets` to bootstrap a fresh spreadsheet.
    pub async fn ensure_header(&self, tab: &str, header: &[&str]) -> Result<(), SheetsError> {
        let existing = self.get_values(tab).await.or_else(|e| match e {
            SheetsError::TabNotFound { .. } => Ok(Vec::new()),
            other => Err(other),
        })?;
        if existing.is_empty() {
            let row: Vec<String> = header.iter().map(|s| s.to_string()).collect();
            self.update_values(tab, &[row]).await?;
        }
        Ok(())
    }

    /// Push every pending/approved record to the `Queue` tab, replacing rows
    /// for tweet ids already present and appending new ones. Never touches
    /// `processed` records.
    pub async fn sync_queue_to_sheet(&self, store: &QueueStore) -> Result<(), SheetsError> {
        let records = store.list_pending().map_err(queue_to_sheets)?;
        let mut rows = vec![QUEUE_HEADER.iter().map(|s| s.to_string()).collect::<Vec<_>>()];
        for record in records {
            rows.push(vec![
                record.tweet_id.clone(),
                record.author_username.clone(),
                record.text.clone(),
                record.status.to_string(),
                record
                    .score
                    .as_ref()
                    .map(|s| s.total.to_string())
                    .unwrap_or_default(),
                record.matched_topics.join(";"),
                record.source_url.clone(),
                String::new(),
            ]);
        }
        self.update_values(QUEUE_TAB, &rows).await
    }

    /// Apply operator edits from the `Queue` tab: rows whose `status` cell
    /// reads `approved`/`skipped` and whose `edited` marker is set are
    /// applied through the Queue Store (I3 semantics, feedback-log side
    /// effect included), then the marker is cleared.
    pub async fn sync_queue_from_sheet(&self, store: &QueueStore) -> Result<usize, SheetsError> {
        let rows = self.get_values(QUEUE_TAB).await?;
        let mut applied = 0usize;
        let mut out_rows = Vec::with_capacity(rows.len());
        for (idx, row) in rows.into_iter().enumerate() {
            if idx == 0 {
                out_rows.push(row);
                continue;
            }
            let tweet_id = row.first().cloned().unwrap_or_default();
            let status = row.get(3).map(String::as_str).unwrap_or_default();
            let edited = row.get(7).map(String::as_str).unwrap_or_default() == "1";
            if edited && !tweet_id.is_empty() {
                match status {
                    "approved" => {
                        store.approve(&tweet_id).map_err(queue_to_sheets)?;
                        applied += 1;
                    }
                    "skipped" => {
                        store
                            .skip(&tweet_id, Some("sheet edit".to_string()), None)
                            .map_err(queue_to_sheets)?;
                        applied += 1;
                    }
                    _ => {}
                }
            }
            let mut cleared = row;
            if cleared.len() > 7 {
                cleared[7] = String::new();
            }
            out_rows.push(cleared);
        }
        if applied > 0 {
            self.update_values(QUEUE_TAB, &out_rows).await?;
        }
        Ok(applied)
    }

    /// `from_sheet` then `to_sheet`, so operator edits land before the
    /// refreshed snapshot overwrites the tab.
    pub async fn sync_queue_full(&self, store: &QueueStore) -> Result<usize, SheetsError> {
        let applied = self.sync_queue_from_sheet(store).await?;
        self.sync_queue_to_sheet(store).await?;
        Ok(applied)
    }

    /// Run [`SyncDirection`] against `store`.
    pub async fn sync_queue(
        &self,
        store: &QueueStore,
        direction: SyncDirection,
    ) -> Result<usize, SheetsError> {
        match direction {
            SyncDirection::ToSheet => {
                self.sync_queue_to_sheet(store).await?;
                Ok(0)
            }
            SyncDirection::FromSheet => self.sync_queue_from_sheet(store).await,
            SyncDirection::Full => self.sync_queue_full(store).await,
        }
    }

    /// Read the `URLs` tab; normalize and add each un-imported row to the
    /// Queue Store, marking it imported. With `auto_approve`, transition
    /// newly-added records to `approved` immediately.
    pub async fn import_urls(
        &self,
        store: &QueueStore,
        auto_approve: bool,
    ) -> Result<usize, SheetsError> {
        let rows = self.get_values(URLS_TAB).await?;
        let mut imported = 0usize;
        let mut out_rows = Vec::with_capacity(rows.len());
        for (idx, row) in rows.into_iter().enumerate() {
            if idx == 0 {
                out_rows.push(row);
                continue;
            }
            let url = row.first().cloned().unwrap_or_default();
            let memo = row.get(1).cloned().filter(|s| !s.is_empty());
            let already_imported = row.get(2).map(String::as_str).unwrap_or_default() == "imported";
            if !url.is_empty() && !already_imported {
                let record = normalize::normalize(CandidateSource::Url {
                    url: url.clone(),
                    memo,
                })
                .map_err(|e| SheetsError::MalformedRow {
                    tab: URLS_TAB.to_string(),
                    row: idx as u32 + 1,
                    message: e.to_string(),
                })?;
                let tweet_id = record.tweet_id.clone();
                let added = store.add(record).map_err(queue_to_sheets)?;
                if added {
                    imported += 1;
                    if auto_approve {
                        store.approve(&tweet_id).map_err(queue_to_sheets)?;
                    }
                }
            }
            let mut marked = row;
            while marked.len() < 3 {
                marked.push(String::new());
            }
            marked[2] = "imported".to_string();
            out_rows.push(marked);
        }
        if imported > 0 {
            self.update_values(URLS_TAB, &out_rows).await?;
        }
        Ok(imported)
    }

    /// Mirror the human-editable `Preferences` fields to the `Settings` tab:
    /// one `(field, value)` row per setting, CSV-joined for list fields.
    pub async fn sync_settings_to_sheet(
        &self,
        preferences: &Preferences,
    ) -> Result<(), SheetsError> {
        let rows = vec![
            vec!["field".to_string(), "value".to_string()],
            vec![
                "topic_preferences.preferred".to_string(),
                preferences.topic_preferences.preferred.join(","),
            ],
            vec![
                "topic_preferences.avoid".to_string(),
                preferences.topic_preferences.avoid.join(","),
            ],
            vec![
                "keyword_weights".to_string(),
                preferences
                    .keyword_weights
                    .iter()
                    .map(|(k, v)| format!("{k}:{v}"))
                    .collect::<Vec<_>>()
                    .join(","),
            ],
            vec![
                "prompt_overrides.custom_directive".to_string(),
                preferences
                    .prompt_overrides
                    .custom_directive
                    .clone()
                    .unwrap_or_default(),
            ],
        ];
        self.update_values(SETTINGS_TAB, &rows).await
    }

    /// Parse the `Settings` tab back onto `preferences`, using the same
    /// CSV-split rules as the remote-store preference pull. Unknown field
    /// rows are ignored.
    pub async fn sync_settings_from_sheet(
        &self,
        preferences: &mut Preferences,
    ) -> Result<(), SheetsError> {
        let rows = self.get_values(SETTINGS_TAB).await?;
        for row in rows.into_iter().skip(1) {
            let field = row.first().map(String::as_str).unwrap_or_default();
            let value = row.get(1).map(String::as_str).unwrap_or_default();
            match field {
                "topic_preferences.preferred" => {
                    preferences.topic_preferences.preferred = split_csv(value);
                }
                "topic_preferences.avoid" => {
                    preferences.topic_preferences.avoid = split_csv(value);
                }
                "keyword_weights" => {
                    preferences.keyword_weights = value
                        .split(',')
                        .filter(|s| !s.trim().is_empty())
                        .filter_map(|pair| {
                            let (k, v) = pair.split_once(':')?;
                            Some((k.trim().to_string(), v.trim().parse::<f64>().ok()?))
                        })
                        .collect();
                }
                "prompt_overrides.custom_directive" => {
                    preferences.prompt_overrides.custom_directive =
                        (!value.is_empty()).then(|| value.to_string());
                }
                _ => {}
            }
        }
        Ok(())
    }
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn queue_to_sheets(err: QueueError) -> SheetsError {
    SheetsError::MalformedRow {
        tab: QUEUE_TAB.to_string(),
        row: 0,
        message: err.to_string(),
    }
}

fn auth_failure(err: crate::google_auth::GoogleAuthFailure) -> SheetsError {
    SheetsError::MalformedRow {
        tab: "auth".to_string(),
        row: 0,
        message: err.to_string(),
    }
}
