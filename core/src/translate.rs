//! Remote translation client with a per-run cache and a deterministic local
//! fallback.
//!
//! `translate` never fails to its caller: remote errors degrade to a
//! terminology-substitution pass, and if that changes nothing the text comes
//! back tagged with the target language name so untranslated strings stay
//! identifiable.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, SystemTime};

use regex::Regex;
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::config::{remote_lang_code, AppConfig, LocaleRegistry};
use crate::protector::Protector;

/// Internal failure classification; callers of [`TranslationClient::translate`]
/// never see this.
#[derive(Debug, thiserror::Error)]
enum TranslateError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited by translation service")]
    Throttled { retry_after: Option<Duration> },

    #[error("unusable response: {0}")]
    BadResponse(String),
}

/// Backoff parameters for throttled requests.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(15),
            max_retries: 2,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `previous_attempts + 1`, preferring a
    /// server-provided hint, else exponential backoff capped at `max_delay`.
    fn delay_for(&self, previous_attempts: u32, hint: Option<Duration>) -> Duration {
        if let Some(hint) = hint {
            return hint.min(self.max_delay);
        }
        let multiplier = 1u32.checked_shl(previous_attempts).unwrap_or(u32::MAX);
        self.base_delay
            .saturating_mul(multiplier)
            .min(self.max_delay)
    }
}

/// Parses an HTTP `Retry-After` header value (delta-seconds or HTTP-date).
fn parse_retry_after(value: &str, now: SystemTime) -> Option<Duration> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(seconds) = trimmed.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    if let Ok(instant) = httpdate::parse_http_date(trimmed) {
        return Some(instant.duration_since(now).unwrap_or(Duration::ZERO));
    }

    None
}

type CacheKey = (String, String, String);

/// Wraps the remote text-translation call. One instance (and its connection
/// pool) is reused for the whole run; the cache lives as long as the client.
pub struct TranslationClient {
    http: reqwest::Client,
    endpoint: String,
    retry: RetryPolicy,
    cache: HashMap<CacheKey, String>,
    glossaries: BTreeMap<String, Vec<(Regex, String)>>,
    locales: LocaleRegistry,
}

impl TranslationClient {
    pub fn new(config: &AppConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent("Mozilla/5.0")
            .build()?;

        Ok(Self {
            http,
            endpoint: config.translation_endpoint.clone(),
            retry: RetryPolicy::default(),
            cache: HashMap::new(),
            glossaries: compile_glossaries(&config.terminology),
            locales: config.locales.clone(),
        })
    }

    /// Translate one string from `source_locale` to `target_locale` (resource
    /// locale codes, e.g. `en_us` -> `zh_tw`). Infallible by contract.
    pub async fn translate(
        &mut self,
        text: &str,
        source_locale: &str,
        target_locale: &str,
    ) -> String {
        if text.trim().is_empty() {
            return text.to_string();
        }
        // Boolean literals pass through lowercased, never localized.
        if text.eq_ignore_ascii_case("true") {
            return "true".to_string();
        }
        if text.eq_ignore_ascii_case("false") {
            return "false".to_string();
        }

        let protected = Protector::mask(text);
        let key = (
            source_locale.to_string(),
            target_locale.to_string(),
            protected.masked_text().to_string(),
        );
        if let Some(cached) = self.cache.get(&key) {
            return protected.unmask(cached);
        }

        let source = remote_lang_code(source_locale);
        let target = remote_lang_code(target_locale);
        let mut previous_attempts = 0u32;
        loop {
            match self
                .request_remote(protected.masked_text(), &source, &target)
                .await
            {
                Ok(translated) => {
                    let translated = normalize_punctuation(&translated);
                    self.cache.insert(key, translated.clone());
                    return protected.unmask(&translated);
                }
                Err(TranslateError::Throttled { retry_after })
                    if previous_attempts < self.retry.max_retries =>
                {
                    let delay = self.retry.delay_for(previous_attempts, retry_after);
                    warn!(
                        delay_ms = delay.as_millis() as u64,
                        "translation service throttled, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    previous_attempts += 1;
                }
                Err(err) => {
                    warn!(error = %err, "remote translation failed, using fallback");
                    let fallback = self.fallback(protected.masked_text(), target_locale);
                    return protected.unmask(&fallback);
                }
            }
        }
    }

    async fn request_remote(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslateError> {
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", source),
                ("tl", target),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| parse_retry_after(value, SystemTime::now()));
            return Err(TranslateError::Throttled { retry_after });
        }
        if !status.is_success() {
            return Err(TranslateError::BadResponse(format!("HTTP {status}")));
        }

        let body: serde_json::Value = response.json().await?;
        let segments = body
            .get(0)
            .and_then(|v| v.as_array())
            .ok_or_else(|| TranslateError::BadResponse("missing segment array".to_string()))?;

        let mut result = String::new();
        for segment in segments {
            if let Some(piece) = segment.get(0).and_then(|v| v.as_str()) {
                result.push_str(piece);
            }
        }

        if result.is_empty() {
            return Err(TranslateError::BadResponse("empty translation".to_string()));
        }
        debug!(chars = result.len(), "remote translation ok");
        Ok(result)
    }

    /// Deterministic offline fallback: glossary substitution, else a visible
    /// tagged passthrough for text that still contains alphabetic content.
    fn fallback(&self, text: &str, target_locale: &str) -> String {
        let locale_key = target_locale.to_lowercase().replace('-', "_");

        let mut result = text.to_string();
        if let Some(glossary) = self.glossaries.get(&locale_key) {
            for (pattern, replacement) in glossary {
                result = pattern
                    .replace_all(&result, regex::NoExpand(replacement))
                    .into_owned();
            }
        }

        if result == text
            && locale_key != "en_us"
            && text.chars().any(|c| c.is_ascii_alphabetic())
        {
            return format!("[{}] {}", self.locales.display_name(&locale_key), text);
        }
        result
    }
}

/// Compile per-locale glossaries into whole-word, case-insensitive patterns,
/// longest key first so compound terms win over their parts.
fn compile_glossaries(
    terminology: &BTreeMap<String, BTreeMap<String, String>>,
) -> BTreeMap<String, Vec<(Regex, String)>> {
    let mut compiled = BTreeMap::new();
    for (locale, table) in terminology {
        let mut keys: Vec<&String> = table.keys().collect();
        keys.sort_by_key(|key| std::cmp::Reverse(key.len()));

        let mut patterns = Vec::with_capacity(keys.len());
        for key in keys {
            let pattern = format!(r"(?i)\b{}\b", regex::escape(key));
            match Regex::new(&pattern) {
                Ok(regex) => patterns.push((regex, table[key].clone())),
                Err(err) => warn!(term = %key, error = %err, "skipping glossary term"),
            }
        }
        compiled.insert(locale.clone(), patterns);
    }
    compiled
}

/// The remote service likes to return fullwidth punctuation around CJK text;
/// resource files expect the ASCII forms.
fn normalize_punctuation(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '“' | '”' => '"',
            '：' => ':',
            '｛' => '{',
            '｝' => '}',
            '［' => '[',
            '］' => ']',
            other => other,
        })
        .collect()
}
