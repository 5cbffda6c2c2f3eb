//! Lending configuration: normalization of the backend `/config` payload
//! into a strongly typed [`LendingConfig`], and a TTL cache around it.
//!
//! The backend is loose about shapes. `data` may be an object keyed by
//! config key or an array of `{key, value}` records, and the nested
//! `interest_rates` / `fee_structure` values may arrive as JSON strings
//! or as objects. All of that is resolved here so the engine only ever
//! sees a [`RateTable`].

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use lending_engine::FeeCalculator;
use lending_types::{LoanLevel, RateTable, TermDays, TermRates};

use crate::error::{ClientError, ClientResult};

pub const DEFAULT_MIN_LOAN_AMOUNT: f64 = 100.0;
pub const DEFAULT_MAX_LOAN_AMOUNT: f64 = 5000.0;
pub const DEFAULT_CACHE_TTL_SECS: i64 = 5 * 60;

/// Where the rate table came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    /// Built-in 22/26/30% policy.
    Canonical,
    /// `interest_rates` / `fee_structure` from the backend.
    Backend,
}

/// Backend `fee_structure` record. Rates are decimals (0.02 = 2%).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FeeStructure {
    #[serde(default)]
    pub service_fee_rate: f64,
    #[serde(default)]
    pub admin_fee_flat: f64,
    #[serde(default)]
    pub commitment_fee_rate: f64,
}

/// Normalized configuration consumed by the engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LendingConfig {
    pub rate_table: RateTable,
    pub rate_source: RateSource,
    pub min_loan_amount: f64,
    pub max_loan_amount: f64,
    pub loan_terms_available: Vec<TermDays>,
}

impl Default for LendingConfig {
    fn default() -> Self {
        Self {
            rate_table: RateTable::canonical(),
            rate_source: RateSource::Canonical,
            min_loan_amount: DEFAULT_MIN_LOAN_AMOUNT,
            max_loan_amount: DEFAULT_MAX_LOAN_AMOUNT,
            loan_terms_available: TermDays::CANONICAL.to_vec(),
        }
    }
}

impl LendingConfig {
    /// Normalize the `data` member of a `/config` response.
    pub fn from_payload(data: &Value) -> ClientResult<Self> {
        let entries = collect_entries(data)?;
        let mut config = Self::default();

        let interest_rates = decode_nested(&entries, "interest_rates")?;
        let fee_structure = match decode_nested(&entries, "fee_structure")? {
            Some(value) => Some(
                serde_json::from_value::<FeeStructure>(value)
                    .map_err(|e| ClientError::InvalidConfig(format!("fee_structure: {}", e)))?,
            ),
            None => None,
        };

        match interest_rates {
            Some(rates) => {
                let fees = fee_structure.unwrap_or_default();
                config.rate_table = backend_rate_table(&rates, &fees)?;
                config.rate_source = RateSource::Backend;
            }
            None if fee_structure.is_some() => {
                debug!("fee_structure present without interest_rates; keeping canonical rates");
            }
            None => {}
        }

        if let Some(min) = number(&entries, "min_loan_amount")? {
            config.min_loan_amount = min;
        }
        if let Some(max) = number(&entries, "max_loan_amount")? {
            config.max_loan_amount = max;
        }
        if config.min_loan_amount > config.max_loan_amount {
            return Err(ClientError::InvalidConfig(format!(
                "min_loan_amount {} exceeds max_loan_amount {}",
                config.min_loan_amount, config.max_loan_amount
            )));
        }

        if let Some(terms) = decode_nested(&entries, "loan_terms_available")? {
            config.loan_terms_available = parse_terms(&terms)?;
        }

        Ok(config)
    }

    /// Parse a JSON document that is either a full `{success, data}`
    /// response or the bare `data` member.
    pub fn from_json_str(json: &str) -> ClientResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        match value.get("data") {
            Some(data) => Self::from_payload(data),
            None => Self::from_payload(&value),
        }
    }

    pub fn calculator(&self) -> FeeCalculator {
        FeeCalculator::new(self.rate_table.clone())
    }

    /// Level used when the user's level is not known: global bounds and
    /// every advertised term.
    pub fn default_level(&self) -> LoanLevel {
        LoanLevel::new(0, "Default", self.min_loan_amount, self.max_loan_amount)
            .with_terms(self.loan_terms_available.iter().copied())
    }
}

fn collect_entries(data: &Value) -> ClientResult<Map<String, Value>> {
    match data {
        Value::Object(map) => Ok(map.clone()),
        Value::Array(items) => {
            let mut map = Map::new();
            for item in items {
                match item.get("key").and_then(Value::as_str) {
                    Some(key) => {
                        let value = item.get("value").cloned().unwrap_or(Value::Null);
                        map.insert(key.to_string(), value);
                    }
                    None => warn!("Skipping config record without a key"),
                }
            }
            Ok(map)
        }
        other => Err(ClientError::InvalidConfig(format!(
            "expected an object or array of config records, got {}",
            type_name(other)
        ))),
    }
}

/// Fetch a key whose value may be JSON-encoded inside a string.
fn decode_nested(entries: &Map<String, Value>, key: &str) -> ClientResult<Option<Value>> {
    match entries.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(raw)) => serde_json::from_str(raw)
            .map(Some)
            .map_err(|e| ClientError::InvalidConfig(format!("{}: {}", key, e))),
        Some(value) => Ok(Some(value.clone())),
    }
}

fn number(entries: &Map<String, Value>, key: &str) -> ClientResult<Option<f64>> {
    match decode_nested(entries, key)? {
        None => Ok(None),
        Some(value) => as_number(&value)
            .map(Some)
            .ok_or_else(|| ClientError::InvalidConfig(format!("{} must be a number", key))),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_term_key(raw: &str) -> ClientResult<TermDays> {
    raw.parse::<TermDays>()
        .map_err(|_| ClientError::InvalidConfig(format!("invalid loan term {:?}", raw)))
}

fn parse_terms(value: &Value) -> ClientResult<Vec<TermDays>> {
    let items = value
        .as_array()
        .ok_or_else(|| ClientError::InvalidConfig("loan_terms_available must be a list".into()))?;
    items
        .iter()
        .map(|item| match item {
            Value::String(s) => parse_term_key(s),
            other => other
                .as_u64()
                .and_then(|d| u32::try_from(d).ok())
                .map(TermDays::new)
                .ok_or_else(|| ClientError::InvalidConfig(format!("invalid loan term {}", other))),
        })
        .collect()
}

/// Build a table from decimal rates. Backend entries carry no target, so
/// the rates are applied exactly as configured.
fn backend_rate_table(interest_rates: &Value, fees: &FeeStructure) -> ClientResult<RateTable> {
    let rates = interest_rates
        .as_object()
        .ok_or_else(|| ClientError::InvalidConfig("interest_rates must be an object".into()))?;

    let mut table = RateTable::new();
    for (raw_term, raw_rate) in rates {
        let term = parse_term_key(raw_term)?;
        let rate = as_number(raw_rate).ok_or_else(|| {
            ClientError::InvalidConfig(format!("interest rate for {} must be a number", raw_term))
        })?;
        let entry = TermRates::unscaled(
            rate * 100.0,
            fees.service_fee_rate * 100.0,
            0.0,
            fees.commitment_fee_rate * 100.0,
        )
        .with_admin_fee_flat(fees.admin_fee_flat);
        table.insert(term, entry)?;
    }
    Ok(table)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Time-bounded cache for [`LendingConfig`].
///
/// A fresh entry is served directly; an expired one is still available
/// through [`ConfigCache::stale`] so callers can fall back to it when the
/// backend is unreachable.
#[derive(Clone, Debug)]
pub struct ConfigCache {
    ttl: Duration,
    entry: Option<(LendingConfig, DateTime<Utc>)>,
}

impl Default for ConfigCache {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_CACHE_TTL_SECS))
    }
}

impl ConfigCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entry: None }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached config if it was stored less than `ttl` before `now`.
    ///
    /// An entry stamped after `now` (clock moved backwards) is not fresh.
    pub fn fresh(&self, now: DateTime<Utc>) -> Option<&LendingConfig> {
        self.entry
            .as_ref()
            .filter(|(_, fetched_at)| now >= *fetched_at && now - *fetched_at < self.ttl)
            .map(|(config, _)| config)
    }

    /// The cached config regardless of age.
    pub fn stale(&self) -> Option<&LendingConfig> {
        self.entry.as_ref().map(|(config, _)| config)
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.entry.as_ref().map(|(_, at)| *at)
    }

    pub fn store(&mut self, config: LendingConfig, now: DateTime<Utc>) {
        self.entry = Some((config, now));
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use lending_types::LendingError;
    use serde_json::json;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn backend_default() -> Value {
        json!({
            "loan_terms_available": [7, 14, 30],
            "max_loan_amount": 5000,
            "min_loan_amount": 100,
            "interest_rates": { "7": 0.05, "14": 0.08, "30": 0.12 },
            "fee_structure": {
                "service_fee_rate": 0.02,
                "admin_fee_flat": 5,
                "commitment_fee_rate": 0.01
            }
        })
    }

    #[test]
    fn object_payload_supersedes_canonical() {
        let config = LendingConfig::from_payload(&backend_default()).unwrap();
        assert_eq!(config.rate_source, RateSource::Backend);

        let seven = config.rate_table.get(TermDays::SEVEN).unwrap();
        assert!(approx(seven.interest_rate_pct, 5.0));
        assert!(approx(seven.service_fee_rate_pct, 2.0));
        assert!(approx(seven.commitment_fee_rate_pct, 1.0));
        assert_eq!(seven.admin_fee_flat, 5.0);
        assert_eq!(seven.target_total_pct, None);

        let thirty = config.rate_table.get(TermDays::THIRTY).unwrap();
        assert!(approx(thirty.interest_rate_pct, 12.0));
    }

    #[test]
    fn string_encoded_values_match_object_form() {
        let as_strings = json!({
            "interest_rates": "{\"7\":0.05,\"14\":0.08,\"30\":0.12}",
            "fee_structure": "{\"service_fee_rate\":0.02,\"admin_fee_flat\":5,\"commitment_fee_rate\":0.01}"
        });
        let a = LendingConfig::from_payload(&as_strings).unwrap();
        let b = LendingConfig::from_payload(&backend_default()).unwrap();
        assert_eq!(a.rate_table, b.rate_table);
    }

    #[test]
    fn array_payload_from_admin_endpoint() {
        let payload = json!([
            { "key": "interest_rates", "value": "{\"7\":0.05}" },
            { "key": "max_loan_amount", "value": 2000 },
            { "value": "orphan" }
        ]);
        let config = LendingConfig::from_payload(&payload).unwrap();
        assert_eq!(config.max_loan_amount, 2000.0);
        assert_eq!(config.rate_table.len(), 1);
        // fee_structure missing: fees default to zero
        let seven = config.rate_table.get(TermDays::SEVEN).unwrap();
        assert_eq!(seven.other_fees_pct(), 0.0);
    }

    #[test]
    fn missing_rates_keep_canonical_policy() {
        let config = LendingConfig::from_payload(&json!({ "app_name": "CEDI Loan" })).unwrap();
        assert_eq!(config, LendingConfig::default());
        assert_eq!(config.rate_table, RateTable::canonical());
    }

    #[test]
    fn malformed_values_are_rejected() {
        let bad_json = json!({ "interest_rates": "{not json" });
        assert!(matches!(
            LendingConfig::from_payload(&bad_json),
            Err(ClientError::InvalidConfig(_))
        ));

        let bad_term = json!({ "interest_rates": { "week": 0.05 } });
        assert!(LendingConfig::from_payload(&bad_term).is_err());

        let huge_term = json!({ "interest_rates": { "200000000": 0.05 } });
        assert!(matches!(
            LendingConfig::from_payload(&huge_term),
            Err(ClientError::Lending(LendingError::InvalidRateTable { .. }))
        ));

        let negative = json!({ "interest_rates": { "7": -0.05 } });
        assert!(matches!(
            LendingConfig::from_payload(&negative),
            Err(ClientError::Lending(_))
        ));

        let inverted = json!({ "min_loan_amount": 900, "max_loan_amount": 100 });
        assert!(LendingConfig::from_payload(&inverted).is_err());

        assert!(LendingConfig::from_payload(&json!("config")).is_err());
    }

    #[test]
    fn from_json_str_accepts_envelope() {
        let doc = json!({ "success": true, "data": backend_default() }).to_string();
        let config = LendingConfig::from_json_str(&doc).unwrap();
        assert_eq!(config.rate_source, RateSource::Backend);

        let bare = backend_default().to_string();
        assert_eq!(LendingConfig::from_json_str(&bare).unwrap(), config);
    }

    #[test]
    fn default_level_uses_global_bounds() {
        let level = LendingConfig::default().default_level();
        assert_eq!(level.min_amount, 100.0);
        assert_eq!(level.max_amount, 5000.0);
        assert_eq!(level.available_terms.len(), 3);
    }

    #[test]
    fn cache_expiry_and_stale_fallback() {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap();
        let mut cache = ConfigCache::default();
        assert!(cache.fresh(t0).is_none());

        cache.store(LendingConfig::default(), t0);
        assert!(cache.fresh(t0 + Duration::minutes(4)).is_some());
        assert!(cache.fresh(t0 + Duration::minutes(5)).is_none());
        assert!(cache.stale().is_some());
        assert_eq!(cache.fetched_at(), Some(t0));

        cache.clear();
        assert!(cache.stale().is_none());
    }

    #[test]
    fn cache_entry_from_the_future_is_not_fresh() {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap();
        let mut cache = ConfigCache::default();
        cache.store(LendingConfig::default(), t0);

        assert!(cache.fresh(t0 - Duration::minutes(1)).is_none());
        assert!(cache.fresh(t0 - Duration::days(30)).is_none());
        assert!(cache.stale().is_some());
    }
}
