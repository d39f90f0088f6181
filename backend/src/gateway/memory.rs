use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use super::models::{HistoryRecord, ReferenceRecord};
use super::{GatewayError, ReferenceGateway};

#[derive(Debug, Default, Deserialize)]
struct FixtureFile {
    references: Vec<ReferenceRecord>,
    #[serde(default)]
    history: HashMap<Uuid, Vec<HistoryRecord>>,
}

/// Serves a fixed snapshot of reference cases and user history.
#[derive(Clone, Default)]
pub struct InMemoryGateway {
    references: Arc<Vec<ReferenceRecord>>,
    history: Arc<HashMap<Uuid, Vec<HistoryRecord>>>,
}

impl InMemoryGateway {
    pub fn new(references: Vec<ReferenceRecord>) -> Self {
        Self {
            references: Arc::new(references),
            history: Arc::default(),
        }
    }

    pub fn with_history(mut self, user_id: Uuid, records: Vec<HistoryRecord>) -> Self {
        Arc::make_mut(&mut self.history).insert(user_id, records);
        self
    }

    /// Loads `{ "references": [...], "history": { "<user uuid>": [...] } }`.
    pub fn from_fixture_file(path: impl AsRef<Path>) -> Result<Self, GatewayError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| GatewayError::Fixture(format!("{}: {}", path.display(), e)))?;
        let gateway = Self::from_json(&raw)?;
        log::info!(
            "Loaded {} reference records and history for {} users from {}",
            gateway.references.len(),
            gateway.history.len(),
            path.display()
        );
        Ok(gateway)
    }

    pub fn from_json(raw: &str) -> Result<Self, GatewayError> {
        let fixtures: FixtureFile =
            serde_json::from_str(raw).map_err(|e| GatewayError::Fixture(e.to_string()))?;
        Ok(Self {
            references: Arc::new(fixtures.references),
            history: Arc::new(fixtures.history),
        })
    }
}

impl ReferenceGateway for InMemoryGateway {
    async fn fetch_reference_sample(
        &self,
        limit: usize,
    ) -> Result<Vec<ReferenceRecord>, GatewayError> {
        Ok(self.references.iter().take(limit).cloned().collect())
    }

    async fn fetch_recent_history(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<HistoryRecord>, GatewayError> {
        let mut records = self.history.get(&user_id).cloned().unwrap_or_default();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[actix_web::test]
    async fn history_is_newest_first_and_limited() {
        let user = Uuid::new_v4();
        let now = Utc::now();
        let records = (0..8)
            .map(|i| HistoryRecord {
                baseline_value: 100.0 + i as f64,
                created_at: now - Duration::hours(8 - i),
            })
            .collect();
        let gateway = InMemoryGateway::default().with_history(user, records);

        let history = gateway.fetch_recent_history(user, 5).await.unwrap();
        let baselines: Vec<f64> = history.iter().map(|r| r.baseline_value).collect();
        assert_eq!(baselines, vec![107.0, 106.0, 105.0, 104.0, 103.0]);

        let other = gateway.fetch_recent_history(Uuid::new_v4(), 5).await.unwrap();
        assert!(other.is_empty());
    }

    #[actix_web::test]
    async fn reference_sample_respects_limit() {
        let references = vec![ReferenceRecord::default(); 150];
        let gateway = InMemoryGateway::new(references);
        assert_eq!(gateway.fetch_reference_sample(100).await.unwrap().len(), 100);
    }

    #[test]
    fn parses_fixture_json() {
        let user = Uuid::new_v4();
        let raw = format!(
            r#"{{
                "references": [{{
                    "baseline_value": 133,
                    "accelerations": 0.003,
                    "prolongued_decelerations": 0,
                    "mean_short_term_variability": 0.9,
                    "pattern_class": 6,
                    "fetal_state": 2
                }}],
                "history": {{
                    "{}": [{{ "baseline_value": 128, "created_at": "2026-01-05T08:00:00Z" }}]
                }}
            }}"#,
            user
        );
        let gateway = InMemoryGateway::from_json(&raw).unwrap();
        assert_eq!(gateway.references.len(), 1);
        assert_eq!(gateway.references[0].pattern_class, Some(6));
        assert_eq!(gateway.history[&user][0].baseline_value, 128.0);
    }

    #[test]
    fn fixture_rows_may_omit_pattern_class() {
        let raw = r#"{
            "references": [
                { "baseline_value": 120, "mean_short_term_variability": 0.4, "fetal_state": 1 },
                { "baseline_value": 121, "mean_short_term_variability": 0.5, "pattern_class": null, "fetal_state": 1 },
                { "baseline_value": 122, "mean_short_term_variability": 0.6, "pattern_class": 2, "fetal_state": 1 }
            ]
        }"#;
        let gateway = InMemoryGateway::from_json(raw).unwrap();
        let classes: Vec<Option<i64>> = gateway.references.iter().map(|r| r.pattern_class).collect();
        assert_eq!(classes, vec![None, None, Some(2)]);
    }

    #[test]
    fn bundled_fixtures_load() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../fixtures/reference_data.json");
        let gateway = InMemoryGateway::from_fixture_file(path).unwrap();
        assert_eq!(gateway.references.len(), 6);
        assert!(gateway.references.iter().all(|r| r.pattern_class.is_some_and(|c| (1..=10).contains(&c))));
    }

    #[test]
    fn malformed_fixture_is_an_error() {
        assert!(matches!(
            InMemoryGateway::from_json("{ \"references\": 3 }"),
            Err(GatewayError::Fixture(_))
        ));
        assert!(InMemoryGateway::from_fixture_file("/nonexistent/fixtures.json").is_err());
    }
}
