pub mod classifier;
pub mod edges;
pub mod heart_rate;
pub mod image_loader;

use std::future::Future;
use std::time::Duration;

use shared::AnalysisResult;
use uuid::Uuid;

use crate::gateway::models::{HistoryRecord, ReferenceRecord};
use crate::gateway::{GatewayError, ReferenceGateway};
use edges::GradientMap;

pub const REFERENCE_SAMPLE_LIMIT: usize = 100;
pub const HISTORY_LIMIT: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Runs the strip analysis pipeline against a reference gateway.
#[derive(Clone)]
pub struct Analyzer<G> {
    gateway: G,
    gateway_timeout: Duration,
}

impl<G: ReferenceGateway> Analyzer<G> {
    pub fn new(gateway: G, gateway_timeout: Duration) -> Self {
        Self {
            gateway,
            gateway_timeout,
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Decodes `image`, extracts its gradient map and derives the heart rate
    /// and rhythm. Only a decode failure is reported; gateway problems fall
    /// back to an empty snapshot.
    pub async fn analyze(
        &self,
        image: &[u8],
        user_id: Option<Uuid>,
    ) -> Result<AnalysisResult, AnalysisError> {
        let grid = image_loader::load_intensity_grid(image)?;
        let edges = edges::extract_edges(&grid);

        let (references, history) =
            futures::join!(self.reference_sample(), self.recent_history(user_id));

        let result = analyze_gradient_map(&edges, &references, &history);
        log::info!(
            "Analysis complete: {} bpm, {} ({:.2}), {} findings, {} references, {} history",
            result.heart_rate,
            result.rhythm_type,
            result.confidence,
            result.abnormalities.len(),
            references.len(),
            history.len()
        );
        Ok(result)
    }

    async fn reference_sample(&self) -> Vec<ReferenceRecord> {
        let mut records = fail_soft(
            "reference sample",
            self.gateway_timeout,
            self.gateway.fetch_reference_sample(REFERENCE_SAMPLE_LIMIT),
        )
        .await;
        records.truncate(REFERENCE_SAMPLE_LIMIT);
        records
    }

    async fn recent_history(&self, user_id: Option<Uuid>) -> Vec<HistoryRecord> {
        let Some(user_id) = user_id else {
            log::debug!("No current user, skipping history lookup");
            return Vec::new();
        };
        let mut records = fail_soft(
            "recent history",
            self.gateway_timeout,
            self.gateway.fetch_recent_history(user_id, HISTORY_LIMIT),
        )
        .await;
        records.truncate(HISTORY_LIMIT);
        records
    }
}

/// Combines both downstream stages over one gradient map. Deterministic for
/// a given map and snapshot.
pub fn analyze_gradient_map(
    edges: &GradientMap,
    references: &[ReferenceRecord],
    history: &[HistoryRecord],
) -> AnalysisResult {
    let heart_rate = heart_rate::estimate_heart_rate(edges, history);
    let classification = classifier::classify(edges, references);

    AnalysisResult {
        heart_rate,
        rhythm_type: classification.rhythm_type,
        confidence: classification.confidence,
        abnormalities: classification.abnormalities,
    }
}

async fn fail_soft<T>(
    what: &str,
    timeout: Duration,
    fetch: impl Future<Output = Result<Vec<T>, GatewayError>>,
) -> Vec<T> {
    match tokio::time::timeout(timeout, fetch).await {
        Ok(Ok(records)) => records,
        Ok(Err(e)) => {
            log::warn!("Failed to fetch {}, continuing without it: {}", what, e);
            Vec::new()
        }
        Err(_) => {
            log::warn!(
                "Fetching {} timed out after {:?}, continuing without it",
                what,
                timeout
            );
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::memory::InMemoryGateway;
    use chrono::Utc;
    use ndarray::Array2;
    use shared::RhythmType;

    #[test]
    fn combines_rate_and_classification() {
        let edges = GradientMap::from_array(Array2::zeros((224, 224)));
        let history = vec![HistoryRecord {
            baseline_value: 140.0,
            created_at: Utc::now(),
        }];
        let result = analyze_gradient_map(&edges, &[], &history);

        assert_eq!(result.heart_rate, 70);
        assert_eq!(result.rhythm_type, RhythmType::NormalSinusRhythm);
        assert_eq!(result.confidence, 0.92);
    }

    #[actix_web::test]
    async fn undecodable_image_is_the_only_failure() {
        let analyzer = Analyzer::new(InMemoryGateway::default(), Duration::from_millis(100));
        let err = analyzer.analyze(&[0x89, 0x50, 0x4e], None).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Decode(_)));
    }

    #[actix_web::test]
    async fn history_needs_a_user() {
        let user = Uuid::new_v4();
        let gateway = InMemoryGateway::default().with_history(
            user,
            vec![HistoryRecord {
                baseline_value: 180.0,
                created_at: Utc::now(),
            }],
        );
        let analyzer = Analyzer::new(gateway, Duration::from_millis(100));

        assert!(analyzer.recent_history(None).await.is_empty());
        assert_eq!(analyzer.recent_history(Some(user)).await.len(), 1);
    }
}
