use super::edges::GradientMap;
use crate::gateway::models::HistoryRecord;

pub const MIN_HEART_RATE: u32 = 60;
pub const MAX_HEART_RATE: u32 = 200;

/// Fraction of the strongest gradient a cell must exceed to count as a peak.
pub const PEAK_THRESHOLD_RATIO: f32 = 0.7;

/// Number of cells strictly above `PEAK_THRESHOLD_RATIO * max`.
pub fn count_peaks(edges: &GradientMap) -> usize {
    let threshold = edges.max() * PEAK_THRESHOLD_RATIO;
    edges.view().iter().filter(|&&v| v > threshold).count()
}

/// Extrapolates a per-minute rate from the peak count: two peaks per beat
/// over a ten second strip.
pub fn raw_estimate(peak_count: usize) -> f64 {
    (peak_count as f64 / 2.0 * 6.0).round()
}

/// Mean baseline of the history records, ignoring non-finite values.
pub fn mean_baseline(history: &[HistoryRecord]) -> Option<f64> {
    let baselines: Vec<f64> = history
        .iter()
        .map(|record| record.baseline_value)
        .filter(|value| value.is_finite())
        .collect();

    if baselines.is_empty() {
        return None;
    }
    Some(baselines.iter().sum::<f64>() / baselines.len() as f64)
}

pub fn estimate_heart_rate(edges: &GradientMap, history: &[HistoryRecord]) -> u32 {
    let peak_count = count_peaks(edges);
    let raw = raw_estimate(peak_count);

    let estimate = match mean_baseline(history) {
        Some(baseline) => {
            log::debug!(
                "Blending raw estimate {} with baseline {:.2} from {} records",
                raw,
                baseline,
                history.len()
            );
            ((raw + baseline) / 2.0).round()
        }
        None => raw,
    };

    log::debug!("Peak count {}, estimate before clamping {}", peak_count, estimate);
    clamp_heart_rate(estimate)
}

fn clamp_heart_rate(estimate: f64) -> u32 {
    estimate.clamp(f64::from(MIN_HEART_RATE), f64::from(MAX_HEART_RATE)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use ndarray::Array2;

    fn map_with_peaks(peaks: usize) -> GradientMap {
        let mut values = Array2::<f32>::zeros((224, 224));
        for (i, cell) in values.iter_mut().enumerate().take(peaks) {
            *cell = if i % 2 == 0 { 1.0 } else { 0.9 };
        }
        GradientMap::from_array(values)
    }

    fn history(baselines: &[f64]) -> Vec<HistoryRecord> {
        let now = Utc::now();
        baselines
            .iter()
            .enumerate()
            .map(|(i, &baseline_value)| HistoryRecord {
                baseline_value,
                created_at: now - Duration::minutes(i as i64),
            })
            .collect()
    }

    #[test]
    fn flat_map_clamps_to_minimum() {
        let edges = GradientMap::from_array(Array2::zeros((224, 224)));
        assert_eq!(count_peaks(&edges), 0);
        assert_eq!(estimate_heart_rate(&edges, &[]), MIN_HEART_RATE);
    }

    #[test]
    fn saturated_map_clamps_to_maximum() {
        let edges = GradientMap::from_array(Array2::from_elem((224, 224), 5.0));
        // every cell equals the max and 5.0 > 3.5
        assert_eq!(count_peaks(&edges), 224 * 224);
        assert_eq!(estimate_heart_rate(&edges, &[]), MAX_HEART_RATE);
    }

    #[test]
    fn peaks_scale_by_three() {
        let edges = map_with_peaks(30);
        assert_eq!(count_peaks(&edges), 30);
        assert_eq!(raw_estimate(30), 90.0);
        assert_eq!(estimate_heart_rate(&edges, &[]), 90);
    }

    #[test]
    fn cells_at_threshold_are_not_peaks() {
        let mut values = Array2::<f32>::zeros((4, 4));
        values[[0, 0]] = 10.0;
        values[[0, 1]] = 10.0 * PEAK_THRESHOLD_RATIO;
        values[[0, 2]] = 7.5;
        let edges = GradientMap::from_array(values);
        assert_eq!(count_peaks(&edges), 2);
    }

    #[test]
    fn blends_with_history_mean() {
        let edges = map_with_peaks(30);
        assert_eq!(estimate_heart_rate(&edges, &history(&[70.0, 72.0, 74.0])), 81);
    }

    #[test]
    fn blend_still_clamps() {
        let edges = GradientMap::from_array(Array2::zeros((8, 8)));
        // (0 + 100) / 2 = 50, below the floor
        assert_eq!(estimate_heart_rate(&edges, &history(&[100.0])), MIN_HEART_RATE);
    }

    #[test]
    fn non_finite_baselines_are_ignored() {
        assert_eq!(mean_baseline(&history(&[f64::NAN, 80.0])), Some(80.0));
        assert_eq!(mean_baseline(&history(&[f64::INFINITY])), None);
        assert_eq!(mean_baseline(&[]), None);
    }
}
