use std::collections::BTreeMap;

use shared::{Finding, RhythmType};

use super::edges::GradientMap;
use crate::gateway::models::ReferenceRecord;

/// Maximum distance between a record's mean short-term variability and the
/// map variance for the record to count as a similar case.
pub const SIMILARITY_TOLERANCE: f64 = 0.5;

const NORMAL_FETAL_STATE_CONFIDENCE: f64 = 0.95;
const ABNORMAL_FETAL_STATE_CONFIDENCE: f64 = 0.85;

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub rhythm_type: RhythmType,
    pub abnormalities: Vec<Finding>,
    pub confidence: f32,
}

pub fn classify(edges: &GradientMap, references: &[ReferenceRecord]) -> Classification {
    let variance = edges.variance();
    let similar = similar_cases(variance, references);
    log::debug!(
        "Gradient variance {:.4}, {} of {} reference records similar",
        variance,
        similar.len(),
        references.len()
    );

    if similar.is_empty() {
        classify_by_variance(variance)
    } else {
        classify_by_references(&similar)
    }
}

pub fn similar_cases(variance: f64, references: &[ReferenceRecord]) -> Vec<&ReferenceRecord> {
    references
        .iter()
        .filter(|record| (record.mean_short_term_variability - variance).abs() < SIMILARITY_TOLERANCE)
        .collect()
}

fn classify_by_references(similar: &[&ReferenceRecord]) -> Classification {
    let confidence = similar
        .iter()
        .map(|record| {
            if record.fetal_state == 1 {
                NORMAL_FETAL_STATE_CONFIDENCE
            } else {
                ABNORMAL_FETAL_STATE_CONFIDENCE
            }
        })
        .sum::<f64>()
        / similar.len() as f64;

    let abnormal: Vec<&ReferenceRecord> = similar
        .iter()
        .copied()
        .filter(|record| record.fetal_state > 1)
        .collect();

    let mut abnormalities = Vec::new();
    if abnormal.iter().any(|r| r.accelerations > 0.0) {
        abnormalities.push(Finding::AccelerationsDetected);
    }
    if abnormal.iter().any(|r| r.light_decelerations > 0.0) {
        abnormalities.push(Finding::MildDecelerations);
    }
    if abnormal.iter().any(|r| r.severe_decelerations > 0.0) {
        abnormalities.push(Finding::SevereDecelerations);
    }
    if abnormal.iter().any(|r| r.abnormal_short_term_variability > 0.0) {
        abnormalities.push(Finding::AbnormalShortTermVariability);
    }

    let rhythm_type = most_common_pattern_class(similar)
        .map(RhythmType::from_pattern_class)
        .unwrap_or(RhythmType::NormalSinusRhythm);

    Classification {
        rhythm_type,
        abnormalities,
        confidence: confidence as f32,
    }
}

fn classify_by_variance(variance: f64) -> Classification {
    if variance < 0.1 {
        Classification {
            rhythm_type: RhythmType::NormalSinusRhythm,
            abnormalities: Vec::new(),
            confidence: 0.92,
        }
    } else if variance < 0.2 {
        Classification {
            rhythm_type: RhythmType::SinusTachycardia,
            abnormalities: vec![Finding::ElevatedHeartRate],
            confidence: 0.85,
        }
    } else {
        Classification {
            rhythm_type: RhythmType::Arrhythmia,
            abnormalities: vec![Finding::RhythmIrregularity, Finding::PossibleFibrillation],
            confidence: 0.78,
        }
    }
}

/// Most frequent pattern class; among equally frequent classes the largest
/// code wins. Records without a class are counted together and lose ties to
/// any known code. `None` when nothing is known.
pub fn most_common_pattern_class(records: &[&ReferenceRecord]) -> Option<i64> {
    let mut counts: BTreeMap<Option<i64>, usize> = BTreeMap::new();
    for record in records {
        *counts.entry(record.pattern_class).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by_key(|&(code, count)| (count, code))
        .and_then(|(code, _)| code)
}
