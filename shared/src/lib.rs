use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// Rhythm label reported for an analysed strip.
///
/// The first three variants come from the variance thresholds used when no
/// reference case matches; the rest mirror the ten CTG pattern classes.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum RhythmType {
    #[serde(rename = "normal sinus rhythm")]
    #[strum(serialize = "normal sinus rhythm")]
    NormalSinusRhythm,
    #[serde(rename = "sinus tachycardia")]
    #[strum(serialize = "sinus tachycardia")]
    SinusTachycardia,
    #[serde(rename = "arrhythmia")]
    #[strum(serialize = "arrhythmia")]
    Arrhythmia,
    #[serde(rename = "quiet sleep")]
    #[strum(serialize = "quiet sleep")]
    QuietSleep,
    #[serde(rename = "REM sleep")]
    #[strum(serialize = "REM sleep")]
    RemSleep,
    #[serde(rename = "quiet wakefulness")]
    #[strum(serialize = "quiet wakefulness")]
    QuietWakefulness,
    #[serde(rename = "active wakefulness")]
    #[strum(serialize = "active wakefulness")]
    ActiveWakefulness,
    #[serde(rename = "shift pattern")]
    #[strum(serialize = "shift pattern")]
    ShiftPattern,
    #[serde(rename = "accelerative/decelerative pattern")]
    #[strum(serialize = "accelerative/decelerative pattern")]
    AcceleroDeceleration,
    #[serde(rename = "decelerative pattern")]
    #[strum(serialize = "decelerative pattern")]
    Decelerative,
    #[serde(rename = "largely decelerative pattern")]
    #[strum(serialize = "largely decelerative pattern")]
    LargelyDecelerative,
    #[serde(rename = "flat-sinusoidal pattern")]
    #[strum(serialize = "flat-sinusoidal pattern")]
    FlatSinusoidal,
    #[serde(rename = "suspect pattern")]
    #[strum(serialize = "suspect pattern")]
    Suspect,
}

impl RhythmType {
    /// Maps a CTG pattern class code (1..=10) to its label. Codes outside the
    /// table fall back to a normal sinus rhythm.
    pub fn from_pattern_class(code: i64) -> Self {
        match code {
            1 => RhythmType::QuietSleep,
            2 => RhythmType::RemSleep,
            3 => RhythmType::QuietWakefulness,
            4 => RhythmType::ActiveWakefulness,
            5 => RhythmType::ShiftPattern,
            6 => RhythmType::AcceleroDeceleration,
            7 => RhythmType::Decelerative,
            8 => RhythmType::LargelyDecelerative,
            9 => RhythmType::FlatSinusoidal,
            10 => RhythmType::Suspect,
            _ => RhythmType::NormalSinusRhythm,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Finding {
    #[serde(rename = "accelerations detected")]
    #[strum(serialize = "accelerations detected")]
    AccelerationsDetected,
    #[serde(rename = "mild decelerations")]
    #[strum(serialize = "mild decelerations")]
    MildDecelerations,
    #[serde(rename = "severe decelerations")]
    #[strum(serialize = "severe decelerations")]
    SevereDecelerations,
    #[serde(rename = "abnormal short-term variability")]
    #[strum(serialize = "abnormal short-term variability")]
    AbnormalShortTermVariability,
    #[serde(rename = "elevated heart rate")]
    #[strum(serialize = "elevated heart rate")]
    ElevatedHeartRate,
    #[serde(rename = "rhythm irregularity")]
    #[strum(serialize = "rhythm irregularity")]
    RhythmIrregularity,
    #[serde(rename = "possible fibrillation")]
    #[strum(serialize = "possible fibrillation")]
    PossibleFibrillation,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub heart_rate: u32,
    pub rhythm_type: RhythmType,
    pub confidence: f32,
    pub abnormalities: Vec<Finding>,
}

#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub image_data: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub result: AnalysisResult,
    pub image_hash: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn pattern_classes_cover_the_ctg_table() {
        assert_eq!(RhythmType::from_pattern_class(1), RhythmType::QuietSleep);
        assert_eq!(RhythmType::from_pattern_class(10), RhythmType::Suspect);
        assert_eq!(RhythmType::from_pattern_class(0), RhythmType::NormalSinusRhythm);
        assert_eq!(RhythmType::from_pattern_class(11), RhythmType::NormalSinusRhythm);
    }

    #[test]
    fn display_matches_wire_label() {
        for rhythm in RhythmType::iter() {
            let json = serde_json::to_string(&rhythm).unwrap();
            assert_eq!(json, format!("\"{}\"", rhythm));
        }
        for finding in Finding::iter() {
            let json = serde_json::to_string(&finding).unwrap();
            assert_eq!(json, format!("\"{}\"", finding));
        }
    }

    #[test]
    fn result_serializes_in_camel_case() {
        let result = AnalysisResult {
            heart_rate: 72,
            rhythm_type: RhythmType::Arrhythmia,
            confidence: 0.78,
            abnormalities: vec![Finding::RhythmIrregularity],
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["heartRate"], 72);
        assert_eq!(value["rhythmType"], "arrhythmia");
        assert_eq!(value["abnormalities"][0], "rhythm irregularity");
    }
}
