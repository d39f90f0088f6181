use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One historical CTG case from the reference table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    pub baseline_value: f64,
    #[serde(default)]
    pub accelerations: f64,
    #[serde(default)]
    pub fetal_movement: f64,
    #[serde(default)]
    pub uterine_contractions: f64,
    #[serde(default)]
    pub light_decelerations: f64,
    #[serde(default)]
    pub severe_decelerations: f64,
    #[serde(default, rename = "prolongued_decelerations")]
    pub prolonged_decelerations: f64,
    #[serde(default)]
    pub abnormal_short_term_variability: f64,
    pub mean_short_term_variability: f64,
    #[serde(default)]
    pub abnormal_long_term_variability: f64,
    #[serde(default)]
    pub mean_long_term_variability: f64,
    /// CTG pattern class, 1..=10. Absent in some exported rows.
    #[serde(default)]
    pub pattern_class: Option<i64>,
    /// 1 is normal, anything above is abnormal.
    pub fetal_state: i64,
}

/// A previous analysis baseline stored for a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub baseline_value: f64,
    pub created_at: DateTime<Utc>,
}
