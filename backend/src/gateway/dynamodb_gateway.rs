use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use super::models::{HistoryRecord, ReferenceRecord};
use super::{GatewayError, ReferenceGateway};

type Item = HashMap<String, AttributeValue>;

/// Reads reference cases and per-user history from two DynamoDB tables.
///
/// The history table is keyed by `user_id` (partition) and `created_at`
/// (sort, RFC 3339), so a reverse query returns the newest rows first.
#[derive(Clone)]
pub struct DynamoDbGateway {
    client: Client,
    reference_table: String,
    history_table: String,
}

impl DynamoDbGateway {
    pub fn new(client: Client, reference_table: String, history_table: String) -> Self {
        Self {
            client,
            reference_table,
            history_table,
        }
    }

    pub fn parse_reference_from_item(item: &Item) -> Result<ReferenceRecord, GatewayError> {
        Ok(ReferenceRecord {
            baseline_value: number_field(item, "baseline_value")?,
            accelerations: optional_number_field(item, "accelerations")?,
            fetal_movement: optional_number_field(item, "fetal_movement")?,
            uterine_contractions: optional_number_field(item, "uterine_contractions")?,
            light_decelerations: optional_number_field(item, "light_decelerations")?,
            severe_decelerations: optional_number_field(item, "severe_decelerations")?,
            prolonged_decelerations: optional_number_field(item, "prolongued_decelerations")?,
            abnormal_short_term_variability: optional_number_field(
                item,
                "abnormal_short_term_variability",
            )?,
            mean_short_term_variability: number_field(item, "mean_short_term_variability")?,
            abnormal_long_term_variability: optional_number_field(
                item,
                "abnormal_long_term_variability",
            )?,
            mean_long_term_variability: optional_number_field(item, "mean_long_term_variability")?,
            pattern_class: optional_integer_field(item, "pattern_class")?,
            fetal_state: integer_field(item, "fetal_state")?,
        })
    }

    pub fn parse_history_from_item(item: &Item) -> Result<HistoryRecord, GatewayError> {
        let baseline_value = number_field(item, "baseline_value")?;

        let created_at = item
            .get("created_at")
            .and_then(|v| v.as_s().ok())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| GatewayError::InvalidData("Invalid created_at".to_string()))?;

        Ok(HistoryRecord {
            baseline_value,
            created_at,
        })
    }
}

impl ReferenceGateway for DynamoDbGateway {
    async fn fetch_reference_sample(
        &self,
        limit: usize,
    ) -> Result<Vec<ReferenceRecord>, GatewayError> {
        log::debug!(
            "Scanning up to {} reference records from '{}'",
            limit,
            self.reference_table
        );

        let result = self
            .client
            .scan()
            .table_name(&self.reference_table)
            .limit(i32::try_from(limit).unwrap_or(i32::MAX))
            .send()
            .await
            .map_err(|e| {
                log::error!(
                    "DynamoDB scan failed for table '{}': {:?}",
                    self.reference_table,
                    e
                );
                GatewayError::DynamoDb(e.to_string())
            })?;

        let items = result.items.unwrap_or_default();
        Ok(keep_parsed(
            &items,
            limit,
            "reference",
            Self::parse_reference_from_item,
        ))
    }

    async fn fetch_recent_history(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<HistoryRecord>, GatewayError> {
        log::debug!(
            "Querying {} most recent history records for user {} from '{}'",
            limit,
            user_id,
            self.history_table
        );

        let result = self
            .client
            .query()
            .table_name(&self.history_table)
            .key_condition_expression("user_id = :user_id")
            .expression_attribute_values(":user_id", AttributeValue::S(user_id.to_string()))
            .scan_index_forward(false)
            .limit(i32::try_from(limit).unwrap_or(i32::MAX))
            .send()
            .await
            .map_err(|e| {
                log::error!("DynamoDB query failed for user {}: {:?}", user_id, e);
                GatewayError::DynamoDb(e.to_string())
            })?;

        let items = result.items.unwrap_or_default();
        Ok(keep_parsed(
            &items,
            limit,
            "history",
            Self::parse_history_from_item,
        ))
    }
}

/// Parses up to `limit` items, skipping the ones that do not parse.
fn keep_parsed<T>(
    items: &[Item],
    limit: usize,
    kind: &str,
    parse: fn(&Item) -> Result<T, GatewayError>,
) -> Vec<T> {
    items
        .iter()
        .take(limit)
        .filter_map(|item| match parse(item) {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("Skipping malformed {} item: {}", kind, e);
                None
            }
        })
        .collect()
}

fn optional_number_field(item: &Item, name: &str) -> Result<f64, GatewayError> {
    match item.get(name) {
        None | Some(AttributeValue::Null(_)) => Ok(0.0),
        Some(_) => number_field(item, name),
    }
}

fn optional_integer_field(item: &Item, name: &str) -> Result<Option<i64>, GatewayError> {
    match item.get(name) {
        None | Some(AttributeValue::Null(_)) => Ok(None),
        Some(_) => integer_field(item, name).map(Some),
    }
}

fn number_field(item: &Item, name: &str) -> Result<f64, GatewayError> {
    item.get(name)
        .and_then(|v| v.as_n().ok())
        .and_then(|n| n.parse::<f64>().ok())
        .ok_or_else(|| GatewayError::InvalidData(format!("Invalid {}", name)))
}

fn integer_field(item: &Item, name: &str) -> Result<i64, GatewayError> {
    let value = number_field(item, name)?;
    if value.fract() != 0.0 {
        return Err(GatewayError::InvalidData(format!(
            "Invalid {}: {} is not an integer",
            name, value
        )));
    }
    Ok(value as i64)
}
