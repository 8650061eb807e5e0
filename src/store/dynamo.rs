use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use futures::future::try_join_all;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_dynamo::aws_sdk_dynamodb_1::{from_items, to_attribute_value, to_item};
use serde_dynamo::from_item;

use super::{DataStore, Page};
use crate::config::{Config, Tables};
use crate::error::{Error, Result};
use crate::model::{ExploreProfile, Interval, Profile, ProfileSubscription, Shift, ShiftAlarm, User};

/// Index on `profileID` carried by the Shift and ProfileSubscription tables.
const BY_PROFILE_INDEX: &str = "byProfile";
/// Index on `shiftID` carried by the ShiftAlarm table.
const BY_SHIFT_INDEX: &str = "byShift";

/// `BatchWriteItem` and transactional limits cap fan-out at 25 requests.
const WRITE_FAN_OUT: usize = 25;

type Item = HashMap<String, AttributeValue>;

fn id_key(id: &str) -> Item {
    HashMap::from([("id".to_string(), AttributeValue::S(id.to_string()))])
}

/// [`DataStore`] backed by the application's DynamoDB tables, each keyed by `id`.
#[derive(Debug, Clone)]
pub struct DynamoStore {
    client: Client,
    tables: Tables,
}

impl DynamoStore {
    pub fn new(client: Client, tables: Tables) -> Self {
        Self { client, tables }
    }

    pub async fn from_config(config: &Config) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(endpoint) = &config.dynamodb_endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;
        Self::new(Client::new(&sdk_config), config.tables.clone())
    }

    async fn get<T: DeserializeOwned>(&self, table: &str, id: &str) -> Result<Option<T>> {
        let output = self
            .client
            .get_item()
            .table_name(table)
            .set_key(Some(id_key(id)))
            .send()
            .await
            .map_err(Error::store)?;
        Ok(output.item.map(from_item).transpose()?)
    }

    async fn put<T: Serialize>(&self, table: &str, value: &T) -> Result<()> {
        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(to_item(value)?))
            .send()
            .await
            .map_err(Error::store)?;
        Ok(())
    }

    /// Every row of `index` whose `attribute` equals `value`, following pagination.
    async fn query_index<T: DeserializeOwned>(
        &self,
        table: &str,
        index: &str,
        attribute: &str,
        value: &str,
    ) -> Result<Vec<T>> {
        let mut rows = Vec::new();
        let mut start_key: Option<Item> = None;
        loop {
            let output = self
                .client
                .query()
                .table_name(table)
                .index_name(index)
                .key_condition_expression("#k = :v")
                .expression_attribute_names("#k", attribute)
                .expression_attribute_values(":v", AttributeValue::S(value.to_string()))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(Error::store)?;
            rows.extend(from_items::<T>(output.items.unwrap_or_default())?);
            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }
        Ok(rows)
    }

    async fn scan<T: DeserializeOwned>(
        &self,
        table: &str,
        cursor: Option<&str>,
        limit: u32,
    ) -> Result<Page<T>> {
        let output = self
            .client
            .scan()
            .table_name(table)
            .limit(i32::try_from(limit).unwrap_or(i32::MAX))
            .set_exclusive_start_key(cursor.map(id_key))
            .send()
            .await
            .map_err(Error::store)?;
        let cursor = output
            .last_evaluated_key
            .as_ref()
            .and_then(|key| key.get("id"))
            .and_then(|id| id.as_s().ok())
            .cloned();
        Ok(Page {
            items: from_items::<T>(output.items.unwrap_or_default())?,
            cursor,
        })
    }

    async fn update_duty_ranges(&self, id: &str, ranges: &[Interval]) -> Result<()> {
        self.client
            .update_item()
            .table_name(&self.tables.explore_profile)
            .set_key(Some(id_key(id)))
            .update_expression("SET dutyRanges = :ranges")
            .condition_expression("attribute_exists(id)")
            .expression_attribute_values(":ranges", to_attribute_value(ranges)?)
            .send()
            .await
            .map_err(Error::store)?;
        Ok(())
    }
}

#[async_trait]
impl DataStore for DynamoStore {
    async fn get_shift(&self, id: &str) -> Result<Option<Shift>> {
        self.get(&self.tables.shift, id).await
    }

    async fn put_shift(&self, shift: &Shift) -> Result<()> {
        self.put(&self.tables.shift, shift).await
    }

    async fn list_shifts_by_profile(&self, profile_id: &str) -> Result<Vec<Shift>> {
        self.query_index(&self.tables.shift, BY_PROFILE_INDEX, "profileID", profile_id)
            .await
    }

    async fn scan_shifts(&self, cursor: Option<&str>, limit: u32) -> Result<Page<Shift>> {
        self.scan(&self.tables.shift, cursor, limit).await
    }

    async fn get_alarm(&self, id: &str) -> Result<Option<ShiftAlarm>> {
        self.get(&self.tables.shift_alarm, id).await
    }

    async fn put_alarm(&self, alarm: &ShiftAlarm) -> Result<()> {
        self.put(&self.tables.shift_alarm, alarm).await
    }

    async fn delete_alarm(&self, id: &str) -> Result<()> {
        // DeleteItem on a missing key is not an error in DynamoDB.
        self.client
            .delete_item()
            .table_name(&self.tables.shift_alarm)
            .set_key(Some(id_key(id)))
            .send()
            .await
            .map_err(Error::store)?;
        Ok(())
    }

    async fn list_alarms_by_shift(&self, shift_id: &str) -> Result<Vec<ShiftAlarm>> {
        self.query_index(&self.tables.shift_alarm, BY_SHIFT_INDEX, "shiftID", shift_id)
            .await
    }

    async fn get_profile(&self, id: &str) -> Result<Option<Profile>> {
        self.get(&self.tables.profile, id).await
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        self.get(&self.tables.user, id).await
    }

    async fn get_subscription(&self, id: &str) -> Result<Option<ProfileSubscription>> {
        self.get(&self.tables.subscription, id).await
    }

    async fn list_subscriptions_by_profile(
        &self,
        profile_id: &str,
    ) -> Result<Vec<ProfileSubscription>> {
        self.query_index(
            &self.tables.subscription,
            BY_PROFILE_INDEX,
            "profileID",
            profile_id,
        )
        .await
    }

    async fn scan_explore_profiles(
        &self,
        cursor: Option<&str>,
        limit: u32,
    ) -> Result<Page<ExploreProfile>> {
        self.scan(&self.tables.explore_profile, cursor, limit).await
    }

    async fn put_duty_ranges(&self, updates: &[(String, Vec<Interval>)]) -> Result<()> {
        for chunk in updates.chunks(WRITE_FAN_OUT) {
            try_join_all(
                chunk
                    .iter()
                    .map(|(id, ranges)| self.update_duty_ranges(id, ranges)),
            )
            .await?;
        }
        Ok(())
    }
}
