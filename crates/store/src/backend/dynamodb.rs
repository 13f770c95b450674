//! DynamoDB client for [`KeyValueBackend`](super::key_value::KeyValueBackend).
//!
//! Uses the AWS SDK's default credential chain. Like the Bigtable client it
//! blocks on a private tokio runtime.

use std::collections::HashMap;

use aws_config::{BehaviorVersion, Region};
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::AttributeValue as DynamoValue;
use aws_sdk_dynamodb::Client;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info};

use super::key_value::{AttributeValue, Item, KeyValueTable};
use crate::{KeyValueConfig, StoreError, StoreResult};

pub struct DynamoDbTable {
    client: Client,
    table_name: String,
    runtime: Runtime,
}

impl DynamoDbTable {
    pub fn connect(config: &KeyValueConfig) -> StoreResult<Self> {
        if config.region.is_empty() || config.table_name.is_empty() {
            return Err(StoreError::backend(
                "dynamodb backend needs both a region and a table name",
            ));
        }

        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("dynamodb-client")
            .enable_all()
            .build()
            .map_err(StoreError::backend)?;

        let sdk_config = runtime.block_on(
            aws_config::defaults(BehaviorVersion::latest())
                .region(Region::new(config.region.clone()))
                .load(),
        );

        info!(region = %config.region, table = %config.table_name, "dynamodb client ready");
        Ok(Self {
            client: Client::new(&sdk_config),
            table_name: config.table_name.clone(),
            runtime,
        })
    }
}

fn from_dynamo(attributes: &HashMap<String, DynamoValue>) -> Item {
    attributes
        .iter()
        .filter_map(|(name, value)| {
            let value = match value {
                DynamoValue::S(text) => AttributeValue::S(text.clone()),
                DynamoValue::B(blob) => AttributeValue::B(blob.as_ref().to_vec()),
                _ => {
                    debug!(attribute = %name, "skipping attribute of unsupported type");
                    return None;
                }
            };
            Some((name.clone(), value))
        })
        .collect()
}

fn to_dynamo(item: Item) -> HashMap<String, DynamoValue> {
    item.into_iter()
        .map(|(name, value)| {
            let value = match value {
                AttributeValue::S(text) => DynamoValue::S(text),
                AttributeValue::B(bytes) => DynamoValue::B(Blob::new(bytes)),
            };
            (name, value)
        })
        .collect()
}

impl KeyValueTable for DynamoDbTable {
    fn get_item(&self, key_attribute: &str, key: &str) -> StoreResult<Option<Item>> {
        let output = self
            .runtime
            .block_on(
                self.client
                    .get_item()
                    .table_name(&self.table_name)
                    .key(key_attribute, DynamoValue::S(key.to_string()))
                    .send(),
            )
            .map_err(|err| StoreError::transport(DisplayErrorContext(&err)))?;

        Ok(output.item().map(from_dynamo))
    }

    fn put_item(&self, _key_attribute: &str, item: Item) -> StoreResult<()> {
        self.runtime
            .block_on(
                self.client
                    .put_item()
                    .table_name(&self.table_name)
                    .set_item(Some(to_dynamo(item)))
                    .send(),
            )
            .map(|_| ())
            .map_err(|err| StoreError::transport(DisplayErrorContext(&err)))
    }
}
