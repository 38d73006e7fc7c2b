//! dynamo-store — DynamoDB adapter implementing the `LinkStore` port.
//!
//! Production implementation backed by `aws-sdk-dynamodb`, supporting both
//! physical layouts that exist in the field:
//! - By-code layout (default): items keyed by `code`. `PutMode::IfAbsent`
//!   maps to a conditional put (`attribute_not_exists(code)`), which is the
//!   atomic uniqueness guarantee the service relies on.
//! - Partitioned layout: items keyed by an opaque `execution_id`, with a
//!   global secondary index on `code` used for lookups. Selected by setting
//!   `DYNAMO_CODE_INDEX`.
//!
//! Provides `from_env()` wiring for Lambda/apps using env vars:
//! `DYNAMO_TABLE_LINKS`, optional `DYNAMO_CODE_INDEX`.
//!
//! Notes:
//! - The domain `LinkStore` trait is synchronous. We bridge to the async AWS
//!   SDK using an internal `tokio::runtime::Runtime` and `block_on` when not
//!   already inside a runtime (Lambda reuses the existing one).

use aws_sdk_dynamodb::{types::AttributeValue, Client};
use aws_smithy_types::error::metadata::ProvideErrorMetadata;
use domain::{Code, CoreError, Link, LinkStore, PutMode};
use rand::Rng;
use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Physical table layout the store operates against.
#[derive(Clone, Debug)]
pub enum DynamoLayout {
    /// Partition key is `code`; conditional writes enforce uniqueness.
    ByCode,
    /// Partition key is `execution_id`; `code` is reached through the named
    /// global secondary index.
    Partitioned { code_index: String },
}

/// Link store backed by AWS DynamoDB.
///
/// Supports both standalone mode (creates its own Tokio runtime) and Lambda
/// mode (reuses the existing runtime via `Handle::current()`).
#[derive(Clone)]
pub struct DynamoStore {
    table_links: String,
    layout: DynamoLayout,
    client: Client,
    // Optional runtime - None when running inside Lambda (reuses existing runtime)
    rt: Option<std::sync::Arc<tokio::runtime::Runtime>>,
}

impl DynamoStore {
    /// Create a new store from an explicit table name, layout, and AWS SDK client.
    ///
    /// If called from within a Tokio runtime (e.g., Lambda), reuses the existing
    /// runtime. Otherwise creates a new runtime.
    pub fn with_client(
        table_links: impl Into<String>,
        layout: DynamoLayout,
        client: Client,
    ) -> Result<Self, CoreError> {
        let rt = Self::maybe_create_runtime()?;
        Ok(Self {
            table_links: table_links.into(),
            layout,
            client,
            rt,
        })
    }

    /// Construct with a table name and layout, creating a default AWS SDK
    /// client using env/IMDS.
    pub fn new(table_links: impl Into<String>, layout: DynamoLayout) -> Result<Self, CoreError> {
        let rt = Self::maybe_create_runtime()?;
        let conf = Self::block_on_with_rt(&rt, aws_config::load_from_env());
        let client = Client::new(&conf);
        Ok(Self {
            table_links: table_links.into(),
            layout,
            client,
            rt,
        })
    }

    /// Construct from environment variables expected by the apps:
    /// - `DYNAMO_TABLE_LINKS` (required)
    /// - `DYNAMO_CODE_INDEX` (optional; presence selects the partitioned layout)
    pub fn from_env() -> Result<Self, CoreError> {
        let table = std::env::var("DYNAMO_TABLE_LINKS")
            .map_err(|_| CoreError::Storage("missing DYNAMO_TABLE_LINKS".into()))?;
        let layout = match std::env::var("DYNAMO_CODE_INDEX") {
            Ok(idx) if !idx.is_empty() => {
                tracing::warn!(
                    code_index = %idx,
                    "partitioned layout selected; code uniqueness is guarded by an \
                     index read before the write, not by a conditional put"
                );
                DynamoLayout::Partitioned { code_index: idx }
            }
            _ => DynamoLayout::ByCode,
        };
        Self::new(table, layout)
    }

    /// Check if we're inside a Tokio runtime. If yes, return None (reuse existing).
    /// If no, create a new runtime.
    fn maybe_create_runtime(
    ) -> Result<Option<std::sync::Arc<tokio::runtime::Runtime>>, CoreError> {
        if tokio::runtime::Handle::try_current().is_ok() {
            // Already inside a runtime (e.g., Lambda) - don't create another
            Ok(None)
        } else {
            // Standalone mode - create our own runtime
            let rt = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .map_err(|e| CoreError::Storage(format!("tokio runtime init: {e}")))?;
            Ok(Some(std::sync::Arc::new(rt)))
        }
    }

    /// Run an async future, using either our owned runtime or the current runtime.
    fn block_on<F: std::future::Future>(&self, fut: F) -> F::Output {
        Self::block_on_with_rt(&self.rt, fut)
    }

    fn block_on_with_rt<F: std::future::Future>(
        rt: &Option<std::sync::Arc<tokio::runtime::Runtime>>,
        fut: F,
    ) -> F::Output {
        match rt {
            Some(rt) => rt.block_on(fut),
            None => {
                // We're inside an existing runtime - use block_in_place + Handle::current()
                tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(fut))
            }
        }
    }

    fn put_by_code(&self, link: &Link, mode: PutMode) -> Result<(), CoreError> {
        let table = self.table_links.clone();
        let item = link_to_item(link);
        let fut = async {
            let mut req = self
                .client
                .put_item()
                .table_name(table)
                .set_item(Some(item));
            if mode == PutMode::IfAbsent {
                req = req
                    .condition_expression("attribute_not_exists(#c)")
                    .expression_attribute_names("#c", "code");
            }
            req.send().await
        };
        self.block_on(fut).map_err(|e| match e.as_service_error() {
            Some(se) if se.code() == Some("ConditionalCheckFailedException") => {
                CoreError::AlreadyExists
            }
            _ => map_sdk_err(e),
        })?;
        Ok(())
    }

    fn put_partitioned(&self, link: &Link, mode: PutMode) -> Result<(), CoreError> {
        // The partition key is unrelated to the code, so the code-level
        // uniqueness guard is the index lookup preceding the write. The
        // conditional expression only protects the (fresh) partition key.
        if mode == PutMode::IfAbsent && self.get_by_code(&link.code)?.is_some() {
            return Err(CoreError::AlreadyExists);
        }
        let mut stored = link.clone();
        if stored.owner_execution_id.is_none() {
            stored.owner_execution_id = Some(new_execution_id());
        }
        let table = self.table_links.clone();
        let item = link_to_item(&stored);
        let fut = async {
            self.client
                .put_item()
                .table_name(table)
                .set_item(Some(item))
                .condition_expression("attribute_not_exists(execution_id)")
                .send()
                .await
        };
        self.block_on(fut).map_err(|e| match e.as_service_error() {
            Some(se) if se.code() == Some("ConditionalCheckFailedException") => {
                CoreError::AlreadyExists
            }
            _ => map_sdk_err(e),
        })?;
        Ok(())
    }
}

impl LinkStore for DynamoStore {
    fn put(&self, link: Link, mode: PutMode) -> Result<(), CoreError> {
        match &self.layout {
            DynamoLayout::ByCode => self.put_by_code(&link, mode),
            DynamoLayout::Partitioned { .. } => self.put_partitioned(&link, mode),
        }
    }

    fn get_by_code(&self, code: &Code) -> Result<Option<Link>, CoreError> {
        match &self.layout {
            DynamoLayout::ByCode => {
                let table = self.table_links.clone();
                let key_code = code.as_str().to_string();
                let fut = async {
                    self.client
                        .get_item()
                        .table_name(table)
                        .key("code", AttributeValue::S(key_code))
                        .send()
                        .await
                };
                let out = self.block_on(fut).map_err(map_sdk_err)?;
                match out.item() {
                    Some(item) => Ok(Some(item_to_link(item)?)),
                    None => Ok(None),
                }
            }
            DynamoLayout::Partitioned { code_index } => {
                let table = self.table_links.clone();
                let index = code_index.clone();
                let key_code = code.as_str().to_string();
                let fut = async {
                    self.client
                        .query()
                        .table_name(table)
                        .index_name(index)
                        .key_condition_expression("#c = :code")
                        .expression_attribute_names("#c", "code")
                        .expression_attribute_values(":code", AttributeValue::S(key_code))
                        .limit(1)
                        .send()
                        .await
                };
                let out = self.block_on(fut).map_err(map_sdk_err)?;
                match out.items().first() {
                    Some(item) => Ok(Some(item_to_link(item)?)),
                    None => Ok(None),
                }
            }
        }
    }
}

fn link_to_item(link: &Link) -> HashMap<String, AttributeValue> {
    let mut m = HashMap::new();
    m.insert(
        "code".into(),
        AttributeValue::S(link.code.as_str().to_string()),
    );
    m.insert("long_url".into(), AttributeValue::S(link.long_url.clone()));
    m.insert(
        "created_at".into(),
        AttributeValue::N(system_time_to_secs(link.created_at).to_string()),
    );
    if let Some(ref owner) = link.owner_execution_id {
        m.insert("execution_id".into(), AttributeValue::S(owner.clone()));
    }
    m
}

fn item_to_link(item: &HashMap<String, AttributeValue>) -> Result<Link, CoreError> {
    let code = item
        .get("code")
        .and_then(|v| v.as_s().ok())
        .ok_or_else(|| CoreError::Storage("item missing code".into()))?;
    let long_url = item
        .get("long_url")
        .and_then(|v| v.as_s().ok())
        .map(|s| s.to_string())
        .unwrap_or_default();
    let created_at = item
        .get("created_at")
        .and_then(|v| v.as_n().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);
    let owner = item
        .get("execution_id")
        .and_then(|v| v.as_s().ok())
        .map(|s| s.to_string());

    let code = Code::new(code.to_string())
        .map_err(|e| CoreError::Storage(format!("bad stored code: {e}")))?;
    let mut link = Link::new(code, long_url, secs_to_system_time(created_at));
    link.owner_execution_id = owner;
    Ok(link)
}

fn map_sdk_err<E, R>(e: aws_sdk_dynamodb::error::SdkError<E, R>) -> CoreError
where
    E: std::fmt::Debug,
    R: std::fmt::Debug,
{
    CoreError::Storage(format!("dynamodb: {e:?}"))
}

/// Opaque partition key for the partitioned layout. Millisecond timestamp
/// plus a random component so two writes in the same millisecond still get
/// distinct keys.
fn new_execution_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    let salt: u64 = rand::rng().random();
    format!("{:x}_{:016x}", millis, salt)
}

fn system_time_to_secs(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

fn secs_to_system_time(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_link() -> Link {
        Link::new(
            Code::new("abc123").unwrap(),
            "https://example.com".into(),
            secs_to_system_time(1_700_000_000),
        )
    }

    #[test]
    fn roundtrip_item_mapping() {
        let link = sample_link();
        let item = link_to_item(&link);
        let link2 = item_to_link(&item).unwrap();
        assert_eq!(link.code, link2.code);
        assert_eq!(link.long_url, link2.long_url);
        assert_eq!(
            system_time_to_secs(link.created_at),
            system_time_to_secs(link2.created_at)
        );
        assert!(link2.owner_execution_id.is_none());
    }

    #[test]
    fn partitioned_item_carries_execution_id() {
        let mut link = sample_link();
        link.owner_execution_id = Some("exec-1".into());
        let item = link_to_item(&link);
        assert!(item.contains_key("execution_id"));
        let link2 = item_to_link(&item).unwrap();
        assert_eq!(link2.owner_execution_id.as_deref(), Some("exec-1"));
    }

    #[test]
    fn item_without_code_is_an_error() {
        let mut item = link_to_item(&sample_link());
        item.remove("code");
        assert!(matches!(item_to_link(&item), Err(CoreError::Storage(_))));
    }

    #[test]
    fn item_with_missing_url_maps_to_empty_string() {
        // Corrupted records surface as empty long_url; the service treats
        // that the same as not-found.
        let mut item = link_to_item(&sample_link());
        item.remove("long_url");
        let link = item_to_link(&item).unwrap();
        assert!(link.long_url.is_empty());
    }

    #[test]
    fn execution_ids_differ_within_the_same_millisecond() {
        // Back-to-back calls land in the same millisecond; the random salt
        // must still keep the partition keys distinct, otherwise a second
        // create in that window trips the conditional put and reports a
        // bogus conflict.
        let ids: std::collections::BTreeSet<String> =
            (0..1000).map(|_| new_execution_id()).collect();
        assert_eq!(ids.len(), 1000);
    }
}
