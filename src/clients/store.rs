//! Record-store capability consumed by the client service.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::clients::error::ClientError;
use crate::clients::model::{Client, GroupField, NewClient, Page, PageRequest, SearchFilter};

/// First account number handed out on an empty table.
pub const FIRST_ACCOUNT_NUMBER: &str = "10000000000000000001";

#[async_trait]
pub trait ClientStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Client>, ClientError>;

    async fn find_by_unique_id(&self, unique_id: &str) -> Result<Option<Client>, ClientError>;

    async fn find_by_account_number(&self, account: &str) -> Result<Option<Client>, ClientError>;

    async fn exists_by_account_number(&self, account: &str) -> Result<bool, ClientError>;

    async fn exists_by_phone_number(&self, phone: &str) -> Result<bool, ClientError>;

    /// Case-insensitive term match across names, account and phone, ANDed
    /// with the optional currency and nationality filters.
    async fn search(
        &self,
        filter: &SearchFilter,
        page: &PageRequest,
    ) -> Result<Page<Client>, ClientError>;

    /// Inclusive on both ends, ordered by birth date.
    async fn find_by_birth_date_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Client>, ClientError>;

    /// `(stored value, count)` pairs, largest group first.
    async fn count_grouped_by(&self, field: GroupField) -> Result<Vec<(String, i64)>, ClientError>;

    /// Newest first.
    async fn recent(&self, limit: u32) -> Result<Vec<Client>, ClientError>;

    async fn insert(&self, client: NewClient) -> Result<Client, ClientError>;

    /// Write back a modified client. Fails with [`ClientError::Conflict`]
    /// when `client.version` no longer matches the stored row.
    async fn update(&self, client: &Client) -> Result<Client, ClientError>;

    async fn delete_by_id(&self, id: i64) -> Result<bool, ClientError>;

    async fn count(&self) -> Result<i64, ClientError>;

    async fn delete_all(&self) -> Result<u64, ClientError>;

    /// `1` followed by 19 digits, one past the highest such number stored.
    async fn next_account_number(&self) -> Result<String, ClientError>;
}
