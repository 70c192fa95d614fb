//! Client use cases on top of a [`ClientStore`].

use chrono::{Days, Months, NaiveDate, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::clients::error::ClientError;
use crate::clients::model::{
    Client, ClientInput, ClientView, Currency, GroupCounts, GroupField, NewClient, Nationality, Page,
    PageRequest, SearchFilter,
};
use crate::clients::store::ClientStore;

const RECENT_LIMIT: u32 = 10;

#[derive(Clone)]
pub struct ClientService {
    store: Arc<dyn ClientStore>,
}

impl ClientService {
    pub fn new(store: Arc<dyn ClientStore>) -> Self {
        Self { store }
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    fn view(client: &Client) -> ClientView {
        client.view(Self::today())
    }

    pub async fn list(&self, page: PageRequest) -> Result<Page<ClientView>, ClientError> {
        self.search(SearchFilter::default(), page).await
    }

    pub async fn search(
        &self,
        filter: SearchFilter,
        page: PageRequest,
    ) -> Result<Page<ClientView>, ClientError> {
        let result = self.store.search(&filter, &page).await?;
        tracing::debug!(
            term = ?filter.term(),
            currency = ?filter.currency,
            nationality = ?filter.nationality,
            total = result.total_elements,
            "Client search"
        );
        Ok(result.map(|c| Self::view(&c)))
    }

    pub async fn get(&self, id: i64) -> Result<ClientView, ClientError> {
        self.store
            .find_by_id(id)
            .await?
            .map(|c| Self::view(&c))
            .ok_or_else(|| ClientError::not_found_id(id))
    }

    pub async fn get_by_account_number(&self, account: &str) -> Result<ClientView, ClientError> {
        self.store
            .find_by_account_number(account)
            .await?
            .map(|c| Self::view(&c))
            .ok_or_else(|| {
                ClientError::NotFound(format!("Client with account number {account} not found"))
            })
    }

    pub async fn get_by_unique_id(&self, unique_id: &str) -> Result<ClientView, ClientError> {
        self.store
            .find_by_unique_id(unique_id)
            .await?
            .map(|c| Self::view(&c))
            .ok_or_else(|| ClientError::NotFound(format!("Client {unique_id} not found")))
    }

    pub async fn create(&self, input: ClientInput) -> Result<ClientView, ClientError> {
        let input = input.validate(Self::today())?;

        if let Some(account) = &input.account_number {
            if self.store.exists_by_account_number(account).await? {
                return Err(ClientError::AlreadyExists(format!(
                    "Client with account number {account} already exists"
                )));
            }
        }
        if self.store.exists_by_phone_number(&input.phone_number).await? {
            return Err(ClientError::AlreadyExists(format!(
                "Client with phone number {} already exists",
                input.phone_number
            )));
        }

        let account_number = match input.account_number {
            Some(account) => account,
            None => self.store.next_account_number().await?,
        };

        let created = self
            .store
            .insert(NewClient {
                unique_id: Uuid::new_v4().to_string(),
                last_name: input.last_name,
                first_name: input.first_name,
                middle_name: input.middle_name,
                birth_date: input.birth_date,
                account_number,
                currency: input.currency,
                nationality: input.nationality,
                phone_number: input.phone_number,
            })
            .await?;

        tracing::info!(
            id = created.id,
            unique_id = %created.unique_id,
            account = %created.account_number,
            "Client created"
        );
        Ok(Self::view(&created))
    }

    pub async fn update(&self, id: i64, input: ClientInput) -> Result<ClientView, ClientError> {
        let input = input.validate(Self::today())?;
        let existing = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| ClientError::not_found_id(id))?;

        if let Some(expected) = input.version {
            if expected != existing.version {
                return Err(ClientError::Conflict(format!(
                    "Client {id} is at version {}, not {expected}",
                    existing.version
                )));
            }
        }

        if let Some(account) = &input.account_number {
            if *account != existing.account_number
                && self.store.exists_by_account_number(account).await?
            {
                return Err(ClientError::AlreadyExists(format!(
                    "Client with account number {account} already exists"
                )));
            }
        }
        if input.phone_number != existing.phone_number
            && self.store.exists_by_phone_number(&input.phone_number).await?
        {
            return Err(ClientError::AlreadyExists(format!(
                "Client with phone number {} already exists",
                input.phone_number
            )));
        }

        let updated = Client {
            last_name: input.last_name,
            first_name: input.first_name,
            middle_name: input.middle_name,
            birth_date: input.birth_date,
            account_number: input
                .account_number
                .unwrap_or_else(|| existing.account_number.clone()),
            currency: input.currency,
            nationality: input.nationality,
            phone_number: input.phone_number,
            ..existing
        };

        let saved = self.store.update(&updated).await?;
        tracing::info!(id, version = saved.version, "Client updated");
        Ok(Self::view(&saved))
    }

    pub async fn delete(&self, id: i64) -> Result<(), ClientError> {
        if !self.store.delete_by_id(id).await? {
            return Err(ClientError::not_found_id(id));
        }
        tracing::info!(id, "Client deleted");
        Ok(())
    }

    /// Clients whose age in whole years lies in `[min_age, max_age]`.
    pub async fn by_age(&self, min_age: u32, max_age: u32) -> Result<Vec<ClientView>, ClientError> {
        let (from, to) = age_window(Self::today(), min_age, max_age)?;
        let clients = self.store.find_by_birth_date_between(from, to).await?;
        Ok(clients.iter().map(Self::view).collect())
    }

    pub async fn currency_statistics(&self) -> Result<GroupCounts<Currency>, ClientError> {
        let rows = self.store.count_grouped_by(GroupField::Currency).await?;
        let groups = rows
            .into_iter()
            .map(|(value, count)| value.parse::<Currency>().map(|c| (c, count)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(GroupCounts::new(groups))
    }

    pub async fn nationality_statistics(&self) -> Result<GroupCounts<Nationality>, ClientError> {
        let rows = self.store.count_grouped_by(GroupField::Nationality).await?;
        let groups = rows
            .into_iter()
            .map(|(value, count)| value.parse::<Nationality>().map(|n| (n, count)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(GroupCounts::new(groups))
    }

    pub async fn recent(&self) -> Result<Vec<ClientView>, ClientError> {
        let clients = self.store.recent(RECENT_LIMIT).await?;
        Ok(clients.iter().map(Self::view).collect())
    }

    pub async fn count(&self) -> Result<i64, ClientError> {
        self.store.count().await
    }
}

/// Birth-date bounds for an age range, both inclusive.
///
/// The youngest qualifying client was born `min_age` years ago today; the
/// oldest turns `max_age + 1` tomorrow.
pub fn age_window(
    today: NaiveDate,
    min_age: u32,
    max_age: u32,
) -> Result<(NaiveDate, NaiveDate), ClientError> {
    if min_age > max_age {
        return Err(ClientError::InvalidArgument(format!(
            "minAge ({min_age}) must not exceed maxAge ({max_age})"
        )));
    }
    if max_age > 150 {
        return Err(ClientError::InvalidArgument(format!(
            "maxAge ({max_age}) is out of range"
        )));
    }

    let to = today
        .checked_sub_months(Months::new(min_age * 12))
        .ok_or_else(|| ClientError::InvalidArgument("minAge out of range".into()))?;
    let from = today
        .checked_sub_months(Months::new((max_age + 1) * 12))
        .and_then(|d| d.checked_add_days(Days::new(1)))
        .ok_or_else(|| ClientError::InvalidArgument("maxAge out of range".into()))?;

    Ok((from, to))
}
