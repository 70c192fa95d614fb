//! Postgres-backed [`ClientStore`].
//!
//! Every call acquires through the resilient pool, so while the database is
//! marked down each method fails immediately with `DbError::Unavailable`.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::{Postgres, QueryBuilder, Row};
use std::sync::Arc;

use crate::clients::error::ClientError;
use crate::clients::model::{
    Client, GroupField, NewClient, Page, PageRequest, SearchFilter,
};
use crate::clients::store::{ClientStore, FIRST_ACCOUNT_NUMBER};
use crate::db::{DbError, PgDatabase, ResilientPool};

const COLUMNS: &str = "id, unique_id, last_name, first_name, middle_name, birth_date, \
     account_number, currency, nationality, phone_number, created_at, updated_at, version";

const NEXT_ACCOUNT_SQL: &str = "SELECT CONCAT('1', LPAD(CAST(COALESCE(MAX(CAST(SUBSTRING(account_number, 2) AS NUMERIC)), 0) + 1 AS VARCHAR), 19, '0')) \
     FROM clients WHERE account_number ~ '^1[0-9]{19}$'";

pub struct PgClientStore {
    pool: Arc<ResilientPool<PgDatabase>>,
}

impl PgClientStore {
    pub fn new(pool: Arc<ResilientPool<PgDatabase>>) -> Self {
        Self { pool }
    }

    async fn fetch_one_by(&self, column: &str, value: &str) -> Result<Option<Client>, ClientError> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!("SELECT {COLUMNS} FROM clients WHERE {column} = $1");
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&mut *conn)
            .await?;
        row.as_ref().map(client_from_row).transpose()
    }

    async fn exists_by(&self, column: &str, value: &str) -> Result<bool, ClientError> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!("SELECT EXISTS (SELECT 1 FROM clients WHERE {column} = $1)");
        let exists: bool = sqlx::query_scalar(&sql)
            .bind(value)
            .fetch_one(&mut *conn)
            .await?;
        Ok(exists)
    }
}

#[async_trait]
impl ClientStore for PgClientStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Client>, ClientError> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!("SELECT {COLUMNS} FROM clients WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        row.as_ref().map(client_from_row).transpose()
    }

    async fn find_by_unique_id(&self, unique_id: &str) -> Result<Option<Client>, ClientError> {
        self.fetch_one_by("unique_id", unique_id).await
    }

    async fn find_by_account_number(&self, account: &str) -> Result<Option<Client>, ClientError> {
        self.fetch_one_by("account_number", account).await
    }

    async fn exists_by_account_number(&self, account: &str) -> Result<bool, ClientError> {
        self.exists_by("account_number", account).await
    }

    async fn exists_by_phone_number(&self, phone: &str) -> Result<bool, ClientError> {
        self.exists_by("phone_number", phone).await
    }

    async fn search(
        &self,
        filter: &SearchFilter,
        page: &PageRequest,
    ) -> Result<Page<Client>, ClientError> {
        let mut conn = self.pool.acquire().await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM clients");
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&mut *conn).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM clients"));
        push_filters(&mut select, filter);
        select
            .push(format!(
                " ORDER BY {} {}, id ASC LIMIT ",
                page.sort.column(),
                page.direction.keyword()
            ))
            .push_bind(i64::from(page.size))
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);

        let rows = select.build().fetch_all(&mut *conn).await?;
        let content = rows.iter().map(client_from_row).collect::<Result<Vec<_>, _>>()?;

        Ok(Page::new(content, page, total.max(0) as u64))
    }

    async fn find_by_birth_date_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Client>, ClientError> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!(
            "SELECT {COLUMNS} FROM clients WHERE birth_date BETWEEN $1 AND $2 ORDER BY birth_date, id"
        );
        let rows = sqlx::query(&sql)
            .bind(from)
            .bind(to)
            .fetch_all(&mut *conn)
            .await?;
        rows.iter().map(client_from_row).collect()
    }

    async fn count_grouped_by(&self, field: GroupField) -> Result<Vec<(String, i64)>, ClientError> {
        let mut conn = self.pool.acquire().await?;
        let column = field.column();
        let sql = format!(
            "SELECT {column}, COUNT(*) FROM clients GROUP BY {column} ORDER BY COUNT(*) DESC, {column}"
        );
        let rows: Vec<(String, i64)> = sqlx::query_as(&sql).fetch_all(&mut *conn).await?;
        Ok(rows)
    }

    async fn recent(&self, limit: u32) -> Result<Vec<Client>, ClientError> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!("SELECT {COLUMNS} FROM clients ORDER BY created_at DESC, id DESC LIMIT $1");
        let rows = sqlx::query(&sql)
            .bind(i64::from(limit))
            .fetch_all(&mut *conn)
            .await?;
        rows.iter().map(client_from_row).collect()
    }

    async fn insert(&self, client: NewClient) -> Result<Client, ClientError> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!(
            "INSERT INTO clients (unique_id, last_name, first_name, middle_name, birth_date, \
             account_number, currency, nationality, phone_number, created_at, updated_at, version) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW(), NOW(), 0) RETURNING {COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&client.unique_id)
            .bind(&client.last_name)
            .bind(&client.first_name)
            .bind(&client.middle_name)
            .bind(client.birth_date)
            .bind(&client.account_number)
            .bind(client.currency.code())
            .bind(client.nationality.tag())
            .bind(&client.phone_number)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| ClientError::from_db(DbError::Sqlx(e), "Client with this account or phone"))?;
        client_from_row(&row)
    }

    async fn update(&self, client: &Client) -> Result<Client, ClientError> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!(
            "UPDATE clients SET last_name = $1, first_name = $2, middle_name = $3, birth_date = $4, \
             account_number = $5, currency = $6, nationality = $7, phone_number = $8, \
             updated_at = NOW(), version = version + 1 \
             WHERE id = $9 AND version = $10 RETURNING {COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&client.last_name)
            .bind(&client.first_name)
            .bind(&client.middle_name)
            .bind(client.birth_date)
            .bind(&client.account_number)
            .bind(client.currency.code())
            .bind(client.nationality.tag())
            .bind(&client.phone_number)
            .bind(client.id)
            .bind(client.version)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| ClientError::from_db(DbError::Sqlx(e), "Client with this account or phone"))?;

        match row {
            Some(row) => client_from_row(&row),
            None => Err(ClientError::Conflict(format!(
                "Client {} was modified concurrently, reload and retry",
                client.id
            ))),
        }
    }

    async fn delete_by_id(&self, id: i64) -> Result<bool, ClientError> {
        let mut conn = self.pool.acquire().await?;
        let result = sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64, ClientError> {
        let mut conn = self.pool.acquire().await?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clients")
            .fetch_one(&mut *conn)
            .await?;
        Ok(count)
    }

    async fn delete_all(&self) -> Result<u64, ClientError> {
        let mut conn = self.pool.acquire().await?;
        let result = sqlx::query("DELETE FROM clients").execute(&mut *conn).await?;
        Ok(result.rows_affected())
    }

    async fn next_account_number(&self) -> Result<String, ClientError> {
        let mut conn = self.pool.acquire().await?;
        let next: Option<String> = sqlx::query_scalar(NEXT_ACCOUNT_SQL)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(next
            .filter(|n| n.len() == 20)
            .unwrap_or_else(|| FIRST_ACCOUNT_NUMBER.to_string()))
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &SearchFilter) {
    qb.push(" WHERE TRUE");
    if let Some(term) = filter.term() {
        let pattern = format!("%{}%", escape_like(term));
        qb.push(" AND (last_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR first_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR middle_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR account_number LIKE ")
            .push_bind(pattern.clone())
            .push(" OR phone_number LIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(currency) = filter.currency {
        qb.push(" AND currency = ").push_bind(currency.code());
    }
    if let Some(nationality) = filter.nationality {
        qb.push(" AND nationality = ").push_bind(nationality.tag());
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn client_from_row(row: &PgRow) -> Result<Client, ClientError> {
    let currency: String = row.try_get("currency")?;
    let nationality: String = row.try_get("nationality")?;

    Ok(Client {
        id: row.try_get("id")?,
        unique_id: row.try_get("unique_id")?,
        last_name: row.try_get("last_name")?,
        first_name: row.try_get("first_name")?,
        middle_name: row.try_get("middle_name")?,
        birth_date: row.try_get("birth_date")?,
        account_number: row.try_get("account_number")?,
        currency: currency
            .parse()
            .map_err(|_| DbError::Decode(format!("currency '{currency}'")))?,
        nationality: nationality
            .parse()
            .map_err(|_| DbError::Decode(format!("nationality '{nationality}'")))?,
        phone_number: row.try_get("phone_number")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        version: row.try_get("version")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::model::{Currency, Nationality};

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("Иванов"), "Иванов");
    }

    #[test]
    fn filters_render_in_order() {
        let filter = SearchFilter {
            term: Some("  ivan ".into()),
            currency: Some(Currency::Eur),
            nationality: Some(Nationality::Russia),
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM clients");
        push_filters(&mut qb, &filter);
        let sql = qb.sql();
        assert!(sql.contains("last_name ILIKE $1"));
        assert!(sql.contains("phone_number LIKE $5"));
        assert!(sql.ends_with("AND currency = $6 AND nationality = $7"));
    }

    #[test]
    fn empty_filter_matches_everything() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM clients");
        push_filters(&mut qb, &SearchFilter::default());
        assert_eq!(qb.sql(), "SELECT COUNT(*) FROM clients WHERE TRUE");
    }
}
