//! Client REST API under `/api/clients`.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    middleware,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::clients::{
    ClientInput, ClientView, Currency, GroupCounts, Nationality, Page, PageRequest,
    SearchFilter, SortDirection, SortField,
};
use crate::http::error::ApiError;
use crate::http::middleware::track_api_call;
use crate::http::server::AppState;
use crate::observability::metrics::MetricsRecorder;

type ApiResult<T> = Result<T, ApiError>;

/// Every route here is timed by [`track_api_call`].
pub fn routes(metrics: Arc<MetricsRecorder>) -> Router<AppState> {
    Router::new()
        .route("/api/clients", get(list).post(create))
        .route("/api/clients/search", get(search))
        .route("/api/clients/recent", get(recent))
        .route("/api/clients/age", get(by_age))
        .route("/api/clients/statistics/currency", get(currency_statistics))
        .route("/api/clients/statistics/nationality", get(nationality_statistics))
        .route("/api/clients/account/{account_number}", get(by_account_number))
        .route(
            "/api/clients/{id}",
            get(get_client).put(update).delete(delete_client),
        )
        .route_layer(middleware::from_fn_with_state(metrics, track_api_call))
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort: Option<String>,
    pub direction: Option<String>,
}

impl PageParams {
    fn to_request(&self) -> ApiResult<PageRequest> {
        let base = PageRequest::default();
        let sort = match self.sort.as_deref() {
            Some(s) => s.parse::<SortField>()?,
            None => SortField::default(),
        };
        let direction = match self.direction.as_deref() {
            Some(d) => d.parse::<SortDirection>()?,
            None => SortDirection::default(),
        };
        Ok(PageRequest::new(
            self.page.unwrap_or(base.page),
            self.size.unwrap_or(base.size),
        )
        .sorted(sort, direction))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
    pub currency: Option<String>,
    pub nationality: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort: Option<String>,
    pub direction: Option<String>,
}

impl SearchParams {
    fn page_params(&self) -> PageParams {
        PageParams {
            page: self.page,
            size: self.size,
            sort: self.sort.clone(),
            direction: self.direction.clone(),
        }
    }

    fn to_filter(&self) -> ApiResult<SearchFilter> {
        let currency = self
            .currency
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(str::parse::<Currency>)
            .transpose()?;
        let nationality = self
            .nationality
            .as_deref()
            .filter(|n| !n.is_empty())
            .map(str::parse::<Nationality>)
            .transpose()?;
        Ok(SearchFilter {
            term: self.query.clone(),
            currency,
            nationality,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgeParams {
    pub min_age: u32,
    pub max_age: u32,
}

type PathResult<T> = Result<Path<T>, PathRejection>;
type QueryResult<T> = Result<Query<T>, QueryRejection>;
type JsonResult<T> = Result<Json<T>, JsonRejection>;

async fn list(
    State(state): State<AppState>,
    params: QueryResult<PageParams>,
) -> ApiResult<Json<Page<ClientView>>> {
    let Query(params) = params?;
    let page = params.to_request()?;
    Ok(Json(state.clients.list(page).await?))
}

async fn search(
    State(state): State<AppState>,
    params: QueryResult<SearchParams>,
) -> ApiResult<Json<Page<ClientView>>> {
    let Query(params) = params?;
    let filter = params.to_filter()?;
    let page = params.page_params().to_request()?;
    Ok(Json(state.clients.search(filter, page).await?))
}

async fn get_client(
    State(state): State<AppState>,
    id: PathResult<i64>,
) -> ApiResult<Json<ClientView>> {
    let Path(id) = id?;
    Ok(Json(state.clients.get(id).await?))
}

async fn by_account_number(
    State(state): State<AppState>,
    account_number: PathResult<String>,
) -> ApiResult<Json<ClientView>> {
    let Path(account_number) = account_number?;
    Ok(Json(state.clients.get_by_account_number(&account_number).await?))
}

async fn create(
    State(state): State<AppState>,
    payload: JsonResult<ClientInput>,
) -> ApiResult<(StatusCode, Json<ClientView>)> {
    let Json(input) = payload?;
    let created = state.clients.create(input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update(
    State(state): State<AppState>,
    id: PathResult<i64>,
    payload: JsonResult<ClientInput>,
) -> ApiResult<Json<ClientView>> {
    let Path(id) = id?;
    let Json(input) = payload?;
    Ok(Json(state.clients.update(id, input).await?))
}

async fn delete_client(
    State(state): State<AppState>,
    id: PathResult<i64>,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    state.clients.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn by_age(
    State(state): State<AppState>,
    params: QueryResult<AgeParams>,
) -> ApiResult<Json<Vec<ClientView>>> {
    let Query(params) = params?;
    Ok(Json(
        state.clients.by_age(params.min_age, params.max_age).await?,
    ))
}

async fn currency_statistics(
    State(state): State<AppState>,
) -> ApiResult<Json<GroupCounts<Currency>>> {
    Ok(Json(state.clients.currency_statistics().await?))
}

async fn nationality_statistics(
    State(state): State<AppState>,
) -> ApiResult<Json<GroupCounts<Nationality>>> {
    Ok(Json(state.clients.nationality_statistics().await?))
}

async fn recent(State(state): State<AppState>) -> ApiResult<Json<Vec<ClientView>>> {
    Ok(Json(state.clients.recent().await?))
}
