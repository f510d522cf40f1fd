use axum::extract::{Path, Query, State};
use axum::Json;
use tracing::debug;

use super::error::ApiError;
use super::{run_query, AppState};
use crate::db::catalog::{self, FacetSource};
use crate::db::models::{EntityId, IdRow, JsonRow, SiteDetails};
use crate::db::{query_ids, query_rows, site_details as load_site_details};
use crate::sql::projection::{self, ProjectionRequest};

pub async fn healthz() -> &'static str {
    "ok"
}

/// `GET /entities/{entity_type}/{category}`: ids matching one category.
pub async fn entity_ids(
    State(state): State<AppState>,
    Path((entity_type, category)): Path<(String, String)>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<IdRow>>, ApiError> {
    let query = catalog::entity_query(&entity_type, &category).ok_or_else(|| {
        ApiError::NotFound(format!("no filter endpoint for {entity_type}/{category}"))
    })?;

    let clause = query.where_clause(&params);
    debug!(%entity_type, %category, "{}", query.statement(&clause.render_inline()));

    let (where_sql, values) = clause.to_sql();
    let sql = query.statement(&where_sql);
    let ids = run_query(&state, move |conn| query_ids(conn, &sql, &values)).await?;

    Ok(Json(ids.into_iter().map(|id| IdRow { id }).collect()))
}

/// `GET /facetValues/{table}`: distinct values of one facet.
pub async fn facet_values(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(request): Query<ProjectionRequest>,
) -> Result<Json<Vec<JsonRow>>, ApiError> {
    let source = catalog::facet_source(&table, request.field.as_deref())
        .ok_or_else(|| ApiError::NotFound(format!("no value lookup for table {table}")))?;

    let sql = match source {
        FacetSource::Fixed(sql) => sql.to_string(),
        FacetSource::Projected { from } => projection::build(&request)?.statement(from),
    };
    debug!(%table, "{sql}");

    let rows = run_query(&state, move |conn| query_rows(conn, &sql, &[])).await?;
    Ok(Json(rows))
}

/// `GET /entities/sitesFouilles/{fid}/details`: the details panel of a site.
pub async fn site_details(
    State(state): State<AppState>,
    Path((entity_type, fid)): Path<(String, String)>,
) -> Result<Json<SiteDetails>, ApiError> {
    if entity_type != "sitesFouilles" {
        return Err(ApiError::NotFound(format!("no details for {entity_type}")));
    }
    let fid: EntityId = fid
        .parse()
        .map_err(|_| ApiError::NotFound(format!("no site with fid {fid}")))?;

    run_query(&state, move |conn| load_site_details(conn, fid))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no site with fid {fid}")))
}
