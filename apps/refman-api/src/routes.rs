use axum::{
	Json, Router,
	extract::{Path, Query, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{delete, get, patch},
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::state::AppState;
use refman_domain::WireRecord;
use refman_service::{CreateOutcome, Error, KeywordRemoval, KeywordSetChange, SearchRequest};

type QueryPairs = Vec<(String, String)>;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/entries", get(list_entries).post(create_entries))
		.route("/v1/dump", get(dump))
		.route(
			"/v1/entries/{entry_id}",
			get(get_entry).put(overwrite_entry).patch(patch_entry).delete(delete_entry),
		)
		.route("/v1/keywords", get(list_keywords))
		.route("/v1/keywords/prune", delete(prune_keywords))
		.route("/v1/keywords/rename", patch(rename_keyword))
		.route(
			"/v1/keywords/{entry_id}",
			get(entry_keywords)
				.patch(add_entry_keywords)
				.put(replace_entry_keywords)
				.delete(remove_entry_keywords),
		)
		.route("/v1/search", get(search))
		.route("/v1/metadata", get(metadata))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn list_entries(
	State(state): State<AppState>,
	Query(params): Query<QueryPairs>,
) -> Result<Json<Vec<Map<String, Value>>>, ApiError> {
	let entry_ids = query_values(&params, "id")
		.iter()
		.map(|id| parse_entry_id(id))
		.collect::<Result<Vec<_>, _>>()?;
	let records = if entry_ids.is_empty() {
		state.service.dump().await?
	} else {
		state.service.get_entries(&entry_ids).await?
	};

	Ok(Json(records))
}

async fn create_entries(
	State(state): State<AppState>,
	Json(payload): Json<Value>,
) -> Result<Response, ApiError> {
	let (records, single) = match payload {
		Value::Array(records) => (records, false),
		record => (vec![record], true),
	};

	let outcomes = state.service.create_entries(records).await;

	if single {
		let entry_id = outcomes
			.into_iter()
			.next()
			.map(|outcome| outcome.result)
			.ok_or_else(|| internal_error("Batch create returned no outcome."))??;

		return Ok((StatusCode::CREATED, Json(vec![entry_id])).into_response());
	}
	if outcomes.iter().all(|outcome| outcome.result.is_ok()) {
		let entry_ids: Vec<i64> =
			outcomes.into_iter().filter_map(|outcome| outcome.result.ok()).collect();

		return Ok((StatusCode::CREATED, Json(entry_ids)).into_response());
	}

	let body: Vec<OutcomeBody> = outcomes.into_iter().map(OutcomeBody::from).collect();

	Ok((StatusCode::MULTI_STATUS, Json(body)).into_response())
}

async fn dump(State(state): State<AppState>) -> Result<Json<Vec<Map<String, Value>>>, ApiError> {
	Ok(Json(state.service.dump().await?))
}

async fn get_entry(
	State(state): State<AppState>,
	Path(entry_id): Path<String>,
) -> Result<Json<Map<String, Value>>, ApiError> {
	let entry_id = parse_entry_id(&entry_id)?;

	Ok(Json(state.service.get_entry(entry_id).await?))
}

async fn overwrite_entry(
	State(state): State<AppState>,
	Path(entry_id): Path<String>,
	Json(payload): Json<Value>,
) -> Result<StatusCode, ApiError> {
	let entry_id = parse_entry_id(&entry_id)?;

	state.service.overwrite_entry(entry_id, decode_record(payload)?).await?;

	Ok(StatusCode::NO_CONTENT)
}

async fn patch_entry(
	State(state): State<AppState>,
	Path(entry_id): Path<String>,
	Json(payload): Json<Value>,
) -> Result<StatusCode, ApiError> {
	let entry_id = parse_entry_id(&entry_id)?;

	state.service.patch_entry(entry_id, decode_record(payload)?).await?;

	Ok(StatusCode::NO_CONTENT)
}

async fn delete_entry(
	State(state): State<AppState>,
	Path(entry_id): Path<String>,
) -> Result<StatusCode, ApiError> {
	let entry_id = parse_entry_id(&entry_id)?;

	state.service.delete_entry(entry_id).await?;

	Ok(StatusCode::NO_CONTENT)
}

async fn list_keywords(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
	Ok(Json(state.service.list_keywords().await?))
}

async fn prune_keywords(State(state): State<AppState>) -> Result<Json<PruneBody>, ApiError> {
	let removed = state.service.prune_keywords().await?;

	Ok(Json(PruneBody { removed }))
}

async fn rename_keyword(
	State(state): State<AppState>,
	Query(params): Query<QueryPairs>,
) -> Result<Response, ApiError> {
	let from = query_values(&params, "from").into_iter().next();
	let to = query_values(&params, "to").into_iter().next();
	let (Some(from), Some(to)) = (from, to) else {
		return Err(json_error(
			StatusCode::BAD_REQUEST,
			"INVALID_REQUEST",
			"Missing query field.",
			Some(vec!["from".to_string(), "to".to_string()]),
		));
	};
	let report = state.service.rename_keyword(&from, &to).await?;

	if report.is_noop() {
		return Ok(StatusCode::NO_CONTENT.into_response());
	}

	Ok(Json(report).into_response())
}

async fn entry_keywords(
	State(state): State<AppState>,
	Path(entry_id): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
	let entry_id = parse_entry_id(&entry_id)?;

	Ok(Json(state.service.entry_keywords(entry_id).await?))
}

async fn add_entry_keywords(
	State(state): State<AppState>,
	Path(entry_id): Path<String>,
	Query(params): Query<QueryPairs>,
) -> Result<StatusCode, ApiError> {
	let entry_id = parse_entry_id(&entry_id)?;
	let keywords = query_values(&params, "keyword");
	let inserted = state.service.add_entry_keywords(entry_id, &keywords).await?;

	Ok(if inserted > 0 { StatusCode::CREATED } else { StatusCode::NO_CONTENT })
}

async fn replace_entry_keywords(
	State(state): State<AppState>,
	Path(entry_id): Path<String>,
	Json(payload): Json<Value>,
) -> Result<Json<KeywordSetChange>, ApiError> {
	let entry_id = parse_entry_id(&entry_id)?;
	let keywords: Vec<String> = serde_json::from_value(payload).map_err(|err| {
		json_error(
			StatusCode::BAD_REQUEST,
			"INVALID_REQUEST",
			format!("Body must be an array of keywords: {err}."),
			None,
		)
	})?;

	Ok(Json(state.service.replace_entry_keywords(entry_id, &keywords).await?))
}

async fn remove_entry_keywords(
	State(state): State<AppState>,
	Path(entry_id): Path<String>,
	Query(params): Query<QueryPairs>,
) -> Result<StatusCode, ApiError> {
	let entry_id = parse_entry_id(&entry_id)?;
	let removal = if params.is_empty() {
		KeywordRemoval::All
	} else {
		KeywordRemoval::Only(query_values(&params, "keyword"))
	};

	state.service.remove_entry_keywords(entry_id, removal).await?;

	Ok(StatusCode::NO_CONTENT)
}

async fn search(
	State(state): State<AppState>,
	Query(params): Query<QueryPairs>,
) -> Result<Json<Vec<i64>>, ApiError> {
	let req = SearchRequest {
		keywords: query_values(&params, "keyword"),
		author: query_values(&params, "author").into_iter().next(),
		title: query_values(&params, "title").into_iter().next(),
	};

	Ok(Json(state.service.search(req).await?))
}

async fn metadata(
	State(state): State<AppState>,
	Query(params): Query<QueryPairs>,
) -> Result<Json<Map<String, Value>>, ApiError> {
	let Some(url) = query_values(&params, "url").into_iter().next() else {
		return Err(json_error(
			StatusCode::BAD_REQUEST,
			"INVALID_REQUEST",
			"Missing query field.",
			Some(vec!["url".to_string()]),
		));
	};
	let fields = query_values(&params, "fields").into_iter().next();

	Ok(Json(state.metadata.lookup(&url, fields.as_deref()).await?))
}

fn query_values(params: &[(String, String)], key: &str) -> Vec<String> {
	params.iter().filter(|(name, _)| name == key).map(|(_, value)| value.clone()).collect()
}

fn parse_entry_id(raw: &str) -> Result<i64, ApiError> {
	raw.trim().parse().map_err(|_| {
		json_error(
			StatusCode::BAD_REQUEST,
			"INVALID_REQUEST",
			format!("Entry id {raw:?} is not an integer."),
			Some(vec!["id".to_string()]),
		)
	})
}

fn decode_record(payload: Value) -> Result<WireRecord, ApiError> {
	WireRecord::from_value(payload).map_err(|err| {
		json_error(
			StatusCode::BAD_REQUEST,
			"INVALID_REQUEST",
			format!("Malformed record: {err}."),
			None,
		)
	})
}

fn internal_error(detail: &str) -> ApiError {
	tracing::error!(error = %detail, "Request failed.");

	json_error(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", "Internal error.", None)
}

#[derive(Debug, Serialize)]
struct PruneBody {
	removed: u64,
}

#[derive(Debug, Serialize)]
struct OutcomeBody {
	index: usize,
	status: u16,
	#[serde(skip_serializing_if = "Option::is_none")]
	id: Option<i64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	error: Option<ErrorBody>,
}
impl From<CreateOutcome> for OutcomeBody {
	fn from(outcome: CreateOutcome) -> Self {
		match outcome.result {
			Ok(entry_id) => Self {
				index: outcome.index,
				status: StatusCode::CREATED.as_u16(),
				id: Some(entry_id),
				error: None,
			},
			Err(err) => {
				let err = ApiError::from(err);

				Self {
					index: outcome.index,
					status: err.status.as_u16(),
					id: None,
					error: Some(err.body()),
				}
			},
		}
	}
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}

	fn body(self) -> ErrorBody {
		ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields }
	}
}
impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		match err {
			Error::InvalidRequest { message } =>
				json_error(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message, None),
			Error::NotFound { message } =>
				json_error(StatusCode::NOT_FOUND, "NOT_FOUND", message, None),
			Error::Conflict { message } =>
				json_error(StatusCode::CONFLICT, "CONFLICT", message, None),
			Error::Storage { message } => internal_error(&message),
			Error::Upstream { message } =>
				json_error(StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", message, None),
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let status = self.status;

		(status, Json(self.body())).into_response()
	}
}

pub fn json_error(
	status: StatusCode,
	code: &str,
	message: impl Into<String>,
	fields: Option<Vec<String>>,
) -> ApiError {
	ApiError::new(status, code, message, fields)
}
