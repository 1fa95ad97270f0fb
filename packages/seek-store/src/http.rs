use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::{
	Result,
	backend::{BoxFuture, StoreBackend},
	bulk::{BulkError, BulkOp, ConcurrencyToken},
	error::Error,
	query::{Hit, Query, SearchRequest},
	schema,
};

/// REST client for an OpenSearch-compatible store.
pub struct HttpStore {
	client: Client,
	base: String,
	username: Option<String>,
	password: Option<String>,
	dimensions: u32,
}
impl HttpStore {
	pub fn new(cfg: &seek_config::Store, dimensions: u32) -> Result<Self> {
		let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;

		Ok(Self {
			client,
			base: cfg.url.clone(),
			username: cfg.username.clone(),
			password: cfg.password.clone(),
			dimensions,
		})
	}

	fn request(&self, method: Method, path: &str) -> RequestBuilder {
		let builder = self.client.request(method, format!("{}{path}", self.base));

		match &self.username {
			Some(username) => builder.basic_auth(username, self.password.as_deref()),
			None => builder,
		}
	}
}
impl StoreBackend for HttpStore {
	fn index_exists<'a>(&'a self, index: &'a str) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move {
			let response = self.request(Method::HEAD, &format!("/{index}")).send().await?;

			match response.status() {
				status if status.is_success() => Ok(true),
				StatusCode::NOT_FOUND => Ok(false),
				status => Err(Error::UnexpectedResponse {
					operation: "index_exists",
					status: status.as_u16(),
					body: response.text().await.unwrap_or_default(),
				}),
			}
		})
	}

	fn ensure_index<'a>(&'a self, index: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			if self.index_exists(index).await? {
				return Ok(());
			}

			tracing::info!(index = %index, "Creating index.");

			let response = self
				.request(Method::PUT, &format!("/{index}"))
				.json(&schema::index_body(self.dimensions))
				.send()
				.await?;
			let status = response.status();

			if status.is_success() {
				return Ok(());
			}

			let body = response.text().await.unwrap_or_default();

			// Lost the creation race against a concurrent writer.
			if body.contains("resource_already_exists_exception") {
				return Ok(());
			}

			Err(Error::UnexpectedResponse {
				operation: "ensure_index",
				status: status.as_u16(),
				body,
			})
		})
	}

	fn delete_index<'a>(&'a self, index: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			tracing::info!(index = %index, "Deleting index.");

			let response = self.request(Method::DELETE, &format!("/{index}")).send().await?;

			match response.status() {
				status if status.is_success() => Ok(()),
				StatusCode::NOT_FOUND => {
					tracing::info!(index = %index, "Index not found, nothing to delete.");

					Ok(())
				},
				status => Err(Error::UnexpectedResponse {
					operation: "delete_index",
					status: status.as_u16(),
					body: response.text().await.unwrap_or_default(),
				}),
			}
		})
	}

	fn ensure_search_pipeline<'a>(
		&'a self,
		id: &'a str,
		weights: &'a [f32],
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let path = format!("/_search/pipeline/{id}");
			let response = self.request(Method::GET, &path).send().await?;

			if response.status().is_success() {
				return Ok(());
			}
			if response.status() != StatusCode::NOT_FOUND {
				return Err(Error::UnexpectedResponse {
					operation: "ensure_search_pipeline",
					status: response.status().as_u16(),
					body: response.text().await.unwrap_or_default(),
				});
			}

			tracing::info!(pipeline = %id, "Creating search pipeline.");

			let response = self
				.request(Method::PUT, &path)
				.json(&schema::search_pipeline_body(weights))
				.send()
				.await?;

			if response.status().is_success() {
				Ok(())
			} else {
				Err(Error::UnexpectedResponse {
					operation: "ensure_search_pipeline",
					status: response.status().as_u16(),
					body: response.text().await.unwrap_or_default(),
				})
			}
		})
	}

	fn bulk<'a>(
		&'a self,
		index: &'a str,
		ops: Vec<BulkOp>,
		refresh: bool,
	) -> BoxFuture<'a, Result<Vec<BulkError>>> {
		Box::pin(async move {
			self.ensure_index(index).await?;

			let mut body = String::new();

			for op in &ops {
				let mut action = Map::new();

				action.insert("_id".to_string(), Value::String(op.id.to_string()));

				if let Some(token) = op.token {
					action.insert("if_seq_no".to_string(), json!(token.seq_no));
					action.insert("if_primary_term".to_string(), json!(token.primary_term));
				}

				body.push_str(&serde_json::to_string(&json!({ op.action.as_str(): action }))?);
				body.push('\n');

				let payload = match op.action {
					crate::bulk::BulkAction::Update => json!({ "doc": op.payload }),
					_ => op.payload.clone(),
				};

				body.push_str(&serde_json::to_string(&payload)?);
				body.push('\n');
			}

			let response = self
				.request(Method::POST, &format!("/{index}/_bulk"))
				.query(&[("refresh", refresh)])
				.header("content-type", "application/x-ndjson")
				.body(body)
				.send()
				.await?;
			let status = response.status();

			if !status.is_success() {
				return Err(Error::UnexpectedResponse {
					operation: "bulk",
					status: status.as_u16(),
					body: response.text().await.unwrap_or_default(),
				});
			}

			let payload: Value = response.json().await?;
			let items = payload
				.get("items")
				.and_then(Value::as_array)
				.ok_or_else(|| Error::InvalidArgument("Bulk response is missing items.".to_string()))?;
			let mut errors = Vec::new();

			for (op, item) in ops.iter().zip(items) {
				let result = &item[op.action.as_str()];
				let status = result.get("status").and_then(Value::as_u64).unwrap_or(0) as u16;

				if status >= 300 {
					let message = result
						.pointer("/error/reason")
						.and_then(Value::as_str)
						.unwrap_or("Unknown error")
						.to_string();

					errors.push(BulkError {
						document_id: op.id,
						action: op.action,
						status,
						message,
						raw: result.clone(),
					});
				}
			}

			Ok(errors)
		})
	}

	fn search<'a>(
		&'a self,
		indices: &'a [String],
		request: &'a SearchRequest,
	) -> BoxFuture<'a, Result<Vec<Hit>>> {
		Box::pin(async move {
			let mut body = Map::new();

			body.insert("query".to_string(), request.query.to_value());
			body.insert("size".to_string(), json!(request.size));

			if !request.sort.is_empty() {
				body.insert(
					"sort".to_string(),
					Value::Array(
						request
							.sort
							.iter()
							.map(|spec| json!({ &spec.field: { "order": spec.order.as_str() } }))
							.collect(),
					),
				);
			}
			if let Some(search_after) = &request.search_after {
				body.insert("search_after".to_string(), json!(search_after));
			}
			if !request.source_excludes.is_empty() {
				body.insert(
					"_source".to_string(),
					json!({ "excludes": request.source_excludes }),
				);
			}

			let mut query_params = vec![
				("ignore_unavailable".to_string(), "true".to_string()),
				("seq_no_primary_term".to_string(), request.seq_no_primary_term.to_string()),
			];

			if let Some(pipeline) = &request.pipeline {
				query_params.push(("search_pipeline".to_string(), pipeline.clone()));
			}

			let response = self
				.request(Method::POST, &format!("/{}/_search", indices.join(",")))
				.query(&query_params)
				.json(&Value::Object(body))
				.send()
				.await?;
			let status = response.status();

			if !status.is_success() {
				return Err(Error::UnexpectedResponse {
					operation: "search",
					status: status.as_u16(),
					body: response.text().await.unwrap_or_default(),
				});
			}

			let payload: Value = response.json().await?;
			let raw_hits = payload
				.pointer("/hits/hits")
				.and_then(Value::as_array)
				.ok_or_else(|| Error::InvalidArgument("Search response is missing hits.".to_string()))?;
			let mut hits = Vec::with_capacity(raw_hits.len());

			for raw in raw_hits {
				let id = raw
					.get("_id")
					.and_then(Value::as_str)
					.and_then(|raw_id| Uuid::parse_str(raw_id).ok())
					.ok_or_else(|| {
						Error::InvalidArgument("Hit id is not a valid document id.".to_string())
					})?;
				let token = match (
					raw.get("_seq_no").and_then(Value::as_u64),
					raw.get("_primary_term").and_then(Value::as_u64),
				) {
					(Some(seq_no), Some(primary_term)) =>
						Some(ConcurrencyToken { seq_no, primary_term }),
					_ => None,
				};

				hits.push(Hit {
					id,
					score: raw.get("_score").and_then(Value::as_f64),
					source: raw.get("_source").cloned().unwrap_or(Value::Null),
					sort: raw
						.get("sort")
						.and_then(Value::as_array)
						.cloned()
						.unwrap_or_default(),
					token,
				});
			}

			Ok(hits)
		})
	}

	fn delete_by_query<'a>(
		&'a self,
		index: &'a str,
		query: &'a Query,
		refresh: bool,
	) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move {
			let response = self
				.request(Method::POST, &format!("/{index}/_delete_by_query"))
				.query(&[("refresh", refresh)])
				.json(&json!({ "query": query.to_value() }))
				.send()
				.await?;

			match response.status() {
				status if status.is_success() => {
					let payload: Value = response.json().await?;

					Ok(payload.get("deleted").and_then(Value::as_u64).unwrap_or(0))
				},
				StatusCode::NOT_FOUND => Ok(0),
				status => Err(Error::UnexpectedResponse {
					operation: "delete_by_query",
					status: status.as_u16(),
					body: response.text().await.unwrap_or_default(),
				}),
			}
		})
	}
}
