use serde_json::Value;
use uuid::Uuid;

use seek_config::Config;
use seek_domain::{LanguageCode, format_embedding_input, language_values};
use seek_store::query::{
	BoolQuery, MultiMatch, Query, ScoreMode, SearchRequest as StoreSearchRequest, SortOrder,
	SortSpec,
};

use crate::{AccessContext, SeekService, ServiceError, ServiceResult, access};

/// The wildcard query: match everything, rank nothing.
pub const MATCH_ALL: &str = "*";

/// Sortable fields. Hybrid queries are restricted to `Relevance` because
/// score normalization across sub-queries is undefined for other sort keys.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OrderBy {
	Relevance,
	Title,
	CreatedAt,
	UpdatedAt,
	Size,
	Reach,
}
impl OrderBy {
	pub fn parse(raw: &str) -> ServiceResult<Self> {
		match raw {
			"relevance" => Ok(Self::Relevance),
			"title" => Ok(Self::Title),
			"created_at" => Ok(Self::CreatedAt),
			"updated_at" => Ok(Self::UpdatedAt),
			"size" => Ok(Self::Size),
			"reach" => Ok(Self::Reach),
			_ => Err(ServiceError::InvalidRequest {
				message: format!("Unsupported sort field {raw:?}."),
			}),
		}
	}

	fn field(&self) -> &'static str {
		match self {
			Self::Relevance => "_score",
			// Wildcard keyword pattern so every language variant participates.
			Self::Title => "title.*",
			Self::CreatedAt => "created_at",
			Self::UpdatedAt => "updated_at",
			Self::Size => "size",
			Self::Reach => "reach",
		}
	}
}

#[derive(Clone, Debug)]
pub struct SearchRequest {
	pub q: String,
	pub nb_results: u32,
	pub order_by: OrderBy,
	pub order_direction: SortOrder,
	/// Documents matching any of these tags (OR).
	pub tags: Vec<String>,
	/// Hierarchy prefix filter on `path`.
	pub path_prefix: Option<String>,
	/// Re-score the top hits with the cross-encoder reranker.
	pub rerank: bool,
}
impl SearchRequest {
	pub fn new(q: impl Into<String>, nb_results: u32) -> Self {
		Self {
			q: q.into(),
			nb_results,
			order_by: OrderBy::Relevance,
			order_direction: SortOrder::Desc,
			tags: Vec::new(),
			path_prefix: None,
			rerank: false,
		}
	}
}

#[derive(Clone, Debug)]
pub struct SearchItem {
	pub id: Uuid,
	pub score: Option<f64>,
	pub language: LanguageCode,
	pub title: String,
	pub content: String,
	pub source: Value,
}

#[derive(Clone, Debug)]
pub struct SearchResponse {
	pub items: Vec<SearchItem>,
}

impl SeekService {
	/// One ranked request to the store: lexical and, when an embedding is
	/// available, the store-native hybrid combination through the
	/// normalization pipeline.
	pub async fn search(
		&self,
		tenants: &[String],
		ctx: &AccessContext,
		request: &SearchRequest,
	) -> ServiceResult<SearchResponse> {
		if tenants.is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "At least one tenant index is required.".to_string(),
			});
		}

		let filters = filter_conjuncts(ctx, request);
		let query = self.build_query(&request.q, request.nb_results, filters).await;
		let sort = sort_spec(&query, request)?;
		let indices = self.search_indices(tenants);
		let mut store_request = StoreSearchRequest {
			query,
			size: request.nb_results,
			sort,
			search_after: None,
			seq_no_primary_term: false,
			source_excludes: vec!["chunks".to_string()],
			pipeline: None,
		};

		if store_request.query.is_hybrid() {
			store_request.pipeline = Some(self.cfg.search.hybrid_pipeline.clone());
		}

		let hits = self.store.search(&indices, &store_request).await?;
		let mut items = Vec::with_capacity(hits.len());

		for hit in hits {
			let (language, title, content) =
				language_values(&hit.source).unwrap_or((LanguageCode::Und, String::new(), String::new()));

			items.push(SearchItem {
				id: hit.id,
				score: hit.score,
				language,
				title,
				content,
				source: hit.source,
			});
		}

		if request.rerank {
			self.rerank_items(&request.q, &mut items).await;
		}

		Ok(SearchResponse { items })
	}

	async fn build_query(&self, q: &str, nb_results: u32, filters: Vec<Query>) -> Query {
		if q == MATCH_ALL {
			tracing::info!("Performing match_all query.");

			return Query::Bool(BoolQuery {
				must: vec![Query::MatchAll],
				filter: filters,
				..Default::default()
			});
		}

		let query_vector = if self.cfg.hybrid_search_enabled() {
			match self.providers.embedding.embed(&self.cfg.providers.embedding, &[q.to_string()]).await
			{
				Ok(mut vectors) if !vectors.is_empty() => Some(vectors.remove(0)),
				Ok(_) => {
					tracing::warn!("Embedding provider returned no query vector.");

					None
				},
				Err(err) => {
					tracing::warn!(error = %err, "Query embedding failed, falling back to lexical search.");

					None
				},
			}
		} else {
			let missing = self.cfg.missing_hybrid_settings();

			if !missing.is_empty() {
				tracing::debug!(missing = ?missing, "Hybrid search is disabled.");
			}

			None
		};

		let Some(query_vector) = query_vector else {
			tracing::info!(query = %q, "Performing full-text search without embedding.");

			return full_text_query(&self.cfg, q, filters);
		};

		tracing::info!(query = %q, "Performing hybrid search with embedding.");

		Query::Hybrid {
			queries: vec![
				full_text_query(&self.cfg, q, filters.clone()),
				semantic_query(query_vector, nb_results, filters),
			],
		}
	}

	/// Non-fatal by contract: any reranker failure keeps the store order.
	async fn rerank_items(&self, q: &str, items: &mut [SearchItem]) {
		if !self.cfg.providers.reranker.enabled {
			tracing::debug!("Reranker is disabled, keeping store order.");

			return;
		}
		if items.is_empty() {
			return;
		}

		let docs: Vec<String> = items
			.iter()
			.map(|item| format_embedding_input(&item.title, &item.content))
			.collect();

		match self.providers.rerank.rerank(&self.cfg.providers.reranker, q, &docs).await {
			Ok(scores) if scores.len() == items.len() => {
				let mut order: Vec<usize> = (0..items.len()).collect();

				order.sort_by(|a, b| {
					scores[*b].partial_cmp(&scores[*a]).unwrap_or(std::cmp::Ordering::Equal)
				});

				let mut reranked: Vec<SearchItem> =
					order.iter().map(|index| items[*index].clone()).collect();

				for (item, score) in reranked.iter_mut().zip(order.iter().map(|i| scores[*i])) {
					item.score = Some(f64::from(score));
				}

				items.clone_from_slice(&reranked);
			},
			Ok(_) => {
				tracing::warn!("Reranker returned a mismatched score count, keeping store order.");
			},
			Err(err) => {
				tracing::warn!(error = %err, "Reranking failed, keeping store order.");
			},
		}
	}
}

fn filter_conjuncts(ctx: &AccessContext, request: &SearchRequest) -> Vec<Query> {
	let mut filters = access::access_filter(ctx);

	if !request.tags.is_empty() {
		filters.push(Query::terms(
			"tags",
			request.tags.iter().map(|tag| Value::String(tag.clone())).collect(),
		));
	}
	if let Some(path_prefix) = &request.path_prefix {
		filters.push(Query::Prefix { field: "path".to_string(), value: path_prefix.clone() });
	}

	filters
}

fn full_text_query(cfg: &Config, q: &str, filters: Vec<Query>) -> Query {
	Query::Bool(BoolQuery {
		must: vec![Query::Bool(BoolQuery {
			should: vec![
				Query::MultiMatch(MultiMatch {
					query: q.to_string(),
					fields: vec!["title.*.text^3".to_string(), "content.*".to_string()],
					boost: None,
					minimum_should_match: None,
				}),
				Query::MultiMatch(MultiMatch {
					query: q.to_string(),
					fields: vec![
						"title.*.text.trigrams^3".to_string(),
						"content.*.trigrams".to_string(),
					],
					boost: Some(cfg.search.trigram_boost),
					minimum_should_match: Some(cfg.search.trigram_minimum_should_match.clone()),
				}),
			],
			minimum_should_match: Some(1),
			..Default::default()
		})],
		filter: filters,
		..Default::default()
	})
}

fn semantic_query(vector: Vec<f32>, nb_results: u32, filters: Vec<Query>) -> Query {
	Query::Bool(BoolQuery {
		must: vec![Query::Nested {
			path: "chunks".to_string(),
			score_mode: ScoreMode::Max,
			query: Box::new(Query::Knn {
				field: "chunks.embedding".to_string(),
				vector,
				k: nb_results,
			}),
		}],
		filter: filters,
		..Default::default()
	})
}

fn sort_spec(query: &Query, request: &SearchRequest) -> ServiceResult<Vec<SortSpec>> {
	// Sorting hybrid results by anything but the combined score is undefined
	// in the store.
	if query.is_hybrid() {
		return Ok(vec![SortSpec::score(request.order_direction)]);
	}

	Ok(vec![SortSpec::new(request.order_by.field(), request.order_direction)])
}

#[cfg(test)]
mod tests {
	use super::*;

	fn cfg() -> Config {
		seek_testkit::fixtures::hybrid_config()
	}

	#[test]
	fn full_text_query_is_a_should_of_two_multi_matches() {
		let query = full_text_query(&cfg(), "wolf", vec![Query::term("is_active", true)]);
		let Query::Bool(outer) = &query else {
			panic!("Expected a bool query.");
		};
		let Query::Bool(should) = &outer.must[0] else {
			panic!("Expected a bool must clause.");
		};

		assert_eq!(should.should.len(), 2);
		assert_eq!(should.minimum_should_match, Some(1));
		assert_eq!(outer.filter.len(), 1);

		let Query::MultiMatch(trigram) = &should.should[1] else {
			panic!("Expected a trigram multi_match.");
		};

		assert_eq!(trigram.minimum_should_match.as_deref(), Some("75%"));
	}

	#[test]
	fn hybrid_sorting_is_score_only() {
		let hybrid = Query::Hybrid { queries: vec![] };
		let mut request = SearchRequest::new("wolf", 5);

		request.order_by = OrderBy::Title;
		request.order_direction = SortOrder::Asc;

		let sort = sort_spec(&hybrid, &request).expect("Sort must build.");

		assert_eq!(sort, vec![SortSpec::score(SortOrder::Asc)]);
	}

	#[test]
	fn non_hybrid_sorting_uses_the_whitelisted_field() {
		let lexical = Query::MatchAll;
		let mut request = SearchRequest::new("*", 5);

		request.order_by = OrderBy::Title;
		request.order_direction = SortOrder::Asc;

		let sort = sort_spec(&lexical, &request).expect("Sort must build.");

		assert_eq!(sort, vec![SortSpec::new("title.*", SortOrder::Asc)]);
	}

	#[test]
	fn unknown_sort_fields_are_rejected() {
		assert!(OrderBy::parse("depth").is_err());
		assert_eq!(OrderBy::parse("created_at").expect("Must parse."), OrderBy::CreatedAt);
	}
}
