use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::bulk::ConcurrencyToken;

/// Typed subset of the store's query DSL, covering exactly what the engine
/// builds. Serialized to the native JSON form by [`Query::to_value`].
#[derive(Clone, Debug, PartialEq)]
pub enum Query {
	MatchAll,
	Term { field: String, value: Value },
	Terms { field: String, values: Vec<Value> },
	Prefix { field: String, value: String },
	Exists { field: String },
	MultiMatch(MultiMatch),
	Bool(BoolQuery),
	Nested { path: String, score_mode: ScoreMode, query: Box<Query> },
	Knn { field: String, vector: Vec<f32>, k: u32 },
	/// Store-native hybrid combination, executed through a search pipeline.
	Hybrid { queries: Vec<Query> },
}
impl Query {
	pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
		Self::Term { field: field.into(), value: value.into() }
	}

	pub fn terms(field: impl Into<String>, values: Vec<Value>) -> Self {
		Self::Terms { field: field.into(), values }
	}

	pub fn is_hybrid(&self) -> bool {
		matches!(self, Self::Hybrid { .. })
	}

	pub fn to_value(&self) -> Value {
		match self {
			Self::MatchAll => json!({ "match_all": {} }),
			Self::Term { field, value } => json!({ "term": { field: value } }),
			Self::Terms { field, values } => json!({ "terms": { field: values } }),
			Self::Prefix { field, value } => json!({ "prefix": { field: { "value": value } } }),
			Self::Exists { field } => json!({ "exists": { "field": field } }),
			Self::MultiMatch(multi_match) => multi_match.to_value(),
			Self::Bool(bool_query) => bool_query.to_value(),
			Self::Nested { path, score_mode, query } => json!({
				"nested": {
					"path": path,
					"score_mode": score_mode.as_str(),
					"query": query.to_value(),
				}
			}),
			Self::Knn { field, vector, k } => json!({
				"knn": { field: { "vector": vector, "k": k } }
			}),
			Self::Hybrid { queries } => json!({
				"hybrid": {
					"queries": queries.iter().map(Self::to_value).collect::<Vec<_>>(),
				}
			}),
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct MultiMatch {
	pub query: String,
	/// Field patterns with optional boosts, e.g. `title.*.text^3`.
	pub fields: Vec<String>,
	pub boost: Option<f32>,
	pub minimum_should_match: Option<String>,
}
impl MultiMatch {
	fn to_value(&self) -> Value {
		let mut body = Map::new();

		body.insert("query".to_string(), Value::String(self.query.clone()));
		body.insert(
			"fields".to_string(),
			Value::Array(self.fields.iter().cloned().map(Value::String).collect()),
		);

		if let Some(boost) = self.boost {
			body.insert("boost".to_string(), json!(boost));
		}
		if let Some(minimum_should_match) = &self.minimum_should_match {
			body.insert(
				"minimum_should_match".to_string(),
				Value::String(minimum_should_match.clone()),
			);
		}

		json!({ "multi_match": body })
	}
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoolQuery {
	pub must: Vec<Query>,
	pub should: Vec<Query>,
	pub must_not: Vec<Query>,
	pub filter: Vec<Query>,
	pub minimum_should_match: Option<u32>,
}
impl BoolQuery {
	fn to_value(&self) -> Value {
		let mut body = Map::new();

		for (name, clauses) in [
			("must", &self.must),
			("should", &self.should),
			("must_not", &self.must_not),
			("filter", &self.filter),
		] {
			if !clauses.is_empty() {
				body.insert(
					name.to_string(),
					Value::Array(clauses.iter().map(Query::to_value).collect()),
				);
			}
		}

		if let Some(minimum_should_match) = self.minimum_should_match {
			body.insert("minimum_should_match".to_string(), json!(minimum_should_match));
		}

		json!({ "bool": body })
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScoreMode {
	Avg,
	Max,
	Sum,
}
impl ScoreMode {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Avg => "avg",
			Self::Max => "max",
			Self::Sum => "sum",
		}
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SortOrder {
	Asc,
	Desc,
}
impl SortOrder {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Asc => "asc",
			Self::Desc => "desc",
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct SortSpec {
	pub field: String,
	pub order: SortOrder,
}
impl SortSpec {
	pub fn new(field: impl Into<String>, order: SortOrder) -> Self {
		Self { field: field.into(), order }
	}

	pub fn score(order: SortOrder) -> Self {
		Self::new("_score", order)
	}
}

/// One search call against one or more indices. Unavailable indices are
/// skipped rather than failing the whole request.
#[derive(Clone, Debug)]
pub struct SearchRequest {
	pub query: Query,
	pub size: u32,
	pub sort: Vec<SortSpec>,
	/// Cursor from the last hit of the previous page.
	pub search_after: Option<Vec<Value>>,
	/// Ask the store to return concurrency tokens with each hit.
	pub seq_no_primary_term: bool,
	pub source_excludes: Vec<String>,
	/// Search pipeline id, required for hybrid queries.
	pub pipeline: Option<String>,
}
impl SearchRequest {
	pub fn new(query: Query, size: u32) -> Self {
		Self {
			query,
			size,
			sort: Vec::new(),
			search_after: None,
			seq_no_primary_term: false,
			source_excludes: Vec::new(),
			pipeline: None,
		}
	}
}

/// One search result.
#[derive(Clone, Debug)]
pub struct Hit {
	pub id: Uuid,
	pub score: Option<f64>,
	pub source: Value,
	/// Sort values, fed back as the `search_after` cursor.
	pub sort: Vec<Value>,
	pub token: Option<ConcurrencyToken>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn term_and_terms_serialize_to_native_form() {
		assert_eq!(
			Query::term("is_active", true).to_value(),
			json!({ "term": { "is_active": true } })
		);
		assert_eq!(
			Query::terms("groups", vec![json!("a"), json!("b")]).to_value(),
			json!({ "terms": { "groups": ["a", "b"] } })
		);
	}

	#[test]
	fn bool_query_omits_empty_clauses() {
		let query = Query::Bool(BoolQuery {
			should: vec![Query::term("users", "alice")],
			minimum_should_match: Some(1),
			..Default::default()
		});

		assert_eq!(
			query.to_value(),
			json!({
				"bool": {
					"should": [{ "term": { "users": "alice" } }],
					"minimum_should_match": 1,
				}
			})
		);
	}

	#[test]
	fn nested_knn_serializes_with_score_mode() {
		let query = Query::Nested {
			path: "chunks".to_string(),
			score_mode: ScoreMode::Max,
			query: Box::new(Query::Knn {
				field: "chunks.embedding".to_string(),
				vector: vec![0.1, 0.2],
				k: 5,
			}),
		};

		assert_eq!(
			query.to_value(),
			json!({
				"nested": {
					"path": "chunks",
					"score_mode": "max",
					"query": { "knn": { "chunks.embedding": { "vector": [0.1, 0.2], "k": 5 } } },
				}
			})
		);
	}

	#[test]
	fn hybrid_wraps_sub_queries_in_order() {
		let hybrid = Query::Hybrid { queries: vec![Query::MatchAll, Query::MatchAll] };
		let value = hybrid.to_value();

		assert!(hybrid.is_hybrid());
		assert_eq!(value["hybrid"]["queries"].as_array().map(Vec::len), Some(2));
	}

	#[test]
	fn multi_match_carries_boost_and_minimum_should_match() {
		let query = Query::MultiMatch(MultiMatch {
			query: "wolf".to_string(),
			fields: vec!["title.*.text.trigrams^3".to_string()],
			boost: Some(0.3),
			minimum_should_match: Some("75%".to_string()),
		});
		let value = query.to_value();

		assert_eq!(value["multi_match"]["boost"], json!(0.3));
		assert_eq!(value["multi_match"]["minimum_should_match"], json!("75%"));
	}
}
