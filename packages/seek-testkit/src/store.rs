//! In-process store double. Implements the same backend contract as the HTTP
//! client, including optimistic-concurrency checks, partial-update merges,
//! deep pagination and hybrid score normalization, so the engine can be
//! exercised end to end without a running store.

use std::{
	cmp::Ordering,
	collections::{BTreeMap, HashMap},
	sync::Mutex,
};

use serde_json::{Value, json};
use uuid::Uuid;

use seek_store::{
	Error, Result,
	backend::{BoxFuture, StoreBackend},
	bulk::{BulkAction, BulkError, BulkOp, ConcurrencyToken},
	query::{Hit, MultiMatch, Query, ScoreMode, SearchRequest, SortOrder, SortSpec},
};

struct StoredDoc {
	source: Value,
	seq_no: u64,
	primary_term: u64,
}

#[derive(Default)]
struct IndexState {
	// Keyed by the id string so iteration order matches `_id asc`.
	docs: BTreeMap<String, StoredDoc>,
	next_seq: u64,
}
impl IndexState {
	fn bump(&mut self) -> u64 {
		self.next_seq += 1;

		self.next_seq
	}
}

#[derive(Default)]
pub struct MemoryStore {
	indices: Mutex<HashMap<String, IndexState>>,
	pipelines: Mutex<HashMap<String, Vec<f32>>>,
}
impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Raw source of one stored document, for assertions.
	pub fn document(&self, index: &str, id: Uuid) -> Option<Value> {
		let indices = self.indices.lock().unwrap_or_else(|err| err.into_inner());

		indices.get(index).and_then(|state| state.docs.get(&id.to_string()))
			.map(|doc| doc.source.clone())
	}

	pub fn count(&self, index: &str) -> usize {
		let indices = self.indices.lock().unwrap_or_else(|err| err.into_inner());

		indices.get(index).map(|state| state.docs.len()).unwrap_or_default()
	}

	pub fn has_pipeline(&self, id: &str) -> bool {
		let pipelines = self.pipelines.lock().unwrap_or_else(|err| err.into_inner());

		pipelines.contains_key(id)
	}
}
impl StoreBackend for MemoryStore {
	fn index_exists<'a>(&'a self, index: &'a str) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move {
			let indices = self.indices.lock().unwrap_or_else(|err| err.into_inner());

			Ok(indices.contains_key(index))
		})
	}

	fn ensure_index<'a>(&'a self, index: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let mut indices = self.indices.lock().unwrap_or_else(|err| err.into_inner());

			indices.entry(index.to_string()).or_default();

			Ok(())
		})
	}

	fn delete_index<'a>(&'a self, index: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let mut indices = self.indices.lock().unwrap_or_else(|err| err.into_inner());

			indices.remove(index);

			Ok(())
		})
	}

	fn ensure_search_pipeline<'a>(
		&'a self,
		id: &'a str,
		weights: &'a [f32],
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let mut pipelines = self.pipelines.lock().unwrap_or_else(|err| err.into_inner());

			pipelines.entry(id.to_string()).or_insert_with(|| weights.to_vec());

			Ok(())
		})
	}

	fn bulk<'a>(
		&'a self,
		index: &'a str,
		ops: Vec<BulkOp>,
		_refresh: bool,
	) -> BoxFuture<'a, Result<Vec<BulkError>>> {
		Box::pin(async move {
			let mut indices = self.indices.lock().unwrap_or_else(|err| err.into_inner());
			let state = indices.entry(index.to_string()).or_default();
			let mut errors = Vec::new();

			for op in ops {
				let id = op.id.to_string();

				match op.action {
					BulkAction::Create => {
						if state.docs.contains_key(&id) {
							errors.push(failure(&op, 409, "version conflict, document already exists"));

							continue;
						}

						let seq_no = state.bump();

						state.docs.insert(id, StoredDoc {
							source: op.payload,
							seq_no,
							primary_term: 1,
						});
					},
					BulkAction::Index => {
						let seq_no = state.bump();

						state.docs.insert(id, StoredDoc {
							source: op.payload,
							seq_no,
							primary_term: 1,
						});
					},
					BulkAction::Update => {
						let seq_no = state.bump();
						let Some(doc) = state.docs.get_mut(&id) else {
							errors.push(failure(&op, 404, "document missing"));

							continue;
						};

						if let Some(token) = op.token
							&& (token.seq_no != doc.seq_no
								|| token.primary_term != doc.primary_term)
						{
							errors.push(failure(
								&op,
								409,
								&format!(
									"version conflict, required seqNo [{}], primary term [{}]",
									token.seq_no, token.primary_term,
								),
							));

							continue;
						}

						merge_value(&mut doc.source, op.payload);

						doc.seq_no = seq_no;
					},
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
			let weights = match &request.pipeline {
				Some(id) => {
					let pipelines = self.pipelines.lock().unwrap_or_else(|err| err.into_inner());

					pipelines.get(id).cloned()
				},
				None => None,
			};
			let map = self.indices.lock().unwrap_or_else(|err| err.into_inner());
			let mut candidates = Vec::new();

			// Unavailable indices are skipped, matching ignore_unavailable.
			for index in indices {
				if let Some(state) = map.get(index.as_str()) {
					for (id, doc) in &state.docs {
						candidates.push((id.clone(), &doc.source, doc.seq_no, doc.primary_term));
					}
				}
			}

			let scores: Vec<Option<f64>> = match &request.query {
				Query::Hybrid { queries } => {
					hybrid_scores(queries, &candidates, weights.as_deref())
				},
				query => candidates
					.iter()
					.map(|(id, source, ..)| evaluate(query, id, source))
					.collect(),
			};
			let specs = if request.sort.is_empty() {
				vec![SortSpec::score(SortOrder::Desc)]
			} else {
				request.sort.clone()
			};
			let mut hits = Vec::new();

			for ((id, source, seq_no, primary_term), score) in candidates.into_iter().zip(scores) {
				let Some(score) = score else {
					continue;
				};
				let sort: Vec<Value> =
					specs.iter().map(|spec| sort_value(&spec.field, &id, source, score)).collect();

				if let Some(cursor) = &request.search_after
					&& compare_sort_values(&sort, cursor, &specs) != Ordering::Greater
				{
					continue;
				}

				let uuid = Uuid::parse_str(&id)
					.map_err(|_| Error::InvalidArgument(format!("Invalid document id {id:?}.")))?;
				let mut source = source.clone();

				if let Value::Object(fields) = &mut source {
					for exclude in &request.source_excludes {
						fields.remove(exclude);
					}
				}

				hits.push(Hit {
					id: uuid,
					score: Some(score),
					source,
					sort,
					token: request
						.seq_no_primary_term
						.then_some(ConcurrencyToken { seq_no, primary_term }),
				});
			}

			hits.sort_by(|a, b| compare_sort_values(&a.sort, &b.sort, &specs));
			hits.truncate(request.size as usize);

			Ok(hits)
		})
	}

	fn delete_by_query<'a>(
		&'a self,
		index: &'a str,
		query: &'a Query,
		_refresh: bool,
	) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move {
			let mut indices = self.indices.lock().unwrap_or_else(|err| err.into_inner());
			let Some(state) = indices.get_mut(index) else {
				return Ok(0);
			};
			let matched: Vec<String> = state
				.docs
				.iter()
				.filter(|(id, doc)| evaluate(query, id, &doc.source).is_some())
				.map(|(id, _)| id.clone())
				.collect();

			for id in &matched {
				state.docs.remove(id);
			}

			Ok(matched.len() as u64)
		})
	}
}

fn failure(op: &BulkOp, status: u16, message: &str) -> BulkError {
	BulkError {
		document_id: op.id,
		action: op.action,
		status,
		message: message.to_string(),
		raw: json!({ "reason": message }),
	}
}

/// Recursive object merge, the store's partial-update semantics. Non-object
/// values are replaced wholesale.
fn merge_value(target: &mut Value, patch: Value) {
	match (target, patch) {
		(Value::Object(fields), Value::Object(patch_fields)) => {
			for (key, value) in patch_fields {
				match fields.get_mut(&key) {
					Some(existing) if existing.is_object() && value.is_object() => {
						merge_value(existing, value);
					},
					_ => {
						fields.insert(key, value);
					},
				}
			}
		},
		(target, patch) => *target = patch,
	}
}

// Query evaluation. `None` means no match; `Some` carries a relevance score.

fn evaluate(query: &Query, id: &str, source: &Value) -> Option<f64> {
	match query {
		Query::MatchAll => Some(1.0),
		Query::Term { field, value } => {
			field_matches(id, source, field, std::slice::from_ref(value)).then_some(1.0)
		},
		Query::Terms { field, values } => field_matches(id, source, field, values).then_some(1.0),
		Query::Prefix { field, value } => source
			.get(field)
			.and_then(Value::as_str)
			.is_some_and(|text| text.starts_with(value))
			.then_some(1.0),
		// Nested values live in child documents, so a parent-level exists on
		// the nested path matches nothing.
		Query::Exists { field } if field == "chunks" || field.starts_with("chunks.") => None,
		Query::Exists { field } => field_exists(source, field).then_some(1.0),
		Query::MultiMatch(multi_match) => evaluate_multi_match(multi_match, source),
		Query::Bool(bool_query) => {
			let mut score = 0.0;

			for clause in &bool_query.must {
				score += evaluate(clause, id, source)?;
			}
			for clause in &bool_query.filter {
				evaluate(clause, id, source)?;
			}
			for clause in &bool_query.must_not {
				if evaluate(clause, id, source).is_some() {
					return None;
				}
			}

			if !bool_query.should.is_empty() {
				let matched: Vec<f64> = bool_query
					.should
					.iter()
					.filter_map(|clause| evaluate(clause, id, source))
					.collect();
				let required = bool_query.minimum_should_match.unwrap_or({
					// Pure should queries require one arm by default.
					if bool_query.must.is_empty() && bool_query.filter.is_empty() { 1 } else { 0 }
				});

				if (matched.len() as u32) < required {
					return None;
				}

				score += matched.iter().sum::<f64>();
			}

			Some(score)
		},
		Query::Nested { path, score_mode, query } => {
			let items = source.get(path).and_then(Value::as_array)?;
			let scores: Vec<f64> = items
				.iter()
				.filter_map(|item| evaluate_nested(query, path, item))
				.collect();

			if scores.is_empty() {
				return None;
			}

			match score_mode {
				ScoreMode::Max => scores.iter().copied().reduce(f64::max),
				ScoreMode::Sum => Some(scores.iter().sum()),
				ScoreMode::Avg => Some(scores.iter().sum::<f64>() / scores.len() as f64),
			}
		},
		// Knn only appears inside a nested clause; hybrid only at the top.
		Query::Knn { .. } | Query::Hybrid { .. } => None,
	}
}

fn evaluate_nested(query: &Query, path: &str, item: &Value) -> Option<f64> {
	match query {
		Query::Knn { field, vector, .. } => {
			let leaf = field.strip_prefix(path).and_then(|rest| rest.strip_prefix('.'))?;
			let embedding: Vec<f64> = item
				.get(leaf)?
				.as_array()?
				.iter()
				.map(Value::as_f64)
				.collect::<Option<Vec<_>>>()?;

			if embedding.len() != vector.len() {
				return None;
			}

			let distance_squared: f64 = embedding
				.iter()
				.zip(vector)
				.map(|(a, b)| (a - f64::from(*b)).powi(2))
				.sum();

			Some(1.0 / (1.0 + distance_squared))
		},
		_ => evaluate(query, "", item),
	}
}

fn field_matches(id: &str, source: &Value, field: &str, values: &[Value]) -> bool {
	if field == "_id" {
		return values.iter().any(|value| value.as_str() == Some(id));
	}

	match source.get(field) {
		Some(Value::Array(items)) => values.iter().any(|value| items.contains(value)),
		Some(stored) => values.iter().any(|value| stored == value),
		None => false,
	}
}

fn field_exists(source: &Value, field: &str) -> bool {
	match source.get(field) {
		None | Some(Value::Null) => false,
		Some(Value::Array(items)) => !items.is_empty(),
		Some(_) => true,
	}
}

/// Field patterns address analyzed variants (`title.*.text`, `.trigrams`)
/// that have no literal counterpart in the source, so matching is approximated
/// lexically: token overlap for text fields, character 3-gram overlap for
/// trigram fields.
fn evaluate_multi_match(multi_match: &MultiMatch, source: &Value) -> Option<f64> {
	let mut best: Option<f64> = None;

	for raw in &multi_match.fields {
		let (path, field_boost) = match raw.split_once('^') {
			Some((path, boost)) => (path, boost.parse::<f64>().unwrap_or(1.0)),
			None => (raw.as_str(), 1.0),
		};
		let trigrams = path.contains("trigrams");
		let base = path.split('.').next().unwrap_or(path);
		let Some(text) = field_text(source, base) else {
			continue;
		};
		let score = if trigrams {
			trigram_score(&multi_match.query, &text, multi_match.minimum_should_match.as_deref())
		} else {
			token_score(&multi_match.query, &text)
		};

		if let Some(score) = score {
			let boosted = score * field_boost * f64::from(multi_match.boost.unwrap_or(1.0));

			best = Some(best.map_or(boosted, |current| current.max(boosted)));
		}
	}

	best
}

/// Concatenated language variants of a top-level text field.
fn field_text(source: &Value, base: &str) -> Option<String> {
	match source.get(base)? {
		Value::String(text) => Some(text.clone()),
		Value::Object(variants) => {
			let parts: Vec<&str> = variants.values().filter_map(Value::as_str).collect();

			if parts.is_empty() { None } else { Some(parts.join(" ")) }
		},
		_ => None,
	}
}

fn tokens(text: &str) -> Vec<String> {
	text.to_lowercase()
		.split(|ch: char| !ch.is_alphanumeric())
		.filter(|token| !token.is_empty())
		.map(str::to_string)
		.collect()
}

fn token_score(query: &str, text: &str) -> Option<f64> {
	let text_tokens = tokens(text);
	let matched = tokens(query)
		.iter()
		.filter(|token| text_tokens.contains(token))
		.count();

	if matched == 0 { None } else { Some(matched as f64) }
}

fn char_trigrams(text: &str) -> Vec<String> {
	let chars: Vec<char> = text.to_lowercase().chars().filter(|ch| !ch.is_whitespace()).collect();

	chars.windows(3).map(|window| window.iter().collect()).collect()
}

fn trigram_score(query: &str, text: &str, minimum_should_match: Option<&str>) -> Option<f64> {
	let query_grams = char_trigrams(query);

	if query_grams.is_empty() {
		return None;
	}

	let text_grams = char_trigrams(text);
	let matched = query_grams.iter().filter(|gram| text_grams.contains(gram)).count();
	let ratio = matched as f64 / query_grams.len() as f64;
	let required = minimum_should_match
		.and_then(|raw| raw.strip_suffix('%'))
		.and_then(|raw| raw.parse::<f64>().ok())
		.map(|percent| percent / 100.0)
		.unwrap_or(0.0);

	if matched == 0 || ratio < required { None } else { Some(ratio) }
}

/// Per-sub-query min-max normalization followed by a weighted arithmetic
/// mean, the normalization-processor combination.
fn hybrid_scores(
	queries: &[Query],
	candidates: &[(String, &Value, u64, u64)],
	weights: Option<&[f32]>,
) -> Vec<Option<f64>> {
	let weights: Vec<f64> = match weights {
		Some(weights) if weights.len() == queries.len() => {
			weights.iter().map(|weight| f64::from(*weight)).collect()
		},
		_ => vec![1.0 / queries.len().max(1) as f64; queries.len()],
	};
	let normalized: Vec<Vec<Option<f64>>> = queries
		.iter()
		.map(|query| {
			let raw: Vec<Option<f64>> = candidates
				.iter()
				.map(|(id, source, ..)| evaluate(query, id, source))
				.collect();

			normalize(raw)
		})
		.collect();
	let weight_sum: f64 = weights.iter().sum();

	(0..candidates.len())
		.map(|index| {
			let mut combined = 0.0;
			let mut matched = false;

			for (sub, weight) in normalized.iter().zip(&weights) {
				if let Some(score) = sub[index] {
					combined += score * weight;
					matched = true;
				}
			}

			if matched && weight_sum > 0.0 { Some(combined / weight_sum) } else { None }
		})
		.collect()
}

fn normalize(raw: Vec<Option<f64>>) -> Vec<Option<f64>> {
	let matched: Vec<f64> = raw.iter().flatten().copied().collect();
	let Some(min) = matched.iter().copied().reduce(f64::min) else {
		return raw;
	};
	let max = matched.iter().copied().reduce(f64::max).unwrap_or(min);
	let range = max - min;

	raw.into_iter()
		.map(|score| {
			score.map(|score| if range > 0.0 { (score - min) / range } else { 1.0 })
		})
		.collect()
}

// Sorting.

fn sort_value(field: &str, id: &str, source: &Value, score: f64) -> Value {
	match field {
		"_score" => json!(score),
		"_id" => Value::String(id.to_string()),
		field => {
			let base = field.strip_suffix(".*").unwrap_or(field);

			match source.get(base) {
				Some(Value::Object(variants)) => variants
					.values()
					.find(|value| value.is_string())
					.cloned()
					.unwrap_or(Value::Null),
				Some(value) => value.clone(),
				None => Value::Null,
			}
		},
	}
}

fn compare_sort_values(a: &[Value], b: &[Value], specs: &[SortSpec]) -> Ordering {
	for (index, spec) in specs.iter().enumerate() {
		let left = a.get(index).unwrap_or(&Value::Null);
		let right = b.get(index).unwrap_or(&Value::Null);
		let ordering = compare_values(left, right);
		let ordering = match spec.order {
			SortOrder::Asc => ordering,
			SortOrder::Desc => ordering.reverse(),
		};

		if ordering != Ordering::Equal {
			return ordering;
		}
	}

	Ordering::Equal
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
	match (a, b) {
		(Value::Null, Value::Null) => Ordering::Equal,
		(Value::Null, _) => Ordering::Less,
		(_, Value::Null) => Ordering::Greater,
		(Value::Number(left), Value::Number(right)) => left
			.as_f64()
			.partial_cmp(&right.as_f64())
			.unwrap_or(Ordering::Equal),
		(Value::String(left), Value::String(right)) => left.cmp(right),
		(Value::Bool(left), Value::Bool(right)) => left.cmp(right),
		(left, right) => left.to_string().cmp(&right.to_string()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn merge_recurses_into_objects() {
		let mut target = json!({
			"content": { "fr": "ancien" },
			"content_status": "wait",
		});

		merge_value(&mut target, json!({
			"content": { "fr": "nouveau" },
			"content_status": "ready",
		}));

		assert_eq!(target["content"]["fr"], json!("nouveau"));
		assert_eq!(target["content_status"], json!("ready"));
	}

	#[test]
	fn term_on_array_fields_means_contains() {
		let source = json!({ "users": ["alice", "bob"] });

		assert!(field_matches("x", &source, "users", &[json!("alice")]));
		assert!(!field_matches("x", &source, "users", &[json!("carol")]));
	}

	#[test]
	fn empty_array_fields_do_not_exist() {
		assert!(!field_exists(&json!({ "tags": [] }), "tags"));
		assert!(!field_exists(&json!({ "tags": null }), "tags"));
		assert!(field_exists(&json!({ "tags": ["memo"] }), "tags"));
	}

	#[test]
	fn parent_level_exists_never_sees_the_nested_chunks() {
		let source = json!({ "chunks": [{ "index": 0 }], "embedding_model": "embeddings-small" });

		assert!(evaluate(&Query::Exists { field: "chunks".to_string() }, "x", &source).is_none());
		assert!(
			evaluate(&Query::Exists { field: "embedding_model".to_string() }, "x", &source)
				.is_some()
		);
	}

	#[test]
	fn trigram_matching_honors_minimum_should_match() {
		assert!(trigram_score("wolf", "wolf pack", Some("75%")).is_some());
		assert!(trigram_score("wolverine", "wolf pack", Some("75%")).is_none());
	}

	#[test]
	fn hybrid_normalization_is_a_weighted_mean() {
		let a = json!({ "title": { "en": "wolf" } });
		let b = json!({ "title": { "en": "dog" } });
		let candidates = vec![
			("a".to_string(), &a, 1_u64, 1_u64),
			("b".to_string(), &b, 2_u64, 1_u64),
		];
		let queries = vec![
			Query::MultiMatch(MultiMatch {
				query: "wolf".to_string(),
				fields: vec!["title.*.text".to_string()],
				boost: None,
				minimum_should_match: None,
			}),
			Query::MatchAll,
		];
		let scores = hybrid_scores(&queries, &candidates, Some(&[0.5, 0.5]));

		// Both docs match the match_all arm; only the first matches lexically.
		assert!(scores[0].unwrap() > scores[1].unwrap());
	}
}
