use serde_json::{Map, Value, json};

/// `(language tag, analyzer name)` for every supported language field pair.
pub const LANGUAGE_ANALYZERS: [(&str, &str); 5] = [
	("fr", "french_analyzer"),
	("en", "english_analyzer"),
	("de", "german_analyzer"),
	("nl", "dutch_analyzer"),
	("und", "undetermined_language_analyzer"),
];

/// Full index creation body: knn-enabled settings, per-language analyzers,
/// the shared trigram analyzer, and the strict mappings.
pub fn index_body(dimensions: u32) -> Value {
	json!({
		"settings": {
			"index.knn": true,
			"analysis": {
				"analyzer": analyzers(),
				"filter": filters(),
			},
		},
		"mappings": mappings(dimensions),
	})
}

fn analyzers() -> Value {
	json!({
		"french_analyzer": analyzer(&["lowercase", "asciifolding", "french_elision", "french_stop", "french_stemmer"]),
		"english_analyzer": analyzer(&["lowercase", "asciifolding", "english_stop", "english_stemmer"]),
		"german_analyzer": analyzer(&["lowercase", "asciifolding", "german_stop", "german_stemmer"]),
		"dutch_analyzer": analyzer(&["lowercase", "asciifolding", "dutch_stop", "dutch_stemmer"]),
		"undetermined_language_analyzer": analyzer(&["lowercase", "asciifolding"]),
		"trigram_analyzer": analyzer(&["lowercase", "asciifolding", "trigram_filter"]),
	})
}

fn analyzer(filter: &[&str]) -> Value {
	json!({
		"type": "custom",
		"tokenizer": "standard",
		"filter": filter,
	})
}

fn filters() -> Value {
	json!({
		"french_elision": {
			"type": "elision",
			"articles_case": true,
			"articles": [
				"l", "m", "t", "qu", "n", "s", "j", "d", "c", "jusqu", "quoiqu", "lorsqu",
				"puisqu",
			],
		},
		"french_stop": { "type": "stop", "stopwords": "_french_" },
		"french_stemmer": { "type": "stemmer", "language": "light_french" },
		"english_stop": { "type": "stop", "stopwords": "_english_" },
		"english_stemmer": { "type": "stemmer", "language": "english" },
		"german_stop": { "type": "stop", "stopwords": "_german_" },
		"german_stemmer": { "type": "stemmer", "language": "light_german" },
		"dutch_stop": { "type": "stop", "stopwords": "_dutch_" },
		"dutch_stemmer": { "type": "stemmer", "language": "dutch" },
		"trigram_filter": { "type": "ngram", "min_gram": 3, "max_gram": 3 },
	})
}

fn mappings(dimensions: u32) -> Value {
	let mut properties = Map::new();

	properties.insert("id".to_string(), json!({ "type": "keyword" }));

	for (tag, analyzer) in LANGUAGE_ANALYZERS {
		properties.insert(format!("title.{tag}"), title_field(analyzer));
		properties.insert(format!("content.{tag}"), content_field(analyzer));
	}

	properties.insert("depth".to_string(), json!({ "type": "integer" }));
	properties.insert(
		"path".to_string(),
		json!({ "type": "keyword", "fields": { "text": { "type": "text" } } }),
	);
	properties.insert("numchild".to_string(), json!({ "type": "integer" }));
	properties.insert("created_at".to_string(), json!({ "type": "date" }));
	properties.insert("updated_at".to_string(), json!({ "type": "date" }));
	properties.insert("size".to_string(), json!({ "type": "long" }));
	properties.insert("users".to_string(), json!({ "type": "keyword" }));
	properties.insert("groups".to_string(), json!({ "type": "keyword" }));
	properties.insert("reach".to_string(), json!({ "type": "keyword" }));
	properties.insert("tags".to_string(), json!({ "type": "keyword" }));
	properties.insert("is_active".to_string(), json!({ "type": "boolean" }));
	properties.insert("mimetype".to_string(), json!({ "type": "keyword" }));
	properties.insert("content_uri".to_string(), json!({ "type": "keyword" }));
	properties.insert("content_status".to_string(), json!({ "type": "keyword" }));
	properties.insert(
		"chunks".to_string(),
		json!({
			"type": "nested",
			"properties": {
				"index": { "type": "integer" },
				"content": { "type": "text" },
				"embedding": {
					"type": "knn_vector",
					"dimension": dimensions,
					"method": {
						"engine": "lucene",
						"space_type": "l2",
						"name": "hnsw",
						"parameters": {},
					},
				},
			},
		}),
	);
	properties.insert("embedding_model".to_string(), json!({ "type": "keyword" }));

	json!({
		"dynamic": "strict",
		"properties": properties,
	})
}

fn title_field(analyzer: &str) -> Value {
	json!({
		"type": "keyword",
		"fields": {
			"text": {
				"type": "text",
				"analyzer": analyzer,
				"fields": {
					"trigrams": { "type": "text", "analyzer": "trigram_analyzer" },
				},
			},
		},
	})
}

fn content_field(analyzer: &str) -> Value {
	json!({
		"type": "text",
		"analyzer": analyzer,
		"fields": {
			"trigrams": { "type": "text", "analyzer": "trigram_analyzer" },
		},
	})
}

/// Body for the hybrid normalization pipeline: min-max normalization and a
/// weighted arithmetic mean over the [lexical, semantic] sub-query scores.
pub fn search_pipeline_body(weights: &[f32]) -> Value {
	json!({
		"description": "Post processor for hybrid search",
		"phase_results_processors": [
			{
				"normalization-processor": {
					"combination": {
						"technique": "arithmetic_mean",
						"parameters": { "weights": weights },
					},
				},
			},
		],
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn every_language_pair_carries_trigram_sub_fields() {
		let body = index_body(4);
		let properties = &body["mappings"]["properties"];

		for (tag, analyzer) in LANGUAGE_ANALYZERS {
			let title = &properties[&format!("title.{tag}")];
			let content = &properties[&format!("content.{tag}")];

			assert_eq!(title["type"], "keyword");
			assert_eq!(title["fields"]["text"]["analyzer"], analyzer);
			assert_eq!(
				title["fields"]["text"]["fields"]["trigrams"]["analyzer"],
				"trigram_analyzer"
			);
			assert_eq!(content["analyzer"], analyzer);
			assert_eq!(content["fields"]["trigrams"]["analyzer"], "trigram_analyzer");
		}
	}

	#[test]
	fn chunk_embeddings_use_the_configured_dimension() {
		let body = index_body(1024);
		let embedding = &body["mappings"]["properties"]["chunks"]["properties"]["embedding"];

		assert_eq!(embedding["type"], "knn_vector");
		assert_eq!(embedding["dimension"], 1024);
		assert_eq!(embedding["method"]["space_type"], "l2");
	}

	#[test]
	fn mappings_are_strict() {
		let body = index_body(8);

		assert_eq!(body["mappings"]["dynamic"], "strict");
		assert_eq!(body["settings"]["index.knn"], true);
	}

	#[test]
	fn pipeline_body_carries_the_weights() {
		let body = search_pipeline_body(&[0.4, 0.6]);
		let combination =
			&body["phase_results_processors"][0]["normalization-processor"]["combination"];

		assert_eq!(combination["technique"], "arithmetic_mean");

		let weights = combination["parameters"]["weights"]
			.as_array()
			.expect("Weights must serialize as an array.");

		assert_eq!(weights.len(), 2);
		assert!((weights[0].as_f64().expect("Weight must be numeric.") - 0.4).abs() < 1e-6);
	}
}
