use serde_json::{Value, json};
use uuid::Uuid;

use seek_domain::Reach;
use seek_store::query::{BoolQuery, Query};

/// Caller identity for query-time access control.
#[derive(Clone, Debug, Default)]
pub struct AccessContext {
	pub user_sub: String,
	pub groups: Vec<String>,
	/// Documents the caller has independently proven prior access to.
	pub visited: Vec<Uuid>,
	/// Optional exact-match narrowing on the visibility tier.
	pub reach: Option<Reach>,
}

/// Conjunct list every query is filtered by. Pure; reused by search and by
/// any path that must only touch documents a caller may see.
///
/// The access clause is a three-arm disjunction: non-restricted documents the
/// caller has visited, documents granting the user directly, and documents
/// granting one of the caller's groups.
pub fn access_filter(ctx: &AccessContext) -> Vec<Query> {
	let mut visited: Vec<Value> =
		ctx.visited.iter().map(|id| Value::String(id.to_string())).collect();

	visited.sort_by(|a, b| a.as_str().cmp(&b.as_str()));

	let groups: Vec<Value> = ctx.groups.iter().map(|group| json!(group)).collect();
	let mut filters = vec![
		Query::term("is_active", true),
		Query::Bool(BoolQuery {
			should: vec![
				Query::Bool(BoolQuery {
					must_not: vec![Query::term("reach", Reach::Restricted.as_str())],
					must: vec![Query::terms("_id", visited)],
					..Default::default()
				}),
				Query::term("users", ctx.user_sub.as_str()),
				Query::terms("groups", groups),
			],
			minimum_should_match: Some(1),
			..Default::default()
		}),
	];

	if let Some(reach) = ctx.reach {
		filters.push(Query::term("reach", reach.as_str()));
	}

	filters
}

/// Ownership-only arm, for mutations: a caller owns the documents that list
/// them in `users`. Visited and group access never grant modification.
pub fn ownership_filter(user_sub: &str) -> Query {
	Query::term("users", user_sub)
}
