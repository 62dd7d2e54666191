//! Stitches executed request trees back into nested output.

use serde_json::{Map, Value as JsonValue};

use crate::engine::Record;
use crate::query::node::{join_field, RequestNode};
use crate::query::profile::{
    profile_timer as query_profile_timer, record_profile_timer as record_query_profile_timer,
    QueryProfileKind,
};

/// Builds the response data: each root alias mapped to its assembled records.
pub fn assemble(roots: &[RequestNode]) -> Map<String, JsonValue> {
    let timer = query_profile_timer();
    let mut data = Map::new();
    for root in roots {
        let records = root
            .result_records
            .iter()
            .map(|record| JsonValue::Object(assemble_record(root, &**record)))
            .collect();
        data.insert(root.alias.clone(), JsonValue::Array(records));
    }
    record_query_profile_timer(QueryProfileKind::Assemble, timer);
    data
}

/// Assembles one record of `node`, nesting the matching records of every child.
///
/// A child's records were already restricted to this node's identifiers when
/// they were fetched, so a linear scan per record is enough to pick out the
/// ones that belong here.
pub fn assemble_record(node: &RequestNode, record: &dyn Record) -> Map<String, JsonValue> {
    let mut entry = Map::new();
    for field in node.output_fields() {
        let value = record
            .get(field)
            .map(|value| value.to_json())
            .unwrap_or(JsonValue::Null);
        entry.insert(field.to_owned(), value);
    }

    let id = record.get(&node.id_field).and_then(|value| value.as_key());
    for child in &node.children {
        let matches = match (id.as_deref(), join_field(&node.child_join_keys, &child.name)) {
            (Some(id), Some(join)) => child
                .result_records
                .iter()
                .filter(|candidate| {
                    candidate
                        .get(join)
                        .and_then(|value| value.as_key())
                        .is_some_and(|key| key == id)
                })
                .map(|candidate| JsonValue::Object(assemble_record(child, &**candidate)))
                .collect(),
            _ => Vec::new(),
        };
        entry.insert(child.alias.clone(), JsonValue::Array(matches));
    }
    entry
}
