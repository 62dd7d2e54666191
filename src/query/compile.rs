//! Compiles one request node into native query text.

use std::borrow::Cow;

use tracing::debug;

use crate::query::context::RequestContext;
use crate::query::errors::RequestError;
use crate::query::node::{RequestNode, LIMIT_ARG, OFFSET_ARG};
use crate::query::value::Value;

/// Join information handed down from the parent node.
#[derive(Clone, Copy, Debug)]
pub struct ParentLink<'a> {
    /// Field on the child holding the parent's identifier.
    pub join_field: &'a str,
    /// Identifiers produced by the parent's query.
    pub identifiers: &'a [Value],
}

/// Result of compiling a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompiledQuery {
    /// Query to send to the backing store.
    Execute(String),
    /// The parent produced no identifiers; the query must not be sent.
    ShortCircuit(String),
}

impl CompiledQuery {
    /// The compiled text, whether or not it will be executed.
    pub fn text(&self) -> &str {
        match self {
            CompiledQuery::Execute(text) | CompiledQuery::ShortCircuit(text) => text,
        }
    }

    /// Returns true when the query must be skipped.
    pub fn is_short_circuit(&self) -> bool {
        matches!(self, CompiledQuery::ShortCircuit(_))
    }
}

/// Fields the native query selects for `node`.
///
/// Output fields first, then the parent join field when `join_field` is given,
/// then the identifier field when the node has children or nothing else is
/// selected.
pub fn select_fields<'a>(node: &'a RequestNode, join_field: Option<&'a str>) -> Vec<&'a str> {
    let mut fields = node.output_fields();
    if let Some(join_field) = join_field {
        if !fields.contains(&join_field) {
            fields.push(join_field);
        }
    }
    let needs_id = fields.is_empty() || !node.children.is_empty();
    if needs_id && !fields.contains(&node.id_field.as_str()) {
        fields.push(node.id_field.as_str());
    }
    fields
}

/// Compiles `node` and records the result in the request's query audit.
///
/// Argument errors are recorded in `ctx` and yield `None`.
pub fn compile(
    node: &RequestNode,
    parent: Option<ParentLink<'_>>,
    ctx: &mut RequestContext,
) -> Option<CompiledQuery> {
    match compile_node(node, parent) {
        Ok(compiled) => {
            debug!(
                entity = %node.entity,
                short_circuit = compiled.is_short_circuit(),
                query = compiled.text(),
                "query.compile"
            );
            ctx.audit.record(compiled.text());
            Some(compiled)
        }
        Err(err) => {
            ctx.error(err);
            None
        }
    }
}

/// Compiles `node` without touching any request state.
pub fn compile_node(
    node: &RequestNode,
    parent: Option<ParentLink<'_>>,
) -> Result<CompiledQuery, RequestError> {
    let join_field = parent.map(|link| link.join_field);
    let fields = select_fields(node, join_field);
    let mut query = format!("SELECT {} FROM {}", fields.join(", "), node.entity);
    let mut has_where = false;
    let mut short_circuit = false;

    if let Some(link) = parent {
        let ids: Vec<String> = link.identifiers.iter().filter_map(sql_literal).collect();
        if ids.is_empty() {
            short_circuit = true;
        } else {
            query.push_str(&format!(" WHERE {} IN ({})", link.join_field, ids.join(",")));
            has_where = true;
        }
    }

    for field in filter_fields(node, join_field) {
        if field == LIMIT_ARG || field == OFFSET_ARG {
            continue;
        }
        let Some(value) = node.arguments.get(field) else {
            continue;
        };
        query.push_str(if has_where { " AND " } else { " WHERE " });
        has_where = true;
        match value {
            Some(raw) => query.push_str(&format!("{field} = {}", quote(&decode_argument(raw)))),
            None => query.push_str(&format!("{field} IS NULL")),
        }
    }

    if let Some(limit) = pagination(node, LIMIT_ARG)? {
        query.push_str(&format!(" LIMIT {limit}"));
    }
    if let Some(offset) = pagination(node, OFFSET_ARG)? {
        query.push_str(&format!(" OFFSET {offset}"));
    }

    Ok(if short_circuit {
        CompiledQuery::ShortCircuit(query)
    } else {
        CompiledQuery::Execute(query)
    })
}

/// Fields an argument may filter on: the output fields plus the parent join field.
fn filter_fields<'a>(node: &'a RequestNode, join_field: Option<&'a str>) -> Vec<&'a str> {
    let mut fields = node.output_fields();
    if let Some(join_field) = join_field {
        if !fields.contains(&join_field) {
            fields.push(join_field);
        }
    }
    fields
}

fn pagination(node: &RequestNode, key: &str) -> Result<Option<u64>, RequestError> {
    let Some(raw) = node.argument(key) else {
        return Ok(None);
    };
    let decoded = decode_argument(raw);
    decoded
        .parse::<u64>()
        .map(Some)
        .map_err(|_| RequestError::InvalidArgument {
            entity: node.entity.clone(),
            key: key.to_owned(),
            reason: format!("must be a non-negative integer (got '{decoded}')"),
        })
}

/// Percent-decodes an argument value and strips one pair of surrounding quotes.
pub fn decode_argument(raw: &str) -> String {
    let decoded = urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw));
    let trimmed = decoded.trim();
    for quote in ['\'', '"'] {
        if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
            return trimmed[1..trimmed.len() - 1].to_owned();
        }
    }
    trimmed.to_owned()
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Renders an identifier as a SQL literal keeping its storage class.
///
/// Numbers stay unquoted so they match untyped integer columns. Null and
/// non-finite floats have no literal.
pub fn sql_literal(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_owned()),
        Value::Int(i) => Some(i.to_string()),
        Value::Float(f) if f.is_finite() => Some(format!("{f:?}")),
        Value::Float(_) => None,
        Value::String(s) => Some(quote(s)),
        Value::Bytes(bytes) => Some(format!(
            "X'{}'",
            bytes.iter().map(|b| format!("{b:02x}")).collect::<String>()
        )),
    }
}
