//! Builds the request tree from normalized query text.
//!
//! The normalized text is tokenized into node/field words and the sentinel
//! brace markers, then consumed left to right with a stack of open nodes.
//! Grammar, after the leading `{` has been stripped:
//!
//! ```text
//! document := item* '}'
//! item     := node | field
//! node     := [alias ':'] name ['(' args ')'] '{' item* '}'
//! ```
//!
//! Bare words always belong to the node on top of the stack, so fields that
//! follow a nested node's closing brace are appended to the enclosing node.

use tracing::debug;

use crate::query::context::RequestContext;
use crate::query::errors::RequestError;
use crate::query::metadata::MetadataCatalog;
use crate::query::node::{insert_by_alias, RequestNode};
use crate::query::normalize::{normalize, END_SENTINEL, START_SENTINEL};
use crate::query::resolve::ObjectResolver;

/// Nesting depth accepted when no other limit is configured.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Lexical unit of normalized query text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Node token or field name.
    Word(&'a str),
    /// Start of a node's selection.
    Open,
    /// End of a node's selection.
    Close,
}

/// Splits normalized text into tokens.
pub fn tokenize(normalized: &str) -> Vec<Token<'_>> {
    let open = format!("{START_SENTINEL}{{");
    let close = format!("}}{END_SENTINEL}");
    let mut tokens = Vec::new();
    let mut word_start: Option<usize> = None;
    let mut idx = 0;
    while idx < normalized.len() {
        let rest = &normalized[idx..];
        let marker = if rest.starts_with(&open) {
            Some((Token::Open, open.len()))
        } else if rest.starts_with(&close) {
            Some((Token::Close, close.len()))
        } else {
            None
        };
        if let Some((token, len)) = marker {
            if let Some(start) = word_start.take() {
                tokens.push(Token::Word(&normalized[start..idx]));
            }
            tokens.push(token);
            idx += len;
            continue;
        }
        let Some(ch) = rest.chars().next() else {
            break;
        };
        if ch.is_whitespace() {
            if let Some(start) = word_start.take() {
                tokens.push(Token::Word(&normalized[start..idx]));
            }
        } else if word_start.is_none() {
            word_start = Some(idx);
        }
        idx += ch.len_utf8();
    }
    if let Some(start) = word_start {
        tokens.push(Token::Word(&normalized[start..]));
    }
    tokens
}

/// Stack-based builder turning tokens into resolved request nodes.
pub struct TreeBuilder<'a> {
    resolver: ObjectResolver<'a>,
    max_depth: usize,
}

impl<'a> TreeBuilder<'a> {
    /// Creates a builder resolving entities against `catalog`.
    pub fn new(catalog: &'a dyn MetadataCatalog) -> Self {
        Self {
            resolver: ObjectResolver::new(catalog),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Overrides the maximum nesting depth.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Parses a raw query document into its root nodes.
    ///
    /// Returns `None` after recording a single parse error when the document
    /// is empty or structurally malformed. Branches naming unknown entities are
    /// dropped with an error while the rest of the document is kept.
    pub fn parse(&self, raw: &str, ctx: &mut RequestContext) -> Option<Vec<RequestNode>> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            ctx.error(RequestError::parse("query is empty"));
            return None;
        }
        if !trimmed.starts_with('{') {
            ctx.error(RequestError::parse("query must start with '{'"));
            return None;
        }
        self.build(&normalize(trimmed), ctx)
    }

    /// Builds the request tree from normalized text.
    pub fn build(&self, normalized: &str, ctx: &mut RequestContext) -> Option<Vec<RequestNode>> {
        let tokens = tokenize(normalized);
        if let Err(message) = self.check_structure(&tokens) {
            ctx.error(RequestError::parse(message));
            return None;
        }

        let mut roots: Vec<RequestNode> = Vec::new();
        let mut stack: Vec<RequestNode> = Vec::new();
        let mut i = 0;
        while i < tokens.len() {
            match tokens[i] {
                Token::Word(word) if tokens.get(i + 1) == Some(&Token::Open) => {
                    match self.resolver.resolve(word, stack.last(), ctx) {
                        Some(node) => {
                            stack.push(node);
                            i += 2;
                        }
                        None => {
                            debug!(token = word, depth = stack.len(), "query.tree.skip_branch");
                            i = skip_branch(&tokens, i + 1);
                        }
                    }
                }
                Token::Word(field) => {
                    if let Some(current) = stack.last_mut() {
                        current.requested_fields.push(field.to_owned());
                    }
                    i += 1;
                }
                Token::Close => {
                    if let Some(done) = stack.pop() {
                        match stack.last_mut() {
                            Some(parent) => parent.add_child(done),
                            None => insert_by_alias(&mut roots, done),
                        }
                    }
                    i += 1;
                }
                Token::Open => i += 1,
            }
        }
        debug!(roots = roots.len(), "query.parse.complete");
        Some(roots)
    }

    fn check_structure(&self, tokens: &[Token<'_>]) -> Result<(), String> {
        if tokens.iter().all(|token| *token == Token::Close) {
            return Err("query is empty".into());
        }
        // The document's own brace is already open.
        let mut depth = 1usize;
        for (idx, token) in tokens.iter().enumerate() {
            if depth == 0 {
                return Err("unexpected content after the closing '}'".into());
            }
            match token {
                Token::Open => {
                    if !matches!(idx.checked_sub(1).map(|prev| &tokens[prev]), Some(Token::Word(_)))
                    {
                        return Err("'{' must follow an entity name".into());
                    }
                    depth += 1;
                    if depth - 1 > self.max_depth {
                        return Err(format!("query nesting exceeds {} levels", self.max_depth));
                    }
                }
                Token::Close => depth -= 1,
                Token::Word(word) => {
                    let opens_node = tokens.get(idx + 1) == Some(&Token::Open);
                    if depth == 1 && !opens_node {
                        return Err(format!("field '{word}' is outside of any entity"));
                    }
                }
            }
        }
        if depth > 0 {
            return Err("unbalanced braces: missing '}'".into());
        }
        Ok(())
    }
}

/// Returns the index just past the `Close` matching the `Open` at `open_idx`.
fn skip_branch(tokens: &[Token<'_>], open_idx: usize) -> usize {
    let mut depth = 0usize;
    for (idx, token) in tokens.iter().enumerate().skip(open_idx) {
        match token {
            Token::Open => depth += 1,
            Token::Close => {
                depth -= 1;
                if depth == 0 {
                    return idx + 1;
                }
            }
            Token::Word(_) => {}
        }
    }
    tokens.len()
}
