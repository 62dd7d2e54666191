#![forbid(unsafe_code)]

//! Nested query pipeline.
//!
//! A query document flows through normalization, tree building (which resolves
//! every node against the metadata catalog), per-node compilation, execution
//! against a backing store and finally assembly into nested output.

/// Stitches child records under their parents.
pub mod assemble;

/// Per-node native query compilation.
///
/// Produces the select list, join filter, argument filters and pagination
/// clauses for one request node.
pub mod compile;

/// Request-scoped error collection and query audit.
pub mod context;

/// Errors raised while serving a single request.
pub mod errors;

/// Depth-first execution of request trees.
pub mod executor;

/// Query metadata and catalog information.
///
/// Describes the entities, fields and child relationships known to the host.
pub mod metadata;

/// Request tree nodes.
pub mod node;

/// Raw text normalization.
pub mod normalize;

/// Performance profiling for query operations.
///
/// Collects timing and count statistics to identify performance bottlenecks.
pub mod profile;

/// Node token splitting and resolution.
pub mod resolve;

/// Query document parsing into request trees.
pub mod tree;

/// Scalar values exchanged with the backing store.
pub mod value;

pub use context::RequestContext;
pub use errors::RequestError;
pub use executor::Executor;
pub use metadata::{ChildRelationship, EntityDescriptor, InMemoryCatalog, MetadataCatalog};
pub use node::RequestNode;
pub use tree::TreeBuilder;
pub use value::Value;
