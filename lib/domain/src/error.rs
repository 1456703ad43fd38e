use thiserror::Error;

/// The internal error taxonomy of the query runtime. Only `Compile`
/// and `Deadline` (when fired before any result could be emitted) ever
/// escape `Runtime::run` as an `Err` — every other kind is folded into
/// a statement's `Details` inside a successful `Resources`.
#[derive(Debug, Error)]
pub enum RestqlError {
  #[error("query failed to compile: {0}")]
  Compile(#[from] CompileError),

  #[error("global query deadline exceeded before any result was produced")]
  Deadline,

  #[error("mapping registry: {0}")]
  MappingRegistry(#[source] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum CompileError {
  #[error("alias {alias:?} referenced by statement {referrer:?} is not defined earlier in the query")]
  UnknownAlias { alias: String, referrer: String },

  #[error("dependency cycle detected involving alias {alias:?}")]
  Cycle { alias: String },

  #[error(
    "statement {alias:?} has more than one list-valued parameter; \
     only a single multiplex dimension is supported"
  )]
  MultipleMultiplexParams { alias: String },

  #[error("duplicate alias {alias:?} in query")]
  DuplicateAlias { alias: String },
}

/// Per-statement resolution failure: never fatal to the query, folded
/// into that statement's `Details{status: 400}`.
#[derive(Debug, Error)]
pub enum ResolutionError {
  #[error("missing required path parameter {name:?} for resource {resource:?}")]
  MissingPathParam { name: String, resource: String },

  #[error("chain reference to unknown alias {alias:?}")]
  UnknownChainAlias { alias: String },

  #[error("mapping not found for resource {resource:?}")]
  UnknownResource { resource: String },

  #[error(
    "statement {alias:?} has more than one list-valued parameter"
  )]
  MultipleMultiplexParams { alias: String },
}
