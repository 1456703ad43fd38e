//! Core data model for the restQL query runtime: the shapes that flow
//! between the scheduler, the statement executor, and the filter
//! pipeline. No I/O, no async — pure types plus the small amount of
//! parsing (`Mapping::parse`) that has no other natural home.

pub mod capabilities;
pub mod context;
pub mod error;
pub mod http;
pub mod mapping;
pub mod query;
pub mod result;
pub mod value;

pub use capabilities::{
  EnvSource, HttpTransport, MappingRegistry, PluginHost, TransportError,
};
pub use context::QueryContext;
pub use error::{CompileError, ResolutionError, RestqlError};
pub use http::{HttpRequest, HttpResponse, QueryValue};
pub use mapping::Mapping;
pub use query::{
  Method, OnlySelector, ParamRef, ChainRef, Query, Segment, Selector,
  Statement, UseOptions, ValueRef,
};
pub use result::{
  Debugging, Details, DoneResource, DoneResources, ResourceEntry,
  Resources,
};
pub use value::Value;
