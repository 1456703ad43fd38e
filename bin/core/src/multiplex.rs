//! Multiplexer (C6): fans a statement with one list-valued field into N
//! concurrent executions, preserving input order in the output.

use std::collections::HashMap;
use std::time::Duration;

use domain::{
  Details, DoneResource, HttpTransport, Mapping, PluginHost,
  ResourceEntry, Statement, Value,
};
use futures_util::future::join_all;

use crate::executor::{self, ExecutionInputs};
use crate::resolver::{self, ResolvedField};

#[allow(clippy::too_many_arguments)]
pub async fn run(
  statement: &Statement,
  mapping: &Mapping,
  fields: HashMap<String, ResolvedField>,
  multiplex_key: Option<String>,
  headers: HashMap<String, String>,
  transport: &dyn HttpTransport,
  plugin_host: &dyn PluginHost,
  deadline: Duration,
  debug: bool,
) -> ResourceEntry {
  let elements = multiplex_key.as_deref().and_then(|key| {
    match fields.get(key) {
      Some(ResolvedField::List(items)) => Some(items.clone()),
      _ => None,
    }
  });

  match elements {
    None => {
      let values = resolver::materialize(&fields, None, None);
      let done = run_one(
        statement,
        mapping,
        values,
        headers,
        transport,
        plugin_host,
        deadline,
        debug,
      )
      .await;
      ResourceEntry::Single(done)
    }
    Some(items) => {
      let futures = items.iter().map(|element| {
        let values = resolver::materialize(
          &fields,
          multiplex_key.as_deref(),
          Some(element),
        );
        run_one(
          statement,
          mapping,
          values,
          headers.clone(),
          transport,
          plugin_host,
          deadline,
          debug,
        )
      });
      let done_resources = join_all(futures).await;
      ResourceEntry::Multiplexed(done_resources)
    }
  }
}

#[allow(clippy::too_many_arguments)]
async fn run_one(
  statement: &Statement,
  mapping: &Mapping,
  values: HashMap<String, Value>,
  headers: HashMap<String, String>,
  transport: &dyn HttpTransport,
  plugin_host: &dyn PluginHost,
  deadline: Duration,
  debug: bool,
) -> DoneResource {
  match resolver::split_path_params(values, mapping, &statement.resource)
  {
    Ok((path_params, remaining)) => {
      executor::execute(
        ExecutionInputs {
          statement,
          mapping,
          path_params,
          fields: remaining,
          headers,
          debug,
        },
        transport,
        plugin_host,
        deadline,
      )
      .await
    }
    // A missing path parameter is a per-statement resolution failure,
    // never fatal to the query.
    Err(_) => DoneResource {
      details: Details::new(400, statement.ignore_errors),
      result: Value::Null,
    },
  }
}
