//! Scheduler (C7): builds the alias dependency graph, batches
//! statements into concurrency levels via Kahn's algorithm, and runs
//! each level to completion before starting the next.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use domain::{
  CompileError, Details, HttpTransport, MappingRegistry, PluginHost,
  Query, QueryContext, ResourceEntry, Resources, Statement, Value,
  ValueRef,
};
use futures_util::future::join_all;

use crate::{multiplex, resolver};

/// Group statement indices into execution levels: level 0 has no
/// dependencies, level k's statements depend only on levels < k.
pub fn levels(query: &Query) -> Result<Vec<Vec<usize>>, CompileError> {
  let mut alias_index: HashMap<String, usize> = HashMap::new();
  for (i, statement) in query.statements.iter().enumerate() {
    if alias_index.insert(statement.alias().to_string(), i).is_some()
    {
      return Err(CompileError::DuplicateAlias {
        alias: statement.alias().to_string(),
      });
    }
  }

  let mut in_degree = vec![0usize; query.statements.len()];
  let mut dependents: Vec<Vec<usize>> =
    vec![Vec::new(); query.statements.len()];

  for (i, statement) in query.statements.iter().enumerate() {
    for dep_alias in referenced_aliases(statement) {
      let dep_index =
        *alias_index.get(&dep_alias).ok_or_else(|| {
          CompileError::UnknownAlias {
            alias: dep_alias.clone(),
            referrer: statement.alias().to_string(),
          }
        })?;
      if dep_index >= i {
        return Err(CompileError::UnknownAlias {
          alias: dep_alias,
          referrer: statement.alias().to_string(),
        });
      }
      dependents[dep_index].push(i);
      in_degree[i] += 1;
    }
  }

  let mut remaining = in_degree;
  let mut processed = vec![false; query.statements.len()];
  let mut frontier: Vec<usize> = (0..query.statements.len())
    .filter(|&i| remaining[i] == 0)
    .collect();
  let mut levels = Vec::new();
  let mut total_processed = 0;

  while !frontier.is_empty() {
    for &i in &frontier {
      processed[i] = true;
      total_processed += 1;
    }
    let mut next_frontier = Vec::new();
    for &i in &frontier {
      for &dep in &dependents[i] {
        remaining[dep] -= 1;
        if remaining[dep] == 0 {
          next_frontier.push(dep);
        }
      }
    }
    levels.push(frontier);
    frontier = next_frontier;
  }

  if total_processed != query.statements.len() {
    let alias = query
      .statements
      .iter()
      .enumerate()
      .find(|(i, _)| !processed[*i])
      .map(|(_, s)| s.alias().to_string())
      .unwrap_or_default();
    return Err(CompileError::Cycle { alias });
  }

  Ok(levels)
}

fn referenced_aliases(statement: &Statement) -> Vec<String> {
  let mut aliases = Vec::new();
  if let Some(target) = &statement.chain_target {
    aliases.push(target.clone());
  }
  for value_ref in statement.with.values() {
    collect_chain_aliases(value_ref, &mut aliases);
  }
  aliases
}

fn collect_chain_aliases(value_ref: &ValueRef, out: &mut Vec<String>) {
  match value_ref {
    ValueRef::Chain(chain) => out.push(chain.alias.clone()),
    ValueRef::List(items) => {
      for item in items {
        collect_chain_aliases(item, out);
      }
    }
    ValueRef::Literal(_) | ValueRef::Param(_) => {}
  }
}

/// Run every level of `query` to completion, fanning results into one
/// `Resources` map. Never fails except at the dependency-analysis step
/// — every per-statement failure folds into that alias's `Details`.
#[allow(clippy::too_many_arguments)]
pub async fn run(
  query: &Query,
  ctx: &QueryContext,
  mapping_registry: &dyn MappingRegistry,
  transport: &dyn HttpTransport,
  plugin_host: &dyn PluginHost,
  global_deadline_at: Instant,
  per_resource_default: Duration,
) -> Result<Resources, CompileError> {
  let levels = levels(query)?;
  let mut resources = Resources::new();

  for level in levels {
    let remaining =
      global_deadline_at.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
      for &i in &level {
        let statement = &query.statements[i];
        resources.insert(
          statement.alias().to_string(),
          ResourceEntry::Single(expired(statement)),
        );
      }
      continue;
    }

    let tasks = level.iter().map(|&i| {
      let statement = &query.statements[i];
      run_statement(
        statement,
        ctx,
        &resources,
        mapping_registry,
        transport,
        plugin_host,
        remaining,
        per_resource_default,
      )
    });
    let results = join_all(tasks).await;

    for (&i, entry) in level.iter().zip(results) {
      let statement = &query.statements[i];
      resources.insert(statement.alias().to_string(), entry);
    }
  }

  Ok(resources)
}

fn expired(statement: &Statement) -> domain::DoneResource {
  domain::DoneResource {
    details: Details::new(408, statement.ignore_errors),
    result: Value::Null,
  }
}

#[allow(clippy::too_many_arguments)]
async fn run_statement(
  statement: &Statement,
  ctx: &QueryContext,
  resources: &Resources,
  mapping_registry: &dyn MappingRegistry,
  transport: &dyn HttpTransport,
  plugin_host: &dyn PluginHost,
  remaining_global: Duration,
  per_resource_default: Duration,
) -> ResourceEntry {
  let failure = |status: u16| {
    ResourceEntry::Single(domain::DoneResource {
      details: Details::new(status, statement.ignore_errors),
      result: Value::Null,
    })
  };

  let mapping = match mapping_registry
    .resolve(&ctx.tenant, &statement.resource)
    .await
  {
    Ok(Some(mapping)) => mapping,
    Ok(None) => return failure(400),
    Err(e) => {
      tracing::warn!(
        resource = %statement.resource,
        error = %e,
        "mapping registry lookup failed"
      );
      return failure(500);
    }
  };

  let fields = match resolver::resolve_with(statement, resources, ctx) {
    Ok(fields) => fields,
    Err(_) => return failure(400),
  };

  let multiplex_key =
    match resolver::multiplex_key(&fields, statement.alias()) {
      Ok(key) => key,
      Err(_) => return failure(400),
    };

  let headers = resolver::resolve_headers(statement, ctx);
  let deadline = effective_deadline(
    statement,
    remaining_global,
    per_resource_default,
  );

  multiplex::run(
    statement,
    &mapping,
    fields,
    multiplex_key,
    headers,
    transport,
    plugin_host,
    deadline,
    ctx.debug,
  )
  .await
}

fn effective_deadline(
  statement: &Statement,
  remaining_global: Duration,
  per_resource_default: Duration,
) -> Duration {
  let mut deadline = remaining_global.min(per_resource_default);
  if let Some(timeout) = statement.timeout {
    deadline = deadline.min(timeout);
  }
  deadline
}

#[cfg(test)]
mod tests {
  use super::*;
  use domain::{ChainRef, ParamRef};

  fn statement(alias: &str, resource: &str) -> Statement {
    Statement {
      resource: resource.to_string(),
      alias: Some(alias.to_string()),
      ..Default::default()
    }
  }

  #[test]
  fn independent_statements_share_one_level() {
    let query = Query {
      statements: vec![
        statement("hero", "hero"),
        statement("sidekick", "sidekick"),
      ],
      ..Default::default()
    };
    let levels = levels(&query).unwrap();
    assert_eq!(levels, vec![vec![0, 1]]);
  }

  #[test]
  fn chained_statement_runs_in_a_later_level() {
    let mut sidekick = statement("sidekick", "sidekick");
    sidekick.with.insert(
      "heroId".into(),
      ValueRef::Chain(ChainRef {
        alias: "hero".into(),
        path: vec!["id".into()],
      }),
    );
    let query = Query {
      statements: vec![statement("hero", "hero"), sidekick],
      ..Default::default()
    };
    let levels = levels(&query).unwrap();
    assert_eq!(levels, vec![vec![0], vec![1]]);
  }

  #[test]
  fn forward_reference_is_a_compile_error() {
    let mut hero = statement("hero", "hero");
    hero.with.insert(
      "x".into(),
      ValueRef::Chain(ChainRef {
        alias: "sidekick".into(),
        path: vec![],
      }),
    );
    let query = Query {
      statements: vec![hero, statement("sidekick", "sidekick")],
      ..Default::default()
    };
    assert!(matches!(
      levels(&query),
      Err(CompileError::UnknownAlias { .. })
    ));
  }

  #[test]
  fn duplicate_alias_is_a_compile_error() {
    let query = Query {
      statements: vec![statement("hero", "hero"), statement("hero", "sidekick")],
      ..Default::default()
    };
    assert!(matches!(
      levels(&query),
      Err(CompileError::DuplicateAlias { .. })
    ));
  }

  #[test]
  fn param_reference_creates_no_dependency_edge() {
    let mut hero = statement("hero", "hero");
    hero.with.insert(
      "id".into(),
      ValueRef::Param(ParamRef { param: "id".into() }),
    );
    let query = Query {
      statements: vec![hero],
      ..Default::default()
    };
    let levels = levels(&query).unwrap();
    assert_eq!(levels, vec![vec![0]]);
  }
}
