//! Value Resolver (C1): turns one statement's `with`/`headers` into
//! plain JSON values, following parameter references, chain references,
//! and literal lists, against the partial `Resources` built by earlier
//! scheduler levels.

use std::collections::HashMap;

use domain::{
  ChainRef, Mapping, ParamRef, QueryContext, ResolutionError,
  ResourceEntry, Resources, Statement, Value, ValueRef,
};

/// One `with`-field's resolved shape: either a single value, ready to
/// send, or a list — the latter is what makes a statement multiplex:
/// it produces multiplexing if the resolved value is itself a list and
/// the target field is scalar.
#[derive(Debug, Clone)]
pub enum ResolvedField {
  Scalar(Value),
  List(Vec<Value>),
}

/// Resolve every `with` entry of a statement. A parameter reference
/// that is absent is *omitted* entirely, per spec — it never appears
/// as `null` in the map.
pub fn resolve_with(
  statement: &Statement,
  resources: &Resources,
  ctx: &QueryContext,
) -> Result<HashMap<String, ResolvedField>, ResolutionError> {
  let mut resolved = HashMap::with_capacity(statement.with.len());
  for (key, value_ref) in &statement.with {
    if let Some(value) = resolve_value_ref(value_ref, resources, ctx)? {
      resolved.insert(key.clone(), to_field(value));
    }
  }
  Ok(resolved)
}

fn to_field(value: Value) -> ResolvedField {
  match value {
    Value::Array(items) => ResolvedField::List(items),
    other => ResolvedField::Scalar(other),
  }
}

fn resolve_value_ref(
  value_ref: &ValueRef,
  resources: &Resources,
  ctx: &QueryContext,
) -> Result<Option<Value>, ResolutionError> {
  match value_ref {
    ValueRef::Literal(value) => Ok(Some(value.clone())),
    ValueRef::Param(ParamRef { param }) => {
      Ok(ctx.param(param).cloned())
    }
    ValueRef::Chain(chain) => resolve_chain(chain, resources),
    ValueRef::List(items) => {
      let mut values = Vec::with_capacity(items.len());
      for item in items {
        let value =
          resolve_value_ref(item, resources, ctx)?.unwrap_or(Value::Null);
        values.push(value);
      }
      Ok(Some(Value::Array(values)))
    }
  }
}

/// Walks a chain reference's path against an earlier statement's
/// result. Hitting a multiplexed predecessor fans the walk out across
/// every element, producing a list: a walk that encounters a
/// `DoneResources` fans resolution out.
fn resolve_chain(
  chain: &ChainRef,
  resources: &Resources,
) -> Result<Option<Value>, ResolutionError> {
  let entry =
    resources.get(&chain.alias).ok_or_else(|| {
      ResolutionError::UnknownChainAlias { alias: chain.alias.clone() }
    })?;
  let value = match entry {
    ResourceEntry::Single(done) => {
      domain::value::walk_path(&done.result, &chain.path).cloned()
    }
    ResourceEntry::Multiplexed(many) => {
      let values: Vec<Value> = many
        .iter()
        .filter_map(|done| {
          domain::value::walk_path(&done.result, &chain.path).cloned()
        })
        .collect();
      Some(Value::Array(values))
    }
  };
  Ok(value)
}

/// Find the statement's single multiplex dimension, if any. More than
/// one list-valued field is a compile-shaped error — only a single
/// multiplex dimension is supported per statement.
pub fn multiplex_key(
  fields: &HashMap<String, ResolvedField>,
  alias: &str,
) -> Result<Option<String>, ResolutionError> {
  let mut keys = fields.iter().filter_map(|(key, field)| match field {
    ResolvedField::List(_) => Some(key.clone()),
    ResolvedField::Scalar(_) => None,
  });
  let first = keys.next();
  if keys.next().is_some() {
    return Err(ResolutionError::MultipleMultiplexParams {
      alias: alias.to_string(),
    });
  }
  Ok(first)
}

/// Collapse resolved fields into plain scalar values for one concrete
/// execution: the multiplex dimension (if any) is replaced by a single
/// `element`, every other field is already scalar.
pub fn materialize(
  fields: &HashMap<String, ResolvedField>,
  multiplex_key: Option<&str>,
  element: Option<&Value>,
) -> HashMap<String, Value> {
  fields
    .iter()
    .map(|(key, field)| {
      let value = match (multiplex_key, field) {
        (Some(mux_key), ResolvedField::List(_)) if mux_key == key => {
          element.cloned().unwrap_or(Value::Null)
        }
        (_, ResolvedField::Scalar(v)) => v.clone(),
        (_, ResolvedField::List(items)) => Value::Array(items.clone()),
      };
      (key.clone(), value)
    })
    .collect()
}

/// Split materialized field values into the URI's path-param bindings
/// and the remaining fields that become query string / body.
pub fn split_path_params(
  values: HashMap<String, Value>,
  mapping: &Mapping,
  resource: &str,
) -> Result<(HashMap<String, String>, HashMap<String, Value>), ResolutionError>
{
  let mut path_params = HashMap::new();
  let mut remaining = HashMap::new();
  for (key, value) in values {
    if mapping.path_params_set.contains(&key) {
      let rendered = domain::value::leaf_as_str(&value)
        .unwrap_or_else(|| value.to_string());
      path_params.insert(key, rendered);
    } else {
      remaining.insert(key, value);
    }
  }
  for name in &mapping.path_params {
    if !path_params.contains_key(name) {
      return Err(ResolutionError::MissingPathParam {
        name: name.clone(),
        resource: resource.to_string(),
      });
    }
  }
  Ok((path_params, remaining))
}

/// `QueryContext.forward_headers` are the base; a statement's own
/// `headers` win on conflict.
pub fn resolve_headers(
  statement: &Statement,
  ctx: &QueryContext,
) -> HashMap<String, String> {
  let mut headers = ctx.forward_headers.clone();
  headers.extend(statement.headers.clone());
  headers
}

#[cfg(test)]
mod tests {
  use super::*;
  use domain::{Details, DoneResource};
  use serde_json::json;

  fn ctx() -> QueryContext {
    QueryContext::default()
  }

  #[test]
  fn literal_resolves_directly() {
    let mut statement = Statement {
      resource: "hero".into(),
      ..Default::default()
    };
    statement
      .with
      .insert("id".into(), ValueRef::Literal(json!(42)));
    let resolved =
      resolve_with(&statement, &Resources::new(), &ctx()).unwrap();
    match resolved.get("id").unwrap() {
      ResolvedField::Scalar(v) => assert_eq!(v, &json!(42)),
      _ => panic!("expected scalar"),
    }
  }

  #[test]
  fn missing_param_is_omitted() {
    let mut statement = Statement {
      resource: "hero".into(),
      ..Default::default()
    };
    statement.with.insert(
      "id".into(),
      ValueRef::Param(ParamRef { param: "missing".into() }),
    );
    let resolved =
      resolve_with(&statement, &Resources::new(), &ctx()).unwrap();
    assert!(resolved.is_empty());
  }

  #[test]
  fn chain_fans_out_over_multiplexed_predecessor() {
    let mut resources = Resources::new();
    resources.insert(
      "hero".into(),
      ResourceEntry::Multiplexed(vec![
        DoneResource {
          details: Details::new(200, false),
          result: json!({"id": "1"}),
        },
        DoneResource {
          details: Details::new(200, false),
          result: json!({"id": "2"}),
        },
      ]),
    );
    let chain =
      ChainRef { alias: "hero".into(), path: vec!["id".into()] };
    let resolved = resolve_chain(&chain, &resources).unwrap().unwrap();
    assert_eq!(resolved, json!(["1", "2"]));
  }

  #[test]
  fn multiplex_key_errors_on_two_lists() {
    let mut fields = HashMap::new();
    fields.insert(
      "a".into(),
      ResolvedField::List(vec![json!(1), json!(2)]),
    );
    fields.insert(
      "b".into(),
      ResolvedField::List(vec![json!(3), json!(4)]),
    );
    let err = multiplex_key(&fields, "hero").unwrap_err();
    assert!(matches!(
      err,
      ResolutionError::MultipleMultiplexParams { .. }
    ));
  }

  #[test]
  fn split_path_params_fails_on_missing_required() {
    let mapping = Mapping::parse("hero", "http://hero.api/{id}").unwrap();
    let err =
      split_path_params(HashMap::new(), &mapping, "hero").unwrap_err();
    assert!(matches!(err, ResolutionError::MissingPathParam { .. }));
  }
}
