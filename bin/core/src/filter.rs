//! Filter Pipeline (C8): hides statements marked `hidden`, then
//! projects `only` selectors over the remaining results.

use domain::{Query, ResourceEntry, Resources, Segment, Selector, Value};

pub fn apply(query: &Query, mut resources: Resources) -> Resources {
  for statement in &query.statements {
    if statement.hidden {
      resources.remove(statement.alias());
    }
  }

  for statement in &query.statements {
    if statement.only.is_empty() {
      continue;
    }
    let Some(entry) = resources.get_mut(statement.alias()) else {
      continue;
    };
    let selectors: Vec<Selector> = statement
      .only
      .iter()
      .filter_map(|only| only.compile().ok())
      .collect();
    project_entry(entry, &selectors);
  }

  resources
}

fn project_entry(entry: &mut ResourceEntry, selectors: &[Selector]) {
  match entry {
    ResourceEntry::Single(done) => {
      done.result = project_value(&done.result, &root_cursors(selectors));
    }
    ResourceEntry::Multiplexed(many) => {
      for done in many {
        done.result =
          project_value(&done.result, &root_cursors(selectors));
      }
    }
  }
}

struct Cursor<'a> {
  segments: &'a [Segment],
  regex: Option<&'a regex::Regex>,
}

fn root_cursors(selectors: &[Selector]) -> Vec<Cursor<'_>> {
  selectors
    .iter()
    .map(|selector| Cursor {
      segments: selector.path(),
      regex: match selector {
        Selector::Match(_, regex) => Some(regex),
        Selector::Path(_) => None,
      },
    })
    .collect()
}

/// Project `value` through `cursors`. Lists project element-wise;
/// objects admit a field iff some cursor's head segment names it (or
/// is `*`); primitives pass through untouched (spec: "if Result is a
/// primitive, leave untouched").
fn project_value(value: &Value, cursors: &[Cursor<'_>]) -> Value {
  match value {
    Value::Array(items) => Value::Array(
      items.iter().map(|item| project_value(item, cursors)).collect(),
    ),
    Value::Object(fields) => {
      let mut projected = serde_json::Map::new();
      for (key, field_value) in fields {
        if let Some(admitted) =
          decide_field(field_value, cursors, key)
        {
          projected.insert(key.clone(), admitted);
        }
      }
      Value::Object(projected)
    }
    other => other.clone(),
  }
}

fn decide_field(
  value: &Value,
  cursors: &[Cursor<'_>],
  key: &str,
) -> Option<Value> {
  let mut match_regexes: Vec<&regex::Regex> = Vec::new();
  let mut plain_wholesale = false;
  let mut child_cursors: Vec<Cursor<'_>> = Vec::new();

  for cursor in cursors {
    let Some((head, tail)) = cursor.segments.split_first() else {
      continue;
    };
    let admits = head.is_star() || head.name() == Some(key);
    if !admits {
      continue;
    }
    if tail.is_empty() {
      match cursor.regex {
        Some(regex) => match_regexes.push(regex),
        None => plain_wholesale = true,
      }
    } else {
      child_cursors.push(Cursor { segments: tail, regex: cursor.regex });
    }
  }

  if !match_regexes.is_empty() {
    return apply_match(value, &match_regexes);
  }
  if plain_wholesale {
    return Some(value.clone());
  }
  if !child_cursors.is_empty() {
    return Some(project_value(value, &child_cursors));
  }
  None
}

fn apply_match(value: &Value, regexes: &[&regex::Regex]) -> Option<Value> {
  let is_match = |v: &Value| {
    domain::value::leaf_as_str(v)
      .map(|s| regexes.iter().all(|re| re.is_match(&s)))
      .unwrap_or(false)
  };
  match value {
    Value::Array(items) => {
      let filtered: Vec<Value> =
        items.iter().filter(|v| is_match(v)).cloned().collect();
      Some(Value::Array(filtered))
    }
    other => is_match(other).then(|| other.clone()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use domain::{Details, DoneResource, OnlySelector, Statement};
  use serde_json::json;

  fn entry(result: Value) -> ResourceEntry {
    ResourceEntry::Single(DoneResource {
      details: Details::new(200, false),
      result,
    })
  }

  fn result_of(entry: &ResourceEntry) -> &Value {
    match entry {
      ResourceEntry::Single(done) => &done.result,
      ResourceEntry::Multiplexed(_) => panic!("expected single"),
    }
  }

  #[test]
  fn hidden_statement_is_removed() {
    let query = Query {
      statements: vec![
        Statement { resource: "hero".into(), hidden: true, ..Default::default() },
        Statement { resource: "sidekick".into(), ..Default::default() },
      ],
      ..Default::default()
    };
    let mut resources = Resources::new();
    resources.insert("hero".into(), entry(Value::Null));
    resources.insert("sidekick".into(), entry(Value::Null));

    let filtered = apply(&query, resources);
    assert!(!filtered.contains_key("hero"));
    assert!(filtered.contains_key("sidekick"));
  }

  #[test]
  fn only_projects_nested_paths() {
    let mut statement = Statement { resource: "hero".into(), ..Default::default() };
    statement.only = vec![
      OnlySelector::Path(vec!["city".into(), "name".into()]),
      OnlySelector::Path(vec!["city".into(), "population".into()]),
    ];
    let query = Query { statements: vec![statement], ..Default::default() };
    let mut resources = Resources::new();
    resources.insert(
      "hero".into(),
      entry(json!({
        "id": "12345", "name": "batman", "age": 42,
        "city": {"name": "gotham", "population": 10000000}
      })),
    );

    let filtered = apply(&query, resources);
    assert_eq!(
      result_of(&filtered["hero"]),
      &json!({"city": {"name": "gotham", "population": 10000000}})
    );
  }

  #[test]
  fn only_projects_list_of_objects() {
    let mut statement = Statement { resource: "hero".into(), ..Default::default() };
    statement.only =
      vec![OnlySelector::Path(vec!["weapons".into(), "name".into()])];
    let query = Query { statements: vec![statement], ..Default::default() };
    let mut resources = Resources::new();
    resources.insert(
      "hero".into(),
      entry(json!({
        "id": "12345",
        "weapons": [{"id": 1, "name": "belt"}, {"id": 2, "name": "batarang"}]
      })),
    );

    let filtered = apply(&query, resources);
    assert_eq!(
      result_of(&filtered["hero"]),
      &json!({"weapons": [{"name": "belt"}, {"name": "batarang"}]})
    );
  }

  #[test]
  fn match_filters_list_elements_by_regex() {
    let mut statement = Statement { resource: "hero".into(), ..Default::default() };
    statement.only = vec![OnlySelector::Match {
      path: vec!["weapons".into()],
      regex: "^b".into(),
    }];
    let query = Query { statements: vec![statement], ..Default::default() };
    let mut resources = Resources::new();
    resources.insert(
      "hero".into(),
      entry(json!({"id": "12345", "weapons": ["belt", "batarang", "katana"]})),
    );

    let filtered = apply(&query, resources);
    assert_eq!(
      result_of(&filtered["hero"]),
      &json!({"weapons": ["belt", "batarang"]})
    );
  }

  #[test]
  fn star_minus_match_excludes_non_matching_field() {
    let mut statement = Statement { resource: "hero".into(), ..Default::default() };
    statement.only = vec![
      OnlySelector::Path(vec!["*".into()]),
      OnlySelector::Match { path: vec!["name".into()], regex: "^c".into() },
    ];
    let query = Query { statements: vec![statement], ..Default::default() };
    let mut resources = Resources::new();
    resources.insert(
      "hero".into(),
      entry(json!({"id": "12345", "name": "batman", "age": 42})),
    );

    let filtered = apply(&query, resources);
    assert_eq!(
      result_of(&filtered["hero"]),
      &json!({"id": "12345", "age": 42})
    );
  }

  #[test]
  fn primitive_result_passes_through_untouched() {
    let mut statement = Statement { resource: "auth".into(), ..Default::default() };
    statement.only = vec![OnlySelector::Path(vec!["name".into()])];
    let query = Query { statements: vec![statement], ..Default::default() };
    let mut resources = Resources::new();
    resources.insert("auth".into(), entry(json!("1234567890abcdefg")));

    let filtered = apply(&query, resources);
    assert_eq!(result_of(&filtered["auth"]), &json!("1234567890abcdefg"));
  }
}
