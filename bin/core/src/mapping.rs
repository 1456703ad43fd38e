//! Default Mapping Registry (C12): resolves a resource name to its
//! `Mapping`, merging statically configured mappings with
//! `RESTQL_MAPPING_<NAME>` environment entries (env wins), and
//! memoizing the parse per tenant+resource.

use std::collections::HashMap;

use async_trait::async_trait;
use cache::CloneCache;
use domain::{EnvSource, Mapping, MappingRegistry};

const ENV_PREFIX: &str = "RESTQL_MAPPING_";

pub struct DefaultMappingRegistry {
  local_mappings: HashMap<String, String>,
  env_source: Box<dyn EnvSource>,
  cache: CloneCache<(String, String), Mapping>,
}

impl DefaultMappingRegistry {
  pub fn new(
    local_mappings: HashMap<String, String>,
    env_source: Box<dyn EnvSource>,
  ) -> Self {
    DefaultMappingRegistry {
      local_mappings,
      env_source,
      cache: CloneCache::default(),
    }
  }

  fn lookup_url(&self, resource_name: &str) -> Option<String> {
    let env_key = format!(
      "{ENV_PREFIX}{}",
      resource_name.to_uppercase()
    );
    self
      .env_source
      .get_string(&env_key)
      .or_else(|| self.local_mappings.get(resource_name).cloned())
  }
}

#[async_trait]
impl MappingRegistry for DefaultMappingRegistry {
  async fn resolve(
    &self,
    tenant: &str,
    resource_name: &str,
  ) -> anyhow::Result<Option<Mapping>> {
    let cache_key = (tenant.to_string(), resource_name.to_string());
    if let Some(mapping) = self.cache.get(&cache_key).await {
      return Ok(Some(mapping));
    }

    let Some(url) = self.lookup_url(resource_name) else {
      return Ok(None);
    };
    let Some(mapping) = Mapping::parse(resource_name, &url) else {
      return Ok(None);
    };

    self.cache.insert(cache_key, mapping.clone()).await;
    Ok(Some(mapping))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct StubEnv(HashMap<String, String>);
  impl EnvSource for StubEnv {
    fn get_string(&self, key: &str) -> Option<String> {
      self.0.get(key).cloned()
    }
    fn get_all(&self) -> Vec<(String, String)> {
      self.0.clone().into_iter().collect()
    }
  }

  #[tokio::test]
  async fn resolves_from_local_mappings() {
    let mut local = HashMap::new();
    local.insert("hero".to_string(), "http://hero.api/{id}".to_string());
    let registry = DefaultMappingRegistry::new(
      local,
      Box::new(StubEnv(HashMap::new())),
    );

    let mapping =
      registry.resolve("default", "hero").await.unwrap().unwrap();
    assert_eq!(mapping.scheme, "http");
    assert_eq!(mapping.path_params, vec!["id".to_string()]);
  }

  #[tokio::test]
  async fn env_mapping_overrides_local() {
    let mut local = HashMap::new();
    local.insert("hero".to_string(), "http://hero.api/".to_string());
    let mut env = HashMap::new();
    env.insert(
      "RESTQL_MAPPING_HERO".to_string(),
      "https://hero.staging/".to_string(),
    );
    let registry =
      DefaultMappingRegistry::new(local, Box::new(StubEnv(env)));

    let mapping =
      registry.resolve("default", "hero").await.unwrap().unwrap();
    assert_eq!(mapping.scheme, "https");
    assert_eq!(mapping.host, "hero.staging/");
  }

  #[tokio::test]
  async fn unknown_resource_resolves_to_none() {
    let registry = DefaultMappingRegistry::new(
      HashMap::new(),
      Box::new(StubEnv(HashMap::new())),
    );
    assert!(registry
      .resolve("default", "missing")
      .await
      .unwrap()
      .is_none());
  }
}
