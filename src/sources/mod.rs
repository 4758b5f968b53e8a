use std::sync::Arc;

use serde_json::Value;

use crate::context::Context;
use crate::settings::{scalar_to_string, Settings};

/// One step of a precedence chain: looks a value up in the context or the
/// settings. `key` is the service name or prefix the chain is resolving for.
pub trait Source: Send + Sync {
    fn name(&self) -> &'static str;
    fn lookup(&self, ctx: &Context, settings: &Settings, key: &str) -> Option<String>;
}

/// Ordered list of sources. The first one yielding a value wins.
#[derive(Clone, Default)]
pub struct Chain {
    sources: Arc<Vec<Arc<dyn Source>>>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<S: Source + 'static>(&mut self, source: S) {
        Arc::make_mut(&mut self.sources).push(Arc::new(source));
    }

    pub fn with<S: Source + 'static>(mut self, source: S) -> Self {
        self.push(source);
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub fn resolve(&self, ctx: &Context, settings: &Settings, key: &str) -> Option<String> {
        self.sources.iter().find_map(|source| {
            let found = source.lookup(ctx, settings, key)?;
            tracing::trace!(source = source.name(), key, "lookup matched");
            Some(found)
        })
    }
}

/// `{service}_domain` var, `analytical_domain` var, `{SERVICE}_DOMAIN`,
/// `ANALYTICAL_DOMAIN`, then the current site.
pub fn domain_chain() -> Chain {
    Chain::new()
        .with(builtins::KeyedVar { name: "service_domain_var", suffix: "_domain" })
        .with(builtins::Var("analytical_domain"))
        .with(builtins::KeyedSetting { name: "service_domain_setting", suffix: "_DOMAIN" })
        .with(builtins::Setting("ANALYTICAL_DOMAIN"))
        .with(builtins::CurrentSite)
}

/// Explicit identity overrides: `{prefix}_identity`, then
/// `analytical_identity`.
pub fn identity_override_chain() -> Chain {
    Chain::new()
        .with(builtins::KeyedVar { name: "prefix_identity_var", suffix: "_identity" })
        .with(builtins::Var("analytical_identity"))
}

fn value_to_string(v: &Value) -> String {
    scalar_to_string(v).unwrap_or_else(|| v.to_string())
}

pub mod builtins {
    use super::*;

    /// A fixed context variable.
    pub struct Var(pub &'static str);
    impl Source for Var {
        fn name(&self) -> &'static str { self.0 }
        fn lookup(&self, ctx: &Context, _: &Settings, _: &str) -> Option<String> {
            ctx.get(self.0).map(value_to_string)
        }
    }

    /// Context variable named `{key}{suffix}`. Skipped for an empty key.
    pub struct KeyedVar {
        pub name: &'static str,
        pub suffix: &'static str,
    }
    impl Source for KeyedVar {
        fn name(&self) -> &'static str { self.name }
        fn lookup(&self, ctx: &Context, _: &Settings, key: &str) -> Option<String> {
            if key.is_empty() {
                return None;
            }
            ctx.get(&format!("{key}{}", self.suffix)).map(value_to_string)
        }
    }

    /// A fixed setting.
    pub struct Setting(pub &'static str);
    impl Source for Setting {
        fn name(&self) -> &'static str { self.0 }
        fn lookup(&self, _: &Context, settings: &Settings, _: &str) -> Option<String> {
            settings.get_str(self.0)
        }
    }

    /// Setting named `{KEY}{suffix}` with the key upper-cased.
    pub struct KeyedSetting {
        pub name: &'static str,
        pub suffix: &'static str,
    }
    impl Source for KeyedSetting {
        fn name(&self) -> &'static str { self.name }
        fn lookup(&self, _: &Context, settings: &Settings, key: &str) -> Option<String> {
            if key.is_empty() {
                return None;
            }
            settings.get_str(&format!("{}{}", key.to_uppercase(), self.suffix))
        }
    }

    /// Domain of the current site from the `SITES` table, selected by
    /// `SITE_ID` (default 1). Entries are either a domain string or an
    /// object with a `domain` field.
    pub struct CurrentSite;
    impl Source for CurrentSite {
        fn name(&self) -> &'static str { "current_site" }
        fn lookup(&self, _: &Context, settings: &Settings, _: &str) -> Option<String> {
            let sites = settings.get("SITES")?.as_object()?;
            let site_id = settings.get_str("SITE_ID").unwrap_or_else(|| "1".to_string());
            match sites.get(&site_id)? {
                Value::Object(site) => site.get("domain").and_then(scalar_to_string),
                other => scalar_to_string(other),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn domain_chain_order() {
        assert_eq!(
            domain_chain().names(),
            vec![
                "service_domain_var",
                "analytical_domain",
                "service_domain_setting",
                "ANALYTICAL_DOMAIN",
                "current_site",
            ]
        );
    }

    #[test]
    fn current_site_by_id() {
        let settings = Settings::new()
            .with("SITES", json!({"1": "one.example", "2": {"domain": "two.example"}}))
            .with("SITE_ID", 2);
        assert_eq!(
            builtins::CurrentSite.lookup(&Context::new(), &settings, "test"),
            Some("two.example".to_string())
        );
        let default_site = Settings::new().with("SITES", json!({"1": "one.example"}));
        assert_eq!(
            builtins::CurrentSite.lookup(&Context::new(), &default_site, "test"),
            Some("one.example".to_string())
        );
    }

    #[test]
    fn keyed_sources_skip_empty_key() {
        let ctx = Context::new().with_var("_identity", "nobody");
        assert_eq!(identity_override_chain().resolve(&ctx, &Settings::new(), ""), None);
    }
}
