use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::context::Context;
use crate::errors::{AnalyticalError, Result};
use crate::settings::Settings;

pub mod kiss_metrics;

/// Where in the page a service's code goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Placement {
    HeadTop,
    HeadBottom,
    BodyTop,
    BodyBottom,
}

impl Placement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Placement::HeadTop => "head_top",
            Placement::HeadBottom => "head_bottom",
            Placement::BodyTop => "body_top",
            Placement::BodyBottom => "body_bottom",
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Placement {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "head_top" => Ok(Placement::HeadTop),
            "head_bottom" => Ok(Placement::HeadBottom),
            "body_top" => Ok(Placement::BodyTop),
            "body_bottom" => Ok(Placement::BodyBottom),
            other => Err(format!("unknown placement `{other}`")),
        }
    }
}

/// A tracking service that renders its own snippet.
pub trait Service: Send + Sync {
    fn name(&self) -> &'static str;
    fn placement(&self) -> Placement;
    /// Render the snippet. A missing required setting surfaces as
    /// `AnalyticalError::SettingNotFound`.
    fn render(&self, ctx: &Context, settings: &Settings) -> Result<String>;
}

/// Thread-safe service registry, ordered by name.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<BTreeMap<&'static str, Arc<dyn Service>>>,
}

impl Registry {
    pub fn new() -> Self { Self::default() }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(kiss_metrics::KissMetrics);
        registry
    }

    pub fn register<S: Service + 'static>(&mut self, service: S) {
        Arc::make_mut(&mut self.inner).insert(service.name(), Arc::new(service));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Service>> {
        self.inner.get(name).cloned()
    }

    pub fn at(&self, placement: Placement) -> impl Iterator<Item = &Arc<dyn Service>> {
        self.inner.values().filter(move |s| s.placement() == placement)
    }
}

/// Render one service by name. Missing configuration renders nothing.
pub fn render_service(
    registry: &Registry,
    name: &str,
    ctx: &Context,
    settings: &Settings,
) -> Result<String> {
    let service = registry
        .get(name)
        .ok_or_else(|| AnalyticalError::UnknownService(name.to_string()))?;
    render_or_skip(service.as_ref(), ctx, settings)
}

/// Render every service registered at `placement`, joined by newlines.
pub fn render_placement(
    registry: &Registry,
    placement: Placement,
    ctx: &Context,
    settings: &Settings,
) -> Result<String> {
    let mut parts = Vec::new();
    for service in registry.at(placement) {
        let html = render_or_skip(service.as_ref(), ctx, settings)?;
        if !html.is_empty() {
            parts.push(html);
        }
    }
    Ok(parts.join("\n"))
}

fn render_or_skip(service: &dyn Service, ctx: &Context, settings: &Settings) -> Result<String> {
    match service.render(ctx, settings) {
        Err(e) if e.is_missing() => {
            tracing::debug!(service = service.name(), error = %e, "not rendering service");
            Ok(String::new())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Fixed;
    impl Service for Fixed {
        fn name(&self) -> &'static str { "fixed" }
        fn placement(&self) -> Placement { Placement::HeadTop }
        fn render(&self, _: &Context, _: &Settings) -> Result<String> {
            Ok("<script>fixed</script>".to_string())
        }
    }

    #[test]
    fn placement_round_trips_through_str() {
        for p in [Placement::HeadTop, Placement::HeadBottom, Placement::BodyTop, Placement::BodyBottom] {
            assert_eq!(p.as_str().parse::<Placement>(), Ok(p));
        }
        assert!("footer".parse::<Placement>().is_err());
    }

    #[test]
    fn unconfigured_services_are_skipped() {
        let mut registry = Registry::with_builtins();
        registry.register(Fixed);
        let out = render_placement(&registry, Placement::HeadTop, &Context::new(), &Settings::new())
            .unwrap();
        assert_eq!(out, "<script>fixed</script>");
        assert_eq!(
            render_placement(&registry, Placement::BodyBottom, &Context::new(), &Settings::new())
                .unwrap(),
            ""
        );
    }

    #[test]
    fn unknown_service_is_an_error() {
        let err = render_service(&Registry::with_builtins(), "nope", &Context::new(), &Settings::new())
            .unwrap_err();
        assert!(matches!(err, AnalyticalError::UnknownService(_)));
    }
}
