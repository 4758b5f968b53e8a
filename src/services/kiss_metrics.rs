//! KISSmetrics funnel analysis.
//!
//! Needs `KISS_METRICS_API_KEY` (40 lowercase hex digits). Without it nothing
//! is rendered. Besides identifying the visitor, three context variables
//! drive extra commands:
//!
//! * `kiss_metrics_alias`: `{"old": "new"}`, aliases one identity to another
//! * `kiss_metrics_event`: `["Signed Up", {"plan": "pro"}]`, records an event
//! * `kiss_metrics_properties`: `{"gender": "m"}`, sets visitor properties

use std::sync::OnceLock;

use itertools::Itertools;
use regex::Regex;
use serde_json::Value;

use super::{Placement, Service};
use crate::context::Context;
use crate::errors::Result;
use crate::html::{disable_html, js_escape, script_json};
use crate::resolve::{get_identity, get_required_setting, is_internal_ip, Requirement};
use crate::settings::Settings;

pub const API_KEY_SETTING: &str = "KISS_METRICS_API_KEY";
pub const EVENT_CONTEXT_KEY: &str = "kiss_metrics_event";
pub const PROPERTY_CONTEXT_KEY: &str = "kiss_metrics_properties";
pub const ALIAS_CONTEXT_KEY: &str = "kiss_metrics_alias";

const TRACKING_CODE: &str = r#"<script type="text/javascript">
  var _kmq = _kmq || [];
  {commands}
  function _kms(u){
    setTimeout(function(){
      var s = document.createElement('script');
      s.type = 'text/javascript';
      s.async = true;
      s.src = u;
      var f = document.getElementsByTagName('script')[0];
      f.parentNode.insertBefore(s, f);
    }, 1);
  }
  _kms('//i.kissmetrics.com/i.js');
  _kms('//doug1izaerwt3.cloudfront.net/{api_key}.1.js');
</script>"#;

fn api_key_requirement() -> &'static Requirement {
    static RE: OnceLock<Requirement> = OnceLock::new();
    RE.get_or_init(|| {
        Requirement::Pattern(Regex::new(r"^[0-9a-f]{40}$").expect("static regex compiles"))
    })
}

pub struct KissMetrics;

impl Service for KissMetrics {
    fn name(&self) -> &'static str { "kiss_metrics" }

    fn placement(&self) -> Placement { Placement::HeadTop }

    fn render(&self, ctx: &Context, settings: &Settings) -> Result<String> {
        let api_key = get_required_setting(
            settings,
            API_KEY_SETTING,
            api_key_requirement(),
            "must be a string containing a 40-digit hexadecimal number",
        )?;

        let html = TRACKING_CODE
            .replace("{commands}", &commands(ctx, settings).iter().join(" "))
            .replace("{api_key}", &api_key);

        if is_internal_ip(ctx, settings, Some("KISS_METRICS")) {
            return Ok(disable_html(&html, "KISSmetrics"));
        }
        Ok(html)
    }
}

fn commands(ctx: &Context, settings: &Settings) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(identity) = get_identity(ctx, settings, Some("kiss_metrics"), None) {
        out.push(format!("_kmq.push(['identify', '{}']);", js_escape(&identity)));
    }
    if let Some((from, to)) = ctx
        .get(ALIAS_CONTEXT_KEY)
        .and_then(Value::as_object)
        .and_then(|m| m.iter().next())
    {
        out.push(format!(
            "_kmq.push(['alias', '{}', '{}']);",
            js_escape(from),
            js_escape(&text(to))
        ));
    }
    if let Some(event) = ctx.get(EVENT_CONTEXT_KEY).and_then(Value::as_array) {
        if let Some(name) = event.first() {
            let properties = event.get(1).cloned().unwrap_or_else(|| Value::Object(Default::default()));
            out.push(format!(
                "_kmq.push(['record', '{}', {}]);",
                js_escape(&text(name)),
                script_json(&properties)
            ));
        }
    }
    if let Some(properties) = ctx.get(PROPERTY_CONTEXT_KEY) {
        out.push(format!("_kmq.push(['set', {}]);", script_json(properties)));
    }
    out
}

fn text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
