use regex::Regex;
use serde_json::Value;

use crate::context::{Context, User};
use crate::errors::{AnalyticalError, Result};
use crate::settings::{scalar_to_string, truthy, Settings};
use crate::sources::{domain_chain, identity_override_chain};

/// Prefix used when a caller does not ask for a per-service one.
pub const DEFAULT_PREFIX: &str = "ANALYTICAL";

/// What a required setting must satisfy.
#[derive(Debug, Clone)]
pub enum Requirement {
    /// The value must contain a match (use anchors for a full match).
    Pattern(Regex),
    /// The value must be one of these.
    Choices(Vec<String>),
}

impl Requirement {
    pub fn choices<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Requirement::Choices(items.into_iter().map(Into::into).collect())
    }

    fn accepts(&self, value: &str) -> bool {
        match self {
            Requirement::Pattern(re) => re.is_match(value),
            Requirement::Choices(valid) => valid.iter().any(|c| c == value),
        }
    }
}

impl From<Regex> for Requirement {
    fn from(re: Regex) -> Self {
        Requirement::Pattern(re)
    }
}

/// True when the visitor's address is on the internal allowlist.
///
/// The allowlist is `{prefix}_INTERNAL_IPS`, else `ANALYTICAL_INTERNAL_IPS`,
/// else `INTERNAL_IPS`. A defined list stops the fall-through even when it
/// is empty.
pub fn is_internal_ip(ctx: &Context, settings: &Settings, prefix: Option<&str>) -> bool {
    let Some(addr) = ctx.request.as_ref().and_then(|r| r.client_addr()) else {
        return false;
    };
    let prefix = prefix.unwrap_or(DEFAULT_PREFIX);
    let internal_ips = [
        format!("{prefix}_INTERNAL_IPS"),
        format!("{DEFAULT_PREFIX}_INTERNAL_IPS"),
        "INTERNAL_IPS".to_string(),
    ]
    .iter()
    .find_map(|key| settings.get_list(key))
    .unwrap_or_default();

    let internal = internal_ips.iter().any(|ip| ip == addr);
    if internal {
        tracing::debug!(addr, prefix, "visitor is on an internal address");
    }
    internal
}

/// Domain to report for `service`; first match of the domain chain.
pub fn get_domain(ctx: &Context, settings: &Settings, service: &str) -> Option<String> {
    domain_chain().resolve(ctx, settings, service)
}

/// Identity to associate with the visitor.
///
/// Explicit context overrides are returned verbatim. Otherwise, with
/// `ANALYTICAL_AUTO_IDENTIFY` on (the default), the username of an
/// authenticated user: `user` if given, else the one in the context.
pub fn get_identity(
    ctx: &Context,
    settings: &Settings,
    prefix: Option<&str>,
    user: Option<&User>,
) -> Option<String> {
    if let Some(identity) = identity_override_chain().resolve(ctx, settings, prefix.unwrap_or("")) {
        return Some(identity);
    }
    if !settings.get_bool("ANALYTICAL_AUTO_IDENTIFY", true) {
        return None;
    }
    let user = user.or_else(|| ctx.current_user())?;
    if !user.is_authenticated {
        return None;
    }
    user.username().map(str::to_string)
}

/// Fetch a setting that must be present and valid.
pub fn get_required_setting(
    settings: &Settings,
    name: &str,
    requirement: &Requirement,
    invalid_message: &str,
) -> Result<String> {
    let value = match settings.get(name) {
        None => return Err(AnalyticalError::SettingNotFound(name.to_string())),
        Some(Value::Null) => return Err(AnalyticalError::SettingIsNone(name.to_string())),
        Some(v) if !truthy(v) => return Err(AnalyticalError::SettingNotSet(name.to_string())),
        Some(v) => scalar_to_string(v).unwrap_or_else(|| v.to_string()),
    };
    if !requirement.accepts(&value) {
        return Err(AnalyticalError::InvalidSetting {
            setting: name.to_string(),
            message: invalid_message.to_string(),
            value,
        });
    }
    Ok(value)
}
