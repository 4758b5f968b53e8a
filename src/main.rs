use std::path::PathBuf;

use analytical::services::Placement;
use analytical::{Context, Settings};
use clap::{ArgGroup, Parser};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

/// Render analytics tracking code from a settings file and a context file.
#[derive(Parser, Debug)]
#[command(author, version, about)]
#[command(group(ArgGroup::new("target").required(true).args(["service", "placement"])))]
struct Args {
    /// Settings as a JSON object
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Render context as JSON (`vars`, `request`, `user`)
    #[arg(long)]
    context: Option<PathBuf>,
    /// Override a setting; the value is parsed as JSON, else taken as a string
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_override)]
    overrides: Vec<(String, Value)>,
    /// Render a single service, e.g. `kiss_metrics`
    #[arg(long)]
    service: Option<String>,
    /// Render every service at a slot: head_top, head_bottom, body_top, body_bottom
    #[arg(long)]
    placement: Option<Placement>,
}

/// Parse `KEY=VALUE`. The value is JSON when it parses as JSON, otherwise a
/// plain string.
fn parse_override(pair: &str) -> Result<(String, Value), String> {
    let (key, raw) = pair
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{pair}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing setting name in `{pair}`"));
    }
    let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(html) => println!("{html}"),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}

fn load_settings(args: &Args) -> analytical::errors::Result<Settings> {
    let mut settings = match &args.settings {
        Some(path) => Settings::from_path(path)?,
        None => Settings::new(),
    };
    for (key, value) in &args.overrides {
        settings.set(key, value.clone());
    }
    Ok(settings)
}

fn run(args: &Args) -> analytical::errors::Result<String> {
    let settings = load_settings(args)?;

    let ctx: Context = match &args.context {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => Context::new(),
    };

    match (&args.service, args.placement) {
        (Some(name), _) => analytical::render_service(name, &ctx, &settings),
        (None, Some(placement)) => analytical::render_placement(placement, &ctx, &settings),
        (None, None) => Ok(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn override_values_are_json_or_string() {
        assert_eq!(
            parse_override("INTERNAL_IPS=[\"1.1.1.1\"]").unwrap(),
            ("INTERNAL_IPS".to_string(), json!(["1.1.1.1"]))
        );
        assert_eq!(
            parse_override("ANALYTICAL_DOMAIN=example.org").unwrap(),
            ("ANALYTICAL_DOMAIN".to_string(), json!("example.org"))
        );
        assert_eq!(
            parse_override("ANALYTICAL_AUTO_IDENTIFY=false").unwrap(),
            ("ANALYTICAL_AUTO_IDENTIFY".to_string(), json!(false))
        );
        assert_eq!(parse_override("EMPTY=").unwrap(), ("EMPTY".to_string(), json!("")));
    }

    #[test]
    fn override_without_equals_is_rejected() {
        assert!(parse_override("KISS_METRICS_API_KEY").is_err());
        assert!(parse_override("=value").is_err());

        let err = Args::try_parse_from([
            "analytical",
            "--service",
            "kiss_metrics",
            "--set",
            "KISS_METRICS_API_KEY",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn overrides_reach_settings() {
        let args = Args::try_parse_from([
            "analytical",
            "--placement",
            "body_bottom",
            "--set",
            "ANALYTICAL_DOMAIN=example.org",
        ])
        .unwrap();
        assert_eq!(args.placement, Some(Placement::BodyBottom));
        let settings = load_settings(&args).unwrap();
        assert_eq!(settings.get_str("ANALYTICAL_DOMAIN").as_deref(), Some("example.org"));
        assert_eq!(run(&args).unwrap(), "");
    }
}
