pub mod errors;
pub mod context;
pub mod settings;
pub mod sources;   // precedence chains for domain and identity lookups
pub mod resolve;
pub mod services;
pub mod html;

use errors::Result;
use services::{Placement, Registry};

pub use context::{Context, Request, User};
pub use errors::AnalyticalError;
pub use resolve::{get_domain, get_identity, get_required_setting, is_internal_ip, Requirement};
pub use settings::Settings;

/// Convenience: render one service from the built-in registry.
pub fn render_service(name: &str, ctx: &Context, settings: &Settings) -> Result<String> {
    services::render_service(&Registry::with_builtins(), name, ctx, settings)
}

/// Convenience: render a placement slot from the built-in registry.
pub fn render_placement(placement: Placement, ctx: &Context, settings: &Settings) -> Result<String> {
    services::render_placement(&Registry::with_builtins(), placement, ctx, settings)
}
