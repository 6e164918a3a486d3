//! Service metadata endpoint.

use serde_json::{json, Map, Value};

use crate::response::Envelope;

pub const APP_NAME: &str = "BridgIt";
/// API version reported to clients; independent of the crate version.
pub const APP_VERSION: &str = "0.1";
pub const APP_DESCRIPTION: &str = "This is Bridgit, a liaison between Weblicht and the GEF";

/// GET /
///
/// Returns `{name, version, Description}`. No side effects.
pub async fn index() -> Envelope {
    Envelope::ok(app_info())
}

fn app_info() -> Map<String, Value> {
    let mut info = Map::new();
    info.insert("name".into(), json!(APP_NAME));
    info.insert("version".into(), json!(APP_VERSION));
    info.insert("Description".into(), json!(APP_DESCRIPTION));
    info
}
