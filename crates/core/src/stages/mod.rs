// Stage kinds shipped with the core crate

pub mod registration;
pub mod reset;

pub use registration::UserRegistrationConfig;
pub use reset::ResetStageConfig;

use crate::registry::StageTypeRegistry;
use crate::stage::StageError;
use url::Url;

/// Register every builtin stage kind
pub fn register_all(registry: &mut StageTypeRegistry) -> Result<(), StageError> {
    registration::register(registry)?;
    reset::register(registry)?;
    Ok(())
}

/// The identity service must be addressed by an absolute http(s) URL
pub(crate) fn check_identity_service_url(url: &str) -> Result<(), String> {
    if url.is_empty() {
        return Err("identityServiceUrl is not specified".to_string());
    }

    let parsed = Url::parse(url).map_err(|e| format!("identityServiceUrl '{}' is invalid: {}", url, e))?;
    match parsed.scheme() {
        "http" | "https" if parsed.has_host() => Ok(()),
        _ => Err(format!(
            "identityServiceUrl '{}' must be an absolute http(s) URL",
            url
        )),
    }
}

pub(crate) fn check_field(field: &str, value: &str) -> Result<(), String> {
    if value.is_empty() {
        Err(format!("{} is not specified", field))
    } else {
        Ok(())
    }
}
