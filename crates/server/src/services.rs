// Resource routes served by the demo and the users it starts with

use selfservice_core::resource::{
    CreateRequest, MemoryBackend, ResourceResult, Router as ResourceRouter,
    SingletonResourceProvider,
};
use serde_json::{json, Value};
use std::sync::Arc;

pub const USERS_ROUTE: &str = "/users";
pub const EMAIL_ROUTE: &str = "/email";

/// Build the resource router: an in-memory user collection and the email service
pub fn initialise(email: Arc<dyn SingletonResourceProvider>) -> ResourceRouter {
    let mut router = ResourceRouter::new();
    router
        .add_collection(USERS_ROUTE, Arc::new(MemoryBackend::new()))
        .add_singleton(EMAIL_ROUTE, email);
    router
}

/// Create the demo users
pub async fn create_demo_data(router: &ResourceRouter) -> ResourceResult<()> {
    let users = [
        ("andy123", "Andy", "andrew.forrest@forgerock.com"),
        ("jake123", "Jake", "jake.feasel@forgerock.com"),
        ("andi123", "Andi", "andi.egloff@forgerock.com"),
    ];

    for (id, name, mail) in users {
        router
            .create(CreateRequest::new(
                USERS_ROUTE,
                Some(id.to_string()),
                build_user(name, mail),
            ))
            .await?;
    }

    tracing::info!("Created {} demo users", users.len());
    Ok(())
}

fn build_user(name: &str, mail: &str) -> Value {
    json!({
        "name": name,
        "mail": mail,
        "_rev": "1.0",
    })
}
