use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub(crate) mod auth;
pub(crate) mod catalog;
pub(crate) mod question;
pub(crate) mod session;
pub(crate) mod user;

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) service: String,
    pub(crate) status: String,
    pub(crate) components: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RootResponse {
    pub(crate) message: String,
    pub(crate) version: String,
    pub(crate) docs_url: String,
}

/// `{id, name}` reference to a catalog entry embedded in other responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct NamedRef {
    pub(crate) id: String,
    pub(crate) name: String,
}

impl NamedRef {
    pub(crate) fn from_parts(id: Option<String>, name: Option<String>) -> Option<Self> {
        match (id, name) {
            (Some(id), Some(name)) => Some(Self { id, name }),
            (Some(id), None) => Some(Self { name: id.clone(), id }),
            _ => None,
        }
    }
}
