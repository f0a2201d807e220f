//! Registry configuration document derived from an access token.

use crate::cluster::{AccessToken, SecretData};
use serde::Serialize;
use std::collections::BTreeMap;

/// Data key under which the registry config document is stored.
pub const DOCKERCFG_KEY: &str = ".dockercfg";

/// Account name registries expect for token-based pulls.
const TOKEN_USER: &str = "oauth2accesstoken";

/// Placeholder address; registries require the field but ignore it.
const TOKEN_EMAIL: &str = "not@val.id";

#[derive(Serialize)]
struct RegistryAuth<'a> {
    username: &'a str,
    password: &'a str,
    email: &'a str,
    auth: String,
}

/// Build the registry config document for one token and host list.
///
/// Pure function of its inputs: the same token and hosts produce
/// byte-identical output (`BTreeMap` keeps host keys ordered).
pub fn registry_config_json(
    token: &AccessToken,
    hosts: &[String],
) -> Result<Vec<u8>, serde_json::Error> {
    let mut entries: BTreeMap<String, RegistryAuth<'_>> = BTreeMap::new();
    for host in hosts {
        entries.insert(
            format!("https://{host}"),
            RegistryAuth {
                username: TOKEN_USER,
                password: token.secret(),
                email: TOKEN_EMAIL,
                // Registry clients conventionally expect base64 here; the
                // plain form is what existing consumers of this secret
                // parse, so it is kept as-is.
                auth: format!("{TOKEN_USER}:{}", token.secret()),
            },
        );
    }
    serde_json::to_vec(&entries)
}

/// Secret payload carrying the registry config document under
/// [`DOCKERCFG_KEY`].
pub fn pull_secret_data(
    token: &AccessToken,
    hosts: &[String],
) -> Result<SecretData, serde_json::Error> {
    let mut data = SecretData::new();
    data.insert(
        DOCKERCFG_KEY.to_string(),
        registry_config_json(token, hosts)?,
    );
    Ok(data)
}
