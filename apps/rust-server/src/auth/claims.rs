// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated identity representation.

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// Claims read from a bearer token.
///
/// Only `exp` is mandatory; every other claim defaults to empty.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub sub: String,

    #[serde(default)]
    pub iss: String,

    /// Audience, either a single string or a list
    #[serde(default, deserialize_with = "one_or_many")]
    pub aud: Vec<String>,

    #[serde(default)]
    pub exp: Option<i64>,

    #[serde(default)]
    pub nbf: Option<i64>,

    #[serde(default)]
    pub client_id: Option<String>,

    #[serde(default, deserialize_with = "one_or_many")]
    pub roles: Vec<String>,

    /// Array or space-separated string
    #[serde(default, deserialize_with = "space_separated")]
    pub scopes: Vec<String>,

    /// OAuth `scope` claim, used when `scopes` is absent
    #[serde(default)]
    pub scope: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(v)) => v,
        None => Vec::new(),
    })
}

fn space_separated<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(s)) => split_scopes(&s),
        Some(OneOrMany::Many(v)) => v,
        None => Vec::new(),
    })
}

fn split_scopes(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

/// Identity established by a validated token.
///
/// Built fresh per request and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedIdentity {
    /// Token subject (`sub`)
    pub subject: String,
    pub issuer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    pub audiences: Vec<String>,
    pub roles: Vec<String>,
    pub scopes: Vec<String>,
    /// Token expiry (Unix seconds, 0 when unknown)
    pub expires_at_unix: i64,
}

impl AuthenticatedIdentity {
    pub fn from_claims(claims: TokenClaims) -> Self {
        let scopes = if claims.scopes.is_empty() {
            claims.scope.as_deref().map(split_scopes).unwrap_or_default()
        } else {
            claims.scopes
        };

        Self {
            subject: claims.sub,
            issuer: claims.iss,
            client_id: claims.client_id,
            audiences: claims.aud,
            roles: claims.roles,
            scopes,
            expires_at_unix: claims.exp.unwrap_or(0),
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    pub fn has_audience(&self, audience: &str) -> bool {
        self.audiences.iter().any(|a| a == audience)
    }
}
