//! Secret payloads and the connection credential derived from them.
//!
//! A secret value is classified exactly once, in [`SecretPayload::parse`].
//! Downstream code only ever sees the tagged union or a validated
//! [`Credential`]; the `user:pass` heuristic is never re-applied.

use secrecy::SecretString;
use serde_json::{Map, Value};

use crate::error::SecretError;

pub const DEFAULT_SSH_PORT: u16 = 22;

#[derive(Debug)]
pub enum SecretPayload {
    UsernamePassword {
        host: Option<String>,
        port: u16,
        username: Option<String>,
        password: SecretString,
    },
    /// Private key authentication. Wins over a password when both are present.
    UsernameKey {
        host: Option<String>,
        port: u16,
        username: Option<String>,
        private_key: SecretString,
    },
    /// A non-JSON value without a `:` separator.
    Opaque(SecretString),
}

impl SecretPayload {
    pub fn parse(raw: &str) -> Result<Self, SecretError> {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Self::from_object(&map),
            Ok(_) => Err(SecretError::NotAnObject),
            Err(_) => Ok(match raw.split_once(':') {
                Some((username, password)) => SecretPayload::UsernamePassword {
                    host: None,
                    port: DEFAULT_SSH_PORT,
                    username: Some(username.to_string()),
                    password: SecretString::from(password.to_string()),
                },
                None => SecretPayload::Opaque(SecretString::from(raw.to_string())),
            }),
        }
    }

    fn from_object(map: &Map<String, Value>) -> Result<Self, SecretError> {
        let host = first_string(map, &["host"]);
        let port = parse_port(map.get("port"))?;
        let username = first_string(map, &["username", "user"]);

        if let Some(private_key) = first_string(map, &["private_key"]) {
            return Ok(SecretPayload::UsernameKey {
                host,
                port,
                username,
                private_key: SecretString::from(private_key),
            });
        }
        match first_string(map, &["password", "pass"]) {
            Some(password) => Ok(SecretPayload::UsernamePassword {
                host,
                port,
                username,
                password: SecretString::from(password),
            }),
            None => Err(SecretError::MissingCredential),
        }
    }
}

/// First non-empty string value among `keys`, in order.
fn first_string(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| map.get(*key).and_then(Value::as_str))
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

fn parse_port(value: Option<&Value>) -> Result<u16, SecretError> {
    let port = match value {
        None | Some(Value::Null) => return Ok(DEFAULT_SSH_PORT),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|p| u16::try_from(p).ok())
            .ok_or_else(|| SecretError::InvalidPort(n.to_string()))?,
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(DEFAULT_SSH_PORT),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u16>()
            .map_err(|_| SecretError::InvalidPort(s.clone()))?,
        Some(other) => return Err(SecretError::InvalidPort(other.to_string())),
    };
    Ok(if port == 0 { DEFAULT_SSH_PORT } else { port })
}

#[derive(Debug)]
pub enum Auth {
    Password(SecretString),
    PrivateKey(SecretString),
}

impl Auth {
    pub fn method(&self) -> &'static str {
        match self {
            Auth::Password(_) => "password",
            Auth::PrivateKey(_) => "publickey",
        }
    }
}

/// A usable connection credential: host, username and one auth method.
#[derive(Debug)]
pub struct Credential {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub auth: Auth,
}

impl TryFrom<SecretPayload> for Credential {
    type Error = SecretError;

    fn try_from(payload: SecretPayload) -> Result<Self, Self::Error> {
        let (host, port, username, auth) = match payload {
            SecretPayload::UsernamePassword {
                host,
                port,
                username,
                password,
            } => (host, port, username, Auth::Password(password)),
            SecretPayload::UsernameKey {
                host,
                port,
                username,
                private_key,
            } => (host, port, username, Auth::PrivateKey(private_key)),
            SecretPayload::Opaque(_) => return Err(SecretError::Unstructured),
        };
        Ok(Credential {
            host: host.ok_or(SecretError::MissingHost)?,
            port,
            username: username.ok_or(SecretError::MissingUsername)?,
            auth,
        })
    }
}
