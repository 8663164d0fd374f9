//! HTTP-backed [`RegistryCollaborator`], grounded on the teacher's
//! `HttpRegistryClient`: same status-code taxonomy, same auth header
//! formatting, same blocking client, pointed at the new document shape
//! registry.rs decodes.

use crate::error::Error;
use crate::registry::RegistryCollaborator;

pub struct HttpRegistryCollaborator {
    base_url: String,
    client: reqwest::blocking::Client,
    api_token: Option<String>,
}

impl HttpRegistryCollaborator {
    pub fn new(base_url: String, api_token: Option<String>) -> Self {
        Self {
            base_url,
            client: reqwest::blocking::Client::new(),
            api_token,
        }
    }

    /// `dprslv_`-prefixed API tokens use `Token <token>`; everything else
    /// is treated as a bearer/JWT token.
    fn format_auth_header(token: &str) -> String {
        if token.starts_with("dprslv_") {
            format!("Token {}", token)
        } else {
            format!("Bearer {}", token)
        }
    }
}

impl RegistryCollaborator for HttpRegistryCollaborator {
    fn fetch_raw(&self, name: &str) -> crate::error::Result<Vec<u8>> {
        let url = format!("{}/api/v1/packages/{}", self.base_url, name);
        let mut request = self.client.get(&url);
        if let Some(token) = &self.api_token {
            request = request.header("Authorization", Self::format_auth_header(token));
        }

        let response = request.send().map_err(|e| {
            if e.is_timeout() {
                Error::Transport {
                    collaborator: "registry".to_string(),
                    message: "request timed out".to_string(),
                }
            } else {
                Error::Transport {
                    collaborator: "registry".to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::PackageNotFound(name.to_string()));
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(Error::Auth {
                collaborator: "registry".to_string(),
            });
        }
        if !status.is_success() {
            return Err(Error::Transport {
                collaborator: "registry".to_string(),
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        response.bytes().map(|b| b.to_vec()).map_err(|e| Error::Transport {
            collaborator: "registry".to_string(),
            message: e.to_string(),
        })
    }
}
