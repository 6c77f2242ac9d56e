//! Blocking HTTP transport for the admin API.
//!
//! Requests carry the admin identity as basic auth. Every response body is a
//! JSON envelope `{"code": u16, "user_id": u64?}`; bodies that do not decode
//! are mapped from the HTTP status instead.

use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::{ResultCode, SessionFactory, StashClient};
use crate::constants::{ADMIN_SESSION_PATH, ADMIN_USERS_PATH};
use crate::types::{RemoteSettings, UserId};

#[derive(Debug, Clone)]
struct ServerEntry {
    base_url: String,
    priority: u32,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    code: ResultCode,
    #[serde(default)]
    user_id: Option<u64>,
}

#[derive(Serialize)]
struct CreateUserBody<'a> {
    username: &'a str,
}

#[derive(Serialize)]
struct SetPasswordBody<'a> {
    password: &'a str,
}

/// [`StashClient`] over the admin HTTP API.
pub struct HttpStashClient {
    settings: RemoteSettings,
    servers: Vec<ServerEntry>,
    authority: Option<(String, Zeroizing<String>)>,
    client: Option<Client>,
    active: Option<String>,
}

impl HttpStashClient {
    #[must_use]
    pub fn new(settings: RemoteSettings) -> Self {
        Self {
            settings,
            servers: Vec::new(),
            authority: None,
            client: None,
            active: None,
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.authority {
            Some((username, password)) => request.basic_auth(username, Some(password.as_str())),
            None => request,
        }
    }

    fn session(&self) -> Result<(&Client, &str), ResultCode> {
        match (&self.client, &self.active) {
            (Some(client), Some(base)) => Ok((client, base.as_str())),
            _ => Err(ResultCode::NOT_CONNECTED),
        }
    }

    fn try_server(&self, client: &Client, server: &ServerEntry) -> Result<(), ResultCode> {
        let url = format!("{}{ADMIN_SESSION_PATH}", server.base_url);
        let response = self
            .authorize(client.get(url))
            .send()
            .map_err(transport_code)?;
        decode(response)?.code.into_result()
    }
}

impl StashClient for HttpStashClient {
    fn set_authority(&mut self, username: &str, password: &str) {
        self.authority = Some((username.to_string(), Zeroizing::new(password.to_string())));
    }

    fn add_server(&mut self, host: &str, priority: u32) -> Result<(), ResultCode> {
        let base_url = base_url_for(host)?;
        self.servers.push(ServerEntry { base_url, priority });
        self.servers.sort_by_key(|server| server.priority);
        Ok(())
    }

    fn connect(&mut self) -> Result<(), ResultCode> {
        if self.active.is_some() {
            return Ok(());
        }
        if self.servers.is_empty() {
            return Err(ResultCode::NO_SERVERS);
        }
        let client = Client::builder()
            .connect_timeout(self.settings.connect_timeout())
            .timeout(self.settings.request_timeout())
            .no_proxy()
            .build()
            .map_err(|_| ResultCode::CONNECT_FAILED)?;

        let attempts = self.settings.max_connect_attempts.max(1) as usize;
        let mut last = ResultCode::CONNECT_FAILED;
        for server in self.servers.iter().take(attempts) {
            match self.try_server(&client, server) {
                Ok(()) => {
                    tracing::debug!(server = %server.base_url, "connected");
                    self.active = Some(server.base_url.clone());
                    self.client = Some(client);
                    return Ok(());
                }
                // Another server would reject the same credentials.
                Err(code @ (ResultCode::AUTH_FAILED | ResultCode::PERMISSION_DENIED)) => {
                    return Err(code);
                }
                Err(code) => {
                    tracing::debug!(server = %server.base_url, %code, "server unavailable");
                    last = code;
                }
            }
        }
        Err(last)
    }

    fn create_username(&mut self, username: &str) -> Result<u64, ResultCode> {
        let (client, base) = self.session()?;
        let request = client
            .post(format!("{base}{ADMIN_USERS_PATH}"))
            .json(&CreateUserBody { username });
        let response = self.authorize(request).send().map_err(transport_code)?;
        let envelope = decode(response)?;
        envelope.code.into_result()?;
        envelope.user_id.ok_or(ResultCode::PROTOCOL)
    }

    fn set_password(&mut self, user_id: UserId, password: &str) -> Result<(), ResultCode> {
        let (client, base) = self.session()?;
        let request = client
            .put(format!("{base}{ADMIN_USERS_PATH}/{user_id}/password"))
            .json(&SetPasswordBody { password });
        let response = self.authorize(request).send().map_err(transport_code)?;
        decode(response)?.code.into_result()
    }

    fn close(&mut self) {
        if let Some(server) = self.active.take() {
            tracing::debug!(%server, "session closed");
        }
        self.client = None;
    }
}

impl Drop for HttpStashClient {
    fn drop(&mut self) {
        self.close();
    }
}

/// Builds an [`HttpStashClient`] per provisioning run.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpSessionFactory;

impl SessionFactory for HttpSessionFactory {
    fn open_session(&self, settings: &RemoteSettings) -> Box<dyn StashClient> {
        Box::new(HttpStashClient::new(*settings))
    }
}

fn base_url_for(host: &str) -> Result<String, ResultCode> {
    let host = host.trim();
    if host.is_empty() {
        return Err(ResultCode::INVALID_REQUEST);
    }
    let candidate = if host.contains("://") {
        host.to_string()
    } else {
        format!("http://{host}")
    };
    let url = reqwest::Url::parse(&candidate).map_err(|_| ResultCode::INVALID_REQUEST)?;
    if url.host_str().is_none() {
        return Err(ResultCode::INVALID_REQUEST);
    }
    Ok(candidate.trim_end_matches('/').to_string())
}

fn transport_code(err: reqwest::Error) -> ResultCode {
    if err.is_timeout() {
        ResultCode::TIMEOUT
    } else if err.is_connect() {
        ResultCode::CONNECT_FAILED
    } else {
        ResultCode::PROTOCOL
    }
}

fn decode(response: Response) -> Result<Envelope, ResultCode> {
    let status = response.status();
    match response.json::<Envelope>() {
        Ok(envelope) => Ok(envelope),
        Err(err) if err.is_timeout() => Err(ResultCode::TIMEOUT),
        Err(_) => Err(match status {
            StatusCode::UNAUTHORIZED => ResultCode::AUTH_FAILED,
            StatusCode::FORBIDDEN => ResultCode::PERMISSION_DENIED,
            StatusCode::CONFLICT => ResultCode::USER_EXISTS,
            status if status.is_server_error() => ResultCode::SERVER_ERROR,
            _ => ResultCode::PROTOCOL,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_port_gets_a_scheme() {
        assert_eq!(
            base_url_for("db1.example.net:13600").unwrap(),
            "http://db1.example.net:13600"
        );
        assert_eq!(
            base_url_for("https://db1.example.net/").unwrap(),
            "https://db1.example.net"
        );
        assert_eq!(base_url_for("  "), Err(ResultCode::INVALID_REQUEST));
    }

    #[test]
    fn requests_before_connect_are_refused() {
        let mut client = HttpStashClient::new(RemoteSettings::default());
        client.add_server("127.0.0.1:9", 10).unwrap();
        assert_eq!(
            client.create_username("alice"),
            Err(ResultCode::NOT_CONNECTED)
        );
        assert_eq!(
            client.set_password(UserId::new(1).unwrap(), "pw"),
            Err(ResultCode::NOT_CONNECTED)
        );
    }

    #[test]
    fn connect_without_servers_fails() {
        let mut client = HttpStashClient::new(RemoteSettings::default());
        assert_eq!(client.connect(), Err(ResultCode::NO_SERVERS));
    }

    #[test]
    fn servers_are_ordered_by_priority() {
        let mut client = HttpStashClient::new(RemoteSettings::default());
        client.add_server("b.example:1", 20).unwrap();
        client.add_server("a.example:1", 5).unwrap();
        assert_eq!(client.servers[0].base_url, "http://a.example:1");
    }
}
