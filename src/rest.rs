use crate::client::{create_http_client, Config};
use crate::error::{Result, StratumError};
use crate::payload::Payload;
use crate::response::{classify, Reply};
use crate::token::{Credential, LoginResponse};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use std::fmt;
use std::time::Instant;
use tracing::{debug, trace, warn};
use url::Url;

/// Resource used for the Basic-authenticated login exchange
pub const LOGIN_RESOURCE: &str = "login/v1";

const JSON: &str = "application/json";

/// Endpoint root, resource prefix and transport, fixed once the client is opened
struct Route {
    endpoint: Url,
    prefix: String,
    http: HttpClient,
}

impl Route {
    fn from_config(config: &Config) -> Result<Self> {
        let mut endpoint = Url::parse(&config.base_url)
            .map_err(|e| StratumError::Config(format!("base_url {:?}: {}", config.base_url, e)))?;

        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(StratumError::Config(format!(
                "base_url {:?}: unsupported scheme {}",
                config.base_url,
                endpoint.scheme()
            )));
        }

        let prefix = endpoint.path().to_string();
        if prefix.trim_matches('/').is_empty() {
            return Err(StratumError::Config("missing: path part in base_url".to_string()));
        }

        endpoint.set_path("");
        endpoint.set_query(None);
        endpoint.set_fragment(None);

        Ok(Route {
            endpoint,
            prefix,
            http: create_http_client(config)?,
        })
    }

    fn root(&self) -> &str {
        self.endpoint.as_str().trim_end_matches('/')
    }

    fn login_url(&self) -> String {
        format!("{}/{}", self.root(), LOGIN_RESOURCE)
    }

    fn resource_url(&self, query: &str) -> String {
        join_resource(self.root(), &self.prefix, query)
    }
}

/// Join root, prefix and resource query with exactly one '/' at each boundary
pub(crate) fn join_resource(root: &str, prefix: &str, query: &str) -> String {
    format!(
        "{}/{}/{}",
        root.trim_end_matches('/'),
        prefix.trim_matches('/'),
        query.trim_start_matches('/')
    )
}

/// Client for a query based Stratum API.
///
/// A client is created unopened; [`Client::open`] validates the
/// configuration and logs in with Basic authentication. Every later call
/// carries the bearer token from that login, which is renewed transparently
/// once it expires. The client is `Sync` and can be shared between threads.
pub struct Client {
    config: Config,
    route: OnceLock<Route>,
    credential: Mutex<Option<Credential>>,
    opened: AtomicBool,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("endpoint", &self.endpoint().map(Url::as_str))
            .field("prefix", &self.prefix())
            .field(
                "credential",
                &self.credential.try_lock().ok().and_then(|guard| guard.clone()),
            )
            .field("opened", &self.is_opened())
            .finish()
    }
}

impl Client {
    /// Create an unopened client
    pub fn new(config: Config) -> Self {
        Client {
            config,
            route: OnceLock::new(),
            credential: Mutex::new(None),
            opened: AtomicBool::new(false),
        }
    }

    /// Create a client and open it
    pub fn connect(config: Config) -> Result<Self> {
        let client = Self::new(config);
        client.open()?;
        Ok(client)
    }

    /// Validate the configuration, split the base URL into endpoint root
    /// and resource prefix, and log in.
    ///
    /// Configuration problems are reported as [`StratumError::Config`]
    /// before any network call is made.
    pub fn open(&self) -> Result<()> {
        let mut credential = self.lock_credential();

        if self.config.username.is_empty() {
            return Err(StratumError::Config("missing: username".to_string()));
        }
        if self.config.password.is_empty() {
            return Err(StratumError::Config("missing: password".to_string()));
        }
        if self.config.base_url.is_empty() {
            return Err(StratumError::Config("missing: base_url".to_string()));
        }

        if self.route.get().is_none() {
            let route = Route::from_config(&self.config)?;
            debug!(endpoint = %route.endpoint, prefix = %route.prefix, "resolved stratum route");
            if self.route.set(route).is_err() {
                warn!("stratum route already initialized, keeping the existing one");
            }
        }

        *credential = None;
        *credential = Some(self.login()?);
        self.opened.store(true, Ordering::Release);

        Ok(())
    }

    /// Whether `open` has completed successfully
    pub fn is_opened(&self) -> bool {
        self.opened.load(Ordering::Acquire)
    }

    /// Configuration the client was created with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Endpoint root (base URL with the path removed), once opened
    pub fn endpoint(&self) -> Option<&Url> {
        self.route.get().map(|route| &route.endpoint)
    }

    /// Resource prefix taken from the base URL path, once opened
    pub fn prefix(&self) -> Option<&str> {
        self.route.get().map(|route| route.prefix.as_str())
    }

    /// Return a usable bearer token, logging in again first when the
    /// current one is missing or expired.
    ///
    /// The expiry check, the refresh and the read happen under one lock, so
    /// concurrent callers behind an expired token trigger a single login.
    pub fn bearer_token(&self) -> Result<String> {
        if !self.is_opened() {
            return Err(StratumError::NotOpened);
        }

        let mut credential = self.lock_credential();
        match credential.as_ref() {
            Some(current) if current.is_valid_at(Utc::now()) => {
                return Ok(current.access_token().to_string());
            }
            Some(current) => {
                debug!(valid_until = %current.valid_until(), "bearer token expired, logging in again")
            }
            None => debug!("no bearer token held, logging in"),
        }

        *credential = None;
        let fresh = self.login()?;
        let token = fresh.access_token().to_string();
        *credential = Some(fresh);

        Ok(token)
    }

    /// Perform a GET call. Queries select, filter and order with the
    /// backend's own parameters, e.g. `platform/?select=id,name&where=name~linux`.
    pub fn get(&self, query: &str) -> Result<Reply> {
        self.call("GET", query, None)
    }

    /// Perform a POST call
    pub fn post(&self, query: &str, data: Option<Payload>) -> Result<Reply> {
        self.call("POST", query, data)
    }

    /// Perform a PUT call
    pub fn put(&self, query: &str, data: Option<Payload>) -> Result<Reply> {
        self.call("PUT", query, data)
    }

    /// Perform a DELETE call
    pub fn delete(&self, query: &str, data: Option<Payload>) -> Result<Reply> {
        self.call("DELETE", query, data)
    }

    /// Perform an API call and unmarshal the response body into the target type
    pub fn apply<T>(&self, method: &str, query: &str, data: Option<Payload>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.call(method, query, data)?.apply()
    }

    /// Perform an API call and return the raw response body.
    ///
    /// # Arguments
    /// * `method` - GET, POST, PUT or DELETE (case insensitive)
    /// * `query` - resource query relative to the prefix, or [`LOGIN_RESOURCE`]
    /// * `data` - request body; not allowed with GET
    ///
    /// The response body is read into memory whole, without a size limit;
    /// only the configured timeout bounds it.
    pub fn call(&self, method: &str, query: &str, data: Option<Payload>) -> Result<Reply> {
        let method = method.to_ascii_uppercase();

        if data.is_some() && method == "GET" {
            return Err(StratumError::Usage(format!(
                "post data not allowed with method {}",
                method
            )));
        }

        let http_method = match method.as_str() {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            other => {
                return Err(StratumError::Usage(format!("unsupported method {}", other)));
            }
        };

        let login = query == LOGIN_RESOURCE;
        let route = match self.route.get() {
            Some(route) if login || self.is_opened() => route,
            _ => return Err(StratumError::NotOpened),
        };

        let target = if login {
            route.login_url()
        } else {
            route.resource_url(query)
        };
        let url = Url::parse(&target)
            .map_err(|e| StratumError::Usage(format!("invalid resource query {:?}: {}", query, e)))?;

        let body = data.map(Payload::into_body).transpose()?;

        let authorization = if login && http_method == Method::GET {
            self.basic_authorization()
        } else {
            format!("Bearer {}", self.bearer_token()?)
        };

        self.send(route, http_method, url, body, authorization)
    }

    fn basic_authorization(&self) -> String {
        let pair = format!("{}:{}", self.config.username, self.config.password);
        format!("Basic {}", STANDARD.encode(pair))
    }

    /// Login exchange: trade username and password for a fresh credential
    fn login(&self) -> Result<Credential> {
        let login: LoginResponse = self.call("GET", LOGIN_RESOURCE, None)?.apply()?;

        debug!(
            username = %self.config.username,
            expires_in = login.expires_in,
            token_type = %login.token_type,
            token_len = login.access_token.len(),
            "logged in"
        );

        Ok(Credential::from_login(login, Utc::now()))
    }

    fn send(
        &self,
        route: &Route,
        method: Method,
        url: Url,
        body: Option<Vec<u8>>,
        authorization: String,
    ) -> Result<Reply> {
        let path = url.path().to_string();

        let mut request = route
            .http
            .request(method.clone(), url)
            .header(USER_AGENT, self.config.user_agent_header())
            .header(CONTENT_TYPE, JSON)
            .header(ACCEPT, JSON)
            .header(AUTHORIZATION, authorization);

        if let Some(body) = body {
            request = request.body(body);
        }

        let start = Instant::now();
        let response = request.send().map_err(|e| {
            warn!(%method, %path, error = %e, "request failed");
            StratumError::from(e)
        })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.bytes()?.to_vec();

        debug!(
            %method,
            %path,
            status = status.as_u16(),
            elapsed = ?start.elapsed(),
            "stratum request"
        );
        trace!(bytes = body.len(), content_type = ?content_type, "response body read");

        classify(status, content_type.as_deref(), body)
    }

    fn lock_credential(&self) -> MutexGuard<'_, Option<Credential>> {
        self.credential.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
