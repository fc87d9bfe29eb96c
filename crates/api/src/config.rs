//! Process configuration, read once from the environment at startup.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("no service selected: set BLOGBUS_SERVICE or pass it as the first argument")]
    MissingService,

    #[error("unknown service {0:?} (expected bus, posts, comments, query or moderation)")]
    UnknownService(String),

    #[error("{var} must be a number, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var} must be an IP address, got {value:?}")]
    InvalidAddr { var: &'static str, value: String },
}

/// Which service this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    Bus,
    Posts,
    Comments,
    Query,
    Moderation,
}

impl ServiceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Bus => "bus",
            ServiceKind::Posts => "posts",
            ServiceKind::Comments => "comments",
            ServiceKind::Query => "query",
            ServiceKind::Moderation => "moderation",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            ServiceKind::Posts => 4000,
            ServiceKind::Comments => 4001,
            ServiceKind::Query => 4002,
            ServiceKind::Moderation => 4003,
            ServiceKind::Bus => 4005,
        }
    }

    /// Services that keep a projection and rebuild it from the bus on startup.
    pub fn owns_state(&self) -> bool {
        matches!(self, ServiceKind::Posts | ServiceKind::Comments | ServiceKind::Query)
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bus" | "event-bus" => Ok(ServiceKind::Bus),
            "posts" => Ok(ServiceKind::Posts),
            "comments" => Ok(ServiceKind::Comments),
            "query" => Ok(ServiceKind::Query),
            "moderation" => Ok(ServiceKind::Moderation),
            _ => Err(ConfigError::UnknownService(s.to_string())),
        }
    }
}

/// One fan-out destination of the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberTarget {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub kind: ServiceKind,
    pub bind_addr: IpAddr,
    pub port: u16,
    /// Bus base URL, used by producers and by replay.
    pub event_api: String,
    /// Bus only: where accepted events are fanned out to.
    pub subscribers: Vec<SubscriberTarget>,
    pub dispatch_timeout: Duration,
    pub dispatch_queue_capacity: usize,
    pub replay_timeout: Duration,
    pub moderation_blocklist: Vec<String>,
}

/// Subscriber URL variables, named after the services they point at.
const SUBSCRIBER_VARS: [(&str, &str); 4] = [
    ("POST_API", "posts"),
    ("COMMENT_API", "comments"),
    ("QUERY_API", "query"),
    ("COMMENT_MODERATE_API", "moderation"),
];

impl ServiceConfig {
    /// Defaults for a service, as used in local development.
    pub fn new(kind: ServiceKind) -> Self {
        Self {
            kind,
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: kind.default_port(),
            event_api: "http://localhost:4005".to_string(),
            subscribers: Vec::new(),
            dispatch_timeout: Duration::from_millis(5_000),
            dispatch_queue_capacity: 1024,
            replay_timeout: Duration::from_millis(10_000),
            moderation_blocklist: vec![blogbus_moderation::DEFAULT_DISALLOWED_TOKEN.to_string()],
        }
    }

    /// Read configuration from the process environment and arguments.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(std::env::args().nth(1), |key| std::env::var(key).ok())
    }

    /// Build configuration from an explicit variable lookup.
    ///
    /// `arg` is the first command-line argument; it selects the service when
    /// `BLOGBUS_SERVICE` is unset.
    pub fn from_lookup<F>(arg: Option<String>, get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let kind: ServiceKind = get("BLOGBUS_SERVICE")
            .or(arg)
            .ok_or(ConfigError::MissingService)?
            .parse()?;

        let mut config = Self::new(kind);

        if let Some(addr) = get("BIND_ADDR") {
            config.bind_addr = addr.trim().parse().map_err(|_| ConfigError::InvalidAddr {
                var: "BIND_ADDR",
                value: addr.clone(),
            })?;
        }
        if let Some(port) = get("PORT") {
            config.port = parse_number("PORT", &port)?;
        }
        if let Some(url) = get("EVENT_API") {
            config.event_api = url.trim().to_string();
        }
        if let Some(ms) = get("DISPATCH_TIMEOUT_MS") {
            config.dispatch_timeout = Duration::from_millis(parse_number("DISPATCH_TIMEOUT_MS", &ms)?);
        }
        if let Some(n) = get("DISPATCH_QUEUE_CAPACITY") {
            config.dispatch_queue_capacity = parse_number("DISPATCH_QUEUE_CAPACITY", &n)?;
        }
        if let Some(ms) = get("REPLAY_TIMEOUT_MS") {
            config.replay_timeout = Duration::from_millis(parse_number("REPLAY_TIMEOUT_MS", &ms)?);
        }
        if let Some(list) = get("MODERATION_BLOCKLIST") {
            config.moderation_blocklist = split_list(&list);
        }

        for (var, name) in SUBSCRIBER_VARS {
            if let Some(url) = get(var) {
                config.subscribers.push(SubscriberTarget {
                    name: name.to_string(),
                    url: url.trim().to_string(),
                });
            }
        }
        if let Some(extra) = get("EXTRA_SUBSCRIBERS") {
            for (i, url) in split_list(&extra).into_iter().enumerate() {
                config.subscribers.push(SubscriberTarget {
                    name: format!("extra-{}", i + 1),
                    url,
                });
            }
        }

        Ok(config)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

fn parse_number<T: FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        var,
        value: value.to_string(),
    })
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_follow_the_service() {
        let config = ServiceConfig::from_lookup(None, lookup(&[("BLOGBUS_SERVICE", "query")])).unwrap();
        assert_eq!(config.kind, ServiceKind::Query);
        assert_eq!(config.port, 4002);
        assert_eq!(config.event_api, "http://localhost:4005");
        assert_eq!(config.dispatch_timeout, Duration::from_secs(5));
        assert_eq!(config.replay_timeout, Duration::from_secs(10));
        assert_eq!(config.moderation_blocklist, vec!["orange".to_string()]);
    }

    #[test]
    fn argument_selects_the_service_when_the_variable_is_unset() {
        let config = ServiceConfig::from_lookup(Some("bus".to_string()), lookup(&[])).unwrap();
        assert_eq!(config.kind, ServiceKind::Bus);
        assert_eq!(config.socket_addr().port(), 4005);

        assert_eq!(
            ServiceConfig::from_lookup(None, lookup(&[])).unwrap_err(),
            ConfigError::MissingService
        );
        assert!(matches!(
            ServiceConfig::from_lookup(Some("billing".to_string()), lookup(&[])),
            Err(ConfigError::UnknownService(_))
        ));
    }

    #[test]
    fn bus_collects_subscribers_in_a_fixed_order() {
        let config = ServiceConfig::from_lookup(
            None,
            lookup(&[
                ("BLOGBUS_SERVICE", "bus"),
                ("QUERY_API", "http://query:4002"),
                ("POST_API", "http://posts:4000"),
                ("EXTRA_SUBSCRIBERS", "http://a:1, ,http://b:2"),
            ]),
        )
        .unwrap();

        let names: Vec<_> = config.subscribers.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["posts", "query", "extra-1", "extra-2"]);
        assert_eq!(config.subscribers[3].url, "http://b:2");
    }

    #[test]
    fn invalid_numbers_are_errors_not_defaults() {
        let err = ServiceConfig::from_lookup(
            None,
            lookup(&[("BLOGBUS_SERVICE", "bus"), ("DISPATCH_TIMEOUT_MS", "soon")]),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidNumber {
                var: "DISPATCH_TIMEOUT_MS",
                value: "soon".to_string()
            }
        );

        assert!(matches!(
            ServiceConfig::from_lookup(None, lookup(&[("BLOGBUS_SERVICE", "bus"), ("PORT", "70000")])),
            Err(ConfigError::InvalidNumber { var: "PORT", .. })
        ));
    }

    #[test]
    fn blocklist_and_bind_address_are_configurable() {
        let config = ServiceConfig::from_lookup(
            None,
            lookup(&[
                ("BLOGBUS_SERVICE", "moderation"),
                ("MODERATION_BLOCKLIST", "spam, scam"),
                ("BIND_ADDR", "127.0.0.1"),
            ]),
        )
        .unwrap();
        assert_eq!(config.moderation_blocklist, vec!["spam".to_string(), "scam".to_string()]);
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:4003");
    }
}
