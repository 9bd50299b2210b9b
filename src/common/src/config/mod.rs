use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

/// Errors raised while turning raw configuration values into typed ones
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("rule endpoint list is empty")]
    NoRuleEndpoints,
    #[error("parsing rule endpoint URL {url:?} failed: {source}")]
    InvalidRuleEndpoint {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("parsing query target URL {url:?} failed: {source}")]
    InvalidTargetUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid listen address {address:?}: {source}")]
    InvalidListenAddress {
        address: String,
        #[source]
        source: std::net::AddrParseError,
    },
}

/// Configuration of the query frontend and its rule/alert federation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FrontendConfig {
    /// Address on which to expose the HTTP API
    pub listen_address: String,
    /// Comma separated list of base URLs serving /api/v1/rules and /api/v1/alerts.
    /// Results are merged as-is, no sorting and deduplication is done.
    pub rule_endpoints: String,
    /// Deadline shared by all backend calls of one inbound request
    #[serde(with = "humantime_serde")]
    pub backend_timeout: Duration,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:19090".to_string(),
            rule_endpoints: "http://rule-evaluator.gmp-system.svc.cluster.local:19092".to_string(),
            backend_timeout: Duration::from_secs(30),
        }
    }
}

impl FrontendConfig {
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen_address
            .parse()
            .map_err(|source| ConfigError::InvalidListenAddress {
                address: self.listen_address.clone(),
                source,
            })
    }

    /// Parse `rule_endpoints` once, in configuration order
    pub fn rule_endpoint_urls(&self) -> Result<Vec<Url>, ConfigError> {
        parse_endpoint_list(&self.rule_endpoints)
    }
}

/// Configuration of the remote instant-query API used by the querier
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Base URL of a Prometheus-compatible HTTP API
    pub target_url: String,
    /// Timeout of a single instant query
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            target_url: "http://localhost:9090".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl QueryConfig {
    pub fn target(&self) -> Result<Url, ConfigError> {
        Url::parse(self.target_url.trim()).map_err(|source| ConfigError::InvalidTargetUrl {
            url: self.target_url.clone(),
            source,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Configuration {
    /// Query frontend configuration
    pub frontend: FrontendConfig,
    /// Remote query configuration
    pub query: QueryConfig,
}

impl Configuration {
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::figment(Toml::file("promrelay.toml"))
    }

    pub fn load_from_path(path: &Path) -> Result<Self, Box<figment::Error>> {
        Self::figment(Toml::file(path))
    }

    fn figment(file: figment::providers::Data<Toml>) -> Result<Self, Box<figment::Error>> {
        let config = Figment::from(Serialized::defaults(Configuration::default()))
            .merge(file)
            .merge(Env::prefixed("PROMRELAY__").split("__"))
            .extract()
            .map_err(Box::new)?;

        Ok(config)
    }
}

/// Split a comma separated URL list, trimming whitespace around each entry
pub fn parse_endpoint_list(list: &str) -> Result<Vec<Url>, ConfigError> {
    let urls = list
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            Url::parse(entry).map_err(|source| ConfigError::InvalidRuleEndpoint {
                url: entry.to_string(),
                source,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if urls.is_empty() {
        return Err(ConfigError::NoRuleEndpoints);
    }
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_default_configuration() {
        let config = Configuration::default();

        assert_eq!(config.frontend.listen_address, "0.0.0.0:19090");
        assert_eq!(config.frontend.backend_timeout, Duration::from_secs(30));
        assert_eq!(
            config.frontend.rule_endpoint_urls().unwrap()[0].as_str(),
            "http://rule-evaluator.gmp-system.svc.cluster.local:19092/"
        );
        assert_eq!(config.query.timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_configless_operation() {
        Jail::expect_with(|_jail| {
            let config = Configuration::load().map_err(|e| *e)?;
            assert_eq!(config.frontend.listen_address, "0.0.0.0:19090");
            assert_eq!(config.query.target_url, "http://localhost:9090");
            Ok(())
        });
    }

    #[test]
    fn test_toml_file_and_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "promrelay.toml",
                r#"
                [frontend]
                rule_endpoints = "http://a:19092, http://b:19092"
                backend_timeout = "5s"

                [query]
                target_url = "http://prometheus:9090"
                "#,
            )?;
            jail.set_env("PROMRELAY__QUERY__TIMEOUT", "10s");
            jail.set_env("PROMRELAY__FRONTEND__LISTEN_ADDRESS", "127.0.0.1:8080");

            let config = Configuration::load().map_err(|e| *e)?;
            assert_eq!(config.frontend.backend_timeout, Duration::from_secs(5));
            assert_eq!(config.frontend.listen_address, "127.0.0.1:8080");
            assert_eq!(config.query.target_url, "http://prometheus:9090");
            assert_eq!(config.query.timeout, Duration::from_secs(10));

            let urls = config.frontend.rule_endpoint_urls().unwrap();
            assert_eq!(urls.len(), 2);
            assert_eq!(urls[0].host_str(), Some("a"));
            assert_eq!(urls[1].host_str(), Some("b"));
            Ok(())
        });
    }

    #[test]
    fn test_load_from_explicit_path() {
        Jail::expect_with(|jail| {
            jail.create_file("custom.toml", "[frontend]\nlisten_address = \"127.0.0.1:1\"\n")?;

            let config = Configuration::load_from_path(Path::new("custom.toml")).map_err(|e| *e)?;
            assert_eq!(config.frontend.listen_address, "127.0.0.1:1");
            Ok(())
        });
    }

    #[test]
    fn test_endpoint_list_keeps_order_and_trims() {
        let urls = parse_endpoint_list(" http://one:1 ,http://two:2,, http://three:3").unwrap();
        let hosts: Vec<_> = urls.iter().filter_map(Url::host_str).collect();
        assert_eq!(hosts, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_endpoint_list_errors() {
        assert!(matches!(
            parse_endpoint_list(" , "),
            Err(ConfigError::NoRuleEndpoints)
        ));

        let err = parse_endpoint_list("http://ok:1,not a url").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRuleEndpoint { ref url, .. } if url == "not a url"));
    }

    #[test]
    fn test_listen_addr() {
        let mut frontend = FrontendConfig::default();
        assert_eq!(frontend.listen_addr().unwrap().port(), 19090);

        frontend.listen_address = ":19090".to_string();
        assert!(frontend.listen_addr().is_err());
    }
}
