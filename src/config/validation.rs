//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (attempts > 0, max age > 0)
//! - Validate addresses and upstream roots
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::ServiceConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} is not a valid socket address: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must be an absolute http(s) URL: {value}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("accelerator.proxy_url is required when the accelerator is enabled")]
    MissingAcceleratorProxy,

    #[error("upstream.bearer_token must start with \"Bearer \"")]
    InvalidBearer,
}

/// Validate a configuration, collecting every violation.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.guest.max_attempts == 0 {
        errors.push(ValidationError::Zero { field: "guest.max_attempts" });
    }
    if config.guest.max_age_secs == 0 {
        errors.push(ValidationError::Zero { field: "guest.max_age_secs" });
    }
    if config.maintenance.queue_capacity == 0 {
        errors.push(ValidationError::Zero { field: "maintenance.queue_capacity" });
    }
    if config.timeouts.upstream_request_secs == 0 {
        errors.push(ValidationError::Zero { field: "timeouts.upstream_request_secs" });
    }

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    check_url(&mut errors, "upstream.api_root", &config.upstream.api_root);
    check_url(&mut errors, "upstream.web_root", &config.upstream.web_root);
    check_url(&mut errors, "upstream.syndication_root", &config.upstream.syndication_root);

    if !config.upstream.bearer_token.starts_with("Bearer ") {
        errors.push(ValidationError::InvalidBearer);
    }

    if config.accelerator.enabled {
        match &config.accelerator.proxy_url {
            Some(proxy) => check_url(&mut errors, "accelerator.proxy_url", proxy),
            None => errors.push(ValidationError::MissingAcceleratorProxy),
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    let valid = Url::parse(value)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
        .unwrap_or(false);
    if !valid {
        errors.push(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ServiceConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ServiceConfig::default();
        config.guest.max_attempts = 0;
        config.listener.bind_address = "not-an-address".to_string();
        config.upstream.api_root = "ftp://example.com".to_string();
        config.upstream.bearer_token = "AAAA".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::Zero { field: "guest.max_attempts" }));
        assert!(errors.contains(&ValidationError::InvalidBearer));
    }

    #[test]
    fn test_accelerator_requires_proxy() {
        let mut config = ServiceConfig::default();
        config.accelerator.enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::MissingAcceleratorProxy]);

        config.accelerator.proxy_url = Some("http://127.0.0.1:3128".to_string());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = ServiceConfig::default();
        config.observability.metrics_address = "bogus".to_string();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
