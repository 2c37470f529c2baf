use super::models::Config;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Dispatcher base_url is not configured")]
    MissingDispatcherAddress,

    #[error("Invalid {field} scheme in '{url}', expected {expected}")]
    InvalidScheme {
        field: &'static str,
        url: String,
        expected: &'static str,
    },

    #[error("Worker client_name is not configured")]
    MissingClientName,

    #[error("Worker pool_size must be at least 1")]
    EmptyPool,

    #[error("Duration must be positive: {field}")]
    ZeroDuration { field: &'static str },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_dispatcher(config)?;
    validate_worker(config)?;
    validate_origin(config)?;
    Ok(())
}

fn validate_dispatcher(config: &Config) -> Result<(), ValidationError> {
    let base_url = config
        .dispatcher
        .base_url
        .as_deref()
        .filter(|url| !url.trim().is_empty())
        .ok_or(ValidationError::MissingDispatcherAddress)?;

    check_scheme("dispatcher.base_url", base_url, &["http://", "https://"])?;

    if config.dispatcher.request_timeout.is_zero() {
        return Err(ValidationError::ZeroDuration {
            field: "dispatcher.request_timeout",
        });
    }

    if config.dispatcher.token.is_none() {
        tracing::warn!("No dispatcher token configured, requests will be sent unauthenticated");
    }

    Ok(())
}

fn validate_worker(config: &Config) -> Result<(), ValidationError> {
    let worker = &config.worker;

    if worker
        .client_name
        .as_deref()
        .is_none_or(|name| name.trim().is_empty())
    {
        return Err(ValidationError::MissingClientName);
    }

    if worker.pool_size == 0 {
        return Err(ValidationError::EmptyPool);
    }

    if worker.task_interval.is_zero() {
        return Err(ValidationError::ZeroDuration {
            field: "worker.task_interval",
        });
    }

    if worker.download_timeout.is_zero() {
        return Err(ValidationError::ZeroDuration {
            field: "worker.download_timeout",
        });
    }

    if worker.download_timeout < worker.task_interval {
        tracing::warn!(
            timeout = %worker.download_timeout,
            interval = %worker.task_interval,
            "download_timeout is shorter than task_interval, timeouts are only enforced once per tick"
        );
    }

    Ok(())
}

fn validate_origin(config: &Config) -> Result<(), ValidationError> {
    let origin = &config.origin;

    check_scheme("origin.download_base", &origin.download_base, &["http://", "https://"])?;

    if let Some(proxy) = origin.proxy.as_deref() {
        check_scheme(
            "origin.proxy",
            proxy,
            &["http://", "https://", "socks5://", "socks5h://"],
        )?;
    }

    if origin.request_timeout.is_zero() {
        return Err(ValidationError::ZeroDuration {
            field: "origin.request_timeout",
        });
    }

    Ok(())
}

fn check_scheme(field: &'static str, url: &str, allowed: &[&str]) -> Result<(), ValidationError> {
    if allowed.iter().any(|scheme| url.starts_with(scheme)) {
        return Ok(());
    }

    Err(ValidationError::InvalidScheme {
        field,
        url: url.to_string(),
        expected: if allowed.len() > 2 {
            "http(s):// or socks5(h)://"
        } else {
            "http:// or https://"
        },
    })
}
