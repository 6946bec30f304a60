use super::{parse_duration_string, Config};
use crate::error::{Error, Result};
use std::collections::HashSet;

const DURATION_HINT: &str = "Use formats like '500ms', '2s', '1m'";

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.services.is_empty() {
            return Err(Error::Validation(
                "No services configured. Add at least one entry under 'services:'".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for service in &self.services {
            validate_service_name(&service.name)?;

            if !seen.insert(service.name.as_str()) {
                return Err(Error::Validation(format!(
                    "Service '{}' is defined more than once. Service names must be unique.",
                    service.name
                )));
            }

            if service.display_name().trim().is_empty() {
                return Err(Error::Validation(format!(
                    "Service '{}' has an empty display_name",
                    service.name
                )));
            }

            if service.executable.trim().is_empty() {
                return Err(Error::Validation(format!(
                    "Service '{}' has no executable",
                    service.name
                )));
            }
        }

        if self.elevate.iter().any(|part| part.trim().is_empty()) {
            return Err(Error::Validation(
                "'elevate' must not contain empty entries".to_string(),
            ));
        }

        // Validate duration strings
        let worker = &self.worker;
        let mut durations = vec![
            ("poll_interval", &self.poll_interval),
            ("settle_delay", &self.settle_delay),
            ("command_timeout", &self.command_timeout),
            ("probe_timeout", &self.probe_timeout),
            ("worker.heartbeat_interval", &worker.heartbeat_interval),
            ("worker.shutdown_timeout", &worker.shutdown_timeout),
        ];
        if let Some(http) = &worker.http {
            durations.push(("worker.http.interval", &http.interval));
            durations.push(("worker.http.timeout", &http.timeout));
        }
        if let Some(db) = &worker.database {
            durations.push(("worker.database.interval", &db.interval));
        }
        for (field, value) in durations {
            if let Some(v) = value {
                if parse_duration_string(v).is_none() {
                    return Err(Error::Validation(format!(
                        "Invalid {} '{}'. {}",
                        field, v, DURATION_HINT
                    )));
                }
            }
        }

        // Periods and timeouts of zero would spin their loops or fail every call.
        let mut non_zero = vec![
            ("poll_interval", self.poll_interval()),
            ("command_timeout", self.command_timeout()),
            ("probe_timeout", self.probe_timeout()),
            ("worker.heartbeat_interval", worker.heartbeat_interval()),
        ];
        if let Some(http) = &worker.http {
            non_zero.push(("worker.http.interval", http.interval()));
            non_zero.push(("worker.http.timeout", http.timeout()));
        }
        if let Some(db) = &worker.database {
            non_zero.push(("worker.database.interval", db.interval()));
        }
        for (field, value) in non_zero {
            if value.is_zero() {
                return Err(Error::Validation(format!(
                    "{} must be greater than zero",
                    field
                )));
            }
        }

        if let Some(http) = &worker.http {
            crate::worker::validate_url(&http.url)
                .map_err(|e| Error::Validation(format!("worker.http.url: {}", e)))?;
        }

        if let Some(db) = &worker.database {
            if db.path.as_os_str().is_empty() {
                return Err(Error::Validation(
                    "worker.database.path must not be empty".to_string(),
                ));
            }
            if db.query().trim().is_empty() {
                return Err(Error::Validation(
                    "worker.database.query must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Service names end up in unit file names and `sc.exe` arguments, so they
/// are limited to `[A-Za-z0-9._@-]`.
pub fn validate_service_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::Validation("Service name must not be empty".to_string()));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '@' | '-')))
    {
        return Err(Error::Validation(format!(
            "Service name '{}' contains invalid character {:?}. Allowed: letters, digits, '.', '_', '@', '-'",
            name, bad
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HttpPollConfig, Parser, ServiceConfig};

    fn service(name: &str) -> ServiceConfig {
        ServiceConfig {
            name: name.to_string(),
            display_name: None,
            description: String::new(),
            executable: "/bin/true".to_string(),
        }
    }

    fn config_with(services: Vec<ServiceConfig>) -> Config {
        Config {
            services,
            ..Default::default()
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(config_with(vec![service("api"), service("worker@1")])
            .validate()
            .is_ok());
    }

    #[test]
    fn empty_service_list_is_rejected() {
        let err = config_with(vec![]).validate().unwrap_err();
        assert!(err.to_string().contains("No services configured"));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = config_with(vec![service("api"), service("api")])
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn names_with_shell_characters_are_rejected() {
        for bad in ["my service", "api;rm", "a/b", ""] {
            assert!(validate_service_name(bad).is_err(), "{:?} should be rejected", bad);
        }
    }

    #[test]
    fn empty_executable_is_rejected() {
        let mut svc = service("api");
        svc.executable = "  ".to_string();
        assert!(config_with(vec![svc]).validate().is_err());
    }

    #[test]
    fn bad_duration_names_the_field() {
        let mut config = config_with(vec![service("api")]);
        config.settle_delay = Some("two seconds".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("settle_delay"));
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let mut config = config_with(vec![service("api")]);
        config.poll_interval = Some("0s".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_periods_and_timeouts_are_rejected() {
        let cases = [
            ("command_timeout", "command_timeout: 0s\n"),
            ("probe_timeout", "probe_timeout: 0ms\n"),
            ("worker.heartbeat_interval", "worker:\n  heartbeat_interval: 0s\n"),
            (
                "worker.http.interval",
                "worker:\n  http:\n    url: http://localhost:8080/api/test\n    interval: 0s\n",
            ),
            (
                "worker.http.timeout",
                "worker:\n  http:\n    url: http://localhost:8080/api/test\n    timeout: 0s\n",
            ),
            (
                "worker.database.interval",
                "worker:\n  database:\n    path: health.db\n    interval: 0s\n",
            ),
        ];
        for (field, extra) in cases {
            let yaml = format!(
                "services:\n  - name: api\n    executable: /bin/api\n{}",
                extra
            );
            let config = Parser::new().parse_config(&yaml).unwrap();
            let err = config.validate().unwrap_err();
            assert!(
                err.to_string().contains(field),
                "{} should be rejected, got: {}",
                field,
                err
            );
        }
    }

    #[test]
    fn zero_settle_delay_is_allowed() {
        let mut config = config_with(vec![service("api")]);
        config.settle_delay = Some("0s".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn non_http_url_is_rejected() {
        let mut config = config_with(vec![service("api")]);
        config.worker.http = Some(HttpPollConfig {
            url: "ftp://example.com/api/test".to_string(),
            interval: None,
            timeout: None,
        });
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("worker.http.url"));
    }

    #[test]
    fn empty_elevate_entry_is_rejected() {
        let yaml = "elevate: [\"sudo\", \"\"]\nservices:\n  - name: api\n    executable: /bin/api\n";
        let config = Parser::new().parse_config(yaml).unwrap();
        assert!(config.validate().is_err());
    }
}
