use std::env;

/// Identity attached to the startup log line so aggregated logs can be told apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ServiceContext {
    pub(crate) service_name: String,
    pub(crate) environment: String,
    pub(crate) component: String,
}

impl ServiceContext {
    pub(crate) fn from_env(component: &str) -> Self {
        Self::from_values(
            component,
            env_string("SERVICE_NAME"),
            env_string("STAGE"),
        )
    }

    fn from_values(
        component: &str,
        service_name: Option<String>,
        environment: Option<String>,
    ) -> Self {
        let component = component.trim().to_string();

        let service_name = service_name
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| component.clone());

        let environment = environment
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "unknown".to_string());

        Self {
            service_name,
            environment,
            component,
        }
    }
}

pub(crate) fn default_filter() -> String {
    env_string("LOG_LEVEL")
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "info".to_string())
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string())
}
