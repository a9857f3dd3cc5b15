use std::env;

use chrono_tz::Tz;

const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Manila;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub environment: String,
    pub api_prefix: String,
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub trusted_hosts: Vec<String>,
    pub rate_limit_enabled: bool,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst_size: u32,
    pub portal_api_base_url: String,
    pub portal_api_timeout_seconds: u64,
    pub institute_timezone: Tz,
    pub overdue_list_requires_approval: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            app_name: env_or("APP_NAME", "Dormitory Portal API"),
            environment: env_or("ENVIRONMENT", "development"),
            api_prefix: normalize_prefix(&env_or("API_PREFIX", "/v1")),
            host: env_or("HOST", "0.0.0.0"),
            port: env_parse_or("PORT", 8000),
            cors_origins: parse_csv(&env_or("CORS_ORIGINS", "http://localhost:5173")),
            trusted_hosts: parse_csv(&env_or("TRUSTED_HOSTS", "localhost,127.0.0.1")),
            rate_limit_enabled: env_parse_bool_or("RATE_LIMIT_ENABLED", true),
            rate_limit_per_second: env_parse_or("RATE_LIMIT_PER_SECOND", 10),
            rate_limit_burst_size: env_parse_or("RATE_LIMIT_BURST_SIZE", 100),
            portal_api_base_url: normalize_base_url(&env_or(
                "PORTAL_API_BASE_URL",
                "http://localhost:8080/api/",
            )),
            portal_api_timeout_seconds: env_parse_or("PORTAL_API_TIMEOUT_SECONDS", 15),
            institute_timezone: parse_timezone(env_opt("INSTITUTE_TIMEZONE").as_deref()),
            overdue_list_requires_approval: env_parse_bool_or(
                "OVERDUE_LIST_REQUIRES_APPROVAL",
                false,
            ),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.trim().eq_ignore_ascii_case("production")
    }

    /// Calendar date "today" at the institute, used whenever a caller does
    /// not pin `as_of`.
    pub fn institute_today(&self) -> chrono::NaiveDate {
        chrono::Utc::now()
            .with_timezone(&self.institute_timezone)
            .date_naive()
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

fn env_parse_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    env_opt(key)
        .and_then(|raw| raw.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_parse_bool_or(key: &str, default: bool) -> bool {
    match env_opt(key).as_deref().map(str::to_ascii_lowercase) {
        Some(value) if value == "1" || value == "true" || value == "yes" || value == "on" => true,
        Some(value) if value == "0" || value == "false" || value == "no" || value == "off" => false,
        Some(_) => default,
        None => default,
    }
}

fn parse_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn normalize_prefix(raw: &str) -> String {
    let mut prefix = raw.trim().to_string();
    if prefix.is_empty() {
        return "/v1".to_string();
    }
    if !prefix.starts_with('/') {
        prefix.insert(0, '/');
    }
    while prefix.ends_with('/') && prefix.len() > 1 {
        prefix.pop();
    }
    prefix
}

// Url::join drops the last path segment unless the base ends with '/'.
fn normalize_base_url(raw: &str) -> String {
    let mut base = raw.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    base
}

fn parse_timezone(raw: Option<&str>) -> Tz {
    match raw.map(str::parse::<Tz>) {
        Some(Ok(tz)) => tz,
        Some(Err(_)) => {
            tracing::warn!("INSTITUTE_TIMEZONE is not a valid IANA zone, using Asia/Manila");
            DEFAULT_TIMEZONE
        }
        None => DEFAULT_TIMEZONE,
    }
}
