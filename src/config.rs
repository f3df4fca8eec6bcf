use std::env;
use std::str::FromStr;
use std::time::Duration;

use bigdecimal::BigDecimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable '{0}'")]
    Missing(&'static str),
    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,

    pub payment_api_base_url: String,
    pub payment_access_token: String,
    pub payment_timeout: Duration,

    pub email_api_base_url: String,
    pub email_api_key: String,
    pub email_from: String,
    pub email_timeout: Duration,

    pub store_name: String,
    pub shipping_home_cost: BigDecimal,
    pub shipping_branch_cost: BigDecimal,
    /// Upper-cased discount code and percent off.
    pub discount_codes: Vec<(String, u32)>,
    pub tracking_prefix: String,
}

impl AppConfig {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to honour a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &'static str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));
        let or = |name: &'static str, default: &str| get(name).unwrap_or_else(|| default.to_string());

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            host: or("HOST", "0.0.0.0"),
            port: parse("PORT", &or("PORT", "8080"))?,

            payment_api_base_url: or("PAYMENT_API_BASE_URL", "https://api.mercadopago.com"),
            payment_access_token: required("PAYMENT_ACCESS_TOKEN")?,
            payment_timeout: Duration::from_millis(parse(
                "PAYMENT_TIMEOUT_MS",
                &or("PAYMENT_TIMEOUT_MS", "5000"),
            )?),

            email_api_base_url: or("EMAIL_API_BASE_URL", "https://api.resend.com"),
            email_api_key: required("EMAIL_API_KEY")?,
            email_from: required("EMAIL_FROM")?,
            email_timeout: Duration::from_millis(parse(
                "EMAIL_TIMEOUT_MS",
                &or("EMAIL_TIMEOUT_MS", "5000"),
            )?),

            store_name: or("STORE_NAME", "Storefront"),
            shipping_home_cost: parse("SHIPPING_HOME_COST", &or("SHIPPING_HOME_COST", "0"))?,
            shipping_branch_cost: parse(
                "SHIPPING_BRANCH_COST",
                &or("SHIPPING_BRANCH_COST", "0"),
            )?,
            discount_codes: parse_discount_codes(&or("DISCOUNT_CODES", ""))?,
            tracking_prefix: or("TRACKING_PREFIX", "TRK"),
        })
    }
}

fn parse<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        name,
        reason: format!("'{}': {}", raw, e),
    })
}

/// Parses `CODE:percent` pairs separated by commas, e.g. `WELCOME10:10,VIP:25`.
fn parse_discount_codes(raw: &str) -> Result<Vec<(String, u32)>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (code, percent) = entry.split_once(':').ok_or_else(|| ConfigError::Invalid {
                name: "DISCOUNT_CODES",
                reason: format!("'{}' is not CODE:percent", entry),
            })?;
            let percent: u32 = parse("DISCOUNT_CODES", percent)?;
            if percent > 100 {
                return Err(ConfigError::Invalid {
                    name: "DISCOUNT_CODES",
                    reason: format!("{} is more than 100 percent off", code),
                });
            }
            Ok((code.trim().to_uppercase(), percent))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("DATABASE_URL", "postgres://localhost/store"),
        ("PAYMENT_ACCESS_TOKEN", "token"),
        ("EMAIL_API_KEY", "key"),
        ("EMAIL_FROM", "orders@example.com"),
    ];

    #[test]
    fn defaults_fill_optional_values() {
        let config = AppConfig::from_lookup(lookup(REQUIRED)).unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.payment_timeout, Duration::from_millis(5000));
        assert_eq!(config.tracking_prefix, "TRK");
        assert!(config.discount_codes.is_empty());
    }

    #[test]
    fn missing_required_variable_is_named() {
        let err = AppConfig::from_lookup(lookup(&REQUIRED[1..])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn invalid_port_is_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("PORT", "eighty"));
        let err = AppConfig::from_lookup(lookup(&vars)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));
    }

    #[test]
    fn discount_codes_are_parsed_and_upper_cased() {
        assert_eq!(
            parse_discount_codes("welcome10:10, VIP:25 ,").unwrap(),
            vec![("WELCOME10".to_string(), 10), ("VIP".to_string(), 25)]
        );
        assert!(parse_discount_codes("broken").is_err());
        assert!(parse_discount_codes("FREE:150").is_err());
    }
}
