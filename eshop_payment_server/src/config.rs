use std::{env, fmt::Display, str::FromStr, time::Duration};

use eshop_common::{parse_boolean_flag, parse_key_value_list, Secret};
use eshop_payment_engine::{
    agents::SessionTtl,
    db_url,
    traits::AgentCredentials,
    ReconcilerConfig,
};
use log::*;
use ylt_client::YltConfig;

use crate::errors::ServerError;

const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_SESSION_REFRESH_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_PAYMENT_TIMEOUT_MINS: u64 = 3;
const DEFAULT_DISPATCH_STAGGER_MS: u64 = 200;
const DEFAULT_MAX_IN_FLIGHT_CHECKS: usize = 16;
const DEFAULT_SESSION_TTL_MINS: u64 = 180;
const DEFAULT_EVENT_BUFFER_SIZE: usize = 25;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub database_url: String,
    /// The pooled gateway accounts. Payments are spread across them at random.
    pub accounts: Vec<AgentCredentials>,
    pub ylt: YltConfig,
    /// Time between the starts of two reconciliation passes.
    pub reconcile_interval: Duration,
    /// Time between two rounds of logging in accounts without a cached session.
    pub session_refresh_interval: Duration,
    pub reconciler: ReconcilerConfig,
    pub session_ttl: SessionTtl,
    /// Re-derive the status of orders whose payment has settled, once at startup.
    pub run_repair_pass: bool,
    pub event_buffer_size: usize,
    /// Where payment anomaly alarms are posted. Anomalies are only logged if this is not set.
    pub alarm_webhook_url: Option<Secret<String>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_url: String::default(),
            accounts: Vec::new(),
            ylt: YltConfig::default(),
            reconcile_interval: DEFAULT_RECONCILE_INTERVAL,
            session_refresh_interval: DEFAULT_SESSION_REFRESH_INTERVAL,
            reconciler: ReconcilerConfig::default(),
            session_ttl: SessionTtl::default(),
            run_repair_pass: true,
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
            alarm_webhook_url: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env_or_default() -> Self {
        let database_url = db_url();
        let accounts = env::var("EPS_YLT_ACCOUNTS")
            .map(|s| parse_accounts(&s))
            .unwrap_or_else(|_| {
                error!(
                    "🪛️ EPS_YLT_ACCOUNTS is not set. Please set it to the gateway accounts to use, in the form \
                     phone:password,phone:password. Checkout will fail until it is set."
                );
                Vec::new()
            });
        let ylt = YltConfig::new_from_env_or_default();
        let reconcile_interval = Duration::from_secs(non_zero_env_or_default(
            "EPS_RECONCILE_INTERVAL_SECS",
            DEFAULT_RECONCILE_INTERVAL.as_secs(),
            "s",
        ));
        let session_refresh_interval = Duration::from_secs(non_zero_env_or_default(
            "EPS_SESSION_REFRESH_INTERVAL_SECS",
            DEFAULT_SESSION_REFRESH_INTERVAL.as_secs(),
            "s",
        ));
        let payment_timeout = non_zero_env_or_default("EPS_PAYMENT_TIMEOUT_MINS", DEFAULT_PAYMENT_TIMEOUT_MINS, " min");
        let dispatch_stagger = env_or_default("EPS_DISPATCH_STAGGER_MS", DEFAULT_DISPATCH_STAGGER_MS, "ms");
        let max_in_flight = non_zero_env_or_default("EPS_MAX_IN_FLIGHT_CHECKS", DEFAULT_MAX_IN_FLIGHT_CHECKS, "");
        let reconciler = ReconcilerConfig {
            payment_timeout: Duration::from_secs(payment_timeout * 60),
            dispatch_stagger: Duration::from_millis(dispatch_stagger),
            max_in_flight,
        };
        let ttl_mins = non_zero_env_or_default("EPS_SESSION_TTL_MINS", DEFAULT_SESSION_TTL_MINS, " min");
        let session_ttl = SessionTtl { base: Duration::from_secs(ttl_mins * 60), ..SessionTtl::default() };
        let run_repair_pass = parse_boolean_flag(env::var("EPS_RUN_REPAIR_PASS").ok(), true);
        let event_buffer_size = non_zero_env_or_default("EPS_EVENT_BUFFER_SIZE", DEFAULT_EVENT_BUFFER_SIZE, "");
        let alarm_webhook_url = env::var("EPS_ALARM_WEBHOOK_URL").ok().filter(|s| !s.trim().is_empty()).map(Secret::new);
        if alarm_webhook_url.is_none() {
            info!("🪛️ EPS_ALARM_WEBHOOK_URL is not set. Payment anomalies will only be logged.");
        }
        Self {
            database_url,
            accounts,
            ylt,
            reconcile_interval,
            session_refresh_interval,
            reconciler,
            session_ttl,
            run_repair_pass,
            event_buffer_size,
            alarm_webhook_url,
        }
    }

    /// Checks the values that the workers and the event system cannot run with.
    pub fn validate(&self) -> Result<(), ServerError> {
        let zero = [
            ("reconcile interval", self.reconcile_interval.is_zero()),
            ("session refresh interval", self.session_refresh_interval.is_zero()),
            ("payment timeout", self.reconciler.payment_timeout.is_zero()),
            ("gateway request timeout", self.ylt.request_timeout.is_zero()),
            ("event buffer size", self.event_buffer_size == 0),
        ];
        let invalid = zero.iter().filter(|(_, is_zero)| *is_zero).map(|(name, _)| *name).collect::<Vec<_>>();
        if invalid.is_empty() {
            Ok(())
        } else {
            Err(ServerError::ConfigurationError(format!("These settings must not be zero: {}", invalid.join(", "))))
        }
    }
}

/// Parses `phone:password,phone:password`. Malformed entries are logged and skipped.
pub fn parse_accounts(value: &str) -> Vec<AgentCredentials> {
    let accounts = value
        .split(',')
        .filter_map(|entry| match parse_key_value_list(entry) {
            Ok(pairs) => Some(pairs),
            Err(bad) => {
                // Never log the entry itself. It probably contains a password.
                warn!("🪛️ Ignoring a malformed entry in EPS_YLT_ACCOUNTS ({} characters)", bad.len());
                None
            },
        })
        .flatten()
        .map(|(phone, password)| AgentCredentials::new(phone, password))
        .collect::<Vec<_>>();
    if accounts.is_empty() {
        warn!("🪛️ EPS_YLT_ACCOUNTS does not contain any usable gateway accounts");
    } else {
        let ids = accounts.iter().map(|a| a.agent_id.as_str()).collect::<Vec<_>>().join(", ");
        info!("🪛️ Gateway accounts: {ids}");
    }
    accounts
}

fn env_or_default<T>(name: &str, default: T, unit: &str) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    parse_or_default(name, env::var(name).ok(), default, unit)
}

fn non_zero_env_or_default<T>(name: &str, default: T, unit: &str) -> T
where
    T: FromStr + Display + Default + PartialEq,
    T::Err: Display,
{
    parse_non_zero_or_default(name, env::var(name).ok(), default, unit)
}

fn parse_or_default<T>(name: &str, value: Option<String>, default: T, unit: &str) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    value
        .ok_or_else(|| info!("🪛️ {name} is not set. Using the default value of {default}{unit}."))
        .and_then(|s| {
            s.trim().parse::<T>().map_err(|e| {
                warn!("🪛️ Invalid configuration value for {name}: {s}. {e} Using the default value of {default}{unit}.")
            })
        })
        .ok()
        .unwrap_or(default)
}

/// Like [`parse_or_default`], but zero is rejected as well.
fn parse_non_zero_or_default<T>(name: &str, value: Option<String>, default: T, unit: &str) -> T
where
    T: FromStr + Display + Default + PartialEq,
    T::Err: Display,
{
    match value.map(|s| s.trim().parse::<T>()) {
        Some(Ok(v)) if v != T::default() => v,
        Some(Ok(_)) => {
            warn!("🪛️ {name} must not be zero. Using the default value of {default}{unit}.");
            default
        },
        Some(Err(e)) => {
            warn!("🪛️ Invalid configuration value for {name}. {e} Using the default value of {default}{unit}.");
            default
        },
        None => {
            info!("🪛️ {name} is not set. Using the default value of {default}{unit}.");
            default
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn accounts_are_parsed() {
        let accounts = parse_accounts("13800000001:pa:ss, 13800000002:secret,,");
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].agent_id, "13800000001");
        assert_eq!(accounts[0].secret.reveal(), "pa:ss");
        assert_eq!(accounts[1].agent_id, "13800000002");
        assert_eq!(accounts[1].secret.reveal(), "secret");
    }

    #[test]
    fn malformed_accounts_are_skipped() {
        let accounts = parse_accounts("13800000001,:nope,13800000002:secret");
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].agent_id, "13800000002");
    }

    #[test]
    fn defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.reconcile_interval, Duration::from_secs(5));
        assert_eq!(config.session_refresh_interval, Duration::from_secs(30));
        assert_eq!(config.reconciler.payment_timeout, Duration::from_secs(180));
        assert_eq!(config.reconciler.dispatch_stagger, Duration::from_millis(200));
        assert!(config.run_repair_pass);
        assert!(config.alarm_webhook_url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_values_fall_back_to_the_default() {
        let interval = parse_non_zero_or_default("EPS_RECONCILE_INTERVAL_SECS", Some("0".into()), 5u64, "s");
        assert_eq!(interval, 5);
        let refresh = parse_non_zero_or_default("EPS_SESSION_REFRESH_INTERVAL_SECS", Some(" 0 ".into()), 30u64, "s");
        assert_eq!(refresh, 30);
        let checks = parse_non_zero_or_default("EPS_MAX_IN_FLIGHT_CHECKS", Some("0".into()), 16usize, "");
        assert_eq!(checks, 16);
        assert_eq!(parse_non_zero_or_default("EPS_RECONCILE_INTERVAL_SECS", Some("7".into()), 5u64, "s"), 7);
        assert_eq!(parse_non_zero_or_default("EPS_RECONCILE_INTERVAL_SECS", None, 5u64, "s"), 5);
        assert_eq!(parse_non_zero_or_default("EPS_RECONCILE_INTERVAL_SECS", Some("soon".into()), 5u64, "s"), 5);
        // A zero stagger is allowed
        assert_eq!(parse_or_default("EPS_DISPATCH_STAGGER_MS", Some("0".into()), 200u64, "ms"), 0);
    }

    #[test]
    fn zero_intervals_are_rejected() {
        let config = ServerConfig { reconcile_interval: Duration::ZERO, ..ServerConfig::default() };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ServerError::ConfigurationError(ref msg) if msg.contains("reconcile interval")));

        let mut config = ServerConfig { session_refresh_interval: Duration::ZERO, ..ServerConfig::default() };
        config.ylt.request_timeout = Duration::ZERO;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("session refresh interval"));
        assert!(err.contains("gateway request timeout"));
    }
}
