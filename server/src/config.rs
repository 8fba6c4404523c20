use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use promfix_common::duration::parse_duration;
use promfix_runtime::EngineOptions;

/// Serve a Prometheus rule unit-test file over the Prometheus query API.
#[derive(Debug, Clone, Parser)]
#[command(name = "promfix", version, about)]
pub struct Config {
    /// Path to the unit-test YAML file holding the input series.
    #[arg(value_name = "FIXTURE")]
    pub fixture: PathBuf,

    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:9090")]
    pub listen: SocketAddr,

    /// Time every query is evaluated at, as a duration after the epoch.
    #[arg(long, default_value = "1m", value_parser = parse_duration_arg)]
    pub eval_time: Duration,

    /// How far back a vector selector looks for the latest sample.
    #[arg(long, default_value = "5m", value_parser = parse_duration_arg)]
    pub lookback_delta: Duration,

    /// Maximum number of samples a single query may load.
    #[arg(long, default_value_t = 10_000)]
    pub max_samples: usize,

    /// Maximum time a single query may run.
    #[arg(long, default_value = "100s", value_parser = parse_duration_arg)]
    pub query_timeout: Duration,
}

impl Config {
    /// Evaluation time in milliseconds since the epoch.
    pub fn eval_time_millis(&self) -> i64 {
        self.eval_time.as_millis() as i64
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            lookback_delta: self.lookback_delta,
            max_samples: self.max_samples,
            timeout: self.query_timeout,
            enable_at_modifier: true,
            enable_negative_offset: true,
            ..EngineOptions::default()
        }
    }
}

fn parse_duration_arg(s: &str) -> Result<Duration, String> {
    match parse_duration(s) {
        Ok(ms) if ms >= 0 => Ok(Duration::from_millis(ms as u64)),
        Ok(_) => Err(format!("duration must not be negative: {s}")),
        Err(err) => Err(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults() {
        let config = Config::try_parse_from(["promfix", "rules_test.yml"]).unwrap();
        assert_eq!(config.fixture, PathBuf::from("rules_test.yml"));
        assert_eq!(config.listen, "127.0.0.1:9090".parse::<SocketAddr>().unwrap());
        assert_eq!(config.eval_time_millis(), 60_000);
        assert_eq!(config.max_samples, 10_000);

        let options = config.engine_options();
        assert_eq!(options.lookback_delta, Duration::from_secs(300));
        assert_eq!(options.timeout, Duration::from_secs(100));
        assert!(options.enable_at_modifier);
        assert!(options.enable_negative_offset);
    }

    #[test]
    fn flags_override_defaults() {
        let config = Config::try_parse_from([
            "promfix",
            "--listen",
            "0.0.0.0:19090",
            "--eval-time",
            "1h30m",
            "--lookback-delta",
            "10m",
            "--max-samples",
            "50",
            "fixture.yml",
        ])
        .unwrap();
        assert_eq!(config.listen.port(), 19090);
        assert_eq!(config.eval_time, Duration::from_secs(5400));
        assert_eq!(config.lookback_delta, Duration::from_secs(600));
        assert_eq!(config.max_samples, 50);
    }

    #[test]
    fn fixture_is_required() {
        assert!(Config::try_parse_from(["promfix"]).is_err());
    }

    #[test]
    fn invalid_durations_are_rejected() {
        assert!(Config::try_parse_from(["promfix", "--eval-time", "soon", "f.yml"]).is_err());
    }
}
