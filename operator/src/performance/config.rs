use std::{collections::BTreeMap, fmt, str::FromStr};

use ucac_common::peers::PeerTopology;

use crate::performance::{notification_service_address, PEER_PORT};

/// How the harness schedules changes between peersets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TestsStrategy {
    /// Send changes at random.
    Random,
    /// Back off when a change conflicts with one in flight.
    #[default]
    DelayOnConflicts,
}

impl TestsStrategy {
    /// Identifier understood by the harness.
    pub fn as_str(&self) -> &'static str {
        match self {
            TestsStrategy::Random => "random",
            TestsStrategy::DelayOnConflicts => "delay_on_conflicts",
        }
    }
}

impl fmt::Display for TestsStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestsStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "random" => Ok(TestsStrategy::Random),
            "delay_on_conflicts" => Ok(TestsStrategy::DelayOnConflicts),
            other => Err(format!(
                "unknown tests strategy {other:?}, expected random or delay_on_conflicts"
            )),
        }
    }
}

/// Test duration in the ISO-8601 form read by the harness, e.g. `PT1S`, `PT5M` or `P1DT2H`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestDuration(String);

impl TestDuration {
    /// The duration as given.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TestDuration {
    fn default() -> Self {
        Self("PT1S".to_owned())
    }
}

impl fmt::Display for TestDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_number(value: &str, allow_fraction: bool) -> bool {
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    match value.split_once(|c| c == '.' || c == ',') {
        Some((whole, fraction)) => {
            allow_fraction
                && !whole.is_empty()
                && all_digits(whole)
                && fraction.len() <= 9
                && all_digits(fraction)
        }
        None => !value.is_empty() && all_digits(value),
    }
}

impl FromStr for TestDuration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid =
            || format!("invalid test duration {s:?}, expected an ISO-8601 duration like PT1S");
        let trimmed = s.trim();
        let upper = trimmed.to_ascii_uppercase();
        let rest = upper.strip_prefix('P').ok_or_else(invalid)?;
        let (date, time) = match rest.split_once('T') {
            Some((date, time)) => (date, Some(time)),
            None => (rest, None),
        };

        let mut components = 0;
        if !date.is_empty() {
            let days = date.strip_suffix('D').ok_or_else(invalid)?;
            if !is_number(days, false) {
                return Err(invalid());
            }
            components += 1;
        }
        if let Some(time) = time {
            let mut remaining = time;
            for unit in ['H', 'M', 'S'] {
                if let Some((value, tail)) = remaining.split_once(unit) {
                    if !is_number(value, unit == 'S') {
                        return Err(invalid());
                    }
                    remaining = tail;
                    components += 1;
                }
            }
            if time.is_empty() || !remaining.is_empty() {
                return Err(invalid());
            }
        }
        if components == 0 {
            return Err(invalid());
        }
        Ok(Self(trimmed.to_owned()))
    }
}

/// Parameters of a performance test run.
#[derive(Clone, Debug, PartialEq)]
pub struct HarnessParams {
    /// Peers in each peerset under test.
    pub peers: PeerTopology,
    /// Number of changes sent to a single peerset.
    pub single_requests: u32,
    /// Number of changes spanning multiple peersets.
    pub multiple_requests: u32,
    /// How long the test runs.
    pub test_duration: TestDuration,
    /// Upper bound of peersets taking part in one change.
    pub max_peersets_in_change: u32,
    /// Scheduling strategy.
    pub strategy: TestsStrategy,
}

impl Default for HarnessParams {
    fn default() -> Self {
        Self {
            peers: PeerTopology::default(),
            single_requests: 1,
            multiple_requests: 0,
            test_duration: TestDuration::default(),
            max_peersets_in_change: 2,
            strategy: TestsStrategy::default(),
        }
    }
}

/// Environment of the harness container, stored in its ConfigMap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HarnessConfig(BTreeMap<String, String>);

impl HarnessConfig {
    /// Build the environment from the test parameters. Identical parameters
    /// always give an identical mapping.
    pub fn build(params: &HarnessParams) -> Self {
        Self(BTreeMap::from_iter(
            [
                ("TEST_PEERS", params.peers.descriptor(PEER_PORT)),
                (
                    "NOTIFICATION_SERVICE_ADDRESS",
                    notification_service_address(),
                ),
                (
                    "SINGLE_PEERSET_CHANGES_NUMBER",
                    params.single_requests.to_string(),
                ),
                (
                    "MULTIPLE_PEERSET_CHANGES_NUMBER",
                    params.multiple_requests.to_string(),
                ),
                ("TEST_DURATION", params.test_duration.to_string()),
                (
                    "MAX_PEERSETS_IN_CHANGE",
                    params.max_peersets_in_change.to_string(),
                ),
                ("TESTS_STRATEGY", params.strategy.to_string()),
            ]
            .map(|(key, value)| (key.to_owned(), value)),
        ))
    }

    /// Report the key value pairs.
    pub fn data(&self) -> &BTreeMap<String, String> {
        &self.0
    }

    /// Consume into the key value pairs.
    pub fn into_data(self) -> BTreeMap<String, String> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use expect_test::expect;

    #[test]
    fn defaults_match_cli_defaults() {
        let config = HarnessConfig::build(&HarnessParams::default());
        expect![[r#"
            {
                "MAX_PEERSETS_IN_CHANGE": "2",
                "MULTIPLE_PEERSET_CHANGES_NUMBER": "0",
                "NOTIFICATION_SERVICE_ADDRESS": "http://notification-service:8080",
                "SINGLE_PEERSET_CHANGES_NUMBER": "1",
                "TESTS_STRATEGY": "delay_on_conflicts",
                "TEST_DURATION": "PT1S",
                "TEST_PEERS": "",
            }
        "#]]
        .assert_debug_eq(config.data());
    }

    #[test]
    fn build_is_deterministic() {
        let params = HarnessParams {
            peers: PeerTopology::from_counts(&[3, 1, 2]),
            single_requests: 10,
            multiple_requests: 4,
            test_duration: "PT5M".parse().unwrap(),
            max_peersets_in_change: 3,
            strategy: TestsStrategy::Random,
        };
        let first = HarnessConfig::build(&params);
        let second = HarnessConfig::build(&params.clone());
        assert_eq!(first, second);
        assert_eq!(
            format!("{:?}", first.data()),
            format!("{:?}", second.data())
        );
        assert_eq!(first.data()["TESTS_STRATEGY"], "random");
        assert_eq!(first.data()["TEST_DURATION"], "PT5M");
        assert_eq!(first.data().len(), 7);
    }

    #[test]
    fn peers_become_service_addresses() {
        let params = HarnessParams {
            peers: PeerTopology::from_counts(&[1, 2]),
            single_requests: 3,
            ..Default::default()
        };
        let config = HarnessConfig::build(&params);
        assert_eq!(
            config.data()["TEST_PEERS"],
            "peer0-peerset0-service:8080;peer0-peerset1-service:8080,peer1-peerset1-service:8080"
        );
        assert_eq!(config.data()["SINGLE_PEERSET_CHANGES_NUMBER"], "3");
        assert_eq!(config.data()["MULTIPLE_PEERSET_CHANGES_NUMBER"], "0");
    }

    #[test]
    fn strategy_round_trips_through_its_identifier() {
        for strategy in [TestsStrategy::Random, TestsStrategy::DelayOnConflicts] {
            assert_eq!(strategy.as_str().parse::<TestsStrategy>(), Ok(strategy));
        }
        assert!("fastest".parse::<TestsStrategy>().is_err());
    }

    #[test]
    fn accepts_iso_durations() {
        for duration in ["PT1S", "PT5M", "PT1H30M", "P1DT2H", "P2D", "PT0.5S", "pt10s"] {
            let parsed: TestDuration = duration.parse().unwrap_or_else(|err| panic!("{err}"));
            assert_eq!(parsed.as_str(), duration);
        }
    }

    #[test]
    fn rejects_other_durations() {
        for duration in ["", "1S", "P", "PT", "PT30M1H", "P1W", "PT1.5M", "10s", "PTS"] {
            assert!(
                duration.parse::<TestDuration>().is_err(),
                "{duration} should be rejected"
            );
        }
    }
}
