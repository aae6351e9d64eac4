// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `config.rs`

#[cfg(test)]
mod tests {
    use crate::config::RanConfig;
    use crate::errors::ConfigError;
    use std::collections::HashMap;
    use std::io::Write;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |var: &str| vars.get(var).cloned()
    }

    fn yaml_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = RanConfig::load_with(env(&[])).unwrap();

        assert_eq!(config, RanConfig::default());
        assert_eq!(config.poll_interval_secs, 10);
        assert_eq!(config.default_timeout_secs, 300);
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.retry_interval_secs, 10);
        assert!(config.spoke1_kubeconfig.is_none());
    }

    #[test]
    fn test_from_file_fills_missing_fields_with_defaults() {
        let file = yaml_file("hubKubeconfig: /etc/ran/hub.kubeconfig\ndefaultTimeoutSecs: 1800\n");

        let config = RanConfig::from_file(file.path()).unwrap();

        assert_eq!(
            config.hub_kubeconfig,
            Some(PathBuf::from("/etc/ran/hub.kubeconfig"))
        );
        assert_eq!(config.default_timeout_secs, 1800);
        assert_eq!(config.poll_interval_secs, 10);
    }

    #[test]
    fn test_from_file_rejects_unknown_fields() {
        let file = yaml_file("pollIntervalSeconds: 5\n");

        let err = RanConfig::from_file(file.path()).unwrap_err();

        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_from_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.yaml");

        let err = RanConfig::from_file(&missing).unwrap_err();

        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("absent.yaml"));
    }

    #[test]
    fn test_env_overrides_file() {
        let file = yaml_file("pollIntervalSecs: 30\nretryAttempts: 5\n");
        let path = file.path().to_str().unwrap().to_string();

        let config = RanConfig::load_with(env(&[
            ("RAN_CONFIG_FILE", path.as_str()),
            ("RAN_POLL_INTERVAL_SECS", "2"),
            ("RAN_SPOKE2_KUBECONFIG", "/tmp/spoke2"),
        ]))
        .unwrap();

        assert_eq!(config.poll_interval_secs, 2);
        assert_eq!(config.retry_attempts, 5);
        assert_eq!(config.spoke2_kubeconfig, Some(PathBuf::from("/tmp/spoke2")));
    }

    #[test]
    fn test_spoke1_falls_back_to_kubeconfig() {
        let config = RanConfig::load_with(env(&[("KUBECONFIG", "/root/.kube/config")])).unwrap();
        assert_eq!(
            config.spoke1_kubeconfig,
            Some(PathBuf::from("/root/.kube/config"))
        );

        let config = RanConfig::load_with(env(&[
            ("KUBECONFIG", "/root/.kube/config"),
            ("RAN_SPOKE1_KUBECONFIG", "/tmp/spoke1"),
        ]))
        .unwrap();
        assert_eq!(config.spoke1_kubeconfig, Some(PathBuf::from("/tmp/spoke1")));
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let config = RanConfig::load_with(env(&[
            ("RAN_CONFIG_FILE", ""),
            ("RAN_RETRY_ATTEMPTS", ""),
        ]))
        .unwrap();

        assert_eq!(config.retry_attempts, 3);
    }

    #[test]
    fn test_malformed_env_value() {
        let err = RanConfig::load_with(env(&[("RAN_DEFAULT_TIMEOUT_SECS", "ten")])).unwrap_err();

        match err {
            ConfigError::InvalidEnv { var, value } => {
                assert_eq!(var, "RAN_DEFAULT_TIMEOUT_SECS");
                assert_eq!(value, "ten");
            }
            other => panic!("expected InvalidEnv, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let err = RanConfig::load_with(env(&[("RAN_POLL_INTERVAL_SECS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = RanConfig::load_with(env(&[("RAN_RETRY_ATTEMPTS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_derived_settings() {
        let config = RanConfig {
            poll_interval_secs: 5,
            default_timeout_secs: 0,
            retry_attempts: 4,
            retry_interval_secs: 1,
            ..RanConfig::default()
        };

        let poll = config.poll_config().unwrap();
        assert_eq!(poll.interval(), Duration::from_secs(5));
        assert_eq!(poll.timeout(), Duration::ZERO);

        let retry = config.retry_policy().unwrap();
        assert_eq!(retry.max_attempts(), 4);
        assert_eq!(retry.interval(), Duration::from_secs(1));
    }
}
