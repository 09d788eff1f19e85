//! Tests for configuration validation and loading

use std::collections::HashMap;

use prometheus_workmanager::config::{
    PreferenceBackendConfig, TransportBackendConfig, WorkManagerConfig, DEFAULT_POLL_INTERVAL_MS,
    ENV_OWNER_COMMAND, ENV_POLL_INTERVAL_MS, ENV_PREFERENCES_PATH, ENV_SPOOL_DIR,
};

#[test]
fn test_default_config_is_valid() {
    let cfg = WorkManagerConfig::default();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.preferences, PreferenceBackendConfig::InMemory);
    assert_eq!(cfg.transport, TransportBackendConfig::InMemory);
    assert_eq!(cfg.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
    assert_eq!(cfg.keys.payload_prefix, "WmPayload_");
    assert!(cfg.owner_command.is_empty());
}

#[test]
fn test_zero_poll_interval_is_invalid() {
    let cfg = WorkManagerConfig {
        poll_interval_ms: 0,
        ..WorkManagerConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_overlapping_prefixes_are_invalid() {
    let mut cfg = WorkManagerConfig::default();
    cfg.keys.descriptor_prefix = "WmPayload_D".into();
    assert!(cfg.validate().is_err());

    let mut cfg = WorkManagerConfig::default();
    cfg.keys.dispatcher_key = "WmPayload_handle".into();
    assert!(cfg.validate().is_err());
}

#[test]
fn test_from_json_str() {
    let cfg = WorkManagerConfig::from_json_str(
        r#"{
            "preferences": { "file": { "path": "/tmp/wm/prefs.json" } },
            "transport": { "file": { "spool_dir": "/tmp/wm/spool" } },
            "poll_interval_ms": 50
        }"#,
    )
    .unwrap();
    assert_eq!(
        cfg.preferences,
        PreferenceBackendConfig::File { path: "/tmp/wm/prefs.json".into() }
    );
    assert_eq!(
        cfg.transport,
        TransportBackendConfig::File { spool_dir: "/tmp/wm/spool".into() }
    );
    assert_eq!(cfg.poll_interval_ms, 50);
    assert_eq!(cfg.keys.dispatcher_key, "WMANAGER_DISPATCHER_HANDLE_KEY");

    assert!(WorkManagerConfig::from_json_str("{ not json").is_err());
    assert!(WorkManagerConfig::from_json_str(r#"{ "poll_interval_ms": 0 }"#).is_err());
}

#[test]
fn test_from_lookup() {
    let vars: HashMap<&str, &str> = [
        (ENV_PREFERENCES_PATH, "/var/lib/wm/prefs.json"),
        (ENV_SPOOL_DIR, "/var/lib/wm/spool"),
        (ENV_POLL_INTERVAL_MS, " 75 "),
    ]
    .into_iter()
    .collect();
    let cfg = WorkManagerConfig::from_lookup(|k| vars.get(k).map(|v| (*v).to_string())).unwrap();
    assert_eq!(
        cfg.preferences,
        PreferenceBackendConfig::File { path: "/var/lib/wm/prefs.json".into() }
    );
    assert_eq!(
        cfg.transport,
        TransportBackendConfig::File { spool_dir: "/var/lib/wm/spool".into() }
    );
    assert_eq!(cfg.poll_interval_ms, 75);
}

#[test]
fn test_from_lookup_rejects_bad_interval() {
    let result = WorkManagerConfig::from_lookup(|k| {
        (k == ENV_POLL_INTERVAL_MS).then(|| "soon".to_string())
    });
    assert!(result.is_err());

    let empty = WorkManagerConfig::from_lookup(|_| None).unwrap();
    assert_eq!(empty, WorkManagerConfig::default());
}

#[test]
fn test_owner_command_from_lookup_and_json() {
    let cfg = WorkManagerConfig::from_lookup(|k| {
        (k == ENV_OWNER_COMMAND).then(|| "  /usr/bin/wm-owner --service ".to_string())
    })
    .unwrap();
    assert_eq!(cfg.owner_command, ["/usr/bin/wm-owner", "--service"]);

    let cfg = WorkManagerConfig::from_json_str(r#"{ "owner_command": ["wm-owner"] }"#).unwrap();
    assert_eq!(cfg.owner_command, ["wm-owner"]);
    assert!(WorkManagerConfig::from_json_str(r#"{ "owner_command": [" "] }"#).is_err());
}
