// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serial_test::serial;
use tempfile::TempDir;

use super::*;

#[test]
#[serial]
fn state_dir_prefers_cx_state_dir() {
    std::env::set_var("CX_STATE_DIR", "/tmp/cx-explicit");
    assert_eq!(state_dir().unwrap(), PathBuf::from("/tmp/cx-explicit"));
    std::env::remove_var("CX_STATE_DIR");
}

#[test]
fn daemon_files_live_in_state_dir() {
    let dir = Path::new("/s");
    assert_eq!(socket_path(dir), Path::new("/s/daemon.sock"));
    assert_eq!(pid_path(dir), Path::new("/s/daemon.pid"));
    assert_eq!(log_path(dir), Path::new("/s/daemon.log"));
}

#[test]
#[serial]
fn vault_root_reads_cx_path() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "cx_path = \"/data/vault\"\nclaude_path = \"claude\"\n").unwrap();
    std::env::set_var("CX_CONFIG", &config);

    let root = vault_root();

    std::env::remove_var("CX_CONFIG");
    assert_eq!(root.unwrap(), PathBuf::from("/data/vault"));
}

#[test]
#[serial]
fn vault_root_defaults_without_config_file() {
    let dir = TempDir::new().unwrap();
    std::env::set_var("CX_CONFIG", dir.path().join("missing.toml"));

    let root = vault_root();

    std::env::remove_var("CX_CONFIG");
    let home = dirs::home_dir().unwrap();
    assert_eq!(root.unwrap(), home.join("cx"));
}

#[test]
#[serial]
fn ipc_timeout_reads_override() {
    std::env::set_var("CX_IPC_TIMEOUT_MS", "250");
    assert_eq!(ipc_timeout(), Duration::from_millis(250));
    std::env::remove_var("CX_IPC_TIMEOUT_MS");
    assert_eq!(ipc_timeout(), Duration::from_secs(5));
}

#[test]
fn expand_home_leaves_absolute_paths() {
    assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
    assert_eq!(expand_home("rel"), PathBuf::from("rel"));
}
