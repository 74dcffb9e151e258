use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::os::unix::fs::symlink;
use std::path::Path;
use tempfile::TempDir;

/// Helper to get the CLI command with a sysfs root and no ACS tool
fn hwtopo_cmd(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("hwtopo").unwrap();
    cmd.arg("--root")
        .arg(root)
        .env("HWTOPO_ACS_TOOL", "hwtopo-no-such-diagnostic-tool")
        .env("NO_COLOR", "1")
        .env_remove("HWTOPO_ROOT")
        .env_remove("HWTOPO_WORKERS")
        .env_remove("RUST_LOG");
    cmd
}

/// One root hub behind PCI function 0000:00:14.0 and one device on it
fn usb_tree() -> TempDir {
    let root = TempDir::new().unwrap();
    let listing = root.path().join("sys/bus/usb/devices");
    fs::create_dir_all(&listing).unwrap();

    let hub = root.path().join("sys/devices/pci0000:00/0000:00:14.0/usb1");
    let dev = hub.join("1-1");
    for (dir, devnum, uevent) in [
        (&hub, "1", "DRIVER=usb\nPRODUCT=1d6b/2/606\n"),
        (&dev, "4", "DRIVER=usb\nPRODUCT=46d/c52b/1211\n"),
    ] {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join("busnum"), "1\n").unwrap();
        fs::write(dir.join("devnum"), format!("{}\n", devnum)).unwrap();
        fs::write(dir.join("uevent"), uevent).unwrap();
    }
    fs::write(dev.join("product"), "USB Receiver\n").unwrap();

    symlink(&hub, listing.join("usb1")).unwrap();
    symlink(&dev, listing.join("1-1")).unwrap();
    root
}

// ============================================================================
// Version and help output tests
// ============================================================================

#[test]
fn test_version_flag() {
    Command::cargo_bin("hwtopo")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("hwtopo"));
}

#[test]
fn test_help_shows_subcommands() {
    Command::cargo_bin("hwtopo")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("usb"))
        .stdout(predicate::str::contains("serial"))
        .stdout(predicate::str::contains("watchdog"))
        .stdout(predicate::str::contains("scan"));
}

#[test]
fn test_unknown_format_rejected() {
    let root = TempDir::new().unwrap();
    hwtopo_cmd(root.path())
        .args(["-f", "xml", "usb"])
        .assert()
        .failure();
}

// ============================================================================
// USB
// ============================================================================

#[test]
fn test_usb_human() {
    let root = usb_tree();
    hwtopo_cmd(root.path())
        .arg("usb")
        .assert()
        .success()
        .stdout(predicate::str::contains("USB Devices"))
        .stdout(predicate::str::contains("46d:c52b"))
        .stdout(predicate::str::contains("USB Receiver"))
        .stdout(predicate::str::contains("parent-usb=1-1"))
        .stdout(predicate::str::contains("parent-pci=0000:00:14.0"))
        .stdout(predicate::str::contains("USB (2 devices)"));
}

#[test]
fn test_usb_json() {
    let root = usb_tree();
    let output = hwtopo_cmd(root.path())
        .args(["--format", "json", "usb"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let devices = value["devices"].as_array().unwrap();
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0]["name"], "1-1");
    assert_eq!(devices[0]["parent"]["usb"]["bus"], "1");
    assert_eq!(devices[1]["parent"]["pci"]["device"], "14");
    assert!(devices.iter().all(|d| d["acs_enabled"] == false));
    assert_eq!(value["errors"].as_array().unwrap().len(), 0);
}

#[test]
fn test_missing_usb_root_is_reported_not_fatal() {
    let root = TempDir::new().unwrap();
    let output = hwtopo_cmd(root.path())
        .args(["-f", "json", "usb"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["devices"].as_array().unwrap().len(), 0);
    assert_eq!(value["errors"].as_array().unwrap().len(), 1);
}

#[test]
fn test_missing_usb_root_warns_on_stderr() {
    let root = TempDir::new().unwrap();
    hwtopo_cmd(root.path())
        .arg("usb")
        .assert()
        .success()
        .stdout(predicate::str::contains("No USB devices found."))
        .stderr(predicate::str::contains("cannot list usb devices"));
}

// ============================================================================
// Other classes
// ============================================================================

#[test]
fn test_watchdog_yaml() {
    let root = TempDir::new().unwrap();
    let wd = root.path().join("sys/class/watchdog/watchdog0");
    fs::create_dir_all(&wd).unwrap();
    fs::write(wd.join("identity"), "iTCO_wdt\n").unwrap();
    fs::write(wd.join("timeout"), "30\n").unwrap();

    hwtopo_cmd(root.path())
        .args(["-f", "yaml", "watchdog"])
        .assert()
        .success()
        .stdout(predicate::str::contains("identity: iTCO_wdt"))
        .stdout(predicate::str::contains("device_path: /dev/watchdog0"));
}

#[test]
fn test_tpm_absent() {
    let root = TempDir::new().unwrap();
    hwtopo_cmd(root.path())
        .arg("tpm")
        .assert()
        .success()
        .stdout(predicate::str::contains("No TPM found."));
}

#[test]
fn test_can_empty_json() {
    let root = TempDir::new().unwrap();
    hwtopo_cmd(root.path())
        .args(["-f", "json", "can"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""devices":[]"#));
}

// ============================================================================
// Scan and configuration
// ============================================================================

#[test]
fn test_scan_pretty_json() {
    let root = usb_tree();
    let output = hwtopo_cmd(root.path())
        .args(["-f", "json", "--pretty", "scan"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let text = String::from_utf8(output.stdout).unwrap();
    assert!(text.contains('\n'));
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["usb"]["devices"].as_array().unwrap().len(), 2);
    assert_eq!(value["tpm"]["present"], false);
}

#[test]
fn test_scan_human_summary() {
    let root = usb_tree();
    hwtopo_cmd(root.path())
        .args(["--workers", "2", "scan"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Summary"))
        .stdout(predicate::str::contains("2 total devices discovered"));
}

#[test]
fn test_scan_only_selected_classes() {
    let root = usb_tree();
    let wd = root.path().join("sys/class/watchdog/watchdog0");
    fs::create_dir_all(&wd).unwrap();
    fs::write(wd.join("identity"), "softdog\n").unwrap();

    let output = hwtopo_cmd(root.path())
        .args(["-f", "json", "scan", "--only", "usb,tpm"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["usb"]["devices"].as_array().unwrap().len(), 2);
    assert_eq!(value["watchdog"]["devices"].as_array().unwrap().len(), 0);
}

#[test]
fn test_scan_only_rejects_unknown_class() {
    let root = TempDir::new().unwrap();
    hwtopo_cmd(root.path())
        .args(["scan", "--only", "usb,gpio"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown device category 'gpio'"));
}

#[test]
fn test_config_file_root() {
    let root = usb_tree();
    let config_dir = TempDir::new().unwrap();
    let config = config_dir.path().join("hwtopo.yaml");
    fs::write(
        &config,
        format!(
            "root: {}\nacs_tool: hwtopo-no-such-diagnostic-tool\n",
            root.path().display()
        ),
    )
    .unwrap();

    Command::cargo_bin("hwtopo")
        .unwrap()
        .env_remove("HWTOPO_ROOT")
        .env_remove("HWTOPO_ACS_TOOL")
        .args(["-f", "json", "--config"])
        .arg(&config)
        .arg("usb")
        .assert()
        .success()
        .stdout(predicate::str::contains("USB Receiver"));
}

#[test]
fn test_invalid_config_fails() {
    let config_dir = TempDir::new().unwrap();
    let config = config_dir.path().join("bad.yaml");
    fs::write(&config, "acs_tool: \"\"\n").unwrap();

    Command::cargo_bin("hwtopo")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .arg("usb")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error:"));
}
