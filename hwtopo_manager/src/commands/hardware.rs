//! Hardware inventory commands for hwtopo
//!
//! Runs one device class (or all of them) against a sysfs root and renders
//! the result as colored text, JSON or YAML.

use clap::ValueEnum;
use colored::*;
use serde::Serialize;

use hwtopo_core::config::Options;
use hwtopo_core::error::{HwError, HwResult};
use hwtopo_core::hardware::{
    BusParent, CanDevice, CanDiscovery, CanInfo, DiscoveryOptions, HardwareDiscovery, SerialDevice,
    SerialDiscovery, SerialInfo, TpmDiscovery, TpmInfo, UsbDevice, UsbDiscovery, UsbInfo,
    WatchdogDevice, WatchdogDiscovery, WatchdogInfo,
};

use crate::cli_output;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Colored text for terminals
    #[default]
    Human,
    /// JSON document
    Json,
    /// YAML document
    Yaml,
}

/// Rendering options shared by every hardware command
#[derive(Debug, Clone, Default)]
pub struct OutputOptions {
    pub format: OutputFormat,
    /// Pretty-print JSON
    pub pretty: bool,
    /// Show per-device details in human output
    pub verbose: bool,
}

/// A device list plus the non-fatal errors met while building it
#[derive(Serialize)]
struct Document<'a, T> {
    #[serde(flatten)]
    info: &'a T,
    errors: Vec<String>,
}

/// Serialize `value` for the machine-readable formats.
///
/// [`OutputFormat::Human`] is rendered by the commands themselves and falls
/// back to JSON here.
pub fn render_document<T: Serialize>(
    value: &T,
    format: OutputFormat,
    pretty: bool,
) -> HwResult<String> {
    let doc = match format {
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
        OutputFormat::Json | OutputFormat::Human if pretty => {
            serde_json::to_string_pretty(value)?
        }
        OutputFormat::Json | OutputFormat::Human => serde_json::to_string(value)?,
    };
    Ok(doc.trim_end().to_string())
}

fn emit<T, F>(info: &T, errors: Vec<String>, out: &OutputOptions, human: F) -> HwResult<()>
where
    T: Serialize,
    F: FnOnce(&T),
{
    if out.format == OutputFormat::Human {
        human(info);
        for error in &errors {
            cli_output::warn(error);
        }
        return Ok(());
    }

    let doc = Document { info, errors };
    println!("{}", render_document(&doc, out.format, out.pretty)?);
    Ok(())
}

fn error_strings(errors: &[HwError]) -> Vec<String> {
    errors.iter().map(ToString::to_string).collect()
}

fn parent_label(parent: Option<&BusParent>) -> String {
    parent
        .map(ToString::to_string)
        .unwrap_or_else(|| "no parent".to_string())
}

/// List root USB devices
pub fn run_usb(settings: Options, out: &OutputOptions) -> HwResult<()> {
    let mut discovery = UsbDiscovery::new(settings);
    let result = discovery.enumerate()?;
    let errors = error_strings(&result.errors);
    let info = UsbInfo {
        devices: result.devices,
    };

    emit(&info, errors, out, |info| {
        if info.devices.is_empty() {
            cli_output::empty(
                "No USB devices found.",
                Some("Check that sys/bus/usb/devices exists under --root"),
            );
            return;
        }
        print_usb(&info.devices, out.verbose);
        println!("  {}", info.to_string().dimmed());
    })
}

/// List CAN interfaces
pub fn run_can(settings: Options, out: &OutputOptions) -> HwResult<()> {
    let result = CanDiscovery::new(&settings).enumerate()?;
    let errors = error_strings(&result.errors);
    let info = CanInfo {
        devices: result.devices,
    };

    emit(&info, errors, out, |info| {
        if info.devices.is_empty() {
            cli_output::empty("No CAN interfaces found.", None);
            return;
        }
        print_can(&info.devices);
        println!("  {}", info.to_string().dimmed());
    })
}

/// List legacy serial ports
pub fn run_serial(settings: Options, out: &OutputOptions) -> HwResult<()> {
    let result = SerialDiscovery::new(&settings).enumerate()?;
    let errors = error_strings(&result.errors);
    let info = SerialInfo {
        devices: result.devices,
    };

    emit(&info, errors, out, |info| {
        if info.devices.is_empty() {
            cli_output::empty(
                "No serial ports found.",
                Some("Only ttyS ports backed by hardware are listed"),
            );
            return;
        }
        print_serial(&info.devices);
        println!("  {}", info.to_string().dimmed());
    })
}

/// Show the TPM, if any
pub fn run_tpm(settings: Options, out: &OutputOptions) -> HwResult<()> {
    let info = TpmDiscovery::new(&settings).detect()?;

    emit(&info, Vec::new(), out, |info| {
        if !info.present {
            cli_output::empty("No TPM found.", None);
            return;
        }
        print_tpm(info);
    })
}

/// List watchdog timers
pub fn run_watchdog(settings: Options, out: &OutputOptions) -> HwResult<()> {
    let result = WatchdogDiscovery::new(&settings).enumerate()?;
    let errors = error_strings(&result.errors);
    let info = WatchdogInfo {
        devices: result.devices,
    };

    emit(&info, errors, out, |info| {
        if info.devices.is_empty() {
            cli_output::empty("No watchdog timers found.", None);
            return;
        }
        print_watchdog(&info.devices, out.verbose);
        println!("  {}", info.to_string().dimmed());
    })
}

/// Scan the device classes selected in `classes`
pub fn run_scan(
    settings: Options,
    classes: DiscoveryOptions,
    out: &OutputOptions,
) -> HwResult<()> {
    let mut discovery = HardwareDiscovery::with_options(settings, classes);
    let report = discovery.scan_all();

    if out.format != OutputFormat::Human {
        println!("{}", render_document(&report, out.format, out.pretty)?);
        return Ok(());
    }

    println!("{}", "hwtopo Hardware Discovery".green().bold());
    println!();

    if !report.usb.devices.is_empty() {
        print_usb(&report.usb.devices, out.verbose);
    }
    if !report.can.devices.is_empty() {
        print_can(&report.can.devices);
    }
    if !report.serial.devices.is_empty() {
        print_serial(&report.serial.devices);
    }
    if report.tpm.present {
        print_tpm(&report.tpm);
    }
    if !report.watchdog.devices.is_empty() {
        print_watchdog(&report.watchdog.devices, out.verbose);
    }

    let summary = report.summary();
    cli_output::header("Summary");
    println!(
        "  {} USB devices ({} behind ACS), {} CAN interfaces, {} serial ports",
        summary.usb_count, summary.acs_enabled_count, summary.can_count, summary.serial_count
    );
    println!(
        "  {} TPM, {} watchdog timers",
        summary.tpm_count, summary.watchdog_count
    );
    println!("  {} total devices discovered", summary.total_devices);
    println!("  {} in {:?}", "Scan completed".green(), summary.duration);

    for error in &report.errors {
        cli_output::warn(error);
    }
    Ok(())
}

fn print_usb(devices: &[UsbDevice], verbose: bool) {
    cli_output::header("USB Devices");
    for device in devices {
        println!(
            "  {} {} [{}]",
            device.vid_pid_string().yellow(),
            device.display_name(),
            parent_label(device.parent.as_ref()).dimmed()
        );
        if device.acs_enabled {
            println!("      {}", "ACS enabled".green());
        }

        if verbose {
            cli_output::detail("Entry", &device.name);
            cli_output::detail("Address", &device.address());
            if !device.driver.is_empty() {
                cli_output::detail("Driver", &device.driver);
            }
            if let Some(manufacturer) = &device.manufacturer {
                cli_output::detail("Manufacturer", manufacturer);
            }
            if let Some(serial) = &device.serial {
                cli_output::detail("Serial", serial);
            }
            if let Some(speed) = &device.speed {
                cli_output::detail("Speed", &format!("{} Mbps", speed));
            }
            cli_output::detail("Sysfs", &device.sysfs_path.display().to_string());
        }
    }
    println!();
}

fn print_can(devices: &[CanDevice]) {
    cli_output::header("CAN Interfaces");
    for device in devices {
        println!(
            "  {} [{}]",
            device.name.yellow(),
            parent_label(device.parent.as_ref()).dimmed()
        );
    }
    println!();
}

fn print_serial(devices: &[SerialDevice]) {
    cli_output::header("Serial Ports");
    for port in devices {
        let io = if port.io.is_empty() { "mmio" } else { port.io.as_str() };
        println!(
            "  {} {} io={} irq={} [{}]",
            port.name.yellow(),
            port.address,
            io,
            port.irq,
            parent_label(port.parent.as_ref()).dimmed()
        );
    }
    println!();
}

fn print_tpm(info: &TpmInfo) {
    cli_output::header("TPM");
    let manufacturer = if info.manufacturer.is_empty() {
        "unknown"
    } else {
        info.manufacturer.as_str()
    };
    cli_output::detail("Manufacturer", manufacturer);
    if !info.spec_version.is_empty() {
        cli_output::detail("Spec", &info.spec_version);
    }
    if !info.firmware_version.is_empty() {
        cli_output::detail("Firmware", &info.firmware_version);
    }
    cli_output::detail("Parent", &parent_label(info.parent.as_ref()));
    println!();
}

fn print_watchdog(devices: &[WatchdogDevice], verbose: bool) {
    cli_output::header("Watchdog Timers");
    for device in devices {
        println!(
            "  {} {} [{}]",
            device.device_path.yellow(),
            device.identity,
            parent_label(device.parent.as_ref()).dimmed()
        );
        if verbose {
            cli_output::detail("Timeout", &format!("{}s", device.timeout));
            cli_output::detail("State", &device.state);
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use hwtopo_core::hardware::PciAddress;

    #[test]
    fn test_document_flattens_devices() {
        let info = CanInfo {
            devices: vec![CanDevice {
                name: "can0".into(),
                parent: PciAddress::parse("0000:03:00.0").map(BusParent::Pci),
            }],
        };
        let doc = Document {
            info: &info,
            errors: vec!["serial: boom".into()],
        };

        let json = render_document(&doc, OutputFormat::Json, false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["devices"][0]["name"], "can0");
        assert_eq!(value["devices"][0]["parent"]["pci"]["bus"], "03");
        assert_eq!(value["errors"][0], "serial: boom");
    }

    #[test]
    fn test_yaml_document() {
        let info = WatchdogInfo::default();
        let doc = Document {
            info: &info,
            errors: Vec::new(),
        };
        let yaml = render_document(&doc, OutputFormat::Yaml, false).unwrap();
        assert!(yaml.contains("devices: []"), "{yaml}");
        assert!(yaml.contains("errors: []"), "{yaml}");
    }

    #[test]
    fn test_pretty_json_is_multiline() {
        let info = TpmInfo::default();
        let compact = render_document(&info, OutputFormat::Json, false).unwrap();
        let pretty = render_document(&info, OutputFormat::Json, true).unwrap();
        assert!(!compact.contains('\n'));
        assert!(pretty.contains('\n'));
    }

    #[test]
    fn test_parent_label() {
        assert_eq!(parent_label(None), "no parent");
        let pci = PciAddress::parse("0000:00:14.0").map(BusParent::Pci);
        assert_eq!(parent_label(pci.as_ref()), "parent-pci=0000:00:14.0");
    }
}
