//! List commands implementation

use crate::transports;

/// List all supported transports
pub fn list_transports() {
    print!("{}", transports::transport_help());
}

/// List connected FX2 devices
#[cfg(feature = "usb")]
pub fn list_devices(vid: Option<&str>, pid: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let mut options = Vec::new();
    if let Some(vid) = vid {
        options.push(("vid", vid));
    }
    if let Some(pid) = pid {
        options.push(("pid", pid));
    }
    let config = fx2prom_usb::parse_options(&options)?;
    let devices = fx2prom_usb::Fx2Usb::list_devices(&config)?;

    if devices.is_empty() {
        println!("No FX2 devices found.");
        return Ok(());
    }

    println!("{:<4} {:<11} {:>4} {:>8} {:>8}", "#", "USB ID", "Bus", "Address", "Release");
    println!("{}", "-".repeat(40));
    for (i, dev) in devices.iter().enumerate() {
        println!(
            "{:<4} {:04X}:{:04X}   {:>4} {:>8} {:>8}",
            i,
            dev.info.vendor_id,
            dev.info.product_id,
            dev.bus,
            dev.address,
            format!("{:04X}", dev.info.device_id)
        );
    }
    Ok(())
}

/// List connected FX2 devices
#[cfg(not(feature = "usb"))]
pub fn list_devices(_vid: Option<&str>, _pid: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    Err("USB support not compiled in (enable the usb feature)".into())
}
