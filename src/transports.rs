//! Transport registration and opening
//!
//! A transport string is a name optionally followed by options, e.g.
//! `usb:vid=125c,index=1` or `dummy:image=eeprom.bin`.

use fx2prom_core::transport::VendorTransport;

/// Information about a transport
pub struct TransportInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Get information about all transports enabled at compile time
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_transports() -> Vec<TransportInfo> {
    let mut transports = Vec::new();

    #[cfg(feature = "usb")]
    transports.push(TransportInfo {
        name: "usb",
        aliases: &["fx2"],
        description: "FX2 controller over USB (vid=<hex>,pid=<hex>,index=<n>,timeout=<ms>)",
    });

    #[cfg(feature = "dummy")]
    transports.push(TransportInfo {
        name: "dummy",
        aliases: &["sim"],
        description: "Simulated controller (vid=,pid=,did=<hex>,chunk=<n>,image=<file>)",
    });

    transports
}

/// Generate help text listing all available transports
pub fn transport_help() -> String {
    let transports = available_transports();

    if transports.is_empty() {
        return "No transports available (recompile with the usb or dummy feature)".to_string();
    }

    let mut help = String::from("Available transports:\n");
    for t in &transports {
        help.push_str(&format!("  {:8} - {}\n", t.name, t.description));
        if !t.aliases.is_empty() {
            help.push_str(&format!("  {:8}   aliases: {}\n", "", t.aliases.join(", ")));
        }
    }
    help
}

fn canonical_name(name: &str) -> Option<&'static str> {
    available_transports()
        .into_iter()
        .find(|t| t.name == name || t.aliases.contains(&name))
        .map(|t| t.name)
}

/// Split a transport string into name and options
///
/// Options without `=` are ignored.
pub fn parse_transport_string(s: &str) -> (&str, Vec<(&str, &str)>) {
    match s.split_once(':') {
        Some((name, opts)) => {
            let options = opts
                .split(',')
                .filter_map(|opt| opt.split_once('='))
                .collect();
            (name, options)
        }
        None => (s, Vec::new()),
    }
}

/// Open the transport described by `selector`
#[allow(unused_variables)]
pub fn open_transport(selector: &str) -> Result<Box<dyn VendorTransport>, Box<dyn std::error::Error>> {
    let (name, options) = parse_transport_string(selector);

    match canonical_name(name) {
        #[cfg(feature = "usb")]
        Some("usb") => {
            let config = fx2prom_usb::parse_options(&options)
                .map_err(|e| format!("Invalid usb parameters: {}", e))?;
            log::info!("Opening FX2 USB device...");
            let device = fx2prom_usb::Fx2Usb::open_with_config(config).map_err(|e| {
                format!(
                    "Failed to open FX2 device: {}\n\
                     Make sure the camera is connected and you have permissions.",
                    e
                )
            })?;
            Ok(Box::new(device))
        }

        #[cfg(feature = "dummy")]
        Some("dummy") => {
            let (config, image) = fx2prom_dummy::parse_options(&options)
                .map_err(|e| format!("Invalid dummy parameters: {}", e))?;
            let device = match image {
                Some(path) => {
                    log::info!("Using simulated controller backed by {}", path.display());
                    fx2prom_dummy::DummyDevice::with_backing_file(config, &path)?
                }
                None => {
                    log::info!("Using in-memory simulated controller");
                    fx2prom_dummy::DummyDevice::new(config)
                }
            };
            Ok(Box::new(device))
        }

        _ => Err(unknown_transport_error(name)),
    }
}

fn unknown_transport_error(name: &str) -> Box<dyn std::error::Error> {
    let mut msg = format!("Unknown transport: {}\n\n", name);
    msg.push_str(&transport_help());
    msg.push_str("\nUse 'fx2prom list-transports' for more details");
    msg.into()
}
