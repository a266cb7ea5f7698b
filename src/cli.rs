//! CLI argument parsing

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Parse `bank:block:offset` (offset in hex or decimal)
pub fn parse_address(s: &str) -> Result<(u8, u8, u16), String> {
    let mut parts = s.split(':');
    let (Some(bank), Some(block), Some(offset), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(format!("Invalid address '{}' (expected bank:block:offset)", s));
    };
    let bank = bank
        .parse::<u8>()
        .map_err(|e| format!("Invalid bank: {}", e))?;
    let block = block
        .parse::<u8>()
        .map_err(|e| format!("Invalid block: {}", e))?;
    let offset = parse_hex_u32(offset)?;
    let offset = u16::try_from(offset).map_err(|_| format!("Offset 0x{:X} too large", offset))?;
    Ok((bank, block, offset))
}

const TRANSPORT_HELP: &str =
    "Transport to use, e.g. usb, usb:vid=04b4,pid=8613 or dummy:image=eeprom.bin (see list-transports)";

#[derive(Parser)]
#[command(name = "fx2prom")]
#[command(author, version, about = "EEPROM and firmware programmer for FX2-based cameras", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Named EEPROM regions
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionArg {
    /// Header record
    Header,
    /// FPGA configuration image
    Fpga,
    /// Controller boot image
    Controller,
    /// USB descriptor table
    Descriptors,
    /// String database
    Strdb,
}

/// Where an EEPROM access starts
#[derive(clap::Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct LocationArgs {
    /// Named region
    #[arg(long)]
    pub region: Option<RegionArg>,

    /// Explicit address as bank:block:offset (e.g. 0:1:0x0000)
    #[arg(long, value_parser = parse_address)]
    pub address: Option<(u8, u8, u16)>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Program FPGA, controller and descriptor images, then the header
    Program {
        #[arg(short, long, help = TRANSPORT_HELP)]
        transport: String,

        /// FPGA configuration image
        #[arg(long)]
        fpga: PathBuf,

        /// Controller boot image
        #[arg(long)]
        controller: PathBuf,

        /// USB descriptor table
        #[arg(long)]
        descriptors: PathBuf,

        /// Bootstrap firmware for unprogrammed controllers (.ron table or binary record stream)
        #[arg(long)]
        loader: Option<PathBuf>,

        /// Read back every region after writing it
        #[arg(long)]
        verify: bool,
    },

    /// Show the EEPROM header
    Header {
        #[arg(short, long, help = TRANSPORT_HELP)]
        transport: String,
    },

    /// Serial number operations
    #[command(subcommand)]
    Serial(SerialCommands),

    /// Show the string database
    Strdb {
        #[arg(short, long, help = TRANSPORT_HELP)]
        transport: String,
    },

    /// Read EEPROM contents to a file
    Read {
        #[arg(short, long, help = TRANSPORT_HELP)]
        transport: String,

        #[command(flatten)]
        location: LocationArgs,

        /// Number of bytes to read (defaults to the region size where known)
        #[arg(short, long, value_parser = parse_hex_u32)]
        length: Option<u32>,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Write a file to the EEPROM
    Write {
        #[arg(short, long, help = TRANSPORT_HELP)]
        transport: String,

        #[command(flatten)]
        location: LocationArgs,

        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Read back after writing
        #[arg(long)]
        verify: bool,
    },

    /// Download firmware into controller RAM and start it
    Download {
        #[arg(short, long, help = TRANSPORT_HELP)]
        transport: String,

        /// Firmware (.ron table or binary record stream)
        #[arg(short, long)]
        loader: PathBuf,
    },

    /// Show device identity and programming state
    Info {
        #[arg(short, long, help = TRANSPORT_HELP)]
        transport: String,
    },

    /// List supported transports
    ListTransports,

    /// List connected USB devices
    ListDevices {
        /// Vendor ID filter (hex)
        #[arg(long)]
        vid: Option<String>,

        /// Product ID filter (hex)
        #[arg(long)]
        pid: Option<String>,
    },
}

/// Serial number subcommands
#[derive(Subcommand)]
pub enum SerialCommands {
    /// Print the customer serial number
    Get {
        #[arg(short, long, help = TRANSPORT_HELP)]
        transport: String,
    },

    /// Set the customer serial number
    Set {
        #[arg(short, long, help = TRANSPORT_HELP)]
        transport: String,

        /// New serial number
        serial: String,
    },
}
