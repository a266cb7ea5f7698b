//! fx2prom - EEPROM and firmware programmer for FX2-based cameras
//!
//! Writes the FPGA image, controller boot image, USB descriptors and header
//! to the camera's banked EEPROM, downloads bootstrap firmware into a
//! factory-fresh controller, and edits the string database.
//!
//! # Transports
//!
//! Commands run over any [`VendorTransport`](fx2prom_core::transport::VendorTransport):
//! - **usb** - a real controller reached with `nusb`
//! - **dummy** - a simulated controller, optionally backed by a file

mod cli;
mod commands;
mod transports;

use clap::Parser;
use cli::{Cli, Commands, SerialCommands};
use transports::open_transport;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    match cli.command {
        Commands::Program {
            transport,
            fpga,
            controller,
            descriptors,
            loader,
            verify,
        } => {
            let mut device = open_transport(&transport)?;
            commands::program::run_program(
                &mut *device,
                &fpga,
                &controller,
                &descriptors,
                loader.as_deref(),
                verify,
            )
        }
        Commands::Header { transport } => {
            let mut device = open_transport(&transport)?;
            commands::eeprom::run_header(&mut *device)
        }
        Commands::Serial(subcmd) => match subcmd {
            SerialCommands::Get { transport } => {
                let mut device = open_transport(&transport)?;
                commands::strdb::run_serial_get(&mut *device)
            }
            SerialCommands::Set { transport, serial } => {
                let mut device = open_transport(&transport)?;
                commands::strdb::run_serial_set(&mut *device, &serial)
            }
        },
        Commands::Strdb { transport } => {
            let mut device = open_transport(&transport)?;
            commands::strdb::run_show(&mut *device)
        }
        Commands::Read {
            transport,
            location,
            length,
            output,
        } => {
            let mut device = open_transport(&transport)?;
            commands::eeprom::run_read(&mut *device, &location, length, &output)
        }
        Commands::Write {
            transport,
            location,
            input,
            verify,
        } => {
            let mut device = open_transport(&transport)?;
            commands::eeprom::run_write(&mut *device, &location, &input, verify)
        }
        Commands::Download { transport, loader } => {
            let mut device = open_transport(&transport)?;
            commands::program::run_download(&mut *device, &loader)
        }
        Commands::Info { transport } => {
            let mut device = open_transport(&transport)?;
            commands::eeprom::run_info(&mut *device)
        }
        Commands::ListTransports => {
            commands::list_transports();
            Ok(())
        }
        Commands::ListDevices { vid, pid } => {
            commands::list_devices(vid.as_deref(), pid.as_deref())
        }
    }
}
