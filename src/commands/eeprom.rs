//! Raw EEPROM access and header inspection

use std::fs;
use std::path::Path;

use fx2prom_core::eeprom::{
    EepromAddress, EepromHeader, HeaderFields, PromState, HEADER_LEN, STR_DB_LEN,
};
use fx2prom_core::error::Error;
use fx2prom_core::family::DeviceFamily;
use fx2prom_core::prom::Prom;
use fx2prom_core::transport::VendorTransport;
use indicatif::ProgressBar;

use crate::cli::{LocationArgs, RegionArg};

/// Bytes moved between progress updates
const PROGRESS_STEP: usize = 0x4000;

fn region_address(family: &DeviceFamily, region: RegionArg) -> EepromAddress {
    match region {
        RegionArg::Header => family.header,
        RegionArg::Fpga => family.fpga_image,
        RegionArg::Controller => family.controller_image,
        RegionArg::Descriptors => family.descriptors,
        RegionArg::Strdb => family.string_db,
    }
}

fn resolve_address(family: &DeviceFamily, location: &LocationArgs) -> EepromAddress {
    match (location.region, location.address) {
        (Some(region), _) => region_address(family, region),
        (None, Some((bank, block, offset))) => EepromAddress::new(bank, block, offset),
        (None, None) => family.header,
    }
}

/// Largest image a named region holds
fn region_limit(family: &DeviceFamily, region: RegionArg) -> usize {
    match region {
        RegionArg::Header => HEADER_LEN,
        RegionArg::Strdb => STR_DB_LEN,
        RegionArg::Fpga => family.fpga_image_len as usize,
        RegionArg::Controller => family.controller_image_len as usize,
        RegionArg::Descriptors => family.descriptors_len as usize,
    }
}

/// Length of a region whose size the device records
fn region_len<T: VendorTransport + ?Sized>(
    prom: &mut Prom<'_, T>,
    region: RegionArg,
) -> Result<Option<usize>, Box<dyn std::error::Error>> {
    Ok(match region {
        RegionArg::Header => Some(HEADER_LEN),
        RegionArg::Strdb => Some(STR_DB_LEN),
        RegionArg::Fpga => match prom.read_state()? {
            PromState::Programmed(h) if h.fields.contains(HeaderFields::BUF_CON_VALID) => {
                log::debug!("FPGA image size from header: {} bytes", h.buf_con_size);
                Some(h.buf_con_size as usize)
            }
            _ => None,
        },
        RegionArg::Controller | RegionArg::Descriptors => None,
    })
}

fn step_address(
    family: &DeviceFamily,
    start: EepromAddress,
    done: usize,
) -> Result<EepromAddress, Box<dyn std::error::Error>> {
    let pos = family.geometry.linear(start)? + done as u32;
    Ok(family.geometry.from_linear(pos)?)
}

/// Read EEPROM contents to a file
pub fn run_read(
    transport: &mut dyn VendorTransport,
    location: &LocationArgs,
    length: Option<u32>,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut prom = Prom::new(transport, DeviceFamily::STANDARD);
    let family = *prom.family();
    let start = resolve_address(&family, location);

    let len = match (length, location.region) {
        (Some(len), _) => len as usize,
        (None, Some(region)) => region_len(&mut prom, region)?
            .ok_or("Region size unknown, pass --length")?,
        (None, None) => return Err("--length is required with --address".into()),
    };
    family.geometry.check_span(start, len)?;

    log::info!("Reading {} bytes at {}", len, start);
    let pb = ProgressBar::new(len as u64);
    pb.set_style(super::bytes_style()?);

    let mut data = Vec::with_capacity(len);
    while data.len() < len {
        let n = PROGRESS_STEP.min(len - data.len());
        let addr = step_address(&family, start, data.len())?;
        match prom.read_eeprom(addr, n) {
            Ok(chunk) => data.extend_from_slice(&chunk),
            Err(e) => {
                pb.abandon_with_message("Read failed!");
                return Err(e.into());
            }
        }
        pb.set_position(data.len() as u64);
    }
    pb.finish_with_message("Read complete");

    fs::write(output, &data)?;
    println!("Wrote {} bytes to {}", data.len(), output.display());
    Ok(())
}

/// Write a file to the EEPROM
pub fn run_write(
    transport: &mut dyn VendorTransport,
    location: &LocationArgs,
    input: &Path,
    verify: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    let mut prom = Prom::new(transport, DeviceFamily::STANDARD);
    let family = *prom.family();
    let start = resolve_address(&family, location);
    family.geometry.check_span(start, data.len())?;

    if location.region == Some(RegionArg::Header) && data.len() != HEADER_LEN {
        return Err(format!("Header image must be {} bytes", HEADER_LEN).into());
    }
    if let Some(region) = location.region {
        let max = region_limit(&family, region);
        if data.len() > max {
            return Err(Error::ImageTooLarge {
                len: data.len(),
                max,
            }
            .into());
        }
    }

    log::info!("Writing {} bytes from {} at {}", data.len(), input.display(), start);
    let pb = ProgressBar::new(data.len() as u64);
    pb.set_style(super::bytes_style()?);

    for (i, chunk) in data.chunks(PROGRESS_STEP).enumerate() {
        let done = i * PROGRESS_STEP;
        let addr = step_address(&family, start, done)?;
        if let Err(e) = prom.write_eeprom(addr, chunk) {
            pb.abandon_with_message("Write failed!");
            return Err(e.into());
        }
        pb.set_position((done + chunk.len()) as u64);
    }
    pb.finish_with_message("Write complete");

    if verify {
        let pb = ProgressBar::new_spinner();
        pb.set_message("Verifying...");
        if let Err(e) = prom.verify_eeprom(start, &data) {
            pb.abandon_with_message("Verification failed!");
            return Err(e.into());
        }
        pb.finish_with_message("Verification passed");
    }
    Ok(())
}

fn print_header(header: &EepromHeader) {
    println!("Size:            {} bytes", header.size);
    println!("Version:         {}", header.version);
    println!("Fields:          {:?}", header.fields);
    println!("FPGA image size: {} bytes", header.buf_con_size);
    println!("Checksum:        0x{:02X}", header.check_sum);
}

/// Show the EEPROM header
pub fn run_header(transport: &mut dyn VendorTransport) -> Result<(), Box<dyn std::error::Error>> {
    let mut prom = Prom::new(transport, DeviceFamily::STANDARD);

    println!("EEPROM Header ({})", prom.family().header);
    println!("=========================");
    println!();
    match prom.read_state()? {
        PromState::Programmed(header) => print_header(&header),
        PromState::Unprogrammed => println!("No valid header (device unprogrammed)"),
    }
    Ok(())
}

/// Show device identity and programming state
pub fn run_info(transport: &mut dyn VendorTransport) -> Result<(), Box<dyn std::error::Error>> {
    let mut prom = Prom::new(transport, DeviceFamily::STANDARD);
    let family = *prom.family();
    let info = prom.vendor_info()?;

    println!("FX2 Camera Controller");
    println!("=====================");
    println!();
    println!("USB ID:          {:04X}:{:04X}", info.vendor_id, info.product_id);
    println!("Release:         {:04X}", info.device_id);
    println!("Family:          {}", family.name);
    println!(
        "EEPROM:          {} banks x {} blocks ({} KiB)",
        family.geometry.banks,
        family.geometry.blocks,
        family.geometry.capacity() / 1024
    );

    if family.needs_bootstrap(info.vendor_id) {
        println!();
        println!("Controller has no firmware; download a loader before EEPROM access.");
        return Ok(());
    }

    println!();
    match prom.read_state()? {
        PromState::Programmed(header) => {
            println!("State:           Programmed");
            print_header(&header);
        }
        PromState::Unprogrammed => println!("State:           Unprogrammed"),
    }

    match prom.serial_number() {
        Ok(serial) if !serial.is_empty() => println!("Serial number:   {}", serial),
        Ok(_) => println!("Serial number:   (not set)"),
        Err(e) => log::debug!("String database unreadable: {}", e),
    }
    Ok(())
}
