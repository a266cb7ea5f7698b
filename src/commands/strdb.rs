//! String database and serial number commands

use fx2prom_core::eeprom::StrDb;
use fx2prom_core::family::DeviceFamily;
use fx2prom_core::prom::Prom;
use fx2prom_core::transport::VendorTransport;

/// Print the customer serial number
pub fn run_serial_get(transport: &mut dyn VendorTransport) -> Result<(), Box<dyn std::error::Error>> {
    let mut prom = Prom::new(transport, DeviceFamily::STANDARD);
    println!("{}", prom.serial_number()?);
    Ok(())
}

/// Set the customer serial number
pub fn run_serial_set(
    transport: &mut dyn VendorTransport,
    serial: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut prom = Prom::new(transport, DeviceFamily::STANDARD);
    prom.set_serial_number(serial)?;
    println!("Serial number set to '{}'", serial);
    Ok(())
}

/// Print every string database entry
pub fn run_show(transport: &mut dyn VendorTransport) -> Result<(), Box<dyn std::error::Error>> {
    let mut prom = Prom::new(transport, DeviceFamily::STANDARD);
    let db = prom.read_str_db()?;

    let named = [
        ("Factory S/N", &db.factory_sn),
        ("Customer S/N", &db.customer_sn),
        ("ID", &db.id),
        ("Platform", &db.platform),
        ("Part number", &db.part_num),
        ("CCD", &db.ccd),
        ("CCD S/N", &db.ccd_sn),
        ("CCD grade", &db.ccd_grade),
        ("Proc board", &db.proc_board_rev),
        ("Drive board", &db.drive_board_rev),
        ("Shutter", &db.shutter),
        ("Window", &db.window_type),
        ("Mech config", &db.mech_config),
        ("Opt config", &db.opt_config),
    ];

    println!("String Database ({})", prom.family().string_db);
    println!("============================");
    println!();
    for (label, value) in named {
        println!("{:<14} {}", format!("{}:", label), value);
    }
    for (i, value) in db.extra.iter().enumerate() {
        println!("{:<14} {}", format!("[{}]:", i + StrDb::NAMED_SLOTS), value);
    }
    Ok(())
}
