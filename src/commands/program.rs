//! Full device programming

use std::path::Path;
use std::time::Duration;

use fx2prom_core::family::DeviceFamily;
use fx2prom_core::firmware::{load_image_file, FirmwareImage};
use fx2prom_core::program::{
    ImageSource, ProgramOptions, ProgramProgress, ProgramSources, ProgramStage, PROGRESS_COMPLETE,
};
use fx2prom_core::prom::Prom;
use fx2prom_core::transport::VendorTransport;
use indicatif::{ProgressBar, ProgressStyle};

/// Progress reporter drawing the programming stages as one bar
pub struct IndicatifProgress {
    bar: ProgressBar,
}

impl IndicatifProgress {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::new(PROGRESS_COMPLETE as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")
            .map(|s| s.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    /// Stop drawing, leaving `message` on screen
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Stop drawing after a failure
    pub fn abandon(&self, message: &str) {
        self.bar.abandon_with_message(message.to_string());
    }
}

impl Default for IndicatifProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramProgress for IndicatifProgress {
    fn stage_started(&mut self, stage: ProgramStage) {
        self.bar.set_message(format!("{}...", stage));
    }

    fn report(&mut self, _stage: ProgramStage, percent: u8) {
        self.bar.set_position(percent as u64);
    }
}

fn load_loader(path: &Path) -> Result<FirmwareImage, Box<dyn std::error::Error>> {
    let image = load_image_file(path)
        .map_err(|e| format!("Failed to load firmware {}: {}", path.display(), e))?;
    log::debug!(
        "Loaded {} firmware records ({} bytes) from {}",
        image.data_records().len(),
        image.payload_len(),
        path.display()
    );
    Ok(image)
}

/// Program all images and the header
pub fn run_program(
    transport: &mut dyn VendorTransport,
    fpga: &Path,
    controller: &Path,
    descriptors: &Path,
    loader: Option<&Path>,
    verify: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let bootstrap = loader.map(load_loader).transpose()?;
    let sources = ProgramSources {
        fpga: ImageSource::File(fpga),
        controller: ImageSource::File(controller),
        descriptors: ImageSource::File(descriptors),
    };
    let options = ProgramOptions { verify };

    let mut prom = Prom::new(transport, DeviceFamily::STANDARD);
    let mut progress = IndicatifProgress::new();
    let report = match prom.program(&sources, bootstrap.as_ref(), &options, &mut progress) {
        Ok(report) => report,
        Err(e) => {
            progress.abandon("Programming failed!");
            return Err(e.into());
        }
    };
    progress.finish("Programming complete");

    if report.bootstrapped {
        println!("Bootstrap firmware was downloaded before programming.");
    }
    println!(
        "Header written: fields {:?}, FPGA image {} bytes, checksum 0x{:02X}",
        report.header.fields, report.header.buf_con_size, report.header.check_sum
    );
    if verify {
        println!("All regions verified.");
    }
    Ok(())
}

/// Download firmware into controller RAM and start it
pub fn run_download(
    transport: &mut dyn VendorTransport,
    loader: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let image = load_loader(loader)?;
    let mut prom = Prom::new(transport, DeviceFamily::STANDARD);

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(format!(
        "Downloading {} bytes of firmware...",
        image.payload_len()
    ));

    if let Err(e) = prom.download_firmware(&image) {
        pb.abandon_with_message("Download failed!");
        return Err(e.into());
    }
    pb.finish_with_message("Firmware running");
    Ok(())
}
