//! Enroll a finger at the first free library location
//!
//! R503_PORT=/dev/ttyUSB0 cargo run --example enroll

use std::time::Duration;

use r503::{ConfirmationTable, Device, EnrollmentConfig, EnrollmentOutcome, LedColor, LedMode};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("R503_PORT").unwrap_or_else(|_| "/dev/ttyUSB0".to_string());

    // Optional JSON file mapping codes to text
    let table = match std::env::var("R503_CODES") {
        Ok(path) => ConfirmationTable::from_reader(std::fs::File::open(path)?)?,
        Err(_) => ConfirmationTable::default(),
    };

    let mut device = Device::new(port, 57_600);
    device.connect()?;
    device.negotiate_packet_size()?;

    device.led_control(LedMode::Breathing, 0x40, LedColor::Blue, 0)?;
    println!("Place your finger on the sensor, lift it and place it again...");

    let config = EnrollmentConfig::new()
        .with_samples_needed(2)
        .with_timeout(Duration::from_secs(30));

    match device.enroll_next_free(&config)? {
        EnrollmentOutcome::Enrolled { location, attempts } => {
            device.led_control(LedMode::Flashing, 0x20, LedColor::Purple, 3)?;
            println!("Enrolled at {} after {} attempts", location, attempts);
        }
        EnrollmentOutcome::Failed { stage, reply } => {
            device.led_control(LedMode::Flashing, 0x20, LedColor::Red, 3)?;
            match reply.code() {
                Some(code) => println!("Failed while {}: {}", stage, table.describe(code)),
                None => println!("Failed while {}: no response", stage),
            }
        }
        EnrollmentOutcome::TimedOut { stage, samples_captured } => {
            device.led_control(LedMode::Off, 0, LedColor::Red, 0)?;
            println!(
                "Timed out while {} with {} sample(s) captured",
                stage, samples_captured
            );
        }
        EnrollmentOutcome::LibraryFull => println!("Library is full"),
    }

    device.disconnect()?;
    Ok(())
}
