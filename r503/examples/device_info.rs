//! Print what the module reports about itself
//!
//! R503_PORT=/dev/ttyUSB0 cargo run --example device_info

use r503::{ConfirmationTable, Device, Reply};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("R503_PORT").unwrap_or_else(|_| "/dev/ttyUSB0".to_string());
    let table = ConfirmationTable::default();

    let mut device = Device::new(port, 57_600);
    device.connect()?;

    match device.product_info()? {
        Reply::Success(info) => println!("{}", info),
        reply => println!("Product info unavailable: status {}", reply.status()),
    }

    let params = device.read_system_parameters()?.into_result()?;
    println!("Capacity: {}", params.library_capacity);
    println!("Security level: {}", params.security_level);
    println!("Packet size: {}", params.packet_size);
    println!("Baud rate: {}", params.baud_rate);

    device.negotiate_packet_size()?;

    match device.template_count()? {
        Reply::Success(count) => println!("Templates stored: {}", count),
        Reply::Rejected(code) => println!("Template count failed: {}", table.describe(code)),
        Reply::NoResponse => println!("Template count: no response"),
    }

    if let Reply::Success(occupied) = device.occupied_locations()? {
        println!("Occupied locations: {:?}", occupied);
    }

    device.disconnect()?;
    Ok(())
}
