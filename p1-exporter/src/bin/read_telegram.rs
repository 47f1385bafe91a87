use std::{env, path::Path};

use anyhow::{bail, Result};
use p1_exporter::{
    config::{AppConfig, SerialConfig},
    observability,
    pipeline::{LineSource, Pipeline},
    sources::{CaptureFileSource, SerialLineSource},
};
use time::format_description::well_known::Rfc3339;

/// Read one telegram from a serial device or a capture file and print it.
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("usage: read_telegram <serial_device|capture_file>");
    }
    let target = &args[1];

    // Serial settings other than the device still come from config.
    let cfg = AppConfig::load(None)?;

    if Path::new(target).is_file() {
        print_reading(CaptureFileSource::new(target), &cfg).await
    } else {
        let serial = SerialConfig {
            device: target.clone(),
            ..cfg.serial.clone()
        };
        print_reading(SerialLineSource::new(serial), &cfg).await
    }
}

async fn print_reading<S: LineSource>(source: S, cfg: &AppConfig) -> Result<()> {
    let pipeline = Pipeline::new(source, &cfg.collector);
    let reading = pipeline.run().await?;

    println!("timestamp          {}", reading.ts.format(&Rfc3339)?);
    println!("electricity_low    {} kWh", reading.electricity_low);
    println!("electricity_normal {} kWh", reading.electricity_normal);
    println!("gas                {} m3", reading.gas);
    Ok(())
}
