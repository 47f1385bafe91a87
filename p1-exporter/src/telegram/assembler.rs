use meter_domain::domain::Reading;
use time::OffsetDateTime;

use super::fields::{read_value, ObisField};

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum AssembleError {
    #[error("telegram has no body lines")]
    EmptyTelegram,
}

/// Build a `Reading` from the body lines of one framed telegram.
///
/// Lines with an unknown OBIS prefix are ignored; a field that appears
/// more than once takes its last value. The reading is stamped with the
/// current time once every line has been applied.
pub fn assemble_reading<S: AsRef<str>>(lines: &[S]) -> Result<Reading, AssembleError> {
    if lines.is_empty() {
        return Err(AssembleError::EmptyTelegram);
    }

    let mut reading = Reading::zeroed(OffsetDateTime::UNIX_EPOCH);
    for line in lines {
        let line = line.as_ref();
        match ObisField::for_line(line) {
            Some(ObisField::ElectricityLow) => reading.electricity_low = read_value(line),
            Some(ObisField::ElectricityNormal) => reading.electricity_normal = read_value(line),
            Some(ObisField::Gas) => reading.gas = read_value(line),
            None => {}
        }
    }
    reading.ts = OffsetDateTime::now_utc();

    Ok(reading)
}
