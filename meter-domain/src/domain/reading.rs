use time::OffsetDateTime;

/// Cumulative meter totals captured from one complete telegram.
///
/// Fields the telegram did not carry are `0.0`, not absent.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Reading {
    /// Capture instant, taken when the telegram was assembled.
    pub ts: OffsetDateTime,
    /// Low-tariff electricity, kWh.
    pub electricity_low: f64,
    /// Normal-tariff electricity, kWh.
    pub electricity_normal: f64,
    /// Gas, m3.
    pub gas: f64,
}

impl Reading {
    /// A reading with every total at zero.
    pub fn zeroed(ts: OffsetDateTime) -> Self {
        Self {
            ts,
            electricity_low: 0.0,
            electricity_normal: 0.0,
            gas: 0.0,
        }
    }
}
