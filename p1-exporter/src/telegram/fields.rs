use once_cell::sync::Lazy;
use regex::Regex;

/// Last parenthesised decimal that is followed by a unit suffix.
///
/// The greedy prefix skips earlier groups such as the `(180630193501S)`
/// capture timestamp on gas lines.
static VALUE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r".+\(([0-9.]+)[^0-9.)]+").expect("value pattern is valid"));

/// Reading fields addressed by an OBIS code prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObisField {
    ElectricityLow,
    ElectricityNormal,
    Gas,
}

impl ObisField {
    const ALL: [Self; 3] = [Self::ElectricityLow, Self::ElectricityNormal, Self::Gas];

    /// Field reported by `line`, if its prefix is a known OBIS code.
    pub fn for_line(line: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|field| line.starts_with(field.obis_code()))
    }

    pub fn obis_code(self) -> &'static str {
        match self {
            Self::ElectricityLow => "1-0:1.8.1",
            Self::ElectricityNormal => "1-0:1.8.2",
            Self::Gas => "0-1:24.2.1",
        }
    }
}

/// Numeric value carried by a telegram line.
///
/// Returns `0.0` when the line has no value group or the token is not a
/// valid decimal.
pub fn read_value(line: &str) -> f64 {
    VALUE_PATTERN
        .captures(line)
        .and_then(|caps| caps.get(1))
        .and_then(|token| token.as_str().parse::<f64>().ok())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_value_skips_timestamp_group_on_gas_line() {
        assert_eq!(read_value("0-1:24.2.1(180630193501S)(01354.810*m3)"), 1354.81);
    }

    #[test]
    fn read_value_parses_electricity_line() {
        assert_eq!(read_value("1-0:1.8.2(001427.007*kWh)"), 1427.007);
    }

    #[test]
    fn read_value_defaults_to_zero_without_value_group() {
        assert_eq!(read_value("1-3:0.2.8"), 0.0);
        assert_eq!(read_value("0-0:96.1.1"), 0.0);
        assert_eq!(read_value(""), 0.0);
    }

    #[test]
    fn read_value_defaults_to_zero_for_malformed_decimals() {
        assert_eq!(read_value("1-0:1.8.1(1.2.3*kWh)"), 0.0);
        assert_eq!(read_value("1-0:1.8.1(.*kWh)"), 0.0);
        assert_eq!(read_value("1-0:1.8.1(*kWh)"), 0.0);
        // No unit suffix after the number.
        assert_eq!(read_value("1-0:1.8.1(123.4)"), 0.0);
    }

    #[test]
    fn read_value_is_pure() {
        let line = "1-0:1.8.1(000123.456*kWh)";
        assert_eq!(read_value(line), read_value(line));
        assert_eq!(read_value(line), 123.456);
    }

    #[test]
    fn obis_field_matches_known_prefixes_only() {
        assert_eq!(
            ObisField::for_line("1-0:1.8.1(000123.456*kWh)"),
            Some(ObisField::ElectricityLow)
        );
        assert_eq!(
            ObisField::for_line("1-0:1.8.2(000001.000*kWh)"),
            Some(ObisField::ElectricityNormal)
        );
        assert_eq!(
            ObisField::for_line("0-1:24.2.1(180630193501S)(01354.810*m3)"),
            Some(ObisField::Gas)
        );
        assert_eq!(ObisField::for_line("1-0:2.8.1(000000.000*kWh)"), None);
    }

    #[test]
    fn obis_code_is_the_matched_prefix() {
        for field in ObisField::ALL {
            let line = format!("{}(000001.000*kWh)", field.obis_code());
            assert_eq!(ObisField::for_line(&line), Some(field));
        }
        assert_eq!(ObisField::ElectricityLow.obis_code(), "1-0:1.8.1");
        assert_eq!(ObisField::Gas.obis_code(), "0-1:24.2.1");
    }
}
