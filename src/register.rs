use crate::prelude::*;

use chrono::{DateTime, Utc};

/// Which register bank a read transaction targets. The wallbox exposes
/// measurements as input registers and configuration as holding registers,
/// queried with different Modbus function codes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ReadFunction {
    Holding,
    Input,
}

impl ReadFunction {
    /// Tag value used by the time-series sink.
    pub fn vartype(&self) -> &'static str {
        match self {
            ReadFunction::Holding => "holding_register",
            ReadFunction::Input => "input_register",
        }
    }
}

/// One row of the register table.
#[derive(Clone, Copy, Debug)]
pub enum RegisterEntry {
    Read(ReadRegister),
    Write(WriteRegister),
}

#[derive(Clone, Copy, Debug)]
pub struct ReadRegister {
    pub function: ReadFunction,
    pub address: u16,
    /// 1 or 2. Two-word registers form a 32-bit quantity, high word first.
    pub words: u8,
    pub name: &'static str,
    /// Presentation hint for diagnostic output, printf-style.
    pub format: &'static str,
    /// Raw-to-display divisor. 1 means the register is unscaled.
    pub scale: f64,
    /// Positional legend for enumerated registers.
    pub choices: Option<&'static [&'static str]>,
}

#[derive(Clone, Copy, Debug)]
pub struct WriteRegister {
    pub address: u16,
    pub name: &'static str,
    pub value: WriteValue,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WriteValue {
    /// Written every cycle; idempotent device configuration.
    Static(u16),
    /// Supplied externally through the pending-setpoint slot.
    Setpoint,
}

/// One decoded read for one cycle. Forwarded to both sinks, never stored.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub address: u16,
    pub function: ReadFunction,
    pub raw: u32,
    pub value: f64,
    pub legend: Option<&'static str>,
    pub time: DateTime<Utc>,
}

impl ReadRegister {
    /// Turn raw register words into a typed, scaled sample.
    ///
    /// A raw value outside the legend just carries no legend; it is still
    /// a valid reading.
    pub fn decode(&self, words: &[u16], time: DateTime<Utc>) -> Sample {
        let raw = if self.words == 2 {
            (words[0] as u32) * 65536 + words[1] as u32
        } else {
            words[0] as u32
        };

        // skip the division for unscaled registers so integers stay exact
        let value = if self.scale == 1.0 {
            raw as f64
        } else {
            raw as f64 / self.scale
        };

        let legend = self
            .choices
            .and_then(|choices| choices.get(raw as usize))
            .copied();

        Sample {
            address: self.address,
            function: self.function,
            raw,
            value,
            legend,
            time,
        }
    }
}

const fn input(
    address: u16,
    words: u8,
    name: &'static str,
    format: &'static str,
    scale: f64,
) -> RegisterEntry {
    RegisterEntry::Read(ReadRegister {
        function: ReadFunction::Input,
        address,
        words,
        name,
        format,
        scale,
        choices: None,
    })
}

const fn input_enum(
    address: u16,
    name: &'static str,
    choices: &'static [&'static str],
) -> RegisterEntry {
    RegisterEntry::Read(ReadRegister {
        function: ReadFunction::Input,
        address,
        words: 1,
        name,
        format: "%s",
        scale: 1.0,
        choices: Some(choices),
    })
}

const fn holding(
    address: u16,
    name: &'static str,
    format: &'static str,
    scale: f64,
) -> RegisterEntry {
    RegisterEntry::Read(ReadRegister {
        function: ReadFunction::Holding,
        address,
        words: 1,
        name,
        format,
        scale,
        choices: None,
    })
}

const fn write_static(address: u16, name: &'static str, value: u16) -> RegisterEntry {
    RegisterEntry::Write(WriteRegister {
        address,
        name,
        value: WriteValue::Static(value),
    })
}

const fn write_setpoint(address: u16, name: &'static str) -> RegisterEntry {
    RegisterEntry::Write(WriteRegister {
        address,
        name,
        value: WriteValue::Setpoint,
    })
}

const CHARGING_STATE: &[&str] = &[
    "", "", "A1", "A2", "B1", "B2", "C1", "C2", "derating", "E", "F", "ERR",
];

const LOCK_STATE: &[&str] = &["locked", "unlocked"];

/// Register map of the wallbox controller. The poll loop walks this in
/// order every cycle; any register not listed here is never touched.
pub static TABLE: &[RegisterEntry] = &[
    input(4, 1, "Modbus Registers Version", "%x", 1.0),
    input_enum(5, "Charging State", CHARGING_STATE),
    input(6, 1, "L1 Current RMS [A]", "%.1f", 10.0),
    input(7, 1, "L2 Current RMS [A]", "%.1f", 10.0),
    input(8, 1, "L3 Current RMS [A]", "%.1f", 10.0),
    input(9, 1, "PCB-Temp [°C]", "%.1f", 10.0),
    input(10, 1, "Voltage L1 RMS [V]", "%.1f", 1.0),
    input(11, 1, "Voltage L2 RMS [V]", "%.1f", 1.0),
    input(12, 1, "Voltage L3 RMS [V]", "%.1f", 1.0),
    input_enum(13, "Lock State", LOCK_STATE),
    input(14, 1, "Power (L1+L2+L3) [VA]", "%d", 1.0),
    input(15, 2, "Energy since PowerOn [VAh]", "%d", 1.0),
    input(17, 2, "Energy since Install [VAh]", "%d", 1.0),
    input(100, 1, "HW: Max Current [A]", "%d", 1.0),
    input(101, 1, "HW: Min Current [A]", "%d", 1.0),
    holding(257, "ModBus Timeout [s]", "%.3f", 1000.0),
    // 0 on [default], 4 off - keep standby off so the box answers promptly
    write_static(258, "Standby Function", 4),
    // written in tenths of an ampere, so 160 = 16 A
    write_setpoint(261, "Control: Max Current [A]"),
    holding(261, "Control: Max Current [A]", "%.1f", 10.0),
];

/// Check a register table before the poll loop starts. A bad table is a
/// configuration error and must abort the process, not a cycle.
pub fn validate(table: &[RegisterEntry]) -> Result<()> {
    let mut setpoints = 0;

    for entry in table {
        match entry {
            RegisterEntry::Read(reg) => {
                if reg.words != 1 && reg.words != 2 {
                    bail!(
                        "register {} ({}): word count must be 1 or 2, got {}",
                        reg.address,
                        reg.name,
                        reg.words
                    );
                }
                if !(reg.scale > 0.0) {
                    bail!(
                        "register {} ({}): scale factor must be positive",
                        reg.address,
                        reg.name
                    );
                }
            }
            RegisterEntry::Write(reg) => {
                if reg.value == WriteValue::Setpoint {
                    setpoints += 1;
                }
            }
        }
    }

    if setpoints != 1 {
        bail!(
            "register table must contain exactly one externally controlled write entry, found {}",
            setpoints
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn decode_single_word() {
        let reg = match TABLE[0] {
            RegisterEntry::Read(r) => r,
            _ => unreachable!(),
        };
        let sample = reg.decode(&[0x0107], now());
        assert_eq!(sample.raw, 0x0107);
        assert_eq!(sample.value, 263.0);
        assert_eq!(sample.legend, None);
    }

    #[test]
    fn decode_double_word_high_word_first() {
        // Energy since PowerOn, input register 15
        let reg = match TABLE[11] {
            RegisterEntry::Read(r) => r,
            _ => unreachable!(),
        };
        assert_eq!(reg.words, 2);
        let sample = reg.decode(&[3, 1], now());
        assert_eq!(sample.raw, 3 * 65536 + 1);
        let sample = reg.decode(&[0xffff, 0xffff], now());
        assert_eq!(sample.raw, u32::MAX);
    }

    #[test]
    fn decode_applies_scale_factor() {
        // L1 current, scale 10
        let reg = match TABLE[2] {
            RegisterEntry::Read(r) => r,
            _ => unreachable!(),
        };
        let sample = reg.decode(&[105], now());
        assert_eq!(sample.raw, 105);
        assert!((sample.value - 10.5).abs() < f64::EPSILON);
    }

    #[test]
    fn scale_of_one_is_exact() {
        let reg = ReadRegister {
            function: ReadFunction::Input,
            address: 14,
            words: 1,
            name: "Power",
            format: "%d",
            scale: 1.0,
            choices: None,
        };
        let sample = reg.decode(&[65535], now());
        assert_eq!(sample.value, 65535.0);
    }

    #[test]
    fn legend_attached_for_valid_index() {
        let reg = match TABLE[1] {
            RegisterEntry::Read(r) => r,
            _ => unreachable!(),
        };
        assert_eq!(reg.decode(&[6], now()).legend, Some("C1"));
        assert_eq!(reg.decode(&[11], now()).legend, Some("ERR"));
        assert_eq!(reg.decode(&[0], now()).legend, Some(""));
    }

    #[test]
    fn legend_absent_for_out_of_range_index() {
        let reg = match TABLE[1] {
            RegisterEntry::Read(r) => r,
            _ => unreachable!(),
        };
        // len(CHARGING_STATE) == 12; 12 is numerically valid but has no legend
        let sample = reg.decode(&[12], now());
        assert_eq!(sample.raw, 12);
        assert_eq!(sample.legend, None);
        assert_eq!(reg.decode(&[9999], now()).legend, None);
    }

    #[test]
    fn lock_state_legend() {
        let reg = match TABLE[9] {
            RegisterEntry::Read(r) => r,
            _ => unreachable!(),
        };
        assert_eq!(reg.decode(&[0], now()).legend, Some("locked"));
        assert_eq!(reg.decode(&[1], now()).legend, Some("unlocked"));
        assert_eq!(reg.decode(&[2], now()).legend, None);
    }

    #[test]
    fn wallbox_table_is_valid() {
        assert!(validate(TABLE).is_ok());
    }

    #[test]
    fn validate_rejects_zero_scale() {
        let table = [
            input(4, 1, "bad", "%d", 0.0),
            write_setpoint(261, "Control: Max Current [A]"),
        ];
        assert!(validate(&table).is_err());
    }

    #[test]
    fn validate_rejects_bad_word_count() {
        let table = [
            input(15, 3, "bad", "%d", 1.0),
            write_setpoint(261, "Control: Max Current [A]"),
        ];
        assert!(validate(&table).is_err());
    }

    #[test]
    fn validate_requires_exactly_one_setpoint() {
        assert!(validate(&[input(4, 1, "ok", "%d", 1.0)]).is_err());

        let table = [
            write_setpoint(261, "Control: Max Current [A]"),
            write_setpoint(262, "another"),
        ];
        assert!(validate(&table).is_err());
    }
}
