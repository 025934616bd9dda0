// Calculator models and the per-model hardware description

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Processor family. Selects the decoder and the field layout.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Family {
    /// ACT processor
    Classic,
    /// Woodstock, Spice, HP-10 and HP-67
    Woodstock,
    /// Voyager
    Nut,
}

/// How "p + 1 -> p" behaves.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PointerStyle {
    /// p + 1, masked to four bits.
    Masked,
    /// Counts up to REG_SIZE then wraps to zero.
    Wrapping,
    /// Wraps at REG_SIZE - 1; from zero, only increments if the previous
    /// opcode differs from the word before pc.
    PreviousOpcode,
}

/// How hardware inputs are latched at the start of each tick.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum InputStyle {
    /// key -> s0, mode -> s3, timer -> s11
    Classic,
    /// key -> s15, mode -> s3, s5 set (low power)
    Woodstock,
    /// key -> s15, mode -> s3, s5 cleared (self test)
    Spice,
    /// key -> s15, mode -> mode flag
    Hp67,
    /// key -> kyf
    Nut,
    /// nothing, the PIK chip reports keys itself
    None,
}

/// What "clear data registers" does.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ClearData {
    Clear,
    Ignore,
    /// Skipped until the card reader has counted down after power on.
    AfterPowerOn,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Peripheral {
    None,
    Printer,
    CardReader,
}

/// Hardware description of one calculator.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Variant {
    pub family: Family,
    pub rom_size: usize,
    pub memory_size: usize,
    pub status_bits: usize,
    pub pointer: PointerStyle,
    pub inputs: InputStyle,
    pub continuous: bool,
    pub clear_data: ClearData,
    pub peripheral: Peripheral,
}

impl Variant {
    const fn classic(memory_size: usize) -> Self {
        Self {
            family: Family::Classic,
            rom_size: 0o4000,
            memory_size,
            status_bits: 12,
            pointer: PointerStyle::Masked,
            inputs: InputStyle::Classic,
            continuous: false,
            clear_data: ClearData::Clear,
            peripheral: Peripheral::None,
        }
    }

    const fn woodstock(rom_size: usize, memory_size: usize, continuous: bool) -> Self {
        Self {
            family: Family::Woodstock,
            rom_size,
            memory_size,
            status_bits: 16,
            pointer: PointerStyle::Wrapping,
            inputs: InputStyle::Woodstock,
            continuous,
            clear_data: ClearData::Clear,
            peripheral: Peripheral::None,
        }
    }

    const fn spice(rom_size: usize, memory_size: usize, continuous: bool) -> Self {
        Self {
            pointer: PointerStyle::PreviousOpcode,
            inputs: InputStyle::Spice,
            ..Self::woodstock(rom_size, memory_size, continuous)
        }
    }

    const fn nut(rom_size: usize) -> Self {
        Self {
            family: Family::Nut,
            rom_size,
            memory_size: 256,
            status_bits: 14,
            pointer: PointerStyle::PreviousOpcode,
            inputs: InputStyle::Nut,
            continuous: true,
            clear_data: ClearData::Clear,
            peripheral: Peripheral::None,
        }
    }

    /// Field code to field mapping used by arithmetic instructions.
    pub fn fields(&self) -> &'static [Field; 8] {
        match self.family {
            Family::Classic => &CLASSIC_FIELDS,
            Family::Woodstock => &WOODSTOCK_FIELDS,
            Family::Nut => &NUT_FIELDS,
        }
    }

    /// Radix of addresses and opcodes in ROM patch listings.
    pub fn listing_radix(&self) -> u32 {
        match self.family {
            Family::Nut => 16,
            _ => 8,
        }
    }
}

/// Register fields selectable by the three bit field code.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Field {
    /// [pt]
    Pointer,
    /// [0 .. pt]
    WordPointer,
    /// [3 .. 12]
    Mantissa,
    /// [3 .. 13]
    MantissaSign,
    /// [0 .. 2]
    Exponent,
    /// [2]
    ExponentSign,
    /// [0 .. 13]
    Word,
    /// [13]
    Sign,
    /// [p .. q], or [p .. 13] when p > q
    PointerPair,
}

impl Field {
    pub fn name(self) -> &'static str {
        match self {
            Field::Pointer => "p",
            Field::WordPointer => "wp",
            Field::Mantissa => "m",
            Field::MantissaSign => "ms",
            Field::Exponent => "x",
            Field::ExponentSign => "xs",
            Field::Word => "w",
            Field::Sign => "s",
            Field::PointerPair => "pq",
        }
    }
}

static CLASSIC_FIELDS: [Field; 8] = [
    Field::Pointer,
    Field::Mantissa,
    Field::Exponent,
    Field::Word,
    Field::WordPointer,
    Field::MantissaSign,
    Field::ExponentSign,
    Field::Sign,
];

static WOODSTOCK_FIELDS: [Field; 8] = [
    Field::Pointer,
    Field::WordPointer,
    Field::ExponentSign,
    Field::Exponent,
    Field::Sign,
    Field::Mantissa,
    Field::Word,
    Field::MantissaSign,
];

static NUT_FIELDS: [Field; 8] = [
    Field::Pointer,
    Field::Exponent,
    Field::WordPointer,
    Field::Word,
    Field::PointerPair,
    Field::ExponentSign,
    Field::Mantissa,
    Field::Sign,
];

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Model {
    Hp35,
    Hp45,
    Hp55,
    Hp70,
    Hp80,
    Hp10,
    Hp21,
    Hp22,
    Hp25,
    Hp25c,
    Hp27,
    Hp29c,
    Hp31e,
    Hp32e,
    Hp33e,
    Hp33c,
    Hp34c,
    Hp37e,
    Hp38e,
    Hp38c,
    Hp67,
    Hp10c,
    Hp11c,
    Hp12c,
    Hp15c,
    Hp16c,
}

impl Model {
    pub const ALL: [Model; 26] = [
        Model::Hp35,
        Model::Hp45,
        Model::Hp55,
        Model::Hp70,
        Model::Hp80,
        Model::Hp10,
        Model::Hp21,
        Model::Hp22,
        Model::Hp25,
        Model::Hp25c,
        Model::Hp27,
        Model::Hp29c,
        Model::Hp31e,
        Model::Hp32e,
        Model::Hp33e,
        Model::Hp33c,
        Model::Hp34c,
        Model::Hp37e,
        Model::Hp38e,
        Model::Hp38c,
        Model::Hp67,
        Model::Hp10c,
        Model::Hp11c,
        Model::Hp12c,
        Model::Hp15c,
        Model::Hp16c,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Model::Hp35 => "hp35",
            Model::Hp45 => "hp45",
            Model::Hp55 => "hp55",
            Model::Hp70 => "hp70",
            Model::Hp80 => "hp80",
            Model::Hp10 => "hp10",
            Model::Hp21 => "hp21",
            Model::Hp22 => "hp22",
            Model::Hp25 => "hp25",
            Model::Hp25c => "hp25c",
            Model::Hp27 => "hp27",
            Model::Hp29c => "hp29c",
            Model::Hp31e => "hp31e",
            Model::Hp32e => "hp32e",
            Model::Hp33e => "hp33e",
            Model::Hp33c => "hp33c",
            Model::Hp34c => "hp34c",
            Model::Hp37e => "hp37e",
            Model::Hp38e => "hp38e",
            Model::Hp38c => "hp38c",
            Model::Hp67 => "hp67",
            Model::Hp10c => "hp10c",
            Model::Hp11c => "hp11c",
            Model::Hp12c => "hp12c",
            Model::Hp15c => "hp15c",
            Model::Hp16c => "hp16c",
        }
    }

    pub fn variant(self) -> Variant {
        const WS: usize = 0o10000;
        const BANKED: usize = 0o20000;
        match self {
            Model::Hp35 => Variant::classic(1),
            Model::Hp45 => Variant::classic(10),
            Model::Hp55 => Variant::classic(30),
            Model::Hp70 => Variant::classic(10),
            Model::Hp80 => Variant::classic(10),
            Model::Hp10 => Variant {
                inputs: InputStyle::None,
                pointer: PointerStyle::PreviousOpcode,
                peripheral: Peripheral::Printer,
                ..Variant::woodstock(0o4000, 16, false)
            },
            Model::Hp21 => Variant::woodstock(0o4000, 1, false),
            Model::Hp22 => Variant::woodstock(WS, 16, false),
            Model::Hp25 => Variant::woodstock(WS, 16, false),
            Model::Hp25c => Variant {
                clear_data: ClearData::Ignore,
                ..Variant::woodstock(WS, 16, true)
            },
            Model::Hp27 => Variant::woodstock(WS, 16, false),
            Model::Hp29c => Variant::woodstock(BANKED, 48, true),
            Model::Hp31e => Variant::spice(WS, 16, false),
            Model::Hp32e => Variant::spice(WS, 32, false),
            Model::Hp33e => Variant::spice(WS, 32, false),
            Model::Hp33c => Variant::spice(WS, 32, true),
            Model::Hp34c => Variant::spice(BANKED, 64, true),
            Model::Hp37e => Variant::spice(BANKED, 48, false),
            Model::Hp38e => Variant::spice(BANKED, 48, false),
            Model::Hp38c => Variant::spice(BANKED, 48, true),
            Model::Hp67 => Variant {
                inputs: InputStyle::Hp67,
                pointer: PointerStyle::PreviousOpcode,
                clear_data: ClearData::AfterPowerOn,
                peripheral: Peripheral::CardReader,
                ..Variant::woodstock(BANKED, 64, true)
            },
            Model::Hp10c => Variant::nut(0o10000),
            Model::Hp11c => Variant::nut(0o14000),
            Model::Hp12c => Variant::nut(0o10000),
            Model::Hp15c => Variant::nut(0o20000),
            Model::Hp16c => Variant::nut(0o20000),
        }
    }

    #[inline]
    pub fn family(self) -> Family {
        self.variant().family
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Model {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let name = lower.strip_prefix("hp").unwrap_or(&lower);
        let name = name.strip_prefix('-').unwrap_or(name);
        Model::ALL
            .iter()
            .copied()
            .find(|m| &m.name()[2..] == name)
            .ok_or_else(|| Error::UnknownModel(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BANK_BIT;

    #[test]
    fn test_parse_model_names() {
        assert_eq!("hp11c".parse::<Model>().unwrap(), Model::Hp11c);
        assert_eq!("11C".parse::<Model>().unwrap(), Model::Hp11c);
        assert_eq!("HP-67".parse::<Model>().unwrap(), Model::Hp67);
        assert!(matches!(
            "hp99".parse::<Model>(),
            Err(Error::UnknownModel(_))
        ));
    }

    #[test]
    fn test_name_round_trip() {
        for m in Model::ALL {
            assert_eq!(m.to_string().parse::<Model>().unwrap(), m);
        }
    }

    #[test]
    fn test_family_layouts() {
        let v = Model::Hp35.variant();
        assert_eq!(v.family, Family::Classic);
        assert_eq!(v.status_bits, 12);
        assert_eq!(v.fields()[4], Field::WordPointer);

        let v = Model::Hp25c.variant();
        assert_eq!(v.status_bits, 16);
        assert_eq!(v.fields()[1], Field::WordPointer);
        assert!(v.continuous);
        assert_eq!(v.clear_data, ClearData::Ignore);

        let v = Model::Hp11c.variant();
        assert_eq!(v.family, Family::Nut);
        assert_eq!(v.rom_size, 0o14000);
        assert_eq!(v.memory_size, 256);
        assert_eq!(v.fields()[4], Field::PointerPair);
        assert_eq!(v.listing_radix(), 16);
    }

    #[test]
    fn test_pointer_styles() {
        assert_eq!(Model::Hp21.variant().pointer, PointerStyle::Wrapping);
        assert_eq!(Model::Hp34c.variant().pointer, PointerStyle::PreviousOpcode);
        assert_eq!(Model::Hp10.variant().pointer, PointerStyle::PreviousOpcode);
        assert_eq!(Model::Hp80.variant().pointer, PointerStyle::Masked);
    }

    #[test]
    fn test_banked_models() {
        for m in [Model::Hp67, Model::Hp34c, Model::Hp37e, Model::Hp38c] {
            assert!(m.variant().rom_size > BANK_BIT as usize, "{}", m);
        }
    }
}
