use serde::Serialize;
use std::fmt;

/// One bit of the per-pixel quality word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    RtosaOos = 0,
    RtosaOor = 1,
    RhowOor = 2,
    CloudRisk = 3,
    IopOor = 4,
    ApigAtMax = 5,
    AdetAtMax = 6,
    AgelbAtMax = 7,
    BpartAtMax = 8,
    BwitAtMax = 9,
    ApigAtMin = 10,
    AdetAtMin = 11,
    AgelbAtMin = 12,
    BpartAtMin = 13,
    BwitAtMin = 14,
    RhowOos = 15,
    Kd489Oor = 16,
    KdminOor = 17,
    Kd489AtMax = 18,
    KdminAtMax = 19,
    ValidPe = 31,
}

impl Flag {
    pub const ALL: [Flag; 21] = [
        Flag::RtosaOos,
        Flag::RtosaOor,
        Flag::RhowOor,
        Flag::CloudRisk,
        Flag::IopOor,
        Flag::ApigAtMax,
        Flag::AdetAtMax,
        Flag::AgelbAtMax,
        Flag::BpartAtMax,
        Flag::BwitAtMax,
        Flag::ApigAtMin,
        Flag::AdetAtMin,
        Flag::AgelbAtMin,
        Flag::BpartAtMin,
        Flag::BwitAtMin,
        Flag::RhowOos,
        Flag::Kd489Oor,
        Flag::KdminOor,
        Flag::Kd489AtMax,
        Flag::KdminAtMax,
        Flag::ValidPe,
    ];

    /// IOP at-max bits in `apig, adet, agelb, bpart, bwit` order.
    pub const IOP_AT_MAX: [Flag; 5] = [
        Flag::ApigAtMax,
        Flag::AdetAtMax,
        Flag::AgelbAtMax,
        Flag::BpartAtMax,
        Flag::BwitAtMax,
    ];

    /// IOP at-min bits in `apig, adet, agelb, bpart, bwit` order.
    pub const IOP_AT_MIN: [Flag; 5] = [
        Flag::ApigAtMin,
        Flag::AdetAtMin,
        Flag::AgelbAtMin,
        Flag::BpartAtMin,
        Flag::BwitAtMin,
    ];

    pub fn bit(self) -> u32 {
        1 << self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            Flag::RtosaOos => "Rtosa_OOS",
            Flag::RtosaOor => "Rtosa_OOR",
            Flag::RhowOor => "Rhow_OOR",
            Flag::CloudRisk => "Cloud_risk",
            Flag::IopOor => "Iop_OOR",
            Flag::ApigAtMax => "Apig_at_max",
            Flag::AdetAtMax => "Adet_at_max",
            Flag::AgelbAtMax => "Agelb_at_max",
            Flag::BpartAtMax => "Bpart_at_max",
            Flag::BwitAtMax => "Bwit_at_max",
            Flag::ApigAtMin => "Apig_at_min",
            Flag::AdetAtMin => "Adet_at_min",
            Flag::AgelbAtMin => "Agelb_at_min",
            Flag::BpartAtMin => "Bpart_at_min",
            Flag::BwitAtMin => "Bwit_at_min",
            Flag::RhowOos => "Rhow_OOS",
            Flag::Kd489Oor => "Kd489_OOR",
            Flag::KdminOor => "Kdmin_OOR",
            Flag::Kd489AtMax => "Kd489_at_max",
            Flag::KdminAtMax => "Kdmin_at_max",
            Flag::ValidPe => "Valid_PE",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Flag::RtosaOos => "The input spectrum to the atmospheric correction neural net was out of the scope of the training range",
            Flag::RtosaOor => "The input spectrum to the atmospheric correction neural net is out of training range",
            Flag::RhowOor => "One of the inputs to the IOP retrieval neural net is out of training range",
            Flag::CloudRisk => "High downwelling transmission is indicating cloudy conditions",
            Flag::IopOor => "One of the IOPs is out of range",
            Flag::ApigAtMax => "Apig output of the IOP retrieval neural net is at its maximum",
            Flag::AdetAtMax => "Adet output of the IOP retrieval neural net is at its maximum",
            Flag::AgelbAtMax => "Agelb output of the IOP retrieval neural net is at its maximum",
            Flag::BpartAtMax => "Bpart output of the IOP retrieval neural net is at its maximum",
            Flag::BwitAtMax => "Bwit output of the IOP retrieval neural net is at its maximum",
            Flag::ApigAtMin => "Apig output of the IOP retrieval neural net is at its minimum",
            Flag::AdetAtMin => "Adet output of the IOP retrieval neural net is at its minimum",
            Flag::AgelbAtMin => "Agelb output of the IOP retrieval neural net is at its minimum",
            Flag::BpartAtMin => "Bpart output of the IOP retrieval neural net is at its minimum",
            Flag::BwitAtMin => "Bwit output of the IOP retrieval neural net is at its minimum",
            Flag::RhowOos => "The Rhow input spectrum to the IOP neural net is probably not within the training range of the neural net",
            Flag::Kd489Oor => "Kd489 is out of range",
            Flag::KdminOor => "Kdmin is out of range",
            Flag::Kd489AtMax => "Kd489 is at maximum",
            Flag::KdminAtMax => "Kdmin is at maximum",
            Flag::ValidPe => "The operator's pixel valid expression",
        }
    }
}

/// Per-pixel quality word. Bits 0 to 19 are set by the pipeline, bit 31 mirrors
/// the caller's valid-pixel predicate.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct QualityFlags(u32);

impl QualityFlags {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn set(&mut self, flag: Flag, on: bool) {
        if on {
            self.0 |= flag.bit();
        } else {
            self.0 &= !flag.bit();
        }
    }

    pub fn contains(self, flag: Flag) -> bool {
        self.0 & flag.bit() != 0
    }

    /// Raised flags in bit order, excluding `Valid_PE`.
    pub fn raised(self) -> impl Iterator<Item = Flag> {
        Flag::ALL
            .into_iter()
            .filter(move |&f| f != Flag::ValidPe && self.contains(f))
    }

    pub fn is_clean(self) -> bool {
        self.raised().next().is_none()
    }
}

impl fmt::Display for QualityFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.raised().map(Flag::name).collect();
        if names.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", names.join("|"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_layout() {
        assert_eq!(Flag::RtosaOos.bit(), 1);
        assert_eq!(Flag::CloudRisk.bit(), 1 << 3);
        assert_eq!(Flag::BwitAtMin.bit(), 1 << 14);
        assert_eq!(Flag::KdminAtMax.bit(), 1 << 19);
        assert_eq!(Flag::ValidPe.bit(), 1 << 31);

        let pipeline_bits: Vec<u32> = Flag::ALL[..20].iter().map(|&f| f as u32).collect();
        assert_eq!(pipeline_bits, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_set_and_clear() {
        let mut flags = QualityFlags::empty();
        flags.set(Flag::IopOor, true);
        flags.set(Flag::ValidPe, true);
        assert!(flags.contains(Flag::IopOor));
        assert_eq!(flags.bits(), (1 << 4) | (1 << 31));

        flags.set(Flag::IopOor, false);
        assert!(flags.is_clean());
        assert!(flags.contains(Flag::ValidPe));
    }

    #[test]
    fn test_display_lists_raised_flags() {
        let flags = QualityFlags::from_bits(Flag::RtosaOor.bit() | Flag::Kd489AtMax.bit() | Flag::ValidPe.bit());
        assert_eq!(flags.to_string(), "Rtosa_OOR|Kd489_at_max");
        assert_eq!(QualityFlags::empty().to_string(), "none");
    }
}
