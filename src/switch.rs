//! Six-position rotary switch decoding.
//!
//! Each switch is wired to a PCF8574 expander with pull-ups on P0-P5. A
//! switch resting on a detent pulls exactly one of those pins low. Between
//! detents the wiper touches zero or two contacts, which shows up as any
//! other byte.

/// A decoded switch position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwitchPosition {
    /// The switch rests on detent 1-6.
    Detent(u8),
    /// The wiper is between detents.
    Indeterminate,
}

/// Raw expander bytes for detents 1 through 6 (one pin pulled low each).
const DETENT_PATTERNS: [u8; 6] = [0xFE, 0xFD, 0xFB, 0xF7, 0xEF, 0xDF];

/// Decode a raw expander byte into a switch position.
pub fn decode_position(raw: u8) -> SwitchPosition {
    DETENT_PATTERNS
        .iter()
        .position(|&pattern| pattern == raw)
        .map_or(SwitchPosition::Indeterminate, |idx| {
            SwitchPosition::Detent(idx as u8 + 1)
        })
}

impl SwitchPosition {
    /// Fold this reading into the last known position.
    ///
    /// An indeterminate reading is "no update": the previous position is
    /// returned unchanged.
    pub fn apply_to(self, previous: u8) -> u8 {
        match self {
            SwitchPosition::Detent(position) => position,
            SwitchPosition::Indeterminate => previous,
        }
    }

    /// The detent number, if any.
    pub fn detent(self) -> Option<u8> {
        match self {
            SwitchPosition::Detent(position) => Some(position),
            SwitchPosition::Indeterminate => None,
        }
    }
}

/// A switch's physical wiring: which multiplexer channel and expander
/// address it lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchDevice {
    /// Multiplexer channel (0-7).
    pub channel: u8,
    /// 7-bit PCF8574 address.
    pub address: u8,
}

impl SwitchDevice {
    /// Create a device description.
    pub const fn new(channel: u8, address: u8) -> Self {
        Self { channel, address }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_patterns_map_to_detents() {
        assert_eq!(decode_position(0xFE), SwitchPosition::Detent(1));
        assert_eq!(decode_position(0xFD), SwitchPosition::Detent(2));
        assert_eq!(decode_position(0xFB), SwitchPosition::Detent(3));
        assert_eq!(decode_position(0xF7), SwitchPosition::Detent(4));
        assert_eq!(decode_position(0xEF), SwitchPosition::Detent(5));
        assert_eq!(decode_position(0xDF), SwitchPosition::Detent(6));
    }

    #[test]
    fn test_every_other_byte_is_indeterminate() {
        let detents = (0..=u8::MAX)
            .filter(|&raw| decode_position(raw) != SwitchPosition::Indeterminate)
            .count();
        assert_eq!(detents, 6);

        // no contact, two contacts, upper pins
        assert_eq!(decode_position(0xFF), SwitchPosition::Indeterminate);
        assert_eq!(decode_position(0xFC), SwitchPosition::Indeterminate);
        assert_eq!(decode_position(0xBF), SwitchPosition::Indeterminate);
        assert_eq!(decode_position(0x00), SwitchPosition::Indeterminate);
    }

    #[test]
    fn test_indeterminate_keeps_previous() {
        assert_eq!(SwitchPosition::Indeterminate.apply_to(4), 4);
        assert_eq!(SwitchPosition::Detent(2).apply_to(4), 2);

        let mut stored = 3;
        for raw in [0xFF, 0xFC, 0xEF, 0x00] {
            stored = decode_position(raw).apply_to(stored);
        }
        assert_eq!(stored, 5);
    }
}
