//! Wire format shared with the MCU firmware.
//!
//! Inbound traffic is single command bytes. Each accepted sample request is
//! answered with a two-byte frame: the low eight bits first, then the upper
//! nibble of the 12-bit sample.

/// Start trigger, sent by the MCU when the measure button is pressed.
pub const START_TRIGGER: u8 = b'C';
/// Sample request, sent by the MCU once per sampling tick while acquiring.
pub const SAMPLE_REQUEST: u8 = b'R';

pub const FRAME_LEN: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    RequestSample,
    Unknown(u8),
}

impl From<u8> for Command {
    fn from(byte: u8) -> Self {
        match byte {
            START_TRIGGER => Command::Start,
            SAMPLE_REQUEST => Command::RequestSample,
            other => Command::Unknown(other),
        }
    }
}

impl Command {
    pub fn as_byte(&self) -> u8 {
        match self {
            Command::Start => START_TRIGGER,
            Command::RequestSample => SAMPLE_REQUEST,
            Command::Unknown(b) => *b,
        }
    }
}

pub fn encode_sample(value: u16) -> [u8; FRAME_LEN] {
    [(value & 0xFF) as u8, ((value >> 8) & 0x0F) as u8]
}

pub fn decode_sample(frame: [u8; FRAME_LEN]) -> u16 {
    frame[0] as u16 | ((frame[1] as u16) << 8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_bytes() {
        assert_eq!(Command::from(0x43), Command::Start);
        assert_eq!(Command::from(0x52), Command::RequestSample);
        assert_eq!(Command::from(b'c'), Command::Unknown(b'c'));
        assert_eq!(Command::RequestSample.as_byte(), 0x52);
    }

    #[test]
    fn frame_layout_is_low_byte_first() {
        assert_eq!(encode_sample(0x0ABC), [0xBC, 0x0A]);
        assert_eq!(encode_sample(0), [0, 0]);
        assert_eq!(encode_sample(4095), [0xFF, 0x0F]);
    }

    #[test]
    fn every_twelve_bit_value_survives_the_wire() {
        for v in 0..=4095u16 {
            let frame = encode_sample(v);
            assert!(frame[1] <= 0x0F);
            assert_eq!(decode_sample(frame), v);
        }
    }

    #[test]
    fn upper_nibble_is_masked_off() {
        assert_eq!(encode_sample(0xF123), [0x23, 0x01]);
    }
}
