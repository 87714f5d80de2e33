use super::{CrcRegisters, XTAL_FREQ, FREQ_DIV_SHIFT};

/// Gaussian filter applied to the GFSK pulse
#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PulseShape {
    #[default]
    Off = 0x00,
    Bt0_3 = 0x08,
    Bt0_5 = 0x09,
    Bt0_7 = 0x0A,
    Bt1_0 = 0x0B,
}

/// GFSK receiver bandwidth (double sideband)
#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GfskBandwidth {
    Bw4800 = 0x1F,
    Bw5800 = 0x17,
    Bw7300 = 0x0F,
    Bw9700 = 0x1E,
    Bw11700 = 0x16,
    Bw14600 = 0x0E,
    Bw19500 = 0x1D,
    Bw23400 = 0x15,
    Bw29300 = 0x0D,
    Bw39000 = 0x1C,
    Bw46900 = 0x14,
    Bw58600 = 0x0C,
    Bw78200 = 0x1B,
    Bw93800 = 0x13,
    #[default]
    Bw117300 = 0x0B,
    Bw156200 = 0x1A,
    Bw187200 = 0x12,
    Bw234300 = 0x0A,
    Bw312000 = 0x19,
    Bw373600 = 0x11,
    Bw467000 = 0x09,
}

/// GFSK modulation params
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GfskModulationParams {
    /// Bit rate in bit/s
    pub bit_rate: u32,
    pub pulse_shape: PulseShape,
    pub bandwidth: GfskBandwidth,
    /// Frequency deviation in Hz
    pub fdev: u32,
}

impl Default for GfskModulationParams {
    fn default() -> Self {
        Self {
            bit_rate: 50_000,
            pulse_shape: PulseShape::Bt0_5,
            bandwidth: GfskBandwidth::Bw117300,
            fdev: 25_000,
        }
    }
}

impl GfskModulationParams {
    /// `round(32 * XTAL_FREQ / bit_rate)`
    pub fn bit_rate_word(&self) -> u32 {
        let bit_rate = self.bit_rate.max(1) as u64;
        ((32 * XTAL_FREQ as u64 + bit_rate / 2) / bit_rate) as u32
    }

    /// `round(fdev / FREQ_STEP)`
    pub fn fdev_word(&self) -> u32 {
        let scaled = (self.fdev as u64) << FREQ_DIV_SHIFT;
        ((scaled + XTAL_FREQ as u64 / 2) / XTAL_FREQ as u64) as u32
    }

    pub(crate) fn as_bytes(&self) -> [u8; 8] {
        let br = self.bit_rate_word().to_be_bytes();
        let fdev = self.fdev_word().to_be_bytes();
        [
            br[1],
            br[2],
            br[3],
            self.pulse_shape as u8,
            self.bandwidth as u8,
            fdev[1],
            fdev[2],
            fdev[3],
        ]
    }
}

/// Preamble detector length
#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PreambleDetector {
    Off = 0x00,
    Bits8 = 0x04,
    #[default]
    Bits16 = 0x05,
    Bits24 = 0x06,
    Bits32 = 0x07,
}

/// Address filtering
#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressComp {
    #[default]
    Off = 0x00,
    Node = 0x01,
    NodeBroadcast = 0x02,
}

/// Length field handling
#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GfskHeader {
    /// Fixed length, known to both sides
    Fixed = 0x00,
    /// Length byte added to the packet
    #[default]
    Variable = 0x01,
}

/// GFSK CRC mode
///
/// `Crc2ByteIbm` and `Crc2ByteCcitt` also load the matching seed and
/// polynomial into the CRC registers.
#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GfskCrc {
    Off = 0x01,
    Crc1Byte = 0x00,
    #[default]
    Crc2Byte = 0x02,
    Crc1ByteInv = 0x04,
    Crc2ByteInv = 0x06,
    Crc2ByteIbm = 0xF1,
    Crc2ByteCcitt = 0xF2,
}

impl GfskCrc {
    /// Byte sent to the chip in the packet params
    pub fn wire_value(self) -> u8 {
        match self {
            Self::Crc2ByteIbm => Self::Crc2Byte as u8,
            Self::Crc2ByteCcitt => Self::Crc2ByteInv as u8,
            other => other as u8,
        }
    }

    pub fn registers(self) -> Option<CrcRegisters> {
        match self {
            Self::Crc2ByteIbm => Some(CrcRegisters {
                seed: 0xFFFF,
                polynomial: 0x8005,
            }),
            Self::Crc2ByteCcitt => Some(CrcRegisters {
                seed: 0x1D0F,
                polynomial: 0x1021,
            }),
            _ => None,
        }
    }
}

/// GFSK packet params
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GfskPacketParams {
    /// Preamble length in bytes
    pub preamble_length: u16,
    pub preamble_detector: PreambleDetector,
    /// Sync word length in bytes, 0 to 8
    pub sync_word_length: u8,
    pub address_comp: AddressComp,
    pub header_type: GfskHeader,
    pub payload_length: u8,
    pub crc: GfskCrc,
    pub whitening: bool,
}

impl Default for GfskPacketParams {
    fn default() -> Self {
        Self {
            preamble_length: 4,
            preamble_detector: PreambleDetector::Bits16,
            sync_word_length: 4,
            address_comp: AddressComp::Off,
            header_type: GfskHeader::Variable,
            payload_length: 0xFF,
            crc: GfskCrc::Crc2Byte,
            whitening: true,
        }
    }
}

impl GfskPacketParams {
    pub(crate) fn as_bytes(&self) -> [u8; 9] {
        let [hi, lo] = (self.preamble_length << 3).to_be_bytes();
        [
            hi,
            lo,
            self.preamble_detector as u8,
            self.sync_word_length.min(8) << 3,
            self.address_comp as u8,
            self.header_type as u8,
            self.payload_length,
            self.crc.wire_value(),
            self.whitening as u8,
        ]
    }
}
