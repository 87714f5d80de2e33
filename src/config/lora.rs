/// LoRa spreading factor
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpreadingFactor {
    Sf5 = 0x05,
    Sf6 = 0x06,
    #[default]
    Sf7 = 0x07,
    Sf8 = 0x08,
    Sf9 = 0x09,
    Sf10 = 0x0A,
    Sf11 = 0x0B,
    Sf12 = 0x0C,
}

/// LoRa bandwidth
#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoRaBandwidth {
    Bw7 = 0x00,
    Bw10 = 0x08,
    Bw15 = 0x01,
    Bw20 = 0x09,
    Bw31 = 0x02,
    Bw41 = 0x0A,
    Bw62 = 0x03,
    #[default]
    Bw125 = 0x04,
    Bw250 = 0x05,
    Bw500 = 0x06,
}

/// LoRa coding rate
#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CodingRate {
    #[default]
    Cr4_5 = 0x01,
    Cr4_6 = 0x02,
    Cr4_7 = 0x03,
    Cr4_8 = 0x04,
}

/// Whether low data rate optimization is needed for `bandwidth` and `sf`.
///
/// Required once the symbol time reaches 16.38 ms.
pub fn low_data_rate_optimize(bandwidth: LoRaBandwidth, sf: SpreadingFactor) -> bool {
    use LoRaBandwidth::*;
    use SpreadingFactor::*;
    match bandwidth {
        Bw500 => false,
        Bw250 => sf == Sf12,
        Bw125 => sf >= Sf11,
        Bw62 => sf >= Sf10,
        Bw41 => sf >= Sf9,
        Bw31 | Bw20 | Bw15 | Bw10 | Bw7 => true,
    }
}

/// LoRa modulation params
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LoRaModulationParams {
    pub spreading_factor: SpreadingFactor,
    pub bandwidth: LoRaBandwidth,
    pub coding_rate: CodingRate,
}

impl LoRaModulationParams {
    pub fn low_data_rate_optimize(&self) -> bool {
        low_data_rate_optimize(self.bandwidth, self.spreading_factor)
    }

    pub(crate) fn as_bytes(&self) -> [u8; 4] {
        [
            self.spreading_factor as u8,
            self.bandwidth as u8,
            self.coding_rate as u8,
            self.low_data_rate_optimize() as u8,
        ]
    }
}

/// LoRa header type
#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoRaHeader {
    /// Variable length, header sent
    #[default]
    Explicit = 0x00,
    /// Fixed length, no header
    Implicit = 0x01,
}

/// LoRa packet params
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LoRaPacketParams {
    /// Preamble length in symbols
    pub preamble_length: u16,
    pub header_type: LoRaHeader,
    pub payload_length: u8,
    pub crc_on: bool,
    pub invert_iq: bool,
}

impl Default for LoRaPacketParams {
    fn default() -> Self {
        Self {
            preamble_length: 8,
            header_type: LoRaHeader::Explicit,
            payload_length: 0xFF,
            crc_on: true,
            invert_iq: false,
        }
    }
}

impl LoRaPacketParams {
    pub(crate) fn as_bytes(&self) -> [u8; 6] {
        let [hi, lo] = self.preamble_length.to_be_bytes();
        [
            hi,
            lo,
            self.header_type as u8,
            self.payload_length,
            self.crc_on as u8,
            self.invert_iq as u8,
        ]
    }
}
