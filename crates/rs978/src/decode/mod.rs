pub mod auxsv;
pub mod ms;
pub mod sv;
pub mod uplink;

use auxsv::AuxStateVector;
use deku::prelude::*;
use ms::ModeStatus;
use serde::ser::{Serialize, Serializer};
use std::fmt;
use sv::StateVector;
use uplink::UplinkMdb;

use crate::demod::{Direction, RawFrame};

/**
 * The payload of every UAT transmission is a Message Data Block (MDB).
 *
 * ADS-B (downlink) MDBs start with a 4-byte header whose 5-bit type code
 * determines which of the three structured elements follow:
 *
 * | mdb_type | SV  | MS  | AuxSV |
 * | -------- | --- | --- | ----- |
 * | 0        |  ✓  |     |       |
 * | 1        |  ✓  |  ✓  |   ✓   |
 * | 2        |  ✓  |     |   ✓   |
 * | 3        |  ✓  |  ✓  |       |
 * | 4        |  ✓  |     |       |
 * | 5, 6     |  ✓  |     |   ✓   |
 * | 7..=10   |  ✓  |     |       |
 * | 11..=31  |     |     |       |
 *
 * Uplink (FIS-B) MDBs carry ground-station coordinates and a train of
 * variable-length information frames, see [`UplinkMdb`].
 */

/// A decoded UAT message, either direction of the 978 MHz channel
#[derive(Debug, PartialEq, serde::Serialize, Clone)]
#[serde(untagged)]
pub enum UatMessage {
    Adsb(AdsbMdb),
    Uplink(UplinkMdb),
}

impl UatMessage {
    /// Decode the structured form of an error-corrected frame
    pub fn from_frame(frame: &RawFrame) -> Result<UatMessage, DekuError> {
        match frame.direction {
            Direction::Downlink => {
                let (_, mdb) = AdsbMdb::from_bytes((&frame.data, 0))?;
                Ok(UatMessage::Adsb(mdb))
            }
            Direction::Uplink => {
                let (_, mdb) = UplinkMdb::from_bytes((&frame.data, 0))?;
                Ok(UatMessage::Uplink(mdb))
            }
        }
    }
}

impl fmt::Display for UatMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UatMessage::Adsb(mdb) => write!(f, "{mdb}"),
            UatMessage::Uplink(mdb) => write!(f, "{mdb}"),
        }
    }
}

/// An ADS-B Message Data Block: the header plus whichever structured
/// elements the type code announces
#[derive(Debug, PartialEq, serde::Serialize, DekuRead, Clone)]
pub struct AdsbMdb {
    #[serde(flatten)]
    pub header: Header,

    #[deku(reader = "read_sv(deku::reader, header.mdb_type, header.address_qualifier)")]
    #[serde(rename = "state_vector", skip_serializing_if = "Option::is_none")]
    pub sv: Option<StateVector>,

    #[deku(reader = "read_ms(deku::reader, header.mdb_type)")]
    #[serde(rename = "mode_status", skip_serializing_if = "Option::is_none")]
    pub ms: Option<ModeStatus>,

    #[deku(reader = "read_auxsv(deku::reader, header.mdb_type, sv)")]
    #[serde(rename = "aux_state_vector", skip_serializing_if = "Option::is_none")]
    pub auxsv: Option<AuxStateVector>,
}

fn read_sv<R: deku::no_std_io::Read + deku::no_std_io::Seek>(
    reader: &mut Reader<R>,
    mdb_type: u8,
    qualifier: AddressQualifier,
) -> Result<Option<StateVector>, DekuError> {
    if mdb_type > 10 {
        return Ok(None);
    }
    Ok(Some(StateVector::from_reader_with_ctx(reader, qualifier)?))
}

fn read_ms<R: deku::no_std_io::Read + deku::no_std_io::Seek>(
    reader: &mut Reader<R>,
    mdb_type: u8,
) -> Result<Option<ModeStatus>, DekuError> {
    if mdb_type != 1 && mdb_type != 3 {
        return Ok(None);
    }
    Ok(Some(ModeStatus::from_reader_with_ctx(reader, ())?))
}

fn read_auxsv<R: deku::no_std_io::Read + deku::no_std_io::Seek>(
    reader: &mut Reader<R>,
    mdb_type: u8,
    sv: &Option<StateVector>,
) -> Result<Option<AuxStateVector>, DekuError> {
    // the auxiliary element sits at byte 29, after reserved padding
    let padding = match mdb_type {
        1 => 2,
        2 | 5 | 6 => 12,
        _ => return Ok(None),
    };
    for _ in 0..padding {
        let _ = u8::from_reader_with_ctx(
            reader,
            (deku::ctx::Endian::Big, deku::ctx::BitSize(8)),
        )?;
    }
    let Some(sv) = sv else { return Ok(None) };
    // the secondary altitude reads the byte-9 type bit with the
    // opposite sense of the primary one
    Ok(Some(AuxStateVector::from_reader_with_ctx(
        reader,
        sv.altitude_type.flipped(),
    )?))
}

impl fmt::Display for AdsbMdb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header)?;
        if let Some(sv) = &self.sv {
            write!(f, "{sv}")?;
        }
        if let Some(ms) = &self.ms {
            write!(f, "{ms}")?;
        }
        if let Some(auxsv) = &self.auxsv {
            write!(f, "{auxsv}")?;
        }
        Ok(())
    }
}

/// The 4-byte MDB header: type code, address qualifier, 24-bit address
#[derive(Debug, PartialEq, serde::Serialize, DekuRead, Clone)]
pub struct Header {
    #[deku(bits = "5")]
    pub mdb_type: u8,
    pub address_qualifier: AddressQualifier,
    pub address: Address,
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "HDR:")?;
        writeln!(f, " MDB Type:          {}", self.mdb_type)?;
        writeln!(
            f,
            " Address:           {} ({})",
            self.address, self.address_qualifier
        )?;
        Ok(())
    }
}

/// What the 24-bit address refers to (DO-282 2.2.4.5.1.2)
#[derive(Debug, PartialEq, Eq, serde::Serialize, DekuRead, Copy, Clone)]
#[deku(id_type = "u8", bits = "3")]
#[repr(u8)]
#[serde(rename_all = "snake_case")]
pub enum AddressQualifier {
    /// ICAO address transmitted by the aircraft itself
    Icao = 0,
    /// Reserved for national use
    NationalUse = 1,
    /// ICAO address rebroadcast by a TIS-B ground station
    TisbIcao = 2,
    /// TIS-B track file address for a target without a known address
    TisbTrackFile = 3,
    /// Surface vehicle
    Vehicle = 4,
    /// Fixed ADS-B beacon
    FixedBeacon = 5,
    Reserved6 = 6,
    Reserved7 = 7,
}

impl AddressQualifier {
    /// Address qualifiers assigned by ground stations rather than
    /// transmitted by the target itself
    pub fn is_tisb(&self) -> bool {
        matches!(self, Self::TisbIcao | Self::TisbTrackFile)
    }
}

impl fmt::Display for AddressQualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Icao => "ICAO address via ADS-B",
                Self::NationalUse => "reserved (national use)",
                Self::TisbIcao => "ICAO address via TIS-B",
                Self::TisbTrackFile => "TIS-B track file address",
                Self::Vehicle => "Vehicle address",
                Self::FixedBeacon => "Fixed ADS-B Beacon Address",
                Self::Reserved6 => "reserved (6)",
                Self::Reserved7 => "reserved (7)",
            }
        )
    }
}

/// 24-bit address from the MDB header; an ICAO airframe address for
/// most qualifiers
#[derive(PartialEq, Eq, PartialOrd, DekuRead, Hash, Copy, Clone, Ord)]
pub struct Address(#[deku(bits = 24, endian = "big")] pub u32);

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06x}", self.0)?;
        Ok(())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06x}", self.0)?;
        Ok(())
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let address = format!("{:06x}", &self.0);
        serializer.serialize_str(&address)
    }
}

impl core::str::FromStr for Address {
    type Err = core::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let num = u32::from_str_radix(s, 16)?;
        Ok(Self(num))
    }
}

/// A WGS-84 position decoded from the 23+24 bit angular weighted binary
/// encoding
#[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize, Clone, Copy)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    /// Both angles count in units of 360/2²⁴ degrees; latitudes beyond
    /// 90° fold into the southern hemisphere, longitudes beyond 180°
    /// into the western one.
    pub(crate) fn from_raw(raw_lat: u32, raw_lon: u32) -> Self {
        let mut latitude = raw_lat as f64 * 360.0 / 16_777_216.0;
        if latitude > 90.0 {
            latitude -= 180.0;
        }
        let mut longitude = raw_lon as f64 * 360.0 / 16_777_216.0;
        if longitude > 180.0 {
            longitude -= 360.0;
        }
        Position {
            latitude,
            longitude,
        }
    }
}
