use deku::prelude::*;
use serde::Serialize;
use std::fmt;

use super::{AddressQualifier, Position};

/**
 * ## State Vector element (DO-282 2.2.4.5.2)
 *
 * Bytes 4..17 of an ADS-B MDB, present for type codes 0 through 10:
 *
 * | LAT | LON | ALTT | ALT | NIC | A/G | R | velocity/movement | LINK |
 * | --- | --- | ---- | --- | --- | --- | - | ----------------- | ---- |
 * | 23  | 24  |  1   | 12  |  4  |  2  | 1 |        33         |  4   |
 *
 * The 33 movement bits split differently for airborne targets (N/S and
 * E/W velocity components plus vertical rate) and for targets on the
 * ground (ground speed, track/heading, airframe dimensions).
 */

#[derive(Debug, PartialEq, Serialize, DekuRead, Clone)]
#[deku(ctx = "qualifier: AddressQualifier")]
pub struct StateVector {
    #[deku(bits = "23", endian = "big")]
    #[serde(skip)]
    pub raw_lat: u32,

    #[deku(bits = "24", endian = "big")]
    #[serde(skip)]
    pub raw_lon: u32,

    /// Source of the primary altitude, bit 0 of byte 9
    pub altitude_type: AltitudeType,

    #[deku(
        bits = "12",
        endian = "big",
        map = "|raw: u16| -> Result<_, DekuError> {
            if raw == 0 { Ok(None) } else { Ok(Some((raw as i32 - 1) * 25 - 1000)) }
        }"
    )]
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Altitude in feet, 25 ft resolution from -1000 ft; zero means
    /// unavailable
    pub altitude: Option<i32>,

    #[deku(bits = "4")]
    #[serde(rename = "NIC")]
    /// Navigation Integrity Category, the containment radius of the
    /// reported position
    pub nic: u8,

    #[deku(skip, default = "decode_position(*raw_lat, *raw_lon, *nic)")]
    #[serde(flatten)]
    /// A position report of all zeroes (with NIC 0) means unavailable
    pub position: Option<Position>,

    #[deku(bits = "2")]
    #[serde(skip)]
    pub ag: u8,

    #[deku(skip, default = "AirGroundState::from_bits(*ag)")]
    pub airground_state: AirGroundState,

    #[deku(bits = "1")]
    #[serde(skip)]
    pub reserved: u8,

    #[deku(ctx = "*ag")]
    #[serde(flatten)]
    pub movement: Movement,

    #[deku(reader = "read_link_status(deku::reader, qualifier)")]
    #[serde(flatten)]
    pub link: LinkStatus,
}

fn decode_position(raw_lat: u32, raw_lon: u32, nic: u8) -> Option<Position> {
    if nic == 0 && raw_lat == 0 && raw_lon == 0 {
        None
    } else {
        Some(Position::from_raw(raw_lat, raw_lon))
    }
}

#[derive(Debug, PartialEq, Eq, Serialize, DekuRead, Copy, Clone)]
#[deku(id_type = "u8", bits = "1")]
#[repr(u8)]
#[serde(rename_all = "snake_case")]
pub enum AltitudeType {
    Barometric = 0,
    Geometric = 1,
}

impl AltitudeType {
    /// The auxiliary state vector reads the same bit with the opposite
    /// sense
    pub(crate) fn flipped(self) -> Self {
        match self {
            Self::Barometric => Self::Geometric,
            Self::Geometric => Self::Barometric,
        }
    }
}

impl fmt::Display for AltitudeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Barometric => "barometric",
                Self::Geometric => "geometric",
            }
        )
    }
}

#[derive(Debug, PartialEq, Eq, Serialize, Copy, Clone)]
#[serde(rename_all = "snake_case")]
pub enum AirGroundState {
    AirborneSubsonic,
    AirborneSupersonic,
    Ground,
    Reserved,
}

impl AirGroundState {
    fn from_bits(ag: u8) -> Self {
        match ag & 0x03 {
            0 => Self::AirborneSubsonic,
            1 => Self::AirborneSupersonic,
            2 => Self::Ground,
            _ => Self::Reserved,
        }
    }
}

impl fmt::Display for AirGroundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::AirborneSubsonic => "airborne, subsonic",
                Self::AirborneSupersonic => "airborne, supersonic",
                Self::Ground => "on ground",
                Self::Reserved => "reserved",
            }
        )
    }
}

/// The 33 movement bits, keyed on the air/ground state
#[derive(Debug, PartialEq, Serialize, DekuRead, Clone)]
#[deku(ctx = "ag: u8", id = "ag")]
#[serde(untagged)]
pub enum Movement {
    #[deku(id_pat = "0..=1")]
    Airborne(#[deku(ctx = "ag")] AirborneMovement),

    #[deku(id = "2")]
    Ground(GroundMovement),

    #[deku(id_pat = "_")]
    Reserved {
        #[deku(bits = "33", endian = "big")]
        #[serde(skip)]
        raw: u64,
    },
}

#[derive(Debug, PartialEq, Serialize, DekuRead, Clone)]
#[deku(ctx = "ag: u8")]
pub struct AirborneMovement {
    #[deku(reader = "read_component(deku::reader, ag)")]
    #[serde(skip_serializing_if = "Option::is_none")]
    /// North/south velocity in kt, positive northbound
    pub ns_vel: Option<i32>,

    #[deku(reader = "read_component(deku::reader, ag)")]
    #[serde(skip_serializing_if = "Option::is_none")]
    /// East/west velocity in kt, positive eastbound
    pub ew_vel: Option<i32>,

    #[deku(skip, default = "track_angle(*ns_vel, *ew_vel)")]
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Ground track in degrees from true north, from the two velocity
    /// components; indeterminate when both are zero
    pub track: Option<u16>,

    #[deku(skip, default = "ground_speed(*ns_vel, *ew_vel)")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<u16>,

    pub vrate_source: VerticalRateSource,

    #[serde(skip)]
    pub vrate_sign: Sign,

    #[deku(
        bits = "9",
        endian = "big",
        map = "|raw: u16| -> Result<_, DekuError> {
            if raw == 0 { Ok(None) }
            else { Ok(Some(vrate_sign.value() * (raw as i32 - 1) * 64)) }
        }"
    )]
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Vertical rate in ft/min, 64 ft/min resolution
    pub vertical_rate: Option<i32>,
}

/// An 11-bit velocity component: sign, then magnitude in kt offset by
/// one; zero magnitude means unavailable. Supersonic frames scale by 4.
fn read_component<R: deku::no_std_io::Read + deku::no_std_io::Seek>(
    reader: &mut Reader<R>,
    ag: u8,
) -> Result<Option<i32>, DekuError> {
    let raw = u16::from_reader_with_ctx(
        reader,
        (deku::ctx::Endian::Big, deku::ctx::BitSize(11)),
    )?;
    let magnitude = raw & 0x3ff;
    if magnitude == 0 {
        return Ok(None);
    }
    let mut value = magnitude as i32 - 1;
    if ag == 1 {
        value *= 4;
    }
    if raw & 0x400 != 0 {
        value = -value;
    }
    Ok(Some(value))
}

fn track_angle(ns_vel: Option<i32>, ew_vel: Option<i32>) -> Option<u16> {
    match (ns_vel, ew_vel) {
        (Some(ns), Some(ew)) if ns != 0 || ew != 0 => {
            let angle = libm::atan2(ns as f64, ew as f64) * 180.0
                / std::f64::consts::PI;
            Some((360.0 + 90.0 - angle) as u16 % 360)
        }
        _ => None,
    }
}

fn ground_speed(ns_vel: Option<i32>, ew_vel: Option<i32>) -> Option<u16> {
    match (ns_vel, ew_vel) {
        (Some(ns), Some(ew)) => {
            Some(libm::sqrt((ns * ns + ew * ew) as f64) as u16)
        }
        _ => None,
    }
}

#[derive(Debug, PartialEq, DekuRead, Copy, Clone)]
#[deku(id_type = "u8", bits = "1")]
#[repr(u8)]
pub enum Sign {
    Positive = 0,
    Negative = 1,
}

impl Sign {
    #[must_use]
    pub fn value(&self) -> i32 {
        match self {
            Self::Positive => 1,
            Self::Negative => -1,
        }
    }
}

#[derive(Debug, PartialEq, Serialize, DekuRead, Copy, Clone)]
#[deku(id_type = "u8", bits = "1")]
#[repr(u8)]
#[serde(rename_all = "snake_case")]
pub enum VerticalRateSource {
    Geometric = 0,
    Barometric = 1,
}

impl fmt::Display for VerticalRateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Geometric => "geometric",
                Self::Barometric => "barometric",
            }
        )
    }
}

#[derive(Debug, PartialEq, Serialize, DekuRead, Clone)]
pub struct GroundMovement {
    #[deku(
        bits = "11",
        endian = "big",
        map = "|raw: u16| -> Result<_, DekuError> {
            if raw == 0 { Ok(None) } else { Ok(Some((raw & 0x3ff).saturating_sub(1))) }
        }"
    )]
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Ground speed in kt
    pub speed: Option<u16>,

    #[deku(reader = "read_ground_track(deku::reader)")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track: Option<GroundTrack>,

    #[deku(
        bits = "4",
        map = "|index: u8| -> Result<_, DekuError> { Ok(Dimensions::from_index(index)) }"
    )]
    #[serde(flatten)]
    /// Airframe length and width from the 16-entry dimension table
    pub dimensions: Dimensions,

    #[deku(bits = "1")]
    /// Whether the position reference point offset is applied
    pub position_offset: bool,

    #[deku(bits = "6")]
    #[serde(skip)]
    pub reserved: u8,
}

/// An 11-bit ground track field: 2 bits of type, 9 bits of angle in
/// 360/512 degree steps
fn read_ground_track<R: deku::no_std_io::Read + deku::no_std_io::Seek>(
    reader: &mut Reader<R>,
) -> Result<Option<GroundTrack>, DekuError> {
    let raw = u16::from_reader_with_ctx(
        reader,
        (deku::ctx::Endian::Big, deku::ctx::BitSize(11)),
    )?;
    let kind = match (raw >> 9) & 0x03 {
        1 => TrackType::Track,
        2 => TrackType::MagneticHeading,
        3 => TrackType::TrueHeading,
        _ => return Ok(None),
    };
    Ok(Some(GroundTrack {
        angle: ((raw as u32 & 0x1ff) * 360 / 512) as u16,
        kind,
    }))
}

#[derive(Debug, PartialEq, Eq, Serialize, Copy, Clone)]
pub struct GroundTrack {
    /// Degrees from north
    pub angle: u16,
    pub kind: TrackType,
}

#[derive(Debug, PartialEq, Eq, Serialize, Copy, Clone)]
#[serde(rename_all = "snake_case")]
pub enum TrackType {
    Track,
    MagneticHeading,
    TrueHeading,
}

#[derive(Debug, PartialEq, Serialize, Copy, Clone)]
pub struct Dimensions {
    /// Airframe length in metres
    pub length: f32,
    /// Airframe width in metres
    pub width: f32,
}

const WIDTHS: [f32; 16] = [
    11.5, 23.0, 28.5, 34.0, 33.0, 38.0, 39.5, 45.0, 45.0, 52.0, 59.5, 67.0,
    72.5, 80.0, 80.0, 90.0,
];

impl Dimensions {
    fn from_index(index: u8) -> Self {
        Dimensions {
            length: 15.0 + 10.0 * (index & 0x07) as f32,
            width: WIDTHS[(index & 0x0f) as usize],
        }
    }
}

/// The trailing 4 bits of the state vector: UTC coupling for reports
/// from the target itself, the site identifier for TIS-B rebroadcasts
#[derive(Debug, PartialEq, Eq, Serialize, Copy, Clone)]
pub struct LinkStatus {
    pub utc_coupled: bool,
    pub tisb_site_id: u8,
}

fn read_link_status<R: deku::no_std_io::Read + deku::no_std_io::Seek>(
    reader: &mut Reader<R>,
    qualifier: AddressQualifier,
) -> Result<LinkStatus, DekuError> {
    let nibble = u8::from_reader_with_ctx(
        reader,
        (deku::ctx::Endian::Big, deku::ctx::BitSize(4)),
    )?;
    Ok(if qualifier.is_tisb() {
        LinkStatus {
            utc_coupled: false,
            tisb_site_id: nibble,
        }
    } else {
        LinkStatus {
            utc_coupled: nibble & 0x08 != 0,
            tisb_site_id: 0,
        }
    })
}

impl fmt::Display for StateVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SV:")?;
        writeln!(f, " NIC:               {}", self.nic)?;
        if let Some(position) = &self.position {
            writeln!(f, " Latitude:          {:+.4}", position.latitude)?;
            writeln!(f, " Longitude:         {:+.4}", position.longitude)?;
        }
        if let Some(altitude) = self.altitude {
            writeln!(
                f,
                " Altitude:          {} ft ({})",
                altitude, self.altitude_type
            )?;
        }
        writeln!(f, " Air/Ground:        {}", self.airground_state)?;
        match &self.movement {
            Movement::Airborne(airborne) => write!(f, "{airborne}")?,
            Movement::Ground(ground) => write!(f, "{ground}")?,
            Movement::Reserved { .. } => (),
        }
        writeln!(
            f,
            " UTC coupling:      {}",
            if self.link.utc_coupled { "yes" } else { "no" }
        )?;
        writeln!(f, " TIS-B site ID:     {}", self.link.tisb_site_id)?;
        Ok(())
    }
}

impl fmt::Display for AirborneMovement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ns_vel) = self.ns_vel {
            writeln!(f, " N/S velocity:      {ns_vel} kt")?;
        }
        if let Some(ew_vel) = self.ew_vel {
            writeln!(f, " E/W velocity:      {ew_vel} kt")?;
        }
        if let Some(track) = self.track {
            writeln!(f, " Track:             {track}")?;
        }
        if let Some(speed) = self.speed {
            writeln!(f, " Speed:             {speed} kt")?;
        }
        if let Some(vertical_rate) = self.vertical_rate {
            writeln!(
                f,
                " Vertical rate:     {} ft/min ({})",
                vertical_rate, self.vrate_source
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for GroundMovement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(speed) = self.speed {
            writeln!(f, " Speed:             {speed} kt")?;
        }
        if let Some(track) = &self.track {
            match track.kind {
                TrackType::Track => {
                    writeln!(f, " Ground track:      {}", track.angle)?
                }
                TrackType::MagneticHeading => writeln!(
                    f,
                    " Ground heading:    {} (magnetic)",
                    track.angle
                )?,
                TrackType::TrueHeading => {
                    writeln!(f, " Ground heading:    {} (true)", track.angle)?
                }
            }
        }
        writeln!(
            f,
            " Dimensions:        {:.1}m L x {:.1}m W{}",
            self.dimensions.length,
            self.dimensions.width,
            if self.position_offset {
                " (position offset applied)"
            } else {
                ""
            }
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::AdsbMdb;
    use approx::assert_relative_eq;
    use hexlit::hex;

    fn state_vector(bytes: &[u8]) -> StateVector {
        let (_, mdb) = AdsbMdb::from_bytes((bytes, 0)).unwrap();
        mdb.sv.unwrap()
    }

    #[test]
    fn test_airborne_state_vector() {
        let bytes = hex!("00abcdef4000018000000f18019664c0b800");
        let sv = state_vector(&bytes);
        let position = sv.position.unwrap();
        assert_relative_eq!(position.latitude, 45.0, max_relative = 1e-9);
        assert_relative_eq!(position.longitude, -90.0, max_relative = 1e-9);
        assert_eq!(sv.altitude, Some(5000));
        assert_eq!(sv.altitude_type, AltitudeType::Barometric);
        assert_eq!(sv.nic, 8);
        assert_eq!(sv.airground_state, AirGroundState::AirborneSubsonic);
        let Movement::Airborne(movement) = &sv.movement else {
            unreachable!()
        };
        assert_eq!(movement.ns_vel, Some(100));
        assert_eq!(movement.ew_vel, Some(-200));
        assert_eq!(movement.track, Some(296));
        assert_eq!(movement.speed, Some(223));
        assert_eq!(movement.vertical_rate, Some(640));
        assert_eq!(movement.vrate_source, VerticalRateSource::Barometric);
        assert!(sv.link.utc_coupled);
        assert_eq!(sv.link.tisb_site_id, 0);
    }

    #[test]
    fn test_supersonic_scaling() {
        let mut bytes = hex!("00abcdef4000018000000f18019664c0b800");
        bytes[12] |= 0x40; // air/ground state 1
        let sv = state_vector(&bytes);
        assert_eq!(sv.airground_state, AirGroundState::AirborneSupersonic);
        let Movement::Airborne(movement) = &sv.movement else {
            unreachable!()
        };
        assert_eq!(movement.ns_vel, Some(400));
        assert_eq!(movement.ew_vel, Some(-800));
    }

    #[test]
    fn test_position_unavailable() {
        // latitude, longitude and NIC all zero
        let bytes = hex!("00abcdef0000000000000000019664c0b800");
        let sv = state_vector(&bytes);
        assert!(sv.position.is_none());
        assert!(sv.altitude.is_none());
    }

    #[test]
    fn test_latitude_quadrant_folding() {
        // raw latitude 0x400000 is exactly 90 degrees
        let bytes = hex!("00abcdef8000000000000f18019664c0b800");
        let sv = state_vector(&bytes);
        assert_relative_eq!(
            sv.position.unwrap().latitude,
            90.0,
            max_relative = 1e-9
        );
        // one step further folds into the southern hemisphere
        let bytes = hex!("00abcdef8000020000000f18019664c0b800");
        let sv = state_vector(&bytes);
        assert_relative_eq!(
            sv.position.unwrap().latitude,
            -90.0 + 360.0 / 16_777_216.0,
            max_relative = 1e-9
        );
    }

    #[test]
    fn test_altitude_extremes() {
        // raw altitude 1 is the floor, -1000 ft
        let mut bytes = hex!("00abcdef4000018000000f18019664c0b800");
        bytes[10] = 0x00;
        bytes[11] = 0x18;
        let sv = state_vector(&bytes);
        assert_eq!(sv.altitude, Some(-1000));
        // raw altitude 0xfff is the ceiling
        bytes[10] = 0xff;
        bytes[11] = 0xf8;
        let sv = state_vector(&bytes);
        assert_eq!(sv.altitude, Some((0xfff - 1) * 25 - 1000));
    }

    #[test]
    fn test_ground_movement() {
        // on ground, speed 35 kt, true track 180°, dimension index 3
        let mut bytes = hex!("00abcdef4000018000000f18019664c0b800");
        bytes[12] = 0x80 | 0x00 | ((36 >> 6) & 0x1f); // gs raw = 36
        bytes[13] = ((36 & 0x3f) << 2) as u8 | 0x01; // track type 01
        bytes[14] = 0x80; // 9-bit angle 256 = 180 degrees
        bytes[15] = 0x18 | 0x04; // dimension index 3, offset applied
        let sv = state_vector(&bytes);
        assert_eq!(sv.airground_state, AirGroundState::Ground);
        let Movement::Ground(movement) = &sv.movement else {
            unreachable!()
        };
        assert_eq!(movement.speed, Some(35));
        let track = movement.track.unwrap();
        assert_eq!(track.kind, TrackType::Track);
        assert_eq!(track.angle, 180);
        assert_eq!(movement.dimensions.length, 45.0);
        assert_eq!(movement.dimensions.width, 34.0);
        assert!(movement.position_offset);
    }

    #[test]
    fn test_tisb_site_id() {
        let mut bytes = hex!("00abcdef4000018000000f18019664c0b800");
        bytes[0] = 0x02; // address qualifier 2, rebroadcast by TIS-B
        bytes[16] = 0xb5; // low nibble 5
        let sv = state_vector(&bytes);
        assert!(!sv.link.utc_coupled);
        assert_eq!(sv.link.tisb_site_id, 5);
    }

    #[test]
    fn test_track_angle_cardinal_points() {
        assert_eq!(track_angle(Some(100), Some(0)), Some(0));
        assert_eq!(track_angle(Some(0), Some(100)), Some(90));
        assert_eq!(track_angle(Some(-100), Some(0)), Some(180));
        assert_eq!(track_angle(Some(0), Some(-100)), Some(270));
        assert_eq!(track_angle(Some(0), Some(0)), None);
        assert_eq!(track_angle(None, Some(10)), None);
    }

    #[test]
    fn test_format_airborne() {
        let bytes = hex!("00abcdef4000018000000f18019664c0b800");
        let (_, mdb) = AdsbMdb::from_bytes((&bytes, 0)).unwrap();
        assert_eq!(
            format!("{mdb}"),
            r#"HDR:
 MDB Type:          0
 Address:           abcdef (ICAO address via ADS-B)
SV:
 NIC:               8
 Latitude:          +45.0000
 Longitude:         -90.0000
 Altitude:          5000 ft (barometric)
 Air/Ground:        airborne, subsonic
 N/S velocity:      100 kt
 E/W velocity:      -200 kt
 Track:             296
 Speed:             223 kt
 Vertical rate:     640 ft/min (barometric)
 UTC coupling:      yes
 TIS-B site ID:     0
"#
        );
    }
}
