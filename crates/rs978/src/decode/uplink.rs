use deku::prelude::*;
use serde::Serialize;
use std::fmt;

use super::Position;

/**
 * ## Uplink Message Data Block (DO-282 2.2.3)
 *
 * The 432-byte payload of an uplink frame, after deinterleaving and
 * per-block error correction. The first eight bytes identify the ground
 * station and its position; the remaining bytes carry a train of
 * variable-length information frames:
 *
 * | length | reserved | type | data         |
 * | ------ | -------- | ---- | ------------ |
 * | 9 bits | 4 bits   | 3    | length bytes |
 *
 * A zero length ends the train. Type 0 information frames are FIS-B
 * APDUs (weather, NOTAMs, ...) and are kept as opaque bytes here:
 * their application-layer decoding belongs to a separate consumer.
 */

/// Offset of the first information frame in the payload
const APP_DATA_START: usize = 8;

/// End of the information frame region
const APP_DATA_END: usize = 422;

#[derive(Debug, PartialEq, Serialize, DekuRead, Clone)]
pub struct UplinkMdb {
    #[deku(bits = "23", endian = "big")]
    #[serde(skip)]
    pub raw_lat: u32,

    #[deku(bits = "24", endian = "big")]
    #[serde(skip)]
    pub raw_lon: u32,

    #[deku(bits = "1")]
    #[serde(skip)]
    pub position_valid: bool,

    #[deku(
        skip,
        default = "if *position_valid { Some(Position::from_raw(*raw_lat, *raw_lon)) } else { None }"
    )]
    #[serde(flatten)]
    /// Position of the transmitting ground station
    pub position: Option<Position>,

    #[deku(bits = "1")]
    pub utc_coupled: bool,

    #[deku(bits = "1")]
    #[serde(skip)]
    pub reserved_a: u8,

    #[deku(bits = "1")]
    pub app_data_valid: bool,

    #[deku(bits = "5")]
    pub slot_id: u8,

    #[deku(bits = "4")]
    pub tisb_site_id: u8,

    #[deku(bits = "4")]
    #[serde(skip)]
    pub reserved_b: u8,

    #[deku(reader = "read_info_frames(deku::reader, *app_data_valid)")]
    pub info_frames: Vec<InfoFrame>,
}

#[derive(Debug, PartialEq, Serialize, Clone)]
pub struct InfoFrame {
    #[serde(rename = "type")]
    pub frame_type: u8,
    #[serde(serialize_with = "crate::demod::as_hex")]
    pub data: Vec<u8>,
}

impl InfoFrame {
    /// FIS-B application protocol data unit
    pub fn is_fisb(&self) -> bool {
        self.frame_type == 0
    }
}

fn read_info_frames<R: deku::no_std_io::Read + deku::no_std_io::Seek>(
    reader: &mut Reader<R>,
    app_data_valid: bool,
) -> Result<Vec<InfoFrame>, DekuError> {
    let mut app_data = [0u8; APP_DATA_END - APP_DATA_START];
    for byte in app_data.iter_mut() {
        *byte = u8::from_reader_with_ctx(
            reader,
            (deku::ctx::Endian::Big, deku::ctx::BitSize(8)),
        )?;
    }
    let mut frames = Vec::new();
    if !app_data_valid {
        return Ok(frames);
    }
    let mut i = 0;
    while i + 2 <= app_data.len() {
        let length =
            ((app_data[i] as usize) << 1) | (app_data[i + 1] >> 7) as usize;
        let frame_type = app_data[i + 1] & 0x07;
        if length == 0 {
            break;
        }
        if i + 2 + length > app_data.len() {
            // length overruns the application data, halt the walk
            break;
        }
        frames.push(InfoFrame {
            frame_type,
            data: app_data[i + 2..i + 2 + length].to_vec(),
        });
        i += length + 2;
    }
    Ok(frames)
}

impl fmt::Display for UplinkMdb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "UPLINK:")?;
        if let Some(position) = &self.position {
            writeln!(f, " GS Latitude:       {:+.4}", position.latitude)?;
            writeln!(f, " GS Longitude:      {:+.4}", position.longitude)?;
        }
        writeln!(
            f,
            " UTC coupled:       {}",
            if self.utc_coupled { "yes" } else { "no" }
        )?;
        writeln!(
            f,
            " App data valid:    {}",
            if self.app_data_valid { "yes" } else { "no" }
        )?;
        writeln!(f, " Slot ID:           {}", self.slot_id)?;
        writeln!(f, " TIS-B site ID:     {}", self.tisb_site_id)?;
        for frame in &self.info_frames {
            writeln!(
                f,
                " Info frame:        type {}, length {}{}",
                frame.frame_type,
                frame.data.len(),
                if frame.is_fisb() { " (FIS-B APDU)" } else { "" }
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use hexlit::hex;

    fn uplink_payload() -> Vec<u8> {
        let mut payload = vec![0u8; 432];
        payload[0] = 0x40; // latitude 0x200000, 45°N
        payload[5] = 0x01; // position valid
        payload[6] = 0x25; // app data valid, slot 5
        payload[7] = 0x30; // TIS-B site 3
        payload[8] = 0x02; // one information frame, length 4, type 0
        payload[10..14].copy_from_slice(&hex!("deadbeef"));
        payload
    }

    #[test]
    fn test_uplink_mdb() {
        let payload = uplink_payload();
        let (_, mdb) = UplinkMdb::from_bytes((&payload, 0)).unwrap();
        let position = mdb.position.unwrap();
        assert_relative_eq!(position.latitude, 45.0, max_relative = 1e-9);
        assert_relative_eq!(position.longitude, 0.0);
        assert!(!mdb.utc_coupled);
        assert!(mdb.app_data_valid);
        assert_eq!(mdb.slot_id, 5);
        assert_eq!(mdb.tisb_site_id, 3);
        assert_eq!(mdb.info_frames.len(), 1);
        assert!(mdb.info_frames[0].is_fisb());
        assert_eq!(mdb.info_frames[0].data, hex!("deadbeef"));
    }

    #[test]
    fn test_position_not_valid() {
        let mut payload = uplink_payload();
        payload[5] = 0x00;
        let (_, mdb) = UplinkMdb::from_bytes((&payload, 0)).unwrap();
        assert!(mdb.position.is_none());
    }

    #[test]
    fn test_app_data_not_valid() {
        let mut payload = uplink_payload();
        payload[6] = 0x05; // same slot, app data flag clear
        let (_, mdb) = UplinkMdb::from_bytes((&payload, 0)).unwrap();
        assert!(mdb.info_frames.is_empty());
    }

    #[test]
    fn test_several_info_frames() {
        let mut payload = uplink_payload();
        // a second frame of type 2 and length 3 right after the first
        payload[14] = 0x01; // length 3, upper 8 bits
        payload[15] = 0x82; // length LSB set, type 2
        payload[16..19].copy_from_slice(&hex!("010203"));
        let (_, mdb) = UplinkMdb::from_bytes((&payload, 0)).unwrap();
        assert_eq!(mdb.info_frames.len(), 2);
        assert_eq!(mdb.info_frames[1].frame_type, 2);
        assert_eq!(mdb.info_frames[1].data, hex!("010203"));
    }

    #[test]
    fn test_overlong_frame_halts_walk() {
        let mut payload = uplink_payload();
        payload[14] = 0xff; // length 510 runs past the application data
        payload[15] = 0x00;
        let (_, mdb) = UplinkMdb::from_bytes((&payload, 0)).unwrap();
        assert_eq!(mdb.info_frames.len(), 1);
    }

    #[test]
    fn test_format() {
        let payload = uplink_payload();
        let (_, mdb) = UplinkMdb::from_bytes((&payload, 0)).unwrap();
        assert_eq!(
            format!("{mdb}"),
            r#"UPLINK:
 GS Latitude:       +45.0000
 GS Longitude:      +0.0000
 UTC coupled:       no
 App data valid:    yes
 Slot ID:           5
 TIS-B site ID:     3
 Info frame:        type 0, length 4 (FIS-B APDU)
"#
        );
    }
}
