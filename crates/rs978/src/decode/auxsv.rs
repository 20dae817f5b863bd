use deku::prelude::*;
use serde::Serialize;
use std::fmt;

use super::sv::AltitudeType;

/**
 * ## Auxiliary State Vector element (DO-282 2.2.4.5.5)
 *
 * Bytes 29..31 of a Long ADS-B MDB, present for type codes 1, 2, 5 and
 * 6: the secondary altitude, of the opposite type of the primary one.
 * The type is taken from the same byte-9 bit as the primary altitude,
 * with the sense reversed, and is passed in as context by the caller.
 */

#[derive(Debug, PartialEq, Serialize, DekuRead, Clone)]
#[deku(ctx = "sec_type: AltitudeType")]
pub struct AuxStateVector {
    #[deku(
        bits = "12",
        endian = "big",
        map = "|raw: u16| -> Result<_, DekuError> {
            if raw == 0 { Ok(None) } else { Ok(Some((raw as i32 - 1) * 25 - 1000)) }
        }"
    )]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altitude: Option<i32>,

    #[deku(bits = "4")]
    #[serde(skip)]
    pub reserved: u8,

    #[deku(skip, default = "sec_type")]
    pub altitude_type: AltitudeType,
}

impl fmt::Display for AuxStateVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "AUXSV:")?;
        match self.altitude {
            Some(altitude) => writeln!(
                f,
                " Sec. altitude:     {} ft ({})",
                altitude, self.altitude_type
            )?,
            None => writeln!(f, " Sec. altitude:     unavailable")?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::AdsbMdb;
    use hexlit::hex;

    #[test]
    fn test_secondary_altitude() {
        let bytes =
            hex!("08abcdef4000018000000f18019664c0b809d90d024a840b98a58e00000f90000000");
        let (_, mdb) = AdsbMdb::from_bytes((&bytes, 0)).unwrap();
        let auxsv = mdb.auxsv.unwrap();
        assert_eq!(auxsv.altitude, Some(5200));
        // primary is barometric, so the secondary is geometric
        assert_eq!(auxsv.altitude_type, AltitudeType::Geometric);
    }

    #[test]
    fn test_type_bit_reversed_sense() {
        let mut bytes =
            hex!("08abcdef4000018000000f18019664c0b809d90d024a840b98a58e00000f90000000");
        bytes[9] |= 0x01; // primary altitude becomes geometric
        let (_, mdb) = AdsbMdb::from_bytes((&bytes, 0)).unwrap();
        assert_eq!(
            mdb.sv.unwrap().altitude_type,
            AltitudeType::Geometric
        );
        assert_eq!(
            mdb.auxsv.unwrap().altitude_type,
            AltitudeType::Barometric
        );
    }

    #[test]
    fn test_unavailable() {
        let mut bytes =
            hex!("08abcdef4000018000000f18019664c0b809d90d024a840b98a58e00000f90000000");
        bytes[29] = 0x00;
        bytes[30] = 0x00;
        let (_, mdb) = AdsbMdb::from_bytes((&bytes, 0)).unwrap();
        let auxsv = mdb.auxsv.unwrap();
        assert_eq!(auxsv.altitude, None);
        assert_eq!(
            format!("{auxsv}"),
            "AUXSV:\n Sec. altitude:     unavailable\n"
        );
    }
}
