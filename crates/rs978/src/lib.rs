#![doc = include_str!("../readme.md")]
pub mod decode;
pub mod demod;
pub mod fec;

pub mod prelude {
    /// This re-export is necessary to decode messages
    pub use deku::prelude::*;

    pub use crate::decode::auxsv::AuxStateVector;
    pub use crate::decode::ms::ModeStatus;
    pub use crate::decode::sv::StateVector;
    pub use crate::decode::uplink::UplinkMdb;
    /// The root structures to decode messages
    pub use crate::decode::{AdsbMdb, Address, AddressQualifier, Header, UatMessage};
    pub use crate::demod::{Demodulator, Direction, RawFrame, SAMPLE_RATE};
}
