use crate::params::{Param, ParameterSet};
use crate::types::StreamConfig;

/// SCTE-104 data ID in the VANC space.
pub const SCTE104_DID: u16 = 577;
/// SCTE-104 secondary data ID.
pub const SCTE104_SDID: u16 = 263;

/// Ancillary-data parameters (`av_input.cgi`) for SCTE-104 to SCTE-35
/// conversion.
pub fn scte(config: &StreamConfig) -> ParameterSet {
    let ch = config.id;
    let mut set = ParameterSet::new();

    if config.encoding.scte104_to_35_conversion {
        set.push(Param::AncEnable(ch), "on")
            .push(Param::AncDid(ch), SCTE104_DID)
            .push(Param::AncSdid(ch), SCTE104_SDID);
    } else {
        set.push(Param::AncEnable(ch), "off");
    }
    set
}
