//! ### GNSS Commands
//!
//! The GNSS engine and its `AT+QGPSCFG` parameter cluster. Most `"…cfg"`
//! writes are only honored while the engine is powered down, so every
//! QGPSCFG parameter here carries the power toggle: the reconciler sends one
//! `AT+QGPSEND` before the first write of a contiguous run and one
//! `AT+QGPS=1` after the last.

use super::{ParameterSpec, QueryTemplate, SectionSpec, SetTemplate, Toggle};
use crate::codec::Codec;

/// Power bracket for parameters the engine must be stopped to change.
const POWER: Toggle = Toggle {
    disable: "AT+QGPSEND",
    enable: "AT+QGPS=1",
    timeout_ms: 2000,
};

const fn cfg(
    key: &'static str,
    query_cmd: &'static str,
    tag: &'static str,
    codec: Codec,
) -> ParameterSpec {
    ParameterSpec {
        key,
        query: QueryTemplate::Keyed {
            cmd: query_cmd,
            prefix: "+QGPSCFG:",
            tag,
        },
        set: SetTemplate::Keyed {
            cmd: "AT+QGPSCFG=",
            tag,
        },
        codec,
        timeout_ms: 300,
        toggle: Some(POWER),
    }
}

pub const SECTION: SectionSpec = SectionSpec {
    name: "gnss",
    params: &[
        // GNSS power state +QGPS / +QGPSEND
        //
        // Turning the engine on is `AT+QGPS=1`; there is no `AT+QGPS=0`,
        // power-off is its own command.
        ParameterSpec {
            key: "enabled",
            query: QueryTemplate::Read {
                cmd: "AT+QGPS?",
                prefix: "+QGPS:",
            },
            set: SetTemplate::Switch {
                on: "AT+QGPS=1",
                off: "AT+QGPSEND",
            },
            codec: Codec::Flag,
            timeout_ms: 2000,
            toggle: None,
        },
        cfg(
            "output_port",
            "AT+QGPSCFG=\"outport\"",
            "outport",
            Codec::Quoted,
        ),
        cfg(
            "nmea_source",
            "AT+QGPSCFG=\"nmeasrc\"",
            "nmeasrc",
            Codec::Integer,
        ),
        cfg(
            "gps_nmea_type",
            "AT+QGPSCFG=\"gpsnmeatype\"",
            "gpsnmeatype",
            Codec::Integer,
        ),
        cfg(
            "glonass_nmea_type",
            "AT+QGPSCFG=\"glonassnmeatype\"",
            "glonassnmeatype",
            Codec::Integer,
        ),
        cfg(
            "galileo_nmea_type",
            "AT+QGPSCFG=\"galileonmeatype\"",
            "galileonmeatype",
            Codec::Integer,
        ),
        cfg(
            "beidou_nmea_type",
            "AT+QGPSCFG=\"beidounmeatype\"",
            "beidounmeatype",
            Codec::Integer,
        ),
        cfg(
            "gsv_extended_nmea",
            "AT+QGPSCFG=\"gsvextnmeatype\"",
            "gsvextnmeatype",
            Codec::Integer,
        ),
        cfg(
            "gnss_config",
            "AT+QGPSCFG=\"gnssconfig\"",
            "gnssconfig",
            Codec::Integer,
        ),
        cfg(
            "auto_gps",
            "AT+QGPSCFG=\"autogps\"",
            "autogps",
            Codec::Integer,
        ),
        cfg(
            "agps_position_mode",
            "AT+QGPSCFG=\"agpsposmode\"",
            "agpsposmode",
            Codec::Integer,
        ),
        cfg(
            "fix_frequency",
            "AT+QGPSCFG=\"fixfreq\"",
            "fixfreq",
            Codec::Integer,
        ),
        cfg("one_pps", "AT+QGPSCFG=\"1pps\"", "1pps", Codec::Integer),
        // Raw measurement output is a multi-value parameter; compared as
        // opaque text, exact match required.
        cfg(
            "raw_data_config",
            "AT+QGPSCFG=\"gnssrawdata\"",
            "gnssrawdata",
            Codec::Raw,
        ),
    ],
};
