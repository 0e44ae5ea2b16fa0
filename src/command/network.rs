//! ### 6 - Network Service Commands
//!
//! Operator-scan presentation and the forbidden-PLMN list.

use super::{ParameterSpec, QueryTemplate, SectionSpec, SetTemplate};
use crate::codec::Codec;

pub const SECTION: SectionSpec = SectionSpec {
    name: "network",
    params: &[
        // Forbidden PLMN list +QFPLMNCFG
        //
        // Declared as a boolean: `true` means the FPLMN list must be empty.
        // The query lists the current entries; any `+QFPLMNCFG:` payload line
        // means there is something to delete. Clearing writes the SIM, hence
        // the generous timeout.
        ParameterSpec {
            key: "clear_forbidden_plmn",
            query: QueryTemplate::Read {
                cmd: "AT+QFPLMNCFG=\"list\"",
                prefix: "+QFPLMNCFG:",
            },
            set: SetTemplate::Fixed {
                cmd: "AT+QFPLMNCFG=\"Delete\",\"all\"",
            },
            codec: Codec::EmptyList,
            timeout_ms: 3000,
            toggle: None,
        },
        // Operator scan presentation +QOPSCFG="displayrssi"
        ParameterSpec {
            key: "display_rssi_in_scan",
            query: QueryTemplate::Keyed {
                cmd: "AT+QOPSCFG=\"displayrssi\"",
                prefix: "+QOPSCFG:",
                tag: "displayrssi",
            },
            set: SetTemplate::Keyed {
                cmd: "AT+QOPSCFG=",
                tag: "displayrssi",
            },
            codec: Codec::Integer,
            timeout_ms: 300,
            toggle: None,
        },
        // Operator scan presentation +QOPSCFG="displaybw"
        ParameterSpec {
            key: "display_bandwidth_in_scan",
            query: QueryTemplate::Keyed {
                cmd: "AT+QOPSCFG=\"displaybw\"",
                prefix: "+QOPSCFG:",
                tag: "displaybw",
            },
            set: SetTemplate::Keyed {
                cmd: "AT+QOPSCFG=",
                tag: "displaybw",
            },
            codec: Codec::Integer,
            timeout_ms: 300,
            toggle: None,
        },
    ],
};
