//! ### 2 - General Commands
//!
//! Session-wide behavior of the module's AT interface.

use super::{ParameterSpec, QueryTemplate, SectionSpec, SetTemplate};
use crate::codec::Codec;

pub const SECTION: SectionSpec = SectionSpec {
    name: "basic",
    params: &[
        // 2.23 Error message format +CMEE
        //
        // Controls whether MT-related errors come back as bare `ERROR`, a
        // numeric `+CME ERROR: <err>` or its verbose form. The engine itself
        // only relies on the terminator shapes, but field logs are useless
        // without verbose errors, so this is usually pinned to 2.
        ParameterSpec {
            key: "error_reporting",
            query: QueryTemplate::Read {
                cmd: "AT+CMEE?",
                prefix: "+CMEE:",
            },
            set: SetTemplate::Assign { cmd: "AT+CMEE=" },
            codec: Codec::Integer,
            timeout_ms: 300,
            toggle: None,
        },
        // 12.5 Automatic time zone update +CTZU
        ParameterSpec {
            key: "time_zone_update",
            query: QueryTemplate::Read {
                cmd: "AT+CTZU?",
                prefix: "+CTZU:",
            },
            set: SetTemplate::Assign { cmd: "AT+CTZU=" },
            codec: Codec::Integer,
            timeout_ms: 300,
            toggle: None,
        },
    ],
};
