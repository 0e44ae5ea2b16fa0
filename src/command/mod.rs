//! AT parameter catalog for Quectel EC2x-class modules\
//! Following the Quectel EC2x&EG9x AT commands and GNSS application notes.
//!
//! One module per manual chapter. Each supported configuration key maps to a
//! [`ParameterSpec`]: the query and set command templates, the value codec,
//! the per-command timeout and, where the module requires it, the
//! disable/enable [`Toggle`] that must bracket writes.
//!
//! Argument arity is part of the template type: a
//! [`QueryTemplate`] never takes an argument, a [`SetTemplate`] takes
//! exactly the shape its variant names, so a malformed command line cannot
//! be produced at runtime.

use core::fmt::Write;

use heapless::String;

use crate::codec::{Codec, RenderError};
use crate::config::Value;

pub mod general;
pub mod gnss;
pub mod network;

/// Upper bound on one rendered AT command line.
pub const MAX_CMD_LEN: usize = 64;

pub type CmdBuf = String<MAX_CMD_LEN>;

/// Query command shape plus the recipe for locating the payload token in the
/// response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum QueryTemplate {
    /// Plain read, e.g. `AT+CMEE?` answered by `+CMEE: <v>`.
    Read {
        cmd: &'static str,
        prefix: &'static str,
    },
    /// Keyed read, e.g. `AT+QGPSCFG="fixfreq"` answered by
    /// `+QGPSCFG: "fixfreq",<v>`.
    Keyed {
        cmd: &'static str,
        prefix: &'static str,
        tag: &'static str,
    },
}

impl QueryTemplate {
    pub fn command(&self) -> &'static str {
        match self {
            QueryTemplate::Read { cmd, .. } | QueryTemplate::Keyed { cmd, .. } => cmd,
        }
    }

    /// Extracts the payload token from a raw response.
    ///
    /// Returns `None` when no line carries this parameter, which the engine
    /// reads as "currently unset".
    pub fn extract<'r>(&self, raw: &'r str) -> Option<&'r str> {
        match self {
            QueryTemplate::Read { prefix, .. } => raw
                .lines()
                .find_map(|line| line.trim().strip_prefix(prefix))
                .map(str::trim),
            QueryTemplate::Keyed { prefix, tag, .. } => {
                raw.lines().find_map(|line| {
                    let rest = line.trim().strip_prefix(prefix)?.trim_start();
                    // `"<tag>",<value...>`
                    let rest = rest
                        .strip_prefix('"')?
                        .strip_prefix(tag)?
                        .strip_prefix('"')?
                        .trim_start();
                    rest.strip_prefix(',').map(str::trim)
                })
            }
        }
    }
}

/// Set command shape; the codec supplies the rendered argument where the
/// variant takes one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SetTemplate {
    /// `<cmd><arg>`, e.g. `AT+CMEE=2`.
    Assign { cmd: &'static str },
    /// `<cmd>"<tag>",<arg>`, e.g. `AT+QGPSCFG="fixfreq",10`.
    Keyed {
        cmd: &'static str,
        tag: &'static str,
    },
    /// A complete literal taking no argument, e.g.
    /// `AT+QFPLMNCFG="Delete","all"`.
    Fixed { cmd: &'static str },
    /// Boolean-selected literal, e.g. `AT+QGPS=1` / `AT+QGPSEND`.
    Switch {
        on: &'static str,
        off: &'static str,
    },
}

impl SetTemplate {
    /// Renders the full set command line for `value` into `out`.
    pub fn render(
        &self,
        codec: &Codec,
        value: &Value,
        out: &mut CmdBuf,
    ) -> Result<(), RenderError> {
        match self {
            SetTemplate::Assign { cmd } => {
                out.push_str(cmd).map_err(|_| RenderError::Overflow)?;
                codec.render(value, out)
            }
            SetTemplate::Keyed { cmd, tag } => {
                write!(out, "{}\"{}\",", cmd, tag).map_err(|_| RenderError::Overflow)?;
                codec.render(value, out)
            }
            SetTemplate::Fixed { cmd } => out.push_str(cmd).map_err(|_| RenderError::Overflow),
            SetTemplate::Switch { on, off } => {
                let on_wire = match value {
                    Value::Bool(b) => *b,
                    Value::Int(n) => *n != 0,
                    Value::Text(_) => return Err(RenderError::TypeMismatch),
                };
                out.push_str(if on_wire { on } else { off })
                    .map_err(|_| RenderError::Overflow)
            }
        }
    }
}

/// Disable/enable command pair bracketing writes to parameters that cannot
/// change while their subsystem is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Toggle {
    pub disable: &'static str,
    pub enable: &'static str,
    /// Subsystem power transitions are slower than parameter reads.
    pub timeout_ms: u32,
}

/// Everything the engine needs to reconcile one configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ParameterSpec {
    /// Key name within its section, matching the desired-configuration
    /// document.
    pub key: &'static str,
    pub query: QueryTemplate,
    pub set: SetTemplate,
    pub codec: Codec,
    /// Per-command response deadline handed to the transport.
    pub timeout_ms: u32,
    /// Required write bracket, shared across a contiguous run of keys.
    pub toggle: Option<Toggle>,
}

/// A registry section: the catalog counterpart of one desired-configuration
/// section.
#[derive(Debug, Clone, Copy)]
pub struct SectionSpec {
    pub name: &'static str,
    pub params: &'static [ParameterSpec],
}

/// The full parameter catalog, grouped by section.
pub static REGISTRY: &[SectionSpec] = &[general::SECTION, network::SECTION, gnss::SECTION];

/// All known sections, for `--list-commands`-style introspection by callers.
pub fn sections() -> &'static [SectionSpec] {
    REGISTRY
}

/// Flattened `(section, spec)` view over the whole catalog.
pub fn all_keys() -> impl Iterator<Item = (&'static str, &'static ParameterSpec)> {
    REGISTRY
        .iter()
        .flat_map(|s| s.params.iter().map(move |p| (s.name, p)))
}

/// Resolves a declared key to its catalog entry.
pub fn lookup(section: &str, key: &str) -> Option<&'static ParameterSpec> {
    REGISTRY
        .iter()
        .find(|s| s.name == section)?
        .params
        .iter()
        .find(|p| p.key == key)
}
