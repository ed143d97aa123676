//! The flat error taxonomy shared by every subsystem (bitstream I/O, element codec,
//! DLC codec, frame graph, renderer). Kept as a single enum rather than one-per-module
//! because the taxonomy is explicitly non-overlapping across subsystems.

/// Fails the call if `$level` is at or above the configured `fail_level`, otherwise
/// logs at the matching level and lets the caller continue.
#[macro_export]
macro_rules! fail_or_warn {
    ($fail_level:expr, $level:expr, $err:expr $(,)?) => {{
        if $level <= $fail_level {
            return Err($err);
        } else {
            match $level {
                ::log::Level::Error => ::log::error!("{}", $err),
                ::log::Level::Warn => ::log::warn!("{}", $err),
                ::log::Level::Info => ::log::info!("{}", $err),
                ::log::Level::Debug => ::log::debug!("{}", $err),
                ::log::Level::Trace => ::log::trace!("{}", $err),
            }
        }
    }};
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum IabError {
    #[error("bad parameters: {0}")]
    BadParams(String),

    #[error("end of stream at bit position {0}")]
    EndOfStream(u64),

    #[error("underlying stream I/O failure: {0}")]
    IoFail(String),

    #[error("unsupported frame version: {0}")]
    UnsupportedVersion(u8),

    #[error("unsupported sample-rate/frame-rate combination: {sample_rate}Hz @ {frame_rate:?}fps")]
    UnsupportedRate {
        sample_rate: u32,
        frame_rate: crate::structs::frame::FrameRate,
    },

    #[error("invalid data: {0}")]
    DataInvalid(String),

    #[error("essence element limit exceeded: {found} > {max}")]
    AssetLimitExceeded { found: usize, max: usize },

    #[error("VBAP solver could not place a source: {0}")]
    VbapFailure(String),
}

/// Non-fatal diagnostics, surfaced out-of-band from a successful call (§7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IabWarning {
    /// A bed or remap routed an LFE channel but the active configuration has no LFE output.
    NoLfe,
    /// A zone-gains-9 mask zeroed out every speaker for a given octant.
    EmptyZone,
    /// An unrecognised element or sub-element tag was skipped during parsing.
    UnknownElementSkipped { tag: u32 },
    /// A conditional object's `ObjectZone19` sub-element was activated; behaviour is
    /// unimplemented upstream (§9 Open Questions) so it is skipped.
    ObjectZone19Activated { metadata_id: u32 },
}

impl std::fmt::Display for IabWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IabWarning::NoLfe => write!(f, "no LFE output channel in active configuration"),
            IabWarning::EmptyZone => write!(f, "zone-gains-9 mask produced an empty zone"),
            IabWarning::UnknownElementSkipped { tag } => {
                write!(f, "skipped unrecognised element tag {tag}")
            }
            IabWarning::ObjectZone19Activated { metadata_id } => write!(
                f,
                "ObjectZone19 activated on conditional object {metadata_id}; skipped"
            ),
        }
    }
}

pub type Result<T> = std::result::Result<T, IabError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_are_stable() {
        assert_eq!(
            IabError::BadParams("zero count".into()).to_string(),
            "bad parameters: zero count"
        );
        assert_eq!(
            IabWarning::NoLfe.to_string(),
            "no LFE output channel in active configuration"
        );
    }
}
