use std::collections::BTreeSet;

use crate::foundation::error::{PulseError, PulseResult};

/// Container/codec combinations the exporter can request.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum ExportFormat {
    /// WebM with VP9 video and Opus audio.
    WebmVp9Opus,
    /// MP4 with H.264 video and AAC audio.
    Mp4H264Aac,
}

impl ExportFormat {
    /// Every format, in preference order.
    pub const ALL: [Self; 2] = [Self::WebmVp9Opus, Self::Mp4H264Aac];

    /// Format substituted when the requested one is not encodable.
    pub const FALLBACK: Self = Self::WebmVp9Opus;

    /// Media type with codec parameters.
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::WebmVp9Opus => "video/webm;codecs=vp9,opus",
            Self::Mp4H264Aac => "video/mp4;codecs=avc1,mp4a",
        }
    }

    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::WebmVp9Opus => "webm",
            Self::Mp4H264Aac => "mp4",
        }
    }

    /// `ffmpeg` video encoder name.
    pub fn video_encoder(self) -> &'static str {
        match self {
            Self::WebmVp9Opus => "libvpx-vp9",
            Self::Mp4H264Aac => "libx264",
        }
    }

    /// `ffmpeg` audio encoder name.
    pub fn audio_encoder(self) -> &'static str {
        match self {
            Self::WebmVp9Opus => "libopus",
            Self::Mp4H264Aac => "aac",
        }
    }

    /// `ffmpeg` muxer name.
    pub fn muxer(self) -> &'static str {
        match self {
            Self::WebmVp9Opus => "webm",
            Self::Mp4H264Aac => "mp4",
        }
    }

    /// Parse `webm` / `mp4` or a media type.
    pub fn parse(s: &str) -> PulseResult<Self> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "webm" | "webm-vp9-opus" | "video/webm" => Ok(Self::WebmVp9Opus),
            "mp4" | "mp4-h264-aac" | "video/mp4" => Ok(Self::Mp4H264Aac),
            other => Self::ALL
                .into_iter()
                .find(|f| f.mime_type() == other)
                .ok_or_else(|| {
                    PulseError::validation(format!(
                        "unknown export format \"{other}\" (expected webm or mp4)"
                    ))
                }),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// What the host can capture and encode.
pub trait Capabilities {
    /// `true` when raster/audio capture and encoding are available at all.
    fn can_capture(&self) -> bool;
    /// `true` when `format` can be encoded.
    fn is_type_supported(&self, format: ExportFormat) -> bool;
}

/// Fixed capability set, for hosts whose support is known up front.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StaticCapabilities {
    /// Capture/encoding availability.
    pub capture: bool,
    /// Encodable formats.
    pub supported: BTreeSet<ExportFormat>,
}

impl StaticCapabilities {
    /// Capture available with the given encodable formats.
    pub fn with_formats(formats: impl IntoIterator<Item = ExportFormat>) -> Self {
        Self {
            capture: true,
            supported: formats.into_iter().collect(),
        }
    }

    /// No capture support at all.
    pub fn none() -> Self {
        Self::default()
    }
}

impl Capabilities for StaticCapabilities {
    fn can_capture(&self) -> bool {
        self.capture
    }

    fn is_type_supported(&self, format: ExportFormat) -> bool {
        self.capture && self.supported.contains(&format)
    }
}

/// Result of format negotiation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Negotiated {
    /// Format that will be encoded.
    pub format: ExportFormat,
    /// Set when the requested format was replaced by the fallback.
    pub warning: Option<String>,
}

/// Pick the format to encode for `requested`.
///
/// Fails with `UnsupportedFeature` when capture is unavailable or neither the requested format
/// nor [`ExportFormat::FALLBACK`] is encodable.
pub fn negotiate(caps: &dyn Capabilities, requested: ExportFormat) -> PulseResult<Negotiated> {
    if !caps.can_capture() {
        return Err(PulseError::unsupported(
            "video capture/encoding is not available",
        ));
    }
    if caps.is_type_supported(requested) {
        return Ok(Negotiated {
            format: requested,
            warning: None,
        });
    }
    let fallback = ExportFormat::FALLBACK;
    if fallback != requested && caps.is_type_supported(fallback) {
        return Ok(Negotiated {
            format: fallback,
            warning: Some(format!(
                "{requested} is not supported here, exporting {fallback} instead"
            )),
        });
    }
    Err(PulseError::unsupported(format!(
        "no supported export format ({requested} and fallback {fallback} unavailable)"
    )))
}

#[cfg(test)]
#[path = "../../tests/unit/encode/format.rs"]
mod tests;
