use super::*;

#[test]
fn parse_accepts_short_names_and_mime_types() {
    assert_eq!(ExportFormat::parse("webm").unwrap(), ExportFormat::WebmVp9Opus);
    assert_eq!(ExportFormat::parse(" MP4 ").unwrap(), ExportFormat::Mp4H264Aac);
    assert_eq!(
        ExportFormat::parse("video/mp4;codecs=avc1,mp4a").unwrap(),
        ExportFormat::Mp4H264Aac
    );
    assert!(ExportFormat::parse("gif").is_err());
}

#[test]
fn extensions_match_containers() {
    assert_eq!(ExportFormat::WebmVp9Opus.extension(), "webm");
    assert_eq!(ExportFormat::Mp4H264Aac.extension(), "mp4");
    assert!(ExportFormat::WebmVp9Opus.mime_type().starts_with("video/webm"));
}

#[test]
fn serde_uses_kebab_case() {
    let s = serde_json::to_string(&ExportFormat::Mp4H264Aac).unwrap();
    assert_eq!(s, "\"mp4-h264-aac\"");
    let f: ExportFormat = serde_json::from_str("\"webm-vp9-opus\"").unwrap();
    assert_eq!(f, ExportFormat::WebmVp9Opus);
}

#[test]
fn negotiate_keeps_supported_request() {
    let caps = StaticCapabilities::with_formats(ExportFormat::ALL);
    let n = negotiate(&caps, ExportFormat::Mp4H264Aac).unwrap();
    assert_eq!(n.format, ExportFormat::Mp4H264Aac);
    assert!(n.warning.is_none());
}

#[test]
fn negotiate_substitutes_fallback_with_warning() {
    let caps = StaticCapabilities::with_formats([ExportFormat::WebmVp9Opus]);
    let n = negotiate(&caps, ExportFormat::Mp4H264Aac).unwrap();
    assert_eq!(n.format, ExportFormat::FALLBACK);
    assert!(n.warning.unwrap().contains("video/mp4"));
}

#[test]
fn negotiate_fails_when_nothing_is_encodable() {
    let caps = StaticCapabilities::with_formats([]);
    let err = negotiate(&caps, ExportFormat::Mp4H264Aac).unwrap_err();
    assert!(err.is_unsupported());

    let err = negotiate(&caps, ExportFormat::WebmVp9Opus).unwrap_err();
    assert!(err.is_unsupported());
}

#[test]
fn negotiate_fails_without_capture() {
    let mut caps = StaticCapabilities::with_formats(ExportFormat::ALL);
    caps.capture = false;
    assert!(!caps.is_type_supported(ExportFormat::WebmVp9Opus));
    assert!(negotiate(&caps, ExportFormat::WebmVp9Opus).unwrap_err().is_unsupported());
    assert!(negotiate(&StaticCapabilities::none(), ExportFormat::WebmVp9Opus).is_err());
}
