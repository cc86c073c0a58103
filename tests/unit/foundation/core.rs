use super::*;

#[test]
fn fps_rejects_zero_terms_and_reports_frame_duration() {
    let fps = Fps::new(30, 1).unwrap();
    assert!((fps.frame_duration_secs() - 1.0 / 30.0).abs() < 1e-12);
    assert_eq!(fps.as_f64(), 30.0);
    assert!(Fps::new(0, 1).is_err());
    assert!(Fps::new(30, 0).is_err());
}

#[test]
fn aspect_ratio_canvases_are_even_and_oriented() {
    let land = AspectRatio::Landscape.canvas(720);
    assert_eq!(land, Canvas { width: 1280, height: 720 });

    let port = AspectRatio::Portrait.canvas(720);
    assert_eq!(port, Canvas { width: 720, height: 1280 });

    let odd = AspectRatio::Landscape.canvas(101);
    assert_eq!(odd.width % 2, 0);
    assert_eq!(odd.height % 2, 0);

    assert_eq!(AspectRatio::parse("9:16").unwrap(), AspectRatio::Portrait);
    assert!(AspectRatio::parse("4:3").is_err());
}

#[test]
fn color_hex_parses_and_formats() {
    let c = Color::parse_hex("#FF8000").unwrap();
    assert_eq!(c, Color::rgb(255, 128, 0));
    assert_eq!(c.to_hex(), "#ff8000");

    let c = Color::parse_hex("10203040").unwrap();
    assert_eq!(c.a, 0x40);
    assert_eq!(c.to_hex(), "#10203040");

    assert!(Color::parse_hex("#abc").is_err());
    assert!(Color::parse_hex("#gg0000").is_err());
}

#[test]
fn color_serde_uses_hex_strings() {
    let json = serde_json::to_string(&Color::rgb(1, 2, 3)).unwrap();
    assert_eq!(json, "\"#010203\"");
    let back: Color = serde_json::from_str("\"#0a0b0c\"").unwrap();
    assert_eq!(back, Color::rgb(10, 11, 12));
}

#[test]
fn color_lerp_hits_endpoints() {
    let a = Color::rgb(0, 0, 0);
    let b = Color::rgb(200, 100, 50);
    assert_eq!(a.lerp(b, 0.0), a);
    assert_eq!(a.lerp(b, 1.0), b);
    assert_eq!(a.lerp(b, 0.5), Color::rgb(100, 50, 25));
}

#[test]
fn premul_scales_channels_by_alpha() {
    let p = Color::rgb(255, 128, 0).with_alpha(128).premul();
    assert_eq!(p.a, 128);
    assert_eq!(p.r, 128);
    assert_eq!(p.b, 0);
}
