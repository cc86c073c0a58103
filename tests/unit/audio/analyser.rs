use super::*;

fn sine(freq_hz: f32, sample_rate: f32, amplitude: f32) -> Vec<f32> {
    (0..FFT_SIZE)
        .map(|i| amplitude * (2.0 * PI * freq_hz * i as f32 / sample_rate).sin())
        .collect()
}

fn argmax(bins: &[u8]) -> usize {
    let mut best = 0;
    for (i, &v) in bins.iter().enumerate() {
        if v > bins[best] {
            best = i;
        }
    }
    best
}

#[test]
fn silence_maps_to_zero_bins() {
    let mut node = AnalyserNode::new(0.0);
    let mut out = vec![7u8; BIN_COUNT];
    node.byte_frequency_data(&vec![0.0; FFT_SIZE], &mut out)
        .unwrap();
    assert!(out.iter().all(|&b| b == 0));
}

#[test]
fn sine_peaks_at_its_bin() {
    // Bin 40 at 48 kHz / 2048.
    let input = sine(40.0 * 48_000.0 / FFT_SIZE as f32, 48_000.0, 0.5);
    let mut node = AnalyserNode::new(0.0);
    let mut out = vec![0u8; BIN_COUNT];
    node.byte_frequency_data(&input, &mut out).unwrap();

    assert!((39..=41).contains(&argmax(&out)));
    assert_eq!(out[40], 255);
    assert!(out[600] < out[40]);
}

#[test]
fn smoothing_lags_behind_the_first_frame() {
    let input = sine(40.0 * 48_000.0 / FFT_SIZE as f32, 48_000.0, 0.5);
    let mut fast = AnalyserNode::new(0.0);
    let mut slow = AnalyserNode::new(0.8);
    let mut a = vec![0u8; BIN_COUNT];
    let mut b = vec![0u8; BIN_COUNT];
    fast.byte_frequency_data(&input, &mut a).unwrap();
    slow.byte_frequency_data(&input, &mut b).unwrap();
    assert!(b[40] < a[40]);

    // Repeated frames converge upward.
    let first = b[40];
    for _ in 0..20 {
        slow.byte_frequency_data(&input, &mut b).unwrap();
    }
    assert!(b[40] > first);
}

#[test]
fn set_smoothing_is_clamped() {
    let mut node = AnalyserNode::new(0.5);
    node.set_smoothing(2.0);
    assert!(node.smoothing() < 1.0);
    node.set_smoothing(f64::NAN);
    assert_eq!(node.smoothing(), 0.0);
}

#[test]
fn wrong_buffer_sizes_are_rejected() {
    let mut node = AnalyserNode::new(0.0);
    let mut out = vec![0u8; BIN_COUNT];
    assert!(node.byte_frequency_data(&[0.0; 16], &mut out).is_err());
    let mut short = vec![0u8; 8];
    assert!(
        node.byte_frequency_data(&vec![0.0; FFT_SIZE], &mut short)
            .is_err()
    );
}

#[test]
fn snapshot_means() {
    let mut bins = vec![0u8; BIN_COUNT];
    bins[..BASS_BINS].fill(100);
    let snap = FrequencySnapshot::from_bins(bins);
    assert_eq!(snap.bass_mean(), 100.0);
    assert!((snap.mean() - 1600.0 / 1024.0).abs() < 1e-4);
    assert!(snap.is_audio_playing());

    let quiet = FrequencySnapshot::from_bins(vec![1u8; BIN_COUNT]);
    assert!(!quiet.is_audio_playing());
}

#[test]
fn window_selects_fractional_sub_range() {
    let bins: Vec<u8> = (0..BIN_COUNT).map(|i| (i % 251) as u8).collect();
    let snap = FrequencySnapshot::from_bins(bins.clone());

    let w = snap.window(0.25, 0.75);
    assert_eq!(w.len(), 512);
    assert_eq!(w, &bins[256..768]);

    assert!(snap.window(0.75, 0.25).is_empty());
    assert!(snap.window(0.5, 0.5).is_empty());
    assert_eq!(snap.window(0.0, 1.0).len(), BIN_COUNT);
}

#[test]
fn window_floors_bounds() {
    let snap = FrequencySnapshot::from_bins(vec![9u8; 10]);
    // 10 * 0.15 = 1.5 -> 1, 10 * 0.39 = 3.9 -> 3
    assert_eq!(snap.window(0.15, 0.39).len(), 2);
}
