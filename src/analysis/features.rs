use std::ops::RangeInclusive;

/// Time-domain bytes are centred here.
const MIDLINE: u8 = 128;

/// RMS level of a time-domain snapshot. Samples map to `s / 128 - 1`.
pub fn volume(time_domain: &[u8]) -> f32 {
    if time_domain.is_empty() {
        return 0.0;
    }
    let sum: f32 = time_domain
        .iter()
        .map(|&s| {
            let amplitude = s as f32 / 128.0 - 1.0;
            amplitude * amplitude
        })
        .sum();
    (sum / time_domain.len() as f32).sqrt()
}

/// Mean magnitude (0..=255 per bin) over `bins`, normalized to [0, 1].
pub fn band_energy(frequency: &[u8], bins: RangeInclusive<usize>) -> f32 {
    let Some(slice) = frequency.get(bins) else {
        return 0.0;
    };
    if slice.is_empty() {
        return 0.0;
    }
    let sum: u32 = slice.iter().map(|&m| m as u32).sum();
    sum as f32 / (slice.len() as f32 * 255.0)
}

/// Rise in band energy since the previous frame; never negative.
pub fn transient(current: &[u8], previous: &[u8], bins: RangeInclusive<usize>) -> f32 {
    let now = band_energy(current, bins.clone());
    let before = band_energy(previous, bins);
    (now - before).max(0.0)
}

/// Fraction of adjacent sample pairs that cross the midline.
pub fn zero_crossing_rate(time_domain: &[u8]) -> f32 {
    if time_domain.len() < 2 {
        return 0.0;
    }
    let crossings = time_domain
        .windows(2)
        .filter(|pair| (pair[0] > MIDLINE) != (pair[1] > MIDLINE))
        .count();
    crossings as f32 / (time_domain.len() - 1) as f32
}

/// Magnitude-weighted mean bin index divided by the bin count. 0 on silence.
pub fn spectral_centroid(frequency: &[u8]) -> f32 {
    let (weighted, total) = frequency
        .iter()
        .enumerate()
        .fold((0u64, 0u64), |(weighted, total), (i, &m)| {
            (weighted + m as u64 * i as u64, total + m as u64)
        });
    if total == 0 {
        return 0.0;
    }
    weighted as f32 / total as f32 / frequency.len() as f32
}
