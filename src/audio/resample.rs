// Sample-rate conversion and PCM quantization
//
// Two conversion strategies are kept deliberately separate:
// - `resample_linear`: endpoint-preserving linear interpolation, used for
//   the streaming recognition path
// - `decimate`: nearest-neighbor fractional-step decimation, used where
//   only down-sampling without fidelity guarantees is needed

/// Target sample rate expected by the recognition service.
pub const STREAM_SAMPLE_RATE: u32 = 16_000;

/// Resample a float sample sequence with linear interpolation.
///
/// Output length is `round(len * target_rate / source_rate)`. The first and
/// last output samples equal the first and last input samples. When the
/// rates match, the input is returned unchanged.
///
/// Degenerate outputs are defined: an output length of 0 yields an empty
/// buffer, and an output length of 1 yields a single sample equal to the
/// last input sample.
pub fn resample_linear(samples: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }

    let fit_count =
        (samples.len() as f64 * target_rate as f64 / source_rate as f64).round() as usize;
    if fit_count == 0 {
        return Vec::new();
    }
    if fit_count == 1 {
        return vec![samples[samples.len() - 1]];
    }

    let mut out = vec![0.0f32; fit_count];
    let spring_factor = (samples.len() - 1) as f64 / (fit_count - 1) as f64;

    out[0] = samples[0];
    for i in 1..fit_count - 1 {
        let pos = i as f64 * spring_factor;
        let before = pos.floor() as usize;
        let after = pos.ceil() as usize;
        let at_point = (pos - before as f64) as f32;
        out[i] = samples[before] + (samples[after] - samples[before]) * at_point;
    }
    out[fit_count - 1] = samples[samples.len() - 1];

    out
}

/// Nearest-neighbor decimation: step through the input at the rate ratio
/// and take the sample under the cursor. Output length is
/// `ceil(len * target_rate / source_rate)`.
pub fn decimate(samples: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }

    let out_len =
        (samples.len() as f64 * target_rate as f64 / source_rate as f64).ceil() as usize;
    let step = source_rate as f64 / target_rate as f64;

    let mut out = Vec::with_capacity(out_len);
    let mut cursor = 0.0f64;
    for _ in 0..out_len {
        let idx = (cursor.floor() as usize).min(samples.len() - 1);
        out.push(samples[idx]);
        cursor += step;
    }

    out
}

/// Quantize float samples in [-1, 1] to signed 16-bit PCM.
///
/// Values outside the range are clamped. Negative samples scale by 0x8000
/// and non-negative by 0x7fff, truncating toward zero, so -1.0 maps to
/// -32768 and 1.0 maps to 32767.
pub fn quantize_i16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&x| {
            let s = x.clamp(-1.0, 1.0);
            if s < 0.0 {
                (s * 0x8000 as f32) as i16
            } else {
                (s * 0x7fff as f32) as i16
            }
        })
        .collect()
}

/// Serialize 16-bit PCM samples as little-endian bytes.
pub fn pcm_bytes(samples: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}

/// Full streaming transform: resample captured audio to the recognition
/// rate and serialize as 16-bit little-endian PCM.
pub fn transform_for_streaming(samples: &[f32], source_rate: u32) -> Vec<u8> {
    let resampled = resample_linear(samples, source_rate, STREAM_SAMPLE_RATE);
    pcm_bytes(&quantize_i16(&resampled))
}
