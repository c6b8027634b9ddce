//! Synthetic test data

use std::f64::consts::PI;

/// Edge length of a checkerboard square, in pixels
pub const SQUARE_SIZE: u32 = 100;

/// Radius of the centred circle, in pixels
pub const CIRCLE_RADIUS: i64 = 200;

/// Test tone frequency (A4)
pub const TONE_HZ: f64 = 440.0;

const WHITE: [u8; 3] = [255, 255, 255];
const BLACK: [u8; 3] = [0, 0, 0];
const RED: [u8; 3] = [255, 0, 0];
const BLUE: [u8; 3] = [0, 0, 255];

/// Blue rectangle drawn over everything else: x in [100, 400), y in [100, 300)
const RECT: (u32, u32, u32, u32) = (100, 100, 400, 300);

/// RGB test pattern, `width * height * 3` bytes, row-major
///
/// Black/white checkerboard, a red filled circle at the centre and a blue
/// rectangle near the top-left corner. Shapes are clipped to the frame.
pub fn checkerboard_frame(width: u32, height: u32) -> Vec<u8> {
    let mut data = Vec::with_capacity(width as usize * height as usize * 3);
    let (cx, cy) = (i64::from(width / 2), i64::from(height / 2));

    for y in 0..height {
        for x in 0..width {
            let (dx, dy) = (i64::from(x) - cx, i64::from(y) - cy);
            let pixel = if (RECT.0..RECT.2).contains(&x) && (RECT.1..RECT.3).contains(&y) {
                BLUE
            } else if dx * dx + dy * dy <= CIRCLE_RADIUS * CIRCLE_RADIUS {
                RED
            } else if ((x / SQUARE_SIZE) + (y / SQUARE_SIZE)) % 2 == 0 {
                WHITE
            } else {
                BLACK
            };
            data.extend_from_slice(&pixel);
        }
    }

    data
}

/// Mono 16-bit little-endian PCM of a full-scale sine wave
pub fn sine_pcm16(sample_rate: u32, duration_ms: f64, frequency: f64) -> Vec<u8> {
    let samples = (f64::from(sample_rate) * duration_ms / 1000.0) as usize;
    let mut data = Vec::with_capacity(samples * 2);

    for i in 0..samples {
        let t = i as f64 / f64::from(sample_rate);
        let value = ((2.0 * PI * frequency * t).sin() * 32767.0) as i16;
        data.extend_from_slice(&value.to_le_bytes());
    }

    data
}
