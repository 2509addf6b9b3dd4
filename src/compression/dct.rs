use std::f64::consts::{FRAC_1_SQRT_2, PI};

pub type DataUnit = [i16; 64];

pub type SampleBlock = [u16; 64];

fn alpha(u: usize) -> f64 {
    if u == 0 {
        FRAC_1_SQRT_2
    } else {
        1.0
    }
}

fn cosine_table() -> [[f64; 8]; 8] {
    let mut table = [[0.0f64; 8]; 8];
    for (u, row) in table.iter_mut().enumerate() {
        for (x, c) in row.iter_mut().enumerate() {
            *c = ((2 * x + 1) as f64 * u as f64 * PI / 16.0).cos();
        }
    }
    table
}

pub fn level_shift_down(samples: &SampleBlock, precision: u8) -> [i16; 64] {
    let offset = 1i32 << (precision - 1);
    let mut out = [0i16; 64];
    for (o, &s) in out.iter_mut().zip(samples.iter()) {
        *o = (s as i32 - offset) as i16;
    }
    out
}

pub fn level_shift_up(values: &[f64; 64], precision: u8) -> SampleBlock {
    let offset = (1u32 << (precision - 1)) as f64;
    let max = ((1u32 << precision) - 1) as f64;
    let mut out = [0u16; 64];
    for (o, &v) in out.iter_mut().zip(values.iter()) {
        *o = (v + offset).clamp(0.0, max) as u16;
    }
    out
}

pub fn forward_dct(block: &[i16; 64]) -> DataUnit {
    let cos = cosine_table();

    let mut rows = [0.0f64; 64];
    for y in 0..8 {
        for u in 0..8 {
            let mut sum = 0.0;
            for x in 0..8 {
                sum += block[y * 8 + x] as f64 * cos[u][x];
            }
            rows[y * 8 + u] = sum;
        }
    }

    let mut output = [0i16; 64];
    for v in 0..8 {
        for u in 0..8 {
            let mut sum = 0.0;
            for y in 0..8 {
                sum += rows[y * 8 + u] * cos[v][y];
            }
            let coeff = 0.25 * alpha(u) * alpha(v) * sum;
            output[v * 8 + u] = (coeff + 0.5).floor().clamp(i16::MIN as f64, i16::MAX as f64) as i16;
        }
    }
    output
}

pub fn inverse_dct(coeffs: &DataUnit) -> [f64; 64] {
    let cos = cosine_table();

    let mut cols = [0.0f64; 64];
    for v in 0..8 {
        for x in 0..8 {
            let mut sum = 0.0;
            for u in 0..8 {
                sum += alpha(u) * coeffs[v * 8 + u] as f64 * cos[u][x];
            }
            cols[v * 8 + x] = sum;
        }
    }

    let mut output = [0.0f64; 64];
    for y in 0..8 {
        for x in 0..8 {
            let mut sum = 0.0;
            for v in 0..8 {
                sum += alpha(v) * cols[v * 8 + x] * cos[v][y];
            }
            output[y * 8 + x] = 0.25 * sum;
        }
    }
    output
}

pub const ZIGZAG_ORDER: [usize; 64] = [
    0, 1, 8, 16, 9, 2, 3, 10, 17, 24, 32, 25, 18, 11, 4, 5, 12, 19, 26, 33, 40, 48, 41, 34, 27, 20,
    13, 6, 7, 14, 21, 28, 35, 42, 49, 56, 57, 50, 43, 36, 29, 22, 15, 23, 30, 37, 44, 51, 58, 59,
    52, 45, 38, 31, 39, 46, 53, 60, 61, 54, 47, 55, 62, 63,
];

pub fn zigzag_scan(block: &DataUnit) -> DataUnit {
    let mut output = [0i16; 64];
    for (i, &idx) in ZIGZAG_ORDER.iter().enumerate() {
        output[i] = block[idx];
    }
    output
}

pub fn zigzag_unscan(scanned: &DataUnit) -> DataUnit {
    let mut output = [0i16; 64];
    for (i, &idx) in ZIGZAG_ORDER.iter().enumerate() {
        output[idx] = scanned[i];
    }
    output
}
