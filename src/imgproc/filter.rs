use crate::core::FloatImage;
use crate::error::{Error, Result};

/// Error function, A&S formula 7.1.26 (max absolute error ~1.5e-7)
#[must_use]
pub fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254_829_592;
    const A2: f64 = -0.284_496_736;
    const A3: f64 = 1.421_413_741;
    const A4: f64 = -1.453_152_027;
    const A5: f64 = 1.061_405_429;
    const P: f64 = 0.327_591_1;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-x * x).exp();

    sign * y
}

/// Fraction of the area under the Gaussian curve lost by truncating to a
/// kernel of total width `n`
#[must_use]
pub fn kernel_loss_gaussian(n: usize, sigma: f64) -> f64 {
    debug_assert!(n > 0);
    debug_assert!(sigma > 0.0);

    let erf_f = 1.0 / (2.0f64.sqrt() * sigma);
    1.0 - erf(n as f64 * 0.5 * erf_f)
}

/// Minimum odd kernel width such that the truncation loss stays below
/// `loss_threshold`
#[must_use]
pub fn kernel_size_min_gaussian(sigma: f64, loss_threshold: f64) -> usize {
    let mut n = 3;
    while kernel_loss_gaussian(n, sigma) > loss_threshold {
        n += 2;
    }
    n
}

/// Symmetric Gaussian kernel: center plus right-side coefficients, normalized
/// so the full kernel sums to 1
#[must_use]
pub fn gaussian_kernel_sym(n_k: usize, sigma: f32) -> Vec<f32> {
    debug_assert!(n_k > 1);
    debug_assert!(sigma > 0.0);

    let mut kernel = vec![0.0f32; n_k];
    let sigma_sq = f64::from(sigma) * f64::from(sigma);
    kernel[0] = 1.0;
    let mut sum = 1.0f64;
    for (i, k) in kernel.iter_mut().enumerate().skip(1) {
        let v = (-0.5 * (i * i) as f64 / sigma_sq).exp();
        *k = v as f32;
        sum += 2.0 * v;
    }

    for k in &mut kernel {
        *k /= sum as f32;
    }
    kernel
}

/// Convolve `data[0..n]` with a symmetric kernel of half-width
/// `kernel.len() - 1`; the buffer carries `kernel.len() - 1` border samples on
/// each side
fn convolve_sym(n: usize, data: &mut [f32], kernel: &[f32]) {
    let n_k = kernel.len();
    for i in 0..n {
        let c = i + n_k - 1;
        let mut sum = kernel[0] * data[c];
        for (k, coeff) in kernel.iter().enumerate().skip(1) {
            sum += coeff * (data[c - k] + data[c + k]);
        }
        data[i] = sum;
    }
}

/// Fill both borders of a convolution buffer by mirroring around the edge
/// samples
fn fill_border_mirror(n: usize, buffer: &mut [f32], n_border: usize) {
    for i in 0..n_border {
        buffer[i] = buffer[2 * n_border - i];
    }
    for i in 0..n_border {
        buffer[n_border + n + i] = buffer[n_border + n - i - 2];
    }
}

fn kernel_for(sigma: f32, truncation_factor: f32) -> Vec<f32> {
    // Mass outside +-truncation_factor sigma, up to a constant; drives the
    // minimum width so the half-width grows with sigma.
    let loss_threshold = (-0.5 * f64::from(truncation_factor) * f64::from(truncation_factor)).exp();
    let n = kernel_size_min_gaussian(f64::from(sigma), loss_threshold);
    gaussian_kernel_sym((n + 1) / 2, sigma)
}

/// Separable Gaussian smoothing in place with mirrored borders
///
/// Fails with `InvalidDimensions` when the truncated kernel no longer fits the
/// image; scale-space construction treats that as the end of usable octaves.
pub fn smooth_in_place(
    img: &mut FloatImage,
    sigma_x: f32,
    sigma_y: f32,
    kernel_truncation_factor: f32,
) -> Result<()> {
    let w = img.width();
    let h = img.height();

    if sigma_x > 0.0 {
        let kernel = kernel_for(sigma_x, kernel_truncation_factor);
        let n_border = kernel.len() - 1;
        if w <= n_border {
            return Err(Error::InvalidDimensions(format!(
                "Gaussian kernel of half-width {n_border} does not fit image width {w}"
            )));
        }

        let mut buffer = vec![0.0f32; w + 2 * n_border];
        for y in 0..h {
            buffer[n_border..n_border + w].copy_from_slice(img.row(y));
            fill_border_mirror(w, &mut buffer, n_border);
            convolve_sym(w, &mut buffer, &kernel);
            img.row_mut(y).copy_from_slice(&buffer[..w]);
        }
    }

    if sigma_y > 0.0 {
        let kernel = kernel_for(sigma_y, kernel_truncation_factor);
        let n_border = kernel.len() - 1;
        if h <= n_border {
            return Err(Error::InvalidDimensions(format!(
                "Gaussian kernel of half-width {n_border} does not fit image height {h}"
            )));
        }

        let stride = img.row_stride();
        let mut buffer = vec![0.0f32; h + 2 * n_border];
        for x in 0..w {
            {
                let data = img.data();
                for y in 0..h {
                    buffer[n_border + y] = data[y * stride + x];
                }
            }
            fill_border_mirror(h, &mut buffer, n_border);
            convolve_sym(h, &mut buffer, &kernel);
            let data = img.data_mut();
            for y in 0..h {
                data[y * stride + x] = buffer[y];
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_erf_reference_values() {
        assert!((erf(0.0)).abs() < 1e-7);
        assert!((erf(1.0) - 0.842_700_79).abs() < 1e-6);
        assert!((erf(-1.0) + 0.842_700_79).abs() < 1e-6);
        assert!((erf(3.0) - 0.999_977_91).abs() < 1e-6);
    }

    #[test]
    fn test_kernel_loss_decreases_with_width() {
        let sigma = 2.0;
        let mut prev = kernel_loss_gaussian(3, sigma);
        for n in (5..21).step_by(2) {
            let loss = kernel_loss_gaussian(n, sigma);
            assert!(loss <= prev);
            prev = loss;
        }
    }

    #[test]
    fn test_kernel_size_grows_with_sigma() {
        let thr = 1e-4;
        let n1 = kernel_size_min_gaussian(1.0, thr);
        let n4 = kernel_size_min_gaussian(4.0, thr);
        assert!(n4 > n1);
        assert!(kernel_loss_gaussian(n4, 4.0) <= thr);
    }

    #[test]
    fn test_kernel_sums_to_one() {
        let kernel = gaussian_kernel_sym(7, 2.0);
        let sum: f32 = kernel[0] + 2.0 * kernel[1..].iter().sum::<f32>();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_smooth_preserves_constant_image() {
        let mut img = FloatImage::new(32, 24);
        for y in 0..24 {
            for v in img.row_mut(y) {
                *v = 0.75;
            }
        }

        smooth_in_place(&mut img, 1.6, 1.6, 4.0).unwrap();
        for y in 0..24 {
            for x in 0..32 {
                assert!((img.pixel(x, y) - 0.75).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_smooth_spreads_impulse() {
        let mut img = FloatImage::new(31, 31);
        img.row_mut(15)[15] = 1.0;

        smooth_in_place(&mut img, 2.0, 2.0, 4.0).unwrap();
        let center = img.pixel(15, 15);
        assert!(center < 1.0);
        assert!(center > img.pixel(10, 15));
        assert!(img.pixel(14, 15) > 0.0);
    }

    #[test]
    fn test_smooth_rejects_oversized_kernel() {
        let mut img = FloatImage::new(4, 4);
        assert!(smooth_in_place(&mut img, 20.0, 20.0, 4.0).is_err());
    }
}
