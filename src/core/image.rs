use crate::error::{Error, Result};

/// 8-bit image with 1 (grayscale) or 4 (RGBA) channels
#[derive(Debug, Clone)]
pub struct ByteImage {
    data: Vec<u8>,
    width: usize,
    height: usize,
    channels: usize,
    row_stride: usize,
}

impl ByteImage {
    /// Create a zero-filled image with a packed row stride
    pub fn new(width: usize, height: usize, channels: usize) -> Result<Self> {
        Self::from_raw(
            vec![0u8; width * channels * height],
            width,
            height,
            channels,
            width * channels,
        )
    }

    /// Create an image from raw bytes
    pub fn from_raw(
        data: Vec<u8>,
        width: usize,
        height: usize,
        channels: usize,
        row_stride: usize,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions(
                "Width and height must be greater than 0".to_string(),
            ));
        }
        if channels != 1 && channels != 4 {
            return Err(Error::InvalidParameter(format!(
                "Channel count must be 1 or 4, got {channels}"
            )));
        }
        if row_stride < width * channels {
            return Err(Error::InvalidDimensions(format!(
                "Row stride {row_stride} is smaller than {} bytes per row",
                width * channels
            )));
        }
        if data.len() < row_stride * (height - 1) + width * channels {
            return Err(Error::InvalidDimensions(format!(
                "Data size {} too small for a {width}x{height}x{channels} image",
                data.len()
            )));
        }

        Ok(Self {
            data,
            width,
            height,
            channels,
            row_stride,
        })
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn channels(&self) -> usize {
        self.channels
    }

    #[must_use]
    pub fn row_stride(&self) -> usize {
        self.row_stride
    }

    /// Pixel samples of row `y`
    #[must_use]
    pub fn row(&self, y: usize) -> &[u8] {
        let start = y * self.row_stride;
        &self.data[start..start + self.width * self.channels]
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let start = y * self.row_stride;
        &mut self.data[start..start + self.width * self.channels]
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Single-channel `f32` image, samples nominally in `[0, 1]`
///
/// The buffer is reusable: `resize` keeps the allocation when shrinking so the
/// detector can recycle its pyramid levels across invocations.
#[derive(Debug, Clone, Default)]
pub struct FloatImage {
    data: Vec<f32>,
    width: usize,
    height: usize,
    row_stride: usize,
}

impl FloatImage {
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            data: vec![0.0; width * height],
            width,
            height,
            row_stride: width,
        }
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn row_stride(&self) -> usize {
        self.row_stride
    }

    /// Resize in place, reusing the allocation where possible. Contents are
    /// unspecified afterwards.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.row_stride = width;
        self.data.resize(width * height, 0.0);
    }

    #[must_use]
    pub fn row(&self, y: usize) -> &[f32] {
        let start = y * self.row_stride;
        &self.data[start..start + self.width]
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [f32] {
        let start = y * self.row_stride;
        &mut self.data[start..start + self.width]
    }

    #[must_use]
    pub fn pixel(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.row_stride + x]
    }

    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Convert a grayscale byte image, mapping `[0, 255]` to `[0, 1]`
    pub fn convert_from_bytes(&mut self, src: &ByteImage) -> Result<()> {
        if src.channels() != 1 {
            return Err(Error::InvalidParameter(
                "Float conversion requires a grayscale image".to_string(),
            ));
        }

        self.resize(src.width(), src.height());
        for y in 0..src.height() {
            let src_row = src.row(y);
            let dst_row = self.row_mut(y);
            for (d, s) in dst_row.iter_mut().zip(src_row.iter()) {
                *d = f32::from(*s) / 255.0;
            }
        }
        Ok(())
    }

    pub fn copy_from(&mut self, src: &FloatImage) {
        self.resize(src.width, src.height);
        for y in 0..src.height {
            self.row_mut(y).copy_from_slice(src.row(y));
        }
    }

    /// 2x bilinear upsample of `src`
    pub fn upsample_from(&mut self, src: &FloatImage) {
        let (w, h) = (src.width, src.height);
        self.resize(2 * w, 2 * h);

        for y in 0..h {
            let sr = src.row(y);
            let sr_next = src.row((y + 1).min(h - 1));
            for x in 0..w {
                let xn = (x + 1).min(w - 1);
                let v00 = sr[x];
                let v01 = sr[xn];
                let v10 = sr_next[x];
                let v11 = sr_next[xn];

                let base = 2 * y * self.row_stride + 2 * x;
                self.data[base] = v00;
                self.data[base + 1] = 0.5 * (v00 + v01);
                self.data[base + self.row_stride] = 0.5 * (v00 + v10);
                self.data[base + self.row_stride + 1] = 0.25 * (v00 + v01 + v10 + v11);
            }
        }
    }

    /// 2x decimating downsample of `src`; `src` is expected to be pre-smoothed
    pub fn downsample_from(&mut self, src: &FloatImage) {
        let w = (src.width / 2).max(1);
        let h = (src.height / 2).max(1);
        self.resize(w, h);

        for y in 0..h {
            let sr = src.row(2 * y);
            let dr = y * self.row_stride;
            for x in 0..w {
                self.data[dr + x] = sr[2 * x];
            }
        }
    }

    /// Pixelwise `a - b`
    pub fn subtract_from(&mut self, a: &FloatImage, b: &FloatImage) -> Result<()> {
        if a.width != b.width || a.height != b.height {
            return Err(Error::InvalidDimensions(
                "Subtraction operands must have the same dimensions".to_string(),
            ));
        }

        self.resize(a.width, a.height);
        for y in 0..a.height {
            let ra = a.row(y);
            let rb = b.row(y);
            let rd = self.row_mut(y);
            for x in 0..ra.len() {
                rd[x] = ra[x] - rb[x];
            }
        }
        Ok(())
    }

    /// Horizontal central-difference derivative of `src`, edges replicated
    pub fn deriv_x_from(&mut self, src: &FloatImage) {
        let (w, h) = (src.width, src.height);
        self.resize(w, h);

        for y in 0..h {
            let sr = src.row(y);
            let dr = self.row_mut(y);
            for x in 0..w {
                let xl = x.saturating_sub(1);
                let xr = (x + 1).min(w - 1);
                dr[x] = 0.5 * (sr[xr] - sr[xl]);
            }
        }
    }

    /// Vertical central-difference derivative of `src`, edges replicated
    pub fn deriv_y_from(&mut self, src: &FloatImage) {
        let (w, h) = (src.width, src.height);
        self.resize(w, h);

        for y in 0..h {
            let yu = y.saturating_sub(1);
            let yd = (y + 1).min(h - 1);
            let ru = src.row(yu);
            let rd_src = src.row(yd);
            let dr = self.row_mut(y);
            for x in 0..w {
                dr[x] = 0.5 * (rd_src[x] - ru[x]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_image_creation() {
        let img = ByteImage::new(64, 32, 1).unwrap();
        assert_eq!(img.width(), 64);
        assert_eq!(img.height(), 32);
        assert_eq!(img.channels(), 1);
        assert_eq!(img.row_stride(), 64);
    }

    #[test]
    fn test_byte_image_rejects_bad_stride() {
        assert!(ByteImage::from_raw(vec![0u8; 8], 4, 2, 1, 3).is_err());
        assert!(ByteImage::from_raw(vec![0u8; 8], 4, 2, 3, 12).is_err());
    }

    #[test]
    fn test_convert_from_bytes() {
        let mut src = ByteImage::new(4, 4, 1).unwrap();
        src.row_mut(1)[2] = 255;

        let mut f = FloatImage::default();
        f.convert_from_bytes(&src).unwrap();
        assert_eq!(f.pixel(2, 1), 1.0);
        assert_eq!(f.pixel(0, 0), 0.0);
    }

    #[test]
    fn test_upsample_doubles_dimensions() {
        let mut src = FloatImage::new(4, 3);
        src.row_mut(1)[1] = 1.0;

        let mut up = FloatImage::default();
        up.upsample_from(&src);
        assert_eq!(up.width(), 8);
        assert_eq!(up.height(), 6);
        assert_eq!(up.pixel(2, 2), 1.0);
        assert_eq!(up.pixel(3, 2), 0.5);
    }

    #[test]
    fn test_downsample_decimates() {
        let mut src = FloatImage::new(6, 4);
        for y in 0..4 {
            for x in 0..6 {
                src.row_mut(y)[x] = (y * 6 + x) as f32;
            }
        }

        let mut down = FloatImage::default();
        down.downsample_from(&src);
        assert_eq!(down.width(), 3);
        assert_eq!(down.height(), 2);
        assert_eq!(down.pixel(1, 1), src.pixel(2, 2));
    }

    #[test]
    fn test_deriv_central_difference() {
        let mut src = FloatImage::new(5, 1);
        for x in 0..5 {
            src.row_mut(0)[x] = 2.0 * x as f32;
        }

        let mut gx = FloatImage::default();
        gx.deriv_x_from(&src);
        assert_eq!(gx.pixel(2, 0), 2.0);
        // replicated edge halves the step
        assert_eq!(gx.pixel(0, 0), 1.0);
    }

    #[test]
    fn test_subtract() {
        let mut a = FloatImage::new(3, 3);
        let b = FloatImage::new(3, 3);
        a.row_mut(2)[2] = 4.0;

        let mut d = FloatImage::default();
        d.subtract_from(&a, &b).unwrap();
        assert_eq!(d.pixel(2, 2), 4.0);
    }
}
