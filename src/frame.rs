use crate::error::EncoderError;

/// Identifies one of the three planes of a 4:2:0 picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneId {
    Y,
    Cb,
    Cr,
}

impl PlaneId {
    /// Stable slot for per-plane predictor state.
    pub fn index(self) -> usize {
        match self {
            PlaneId::Y => 0,
            PlaneId::Cb => 1,
            PlaneId::Cr => 2,
        }
    }
}

/// One uncompressed 4:2:0 picture: full-resolution luma plus two
/// quarter-resolution chroma planes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub y: Vec<u8>,
    pub u: Vec<u8>,
    pub v: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    pub fn solid(width: u32, height: u32, y: u8, u: u8, v: u8) -> Self {
        let y_size = (width * height) as usize;
        let uv_w = width.div_ceil(2) as usize;
        let uv_h = height.div_ceil(2) as usize;
        let uv_size = uv_w * uv_h;

        Self {
            y: vec![y; y_size],
            u: vec![u; uv_size],
            v: vec![v; uv_size],
            width,
            height,
        }
    }

    /// Builds a frame from caller-supplied planes, checking the lengths
    /// against the stated dimensions.
    pub fn from_planes(
        y: Vec<u8>,
        u: Vec<u8>,
        v: Vec<u8>,
        width: u32,
        height: u32,
    ) -> Result<Self, EncoderError> {
        if width == 0 || height == 0 {
            return Err(EncoderError::InvalidDimensions { width, height });
        }
        let y_size = (width * height) as usize;
        let uv_size = (width.div_ceil(2) * height.div_ceil(2)) as usize;
        if y.len() != y_size || u.len() != uv_size || v.len() != uv_size {
            return Err(EncoderError::InvalidPlaneLengths {
                luma: y.len(),
                chroma_b: u.len(),
                chroma_r: v.len(),
                width,
                height,
            });
        }
        Ok(Self { y, u, v, width, height })
    }

    pub fn chroma_width(&self) -> u32 {
        self.width.div_ceil(2)
    }

    pub fn chroma_height(&self) -> u32 {
        self.height.div_ceil(2)
    }

    /// Plane samples with that plane's own dimensions.
    pub fn plane(&self, id: PlaneId) -> (&[u8], u32, u32) {
        match id {
            PlaneId::Y => (&self.y, self.width, self.height),
            PlaneId::Cb => (&self.u, self.chroma_width(), self.chroma_height()),
            PlaneId::Cr => (&self.v, self.chroma_width(), self.chroma_height()),
        }
    }

    pub fn plane_mut(&mut self, id: PlaneId) -> (&mut [u8], u32, u32) {
        let (cw, ch) = (self.chroma_width(), self.chroma_height());
        match id {
            PlaneId::Y => (&mut self.y, self.width, self.height),
            PlaneId::Cb => (&mut self.u, cw, ch),
            PlaneId::Cr => (&mut self.v, cw, ch),
        }
    }

    /// Copies a `size` x `size` block at plane coordinates (`x`, `y`) into
    /// `out`. The block must lie fully inside the plane.
    pub fn copy_block(&self, id: PlaneId, x: u32, y: u32, size: u32, out: &mut [u8]) {
        let (plane, w, h) = self.plane(id);
        debug_assert!(x + size <= w && y + size <= h);
        debug_assert_eq!(out.len(), (size * size) as usize);
        for row in 0..size {
            let src = ((y + row) * w + x) as usize;
            let dst = (row * size) as usize;
            out[dst..dst + size as usize].copy_from_slice(&plane[src..src + size as usize]);
        }
    }

    /// Writes a `size` x `size` block back at plane coordinates (`x`, `y`).
    pub fn store_block(&mut self, id: PlaneId, x: u32, y: u32, size: u32, block: &[u8]) {
        let (plane, w, h) = self.plane_mut(id);
        debug_assert!(x + size <= w && y + size <= h);
        debug_assert_eq!(block.len(), (size * size) as usize);
        for row in 0..size {
            let dst = ((y + row) * w + x) as usize;
            let src = (row * size) as usize;
            plane[dst..dst + size as usize].copy_from_slice(&block[src..src + size as usize]);
        }
    }
}
