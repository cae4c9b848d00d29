/// Terminal dimensions advertised to the remote side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSize {
    /// The number of lines of text
    pub rows: u16,
    /// The number of columns of text
    pub cols: u16,
}

impl Default for SessionSize {
    fn default() -> Self {
        SessionSize { rows: 24, cols: 80 }
    }
}

impl SessionSize {
    pub(crate) fn pack(self) -> u32 {
        (u32::from(self.cols) << 16) | u32::from(self.rows)
    }

    pub(crate) fn unpack(packed: u32) -> Self {
        SessionSize {
            rows: (packed & 0xffff) as u16,
            cols: (packed >> 16) as u16,
        }
    }
}
