//! Opaque page cursors: hex of `"{generation}:{offset}"`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub generation: u64,
    pub offset: usize,
}

impl Cursor {
    pub fn new(generation: u64, offset: usize) -> Self {
        Self { generation, offset }
    }

    pub fn encode(&self) -> String {
        hex::encode(format!("{}:{}", self.generation, self.offset))
    }

    /// `None` for anything this module did not produce.
    pub fn decode(raw: &str) -> Option<Self> {
        let bytes = hex::decode(raw).ok()?;
        let text = std::str::from_utf8(&bytes).ok()?;
        let (generation, offset) = text.split_once(':')?;
        Some(Self {
            generation: generation.parse().ok()?,
            offset: offset.parse().ok()?,
        })
    }

    /// Whether the cursor can still be honoured against a listing at
    /// `current` generation with `len` items.
    pub fn is_usable(&self, current: u64, len: usize, max_lag: u64) -> bool {
        self.generation <= current && current - self.generation <= max_lag && self.offset < len
    }
}
