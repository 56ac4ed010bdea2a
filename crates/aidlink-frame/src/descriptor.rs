/// Pixel format string capacity, terminator included.
pub const FORMAT_CAPACITY: usize = 128;
/// Image name capacity, terminator included.
pub const NAME_CAPACITY: usize = 128;
/// Image notes capacity, terminator included.
pub const NOTES_CAPACITY: usize = 4096;
/// Largest payload a single frame may declare.
pub const MAX_PAYLOAD_SIZE: usize = i32::MAX as usize;

/// Measure a string the way the viewer does and cap it to `capacity - 1` bytes.
///
/// Bytes after the first NUL are never sent. Truncation is silent.
pub fn capped(bytes: &[u8], capacity: usize) -> &[u8] {
    let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    &bytes[..len.min(capacity.saturating_sub(1))]
}

/// One image to transmit, borrowed from the caller for the duration of a send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDescriptor<'a> {
    pub width: u32,
    pub height: u32,
    /// Pixel layout description, opaque to the client (e.g. `R8G8B8`).
    pub format: &'a [u8],
    /// Raw pixel data; its length is the declared payload size.
    pub payload: &'a [u8],
    pub name: Option<&'a [u8]>,
    pub notes: Option<&'a [u8]>,
    /// Row stride in bits, 0 for tightly packed rows.
    pub row_stride_bits: u32,
}

impl<'a> ImageDescriptor<'a> {
    pub fn new<F>(width: u32, height: u32, format: &'a F, payload: &'a [u8]) -> Self
    where
        F: AsRef<[u8]> + ?Sized,
    {
        Self {
            width,
            height,
            format: format.as_ref(),
            payload,
            name: None,
            notes: None,
            row_stride_bits: 0,
        }
    }

    pub fn with_name<N: AsRef<[u8]> + ?Sized>(mut self, name: &'a N) -> Self {
        self.name = Some(name.as_ref());
        self
    }

    pub fn with_notes<N: AsRef<[u8]> + ?Sized>(mut self, notes: &'a N) -> Self {
        self.notes = Some(notes.as_ref());
        self
    }

    pub fn with_row_stride_bits(mut self, row_stride_bits: u32) -> Self {
        self.row_stride_bits = row_stride_bits;
        self
    }

    /// Format bytes as they go on the wire.
    pub fn format_bytes(&self) -> &'a [u8] {
        capped(self.format, FORMAT_CAPACITY)
    }

    /// Name bytes as they go on the wire (empty when absent).
    pub fn name_bytes(&self) -> &'a [u8] {
        self.name.map(|n| capped(n, NAME_CAPACITY)).unwrap_or(&[])
    }

    /// Notes bytes as they go on the wire (empty when absent).
    pub fn notes_bytes(&self) -> &'a [u8] {
        self.notes.map(|n| capped(n, NOTES_CAPACITY)).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_strings_pass_through() {
        assert_eq!(capped(b"R8G8B8", FORMAT_CAPACITY), b"R8G8B8");
        assert_eq!(capped(b"", NAME_CAPACITY), b"");
    }

    #[test]
    fn long_strings_are_cut_to_capacity_minus_one() {
        let long = vec![b'x'; 10_000];
        assert_eq!(capped(&long, FORMAT_CAPACITY).len(), 127);
        assert_eq!(capped(&long, NAME_CAPACITY).len(), 127);
        assert_eq!(capped(&long, NOTES_CAPACITY).len(), 4095);

        let exact = vec![b'y'; NAME_CAPACITY];
        assert_eq!(capped(&exact, NAME_CAPACITY).len(), NAME_CAPACITY - 1);
    }

    #[test]
    fn embedded_nul_ends_the_string() {
        assert_eq!(capped(b"abc\0def", NAME_CAPACITY), b"abc");
    }

    #[test]
    fn builder_sets_optional_fields() {
        let payload = [0u8; 6];
        let desc = ImageDescriptor::new(2, 1, "R8G8B8", &payload)
            .with_name("t")
            .with_notes("")
            .with_row_stride_bits(48);

        assert_eq!(desc.format_bytes(), b"R8G8B8");
        assert_eq!(desc.name_bytes(), b"t");
        assert_eq!(desc.notes_bytes(), b"");
        assert_eq!(desc.row_stride_bits, 48);
    }

    #[test]
    fn missing_name_and_notes_are_empty() {
        let desc = ImageDescriptor::new(1, 1, "R8", &[7u8]);
        assert!(desc.name_bytes().is_empty());
        assert!(desc.notes_bytes().is_empty());
    }
}
