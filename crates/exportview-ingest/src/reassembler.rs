use bytes::BytesMut;

/// Reassembles newline-terminated lines from a byte stream delivered in
/// arbitrary chunks.
///
/// Splitting happens on raw bytes. `\n` never appears inside a multi-byte
/// UTF-8 sequence, so a character cut in half by a chunk boundary stays in
/// the pending buffer until its tail arrives. Complete lines are decoded
/// lossily: invalid sequences become U+FFFD instead of failing the stream.
#[derive(Debug, Default)]
pub struct LineReassembler {
    pending: BytesMut,
    /// Prefix of `pending` already known to hold no newline.
    scanned: usize,
}

impl LineReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completed, without the
    /// terminating `\n`.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(offset) = self.pending[self.scanned..].iter().position(|&b| b == b'\n') {
            let end = self.scanned + offset;
            let line = self.pending.split_to(end + 1);
            lines.push(String::from_utf8_lossy(&line[..end]).into_owned());
            self.scanned = 0;
        }
        self.scanned = self.pending.len();
        lines
    }

    /// Take whatever is left once the stream has ended. `None` when nothing
    /// but whitespace remains.
    pub fn finish(&mut self) -> Option<String> {
        let rest = self.pending.split();
        self.scanned = 0;
        let text = String::from_utf8_lossy(&rest);
        if text.trim().is_empty() {
            None
        } else {
            Some(text.into_owned())
        }
    }

    /// Bytes held back waiting for a newline.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
