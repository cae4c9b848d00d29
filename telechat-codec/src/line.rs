/// Reassembles complete lines from arbitrarily chunked text.
///
/// `\r\n` and bare `\r` both terminate a line. Text after the last
/// terminator is retained until a later chunk completes it.
#[derive(Debug, Default, Clone)]
pub struct LineAssembler {
    partial: String,
    /// The previous chunk ended in `\r`; a leading `\n` belongs to it.
    pending_cr: bool,
}

impl LineAssembler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed decoded text and collect every line it completes, in order.
    pub fn feed(&mut self, chunk: &str) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = chunk;

        if self.pending_cr && !rest.is_empty() {
            self.pending_cr = false;
            rest = rest.strip_prefix('\n').unwrap_or(rest);
        }

        while let Some(idx) = rest.find(|c: char| c == '\r' || c == '\n') {
            self.partial.push_str(&rest[..idx]);
            lines.push(std::mem::take(&mut self.partial));

            let after = &rest[idx + 1..];
            rest = if rest.as_bytes()[idx] == b'\r' {
                match after.strip_prefix('\n') {
                    Some(after) => after,
                    None if after.is_empty() => {
                        self.pending_cr = true;
                        after
                    },
                    None => after,
                }
            } else {
                after
            };
        }

        self.partial.push_str(rest);
        lines
    }

    /// The retained, not yet terminated text.
    pub fn partial(&self) -> &str {
        &self.partial
    }

    pub fn reset(&mut self) {
        self.partial.clear();
        self.pending_cr = false;
    }
}
