//! Text buffer that only keeps the end of a long stream

/// Append-only text that keeps roughly its last `limit` bytes.
///
/// The buffer may grow to twice the limit before it drops its head, so the
/// cost of trimming is spread over many appends. Trimming cuts at a line
/// boundary when one is available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailBuffer {
    text: String,
    limit: usize,
    dropped_chars: usize,
}

impl TailBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            text: String::new(),
            limit: limit.max(1),
            dropped_chars: 0,
        }
    }

    pub fn push(&mut self, chunk: &str) {
        self.text.push_str(chunk);
        if self.text.len() > self.limit.saturating_mul(2) {
            self.trim();
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Characters dropped from the head so far
    pub fn dropped_chars(&self) -> usize {
        self.dropped_chars
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.dropped_chars = 0;
    }

    /// Replace the contents, keeping the tail if `text` is over the limit
    pub fn replace(&mut self, text: String) {
        self.clear();
        self.text = text;
        if self.text.len() > self.limit {
            self.trim();
        }
    }

    /// Trim to at most `limit` bytes and return the text with the number of
    /// characters dropped in total
    pub fn finish(mut self) -> (String, usize) {
        if self.text.len() > self.limit {
            self.trim();
        }
        (self.text, self.dropped_chars)
    }

    fn trim(&mut self) {
        let mut cut = self.text.len() - self.limit;
        while !self.text.is_char_boundary(cut) {
            cut += 1;
        }
        if let Some(newline) = self.text[cut..].find('\n') {
            let after = cut + newline + 1;
            if after < self.text.len() {
                cut = after;
            }
        }
        self.dropped_chars += self.text[..cut].chars().count();
        self.text.drain(..cut);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_untouched() {
        let mut buffer = TailBuffer::new(64);
        buffer.push("one\n");
        buffer.push("two\n");
        assert_eq!(buffer.as_str(), "one\ntwo\n");
        assert_eq!(buffer.finish(), ("one\ntwo\n".to_string(), 0));
    }

    #[test]
    fn test_stays_bounded_under_many_appends() {
        let mut buffer = TailBuffer::new(100);
        for i in 0..10_000 {
            buffer.push(&format!("line {i}\n"));
            assert!(buffer.as_str().len() <= 200);
        }
        assert!(buffer.as_str().ends_with("line 9999\n"));
        assert!(buffer.as_str().starts_with("line "));
        assert!(buffer.dropped_chars() > 0);
    }

    #[test]
    fn test_finish_trims_to_limit_at_line_boundary() {
        let mut buffer = TailBuffer::new(12);
        buffer.push("aaaa\nbbbb\ncccc\ndddd\n");
        let (text, dropped) = buffer.finish();
        assert_eq!(text, "cccc\ndddd\n");
        assert_eq!(dropped, 10);
    }

    #[test]
    fn test_trim_respects_char_boundaries() {
        let mut buffer = TailBuffer::new(3);
        buffer.push("éééééé");
        let (text, dropped) = buffer.finish();
        assert!(text.len() <= 3);
        assert!(text.chars().all(|c| c == 'é'));
        assert_eq!(dropped + text.chars().count(), 6);
    }
}
