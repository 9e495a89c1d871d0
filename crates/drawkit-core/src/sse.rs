//! Incremental Server-Sent Events decoder.
//!
//! Feed it bytes as they arrive with [`SseDecoder::push`]; it hands back every
//! frame completed by a blank line. Lines end with `\n`, `\r\n` or a lone
//! `\r`. Chunk boundaries may fall anywhere, including inside a UTF-8
//! sequence or between `\r` and `\n`.
//!
//! Supported fields are `event`, `data` (multi-line, joined with `\n`) and
//! `id`. Comments (`:` lines) and unknown fields such as `retry` are skipped.

/// One dispatched SSE frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
    pub id: Option<String>,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
    id: Option<String>,
    /// The last line ended with `\r`; a leading `\n` belongs to it.
    after_cr: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return the frames it completes, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();

        loop {
            if self.after_cr {
                match self.buffer.first() {
                    Some(b'\n') => {
                        self.buffer.drain(..1);
                        self.after_cr = false;
                    }
                    Some(_) => self.after_cr = false,
                    None => break,
                }
            }
            let Some(pos) = self.buffer.iter().position(|&b| b == b'\n' || b == b'\r') else {
                break;
            };
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.after_cr = line.pop() == Some(b'\r');
            match std::str::from_utf8(&line) {
                Ok(text) => {
                    if let Some(frame) = self.process_line(text) {
                        frames.push(frame);
                    }
                }
                Err(_) => log::warn!("skipping non-UTF-8 SSE line ({} bytes)", line.len()),
            }
        }
        frames
    }

    /// Flush whatever is left once the byte stream has ended.
    ///
    /// An unterminated last line is processed and a pending frame is
    /// dispatched even without its closing blank line.
    pub fn finish(&mut self) -> Option<SseFrame> {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let text = String::from_utf8_lossy(&rest);
            if let Some(frame) = self.process_line(&text) {
                return Some(frame);
            }
        }
        self.dispatch()
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            "id" => self.id = Some(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        let id = self.id.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseFrame {
            event: event.filter(|e| !e.is_empty()),
            data,
            id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(chunks: &[&[u8]]) -> Vec<SseFrame> {
        let mut decoder = SseDecoder::new();
        let mut frames: Vec<SseFrame> = chunks.iter().flat_map(|c| decoder.push(c)).collect();
        frames.extend(decoder.finish());
        frames
    }

    const FEED: &str = "event: entropy\ndata: {\"bytes\":512}\n\n\
                        : keep-alive\n\n\
                        data: {\"plain\":true}\n\n\
                        event: final\r\nid: 7\r\ndata: {\"status\":\"done\"}\r\n\r\n";

    #[test]
    fn decodes_named_and_unnamed_frames() {
        let frames = decode_all(&[FEED.as_bytes()]);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].event.as_deref(), Some("entropy"));
        assert_eq!(frames[0].data, "{\"bytes\":512}");
        assert_eq!(frames[1].event, None);
        assert_eq!(frames[2].event.as_deref(), Some("final"));
        assert_eq!(frames[2].id.as_deref(), Some("7"));
    }

    #[test]
    fn any_split_point_gives_same_frames() {
        let whole = decode_all(&[FEED.as_bytes()]);
        let bytes = FEED.as_bytes();
        for split in 1..bytes.len() {
            let (a, b) = bytes.split_at(split);
            assert_eq!(decode_all(&[a, b]), whole, "split at {split}");
        }
    }

    #[test]
    fn byte_at_a_time() {
        let bytes = FEED.as_bytes();
        let chunks: Vec<&[u8]> = bytes.chunks(1).collect();
        assert_eq!(decode_all(&chunks).len(), 3);
    }

    #[test]
    fn lone_cr_ends_lines() {
        let frames = decode_all(&[b"event: seed\rdata: {}\r\revent: final\rdata: 1\r\r"]);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].event.as_deref(), Some("seed"));
        assert_eq!(frames[1].data, "1");
    }

    #[test]
    fn crlf_split_after_cr_is_one_terminator() {
        // a stray empty line here would dispatch "a" on its own
        let frames = decode_all(&[b"data: a\r", b"\ndata: b\r\n\r\n"]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "a\nb");
    }

    #[test]
    fn multi_line_data_is_joined() {
        let frames = decode_all(&[b"data: {\"a\":\ndata: 1}\n\n"]);
        assert_eq!(frames[0].data, "{\"a\":\n1}");
    }

    #[test]
    fn only_one_leading_space_is_stripped() {
        let frames = decode_all(&[b"data:  x\n\n"]);
        assert_eq!(frames[0].data, " x");
        let frames = decode_all(&[b"data:x\n\n"]);
        assert_eq!(frames[0].data, "x");
    }

    #[test]
    fn event_without_data_is_not_dispatched() {
        let frames = decode_all(&[b"event: ping\n\nevent: seed\ndata: {}\n\n"]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event.as_deref(), Some("seed"));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let frames = decode_all(&[b"retry: 3000\nfoo: bar\ndata: {}\n\n"]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "{}");
    }

    #[test]
    fn finish_flushes_unterminated_frame() {
        let frames = decode_all(&[b"event: final\ndata: {\"status\":\"done\"}"]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event.as_deref(), Some("final"));
    }

    #[test]
    fn finish_on_clean_stream_is_empty() {
        let mut decoder = SseDecoder::new();
        assert_eq!(decoder.push(b"data: 1\n\n").len(), 1);
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn utf8_split_across_chunks() {
        let text = "data: {\"name\":\"энтропия\"}\n\n".as_bytes();
        // split inside the first Cyrillic character
        let at = text.iter().position(|&b| b >= 0x80).unwrap() + 1;
        let frames = decode_all(&[&text[..at], &text[at..]]);
        assert_eq!(frames[0].data, "{\"name\":\"энтропия\"}");
    }
}
