//! Frame Assembler
//!
//! Transports may split one logical JSON document across several text
//! frames. This component accumulates fragments per session and hands a
//! document to the dispatcher only once its brackets balance.
//!
//! It never parses and never errors: a frame is either complete or not yet
//! complete. Unbalanced garbage simply accumulates until the session's
//! buffer is cleared on disconnect.

use dashmap::DashMap;

/// Per-session reassembly of fragmented text frames.
pub struct FrameAssembler {
    buffers: DashMap<String, String>,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self {
            buffers: DashMap::new(),
        }
    }

    /// Append `chunk` to the session's buffer. Returns the full accumulated
    /// text when it forms a complete top-level JSON document, consuming the
    /// buffer; otherwise returns `None` and keeps accumulating.
    pub fn feed(&self, session_id: &str, chunk: &str) -> Option<String> {
        let complete = {
            let mut buffer = self.buffers.entry(session_id.to_string()).or_default();
            buffer.push_str(chunk);
            is_complete_document(&buffer)
        };

        if complete {
            self.buffers.remove(session_id).map(|(_, buffer)| buffer)
        } else {
            None
        }
    }

    /// Drop any in-flight buffer for the session. Called on disconnect so a
    /// session that never completes a frame does not leak its partial data.
    pub fn clear(&self, session_id: &str) {
        self.buffers.remove(session_id);
    }

    pub fn pending(&self, session_id: &str) -> bool {
        self.buffers.contains_key(session_id)
    }

    pub fn pending_count(&self) -> usize {
        self.buffers.len()
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

/// Single scan over the accumulated text: string mode (either quote
/// character toggles it, since the producer is not guaranteed strict JSON),
/// backslash escapes, and a stack of opened brackets. Complete iff the text
/// starts with `{` or `[`, the stack empties, and the scan ends outside a
/// string. A mismatched closer is "not yet complete", never an error.
fn is_complete_document(text: &str) -> bool {
    let trimmed = text.trim_start();
    if !trimmed.starts_with('{') && !trimmed.starts_with('[') {
        return false;
    }

    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut quote = '"';
    let mut escaped = false;

    for ch in trimmed.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        if in_string {
            match ch {
                '\\' => escaped = true,
                _ if ch == quote => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' | '\'' => {
                in_string = true;
                quote = ch;
            }
            '{' | '[' => stack.push(ch),
            '}' => {
                if stack.pop() != Some('{') {
                    return false;
                }
            }
            ']' => {
                if stack.pop() != Some('[') {
                    return false;
                }
            }
            _ => {}
        }
    }

    stack.is_empty() && !in_string
}
