//! Outbound chunking: fitting a drained batch under the sink's size cap.
//!
//! Applied after `drain`, before handing text to the sink. The drained text
//! is split into the fewest contiguous chunks of at most `max_size` bytes,
//! splitting only at line boundaries; chunk order preserves line order. A
//! single line longer than the cap is hard-truncated at a UTF-8 character
//! boundary with [`TRUNCATION_MARKER`] appended, never cut mid-character.
//!
//! [`collapse_tail`] implements the lossy-backpressure window: when the rate
//! limiter denies a flush, only the trailing lines that fit one message are
//! kept, oldest first to go.

/// Appended to a line that had to be hard-truncated to fit the cap.
pub const TRUNCATION_MARKER: &str = " …[truncated]";

/// Splits `text` into chunks of at most `max_size` bytes at line boundaries.
///
/// Over-long single lines are truncated via [`truncate_line`]. Empty input
/// yields no chunks.
pub fn chunk_message(text: &str, max_size: usize) -> Vec<String> {
    let max_size = max_size.max(1);
    if text.is_empty() {
        return Vec::new();
    }
    if text.len() <= max_size {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    for line in text.split('\n') {
        let line = if line.len() > max_size {
            truncate_line(line, max_size)
        } else {
            line.to_string()
        };

        let cost = line.len() + usize::from(!current.is_empty());
        if !current.is_empty() && current.len() + cost > max_size {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(&line);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Keeps only the trailing window of lines fitting in `max_size` bytes.
///
/// Returns the window (original line order) and the number of older lines
/// dropped. A trailing line that alone exceeds the cap is truncated so the
/// window is never empty while input lines exist.
pub fn collapse_tail(text: &str, max_size: usize) -> (String, usize) {
    let max_size = max_size.max(1);
    let lines: Vec<&str> = text.split('\n').collect();
    let mut kept: Vec<String> = Vec::new();
    let mut used = 0usize;

    for line in lines.iter().rev() {
        let line = if line.len() > max_size {
            truncate_line(line, max_size)
        } else {
            (*line).to_string()
        };
        let cost = line.len() + usize::from(!kept.is_empty());
        if used + cost > max_size {
            break;
        }
        used += cost;
        kept.push(line);
    }

    let dropped = lines.len() - kept.len();
    kept.reverse();
    (kept.join("\n"), dropped)
}

/// Hard-truncates one line to `max_size` bytes, appending the marker when it
/// fits, and always cutting at a character boundary.
fn truncate_line(line: &str, max_size: usize) -> String {
    if line.len() <= max_size {
        return line.to_string();
    }
    let budget = max_size.saturating_sub(TRUNCATION_MARKER.len());
    if budget == 0 {
        return line[..floor_char_boundary(line, max_size)].to_string();
    }
    let cut = floor_char_boundary(line, budget);
    format!("{}{}", &line[..cut], TRUNCATION_MARKER)
}

/// Largest index ≤ `idx` that lies on a UTF-8 character boundary.
fn floor_char_boundary(s: &str, idx: usize) -> usize {
    if idx >= s.len() {
        return s.len();
    }
    let mut i = idx;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(chunk_message("hello", 100), vec!["hello".to_string()]);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk_message("", 100).is_empty());
    }

    #[test]
    fn three_times_cap_reconstructs_in_order() {
        let max = 100;
        let lines: Vec<String> = (0..30).map(|i| format!("line-{i:02}-{}", "x".repeat(20))).collect();
        let text = lines.join("\n");
        assert!(text.len() >= 3 * max);

        let chunks = chunk_message(&text, max);
        assert!(chunks.len() >= 3);
        for chunk in &chunks {
            assert!(chunk.len() <= max, "chunk of {} bytes over cap", chunk.len());
        }
        let rejoined = chunks.join("\n");
        assert_eq!(rejoined, text);
    }

    #[test]
    fn overlong_line_is_truncated_with_marker() {
        let line = "y".repeat(500);
        let chunks = chunk_message(&line, 100);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].len() <= 100);
        assert!(chunks[0].ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // multibyte content near the cut point must not split a character
        let line = "д".repeat(300);
        let chunks = chunk_message(&line, 101);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].len() <= 101);
        assert!(std::str::from_utf8(chunks[0].as_bytes()).is_ok());
    }

    #[test]
    fn collapse_keeps_trailing_window() {
        let lines: Vec<String> = (0..20).map(|i| format!("line-{i:02}")).collect();
        let text = lines.join("\n");
        let (window, dropped) = collapse_tail(&text, 30);

        assert!(dropped > 0);
        assert!(window.len() <= 30);
        // the newest line is always preserved
        assert!(window.ends_with("line-19"));
        // kept lines remain in original order
        let kept: Vec<&str> = window.split('\n').collect();
        assert_eq!(kept.len(), 20 - dropped);
        assert_eq!(kept.last().copied(), Some("line-19"));
        assert_eq!(kept[0], format!("line-{dropped:02}"));
    }

    #[test]
    fn collapse_of_fitting_text_drops_nothing() {
        let (window, dropped) = collapse_tail("a\nb\nc", 100);
        assert_eq!(window, "a\nb\nc");
        assert_eq!(dropped, 0);
    }
}
