//! Balanced-delimiter splitting shared by the union, intersection,
//! object-member, and tuple-element paths of the type-expression parser.

/// Split `input` at `delim`, but only where bracket/generic nesting depth is
/// zero. A single left-to-right scan tracks depth over `< ( [ {` and
/// `> ) ] }`; segments come back trimmed, empty segments dropped.
pub fn split_top_level(input: &str, delim: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth: usize = 0;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        match c {
            '<' | '(' | '[' | '{' => depth += 1,
            '>' | ')' | ']' | '}' => depth = depth.saturating_sub(1),
            c if c == delim && depth == 0 => {
                let piece = input[start..i].trim();
                if !piece.is_empty() {
                    parts.push(piece);
                }
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    let tail = input[start..].trim();
    if !tail.is_empty() {
        parts.push(tail);
    }
    parts
}
