//! Watermark filter construction, grounded in `get_watermark_filter` from
//! the original bot: a `drawtext` filter with a fixed style, escaped the
//! same way, positioned from a small named-position table.

/// Escapes ffmpeg `drawtext` special characters the way the original bot
/// does: backslashes first (so later escapes aren't double-escaped), then
/// quotes, colons, and percent signs.
pub fn escape_drawtext(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('\'', "\u{2019}")
        .replace(':', "\\:")
        .replace('%', "\\%")
}

/// Maps a named corner/center position to a `drawtext` `x=...:y=...`
/// expression. Unknown names fall back to bottom-right, matching the
/// original's `position_map.get(..., default)`.
pub fn position_expr(position: &str) -> &'static str {
    match position {
        "top-left" => "x=10:y=10",
        "top-right" => "x=w-text_w-10:y=10",
        "bottom-left" => "x=10:y=h-text_h-10",
        "center" => "x=(w-text_w)/2:y=(h-text_h)/2",
        _ => "x=w-text_w-10:y=h-text_h-10",
    }
}

/// Builds the full `drawtext` filter expression, or `None` when watermarking
/// is disabled.
pub fn watermark_filter(enabled: bool, text: &str, position: &str) -> Option<String> {
    if !enabled {
        return None;
    }
    let escaped = escape_drawtext(text);
    let position = position_expr(position);
    Some(format!(
        "drawtext=text='{escaped}':fontcolor=white@0.9:fontsize=24:box=1:boxcolor=black@0.6:boxborderw=3:{position}"
    ))
}
