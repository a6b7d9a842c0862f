// Format expressions handed to yt-dlp.
//
// mp4 video + m4a audio is preferred so the merge into an mp4 container is a
// plain remux; every expression ends in an unrestricted `b` fallback.

use crate::domain::Quality;

const AUDIO_ONLY: &str = "ba/b";

/// Maps a quality tier and the audio-only flag to a format expression.
pub fn format_expression(quality: Quality, audio_only: bool) -> String {
    if audio_only {
        return AUDIO_ONLY.to_string();
    }

    match quality.max_height() {
        None => "bv*[ext=mp4]+ba[ext=m4a]/bv*+ba/b".to_string(),
        Some(height) => format!(
            "bv*[height<={h}][ext=mp4]+ba[ext=m4a]/bv*[height<={h}]+ba/b",
            h = height
        ),
    }
}
