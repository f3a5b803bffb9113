//! SRT to WebVTT conversion.
//!
//! Line oriented and stateless: cue index lines are dropped, the sub-second
//! comma in time ranges becomes a period, everything else passes through.
//! Timestamps are not otherwise validated.

const HEADER: &str = "WEBVTT\n\n";
const TIME_RANGE_SEPARATOR: &str = "-->";

/// Convert raw SRT bytes into WebVTT text.
pub fn srt_to_vtt(srt: &[u8]) -> String {
    let content = String::from_utf8_lossy(srt);
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
    let content = content.replace("\r\n", "\n").replace('\r', "\n");

    let mut vtt = String::with_capacity(HEADER.len() + content.len());
    vtt.push_str(HEADER);

    for line in content.lines() {
        let line = line.trim();

        if is_cue_index(line) {
            continue;
        }

        if line.contains(TIME_RANGE_SEPARATOR) {
            vtt.push_str(&line.replace(',', "."));
        } else {
            vtt.push_str(line);
        }
        vtt.push('\n');
    }

    vtt
}

fn is_cue_index(line: &str) -> bool {
    !line.is_empty() && line.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str =
        "1\n00:00:01,000 --> 00:00:04,000\nHello\n\n2\n00:00:05,000 --> 00:00:06,500\nWorld\n";

    #[test]
    fn test_converts_sample() {
        assert_eq!(
            srt_to_vtt(SAMPLE.as_bytes()),
            "WEBVTT\n\n00:00:01.000 --> 00:00:04.000\nHello\n\n00:00:05.000 --> 00:00:06.500\nWorld\n"
        );
    }

    #[test]
    fn test_header_on_empty_input() {
        assert_eq!(srt_to_vtt(b""), "WEBVTT\n\n");
    }

    #[test]
    fn test_normalizes_crlf_and_cr() {
        let crlf = SAMPLE.replace('\n', "\r\n");
        assert_eq!(srt_to_vtt(crlf.as_bytes()), srt_to_vtt(SAMPLE.as_bytes()));

        let cr = SAMPLE.replace('\n', "\r");
        assert_eq!(srt_to_vtt(cr.as_bytes()), srt_to_vtt(SAMPLE.as_bytes()));
    }

    #[test]
    fn test_commas_outside_time_ranges_are_kept() {
        let vtt = srt_to_vtt(b"1\n00:00:01,000 --> 00:00:02,000\nWell, hello there\n");
        assert!(vtt.contains("00:00:01.000 --> 00:00:02.000\n"));
        assert!(vtt.contains("Well, hello there\n"));
    }

    #[test]
    fn test_digit_only_dialogue_is_dropped() {
        // Indistinguishable from a cue index line
        let vtt = srt_to_vtt(b"1\n00:00:01,000 --> 00:00:02,000\n42\n");
        assert_eq!(vtt, "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\n");
    }

    #[test]
    fn test_surrounding_whitespace_is_trimmed() {
        let vtt = srt_to_vtt(b"  7  \n 00:00:01,000 --> 00:00:02,000 \n  Hi  \n");
        assert_eq!(vtt, "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nHi\n");
    }

    #[test]
    fn test_strips_byte_order_mark() {
        let mut srt = vec![0xEF, 0xBB, 0xBF];
        srt.extend_from_slice(SAMPLE.as_bytes());
        assert_eq!(srt_to_vtt(&srt), srt_to_vtt(SAMPLE.as_bytes()));
    }

    #[test]
    fn test_invalid_utf8_is_replaced_not_rejected() {
        let vtt = srt_to_vtt(b"1\n00:00:01,000 --> 00:00:02,000\ncaf\xe9\n");
        assert!(vtt.starts_with("WEBVTT\n\n00:00:01.000 --> 00:00:02.000\ncaf"));
    }

    #[test]
    fn test_reconversion_does_not_corrupt_cues() {
        let once = srt_to_vtt(SAMPLE.as_bytes());
        let twice = srt_to_vtt(once.as_bytes());

        // The header is re-emitted, the cue lines are untouched
        assert_eq!(twice, format!("WEBVTT\n\n{}", once));
        assert!(!twice.lines().any(is_cue_index));
    }
}
