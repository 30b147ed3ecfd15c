//! Subtitle quality scoring and variant selection.

use crate::models::media::SubtitleCandidate;
use std::cmp::Ordering;
use std::path::Path;

/// Files smaller than this are never selected.
pub const MIN_SUBTITLE_BYTES: u64 = 100;

const SIZE_WEIGHT: f64 = 1.0;
const BLOCK_WEIGHT: f64 = 10.0;
const LINE_WEIGHT: f64 = 2.0;

/// Quality of one subtitle file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QualityScore {
    /// Too small or unreadable.
    Rejected,
    Scored {
        value: f64,
        blocks: usize,
        lines: usize,
        size: u64,
    },
}

impl QualityScore {
    pub fn value(&self) -> Option<f64> {
        match self {
            QualityScore::Rejected => None,
            QualityScore::Scored { value, .. } => Some(*value),
        }
    }

    /// Ranking key: block count first, weighted score second.
    pub fn rank_key(&self) -> Option<(usize, f64)> {
        match self {
            QualityScore::Rejected => None,
            QualityScore::Scored { value, blocks, .. } => Some((*blocks, *value)),
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, QualityScore::Rejected)
    }
}

fn is_timestamp_line(line: &str) -> bool {
    line.contains("-->")
}

fn is_dialogue_line(line: &str) -> bool {
    line.starts_with("Dialogue:")
}

/// SRT/VTT lines that carry no cue text.
fn is_structural_line(line: &str) -> bool {
    line.chars().all(|c| c.is_ascii_digit())
        || is_timestamp_line(line)
        || line.starts_with("WEBVTT")
        || line.starts_with("NOTE")
}

/// Score subtitle text.
///
/// Blocks are SRT/VTT timestamp lines or ASS/SSA `Dialogue:` lines; lines are
/// non-blank cue text lines. The weighted value alone does not decide a
/// group; see [`select_best`].
pub fn score_text(size: u64, text: &str) -> QualityScore {
    if size < MIN_SUBTITLE_BYTES {
        return QualityScore::Rejected;
    }

    let is_ass = text.lines().any(|l| is_dialogue_line(l.trim_start()));
    let mut blocks = 0;
    let mut lines = 0;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if is_ass {
            if is_dialogue_line(line) {
                blocks += 1;
                // Text is the tenth comma-separated field.
                let has_text = line
                    .splitn(10, ',')
                    .nth(9)
                    .map(|t| !t.trim().is_empty())
                    .unwrap_or(false);
                if has_text {
                    lines += 1;
                }
            }
        } else if is_timestamp_line(line) {
            blocks += 1;
        } else if !is_structural_line(line) {
            lines += 1;
        }
    }

    let value = (size as f64 / 1024.0) * SIZE_WEIGHT
        + blocks as f64 * BLOCK_WEIGHT
        + lines as f64 * LINE_WEIGHT;

    QualityScore::Scored {
        value,
        blocks,
        lines,
        size,
    }
}

/// Read and score a subtitle file. Unreadable files are rejected.
pub fn measure(path: &Path) -> QualityScore {
    match std::fs::read(path) {
        Ok(bytes) => score_text(bytes.len() as u64, &String::from_utf8_lossy(&bytes)),
        Err(e) => {
            tracing::warn!("Failed to read subtitle {:?}: {}", path, e);
            QualityScore::Rejected
        }
    }
}

type Ranked<'a> = (&'a SubtitleCandidate, (usize, f64));

/// Order two scored candidates: more blocks first, then higher score, then
/// lower variant.
fn rank(a: &Ranked<'_>, b: &Ranked<'_>) -> Ordering {
    let (blocks_a, value_a) = a.1;
    let (blocks_b, value_b) = b.1;
    blocks_b
        .cmp(&blocks_a)
        .then_with(|| value_b.partial_cmp(&value_a).unwrap_or(Ordering::Equal))
        .then_with(|| a.0.variant().cmp(&b.0.variant()))
        .then_with(|| a.0.file.path.cmp(&b.0.file.path))
}

/// Pick the best subtitle of a same-language group.
///
/// A file with strictly more dialogue blocks always wins, whatever its size.
/// Returns `None` when every file is rejected.
pub fn select_best<'a>(group: &[&'a SubtitleCandidate]) -> Option<&'a SubtitleCandidate> {
    group
        .iter()
        .filter_map(|c| measure(&c.file.path).rank_key().map(|k| (*c, k)))
        .min_by(rank)
        .map(|(c, _)| c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::media::{FileKind, MediaFile, SubtitleLanguage, SubtitleTag};

    fn candidate(path: &Path, variant: u8) -> SubtitleCandidate {
        SubtitleCandidate {
            file: MediaFile {
                path: path.to_path_buf(),
                filename: path.file_name().unwrap().to_string_lossy().to_string(),
                kind: FileKind::Subtitle,
                size: std::fs::metadata(path).unwrap().len(),
                subtitle: Some(SubtitleTag {
                    base: "Movie".to_string(),
                    language: Some("por".to_string()),
                    variant,
                    forced: false,
                    sdh: false,
                    extension: "srt".to_string(),
                }),
            },
            language: SubtitleLanguage::Code("por".to_string()),
            inferred: false,
        }
    }

    fn srt(blocks: usize) -> String {
        (1..=blocks)
            .map(|i| {
                format!(
                    "{}\n00:00:{:02},000 --> 00:00:{:02},500\nLine number {}\n",
                    i,
                    i % 60,
                    i % 60,
                    i
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_small_file_rejected() {
        assert!(score_text(99, "1\n00:00:01,000 --> 00:00:02,000\nHi\n").is_rejected());
    }

    #[test]
    fn test_counts_blocks_and_lines() {
        let text = srt(3);
        match score_text(text.len() as u64, &text) {
            QualityScore::Scored { blocks, lines, .. } => {
                assert_eq!(blocks, 3);
                assert_eq!(lines, 3);
            }
            QualityScore::Rejected => panic!("expected a score"),
        }
    }

    #[test]
    fn test_ass_dialogue_blocks() {
        let text = "[Script Info]\nTitle: x\n\n[Events]\nFormat: Layer, Start, End, Text\n\
                    Dialogue: 0,0:00:01.00,0:00:02.00,Default,,0,0,0,,Hello\n\
                    Dialogue: 0,0:00:03.00,0:00:04.00,Default,,0,0,0,,World\n";
        match score_text(200, text) {
            QualityScore::Scored { blocks, lines, .. } => {
                assert_eq!(blocks, 2);
                assert_eq!(lines, 2);
            }
            QualityScore::Rejected => panic!("expected a score"),
        }
    }

    #[test]
    fn test_more_blocks_beats_bigger_file() {
        // 65 KB with 40 blocks vs 60 KB with 55 blocks
        let fewer = score_text(65 * 1024, &srt(40)).value().unwrap();
        let more = score_text(60 * 1024, &srt(55)).value().unwrap();
        assert!(more > fewer);
    }

    #[test]
    fn test_padded_file_with_fewer_blocks_loses() {
        let dir = tempfile::TempDir::new().unwrap();
        let dense = dir.path().join("Movie.por2.srt");
        let padded = dir.path().join("Movie.por3.srt");
        std::fs::write(&dense, srt(41)).unwrap();
        std::fs::write(&padded, format!("{}\n{}", srt(40), " ".repeat(40_000))).unwrap();

        let padded_score = measure(&padded);
        let dense_score = measure(&dense);
        // Padding alone outweighs one block in the weighted value
        assert!(padded_score.value().unwrap() > dense_score.value().unwrap());

        let candidates: Vec<SubtitleCandidate> = [(&dense, 2), (&padded, 3)]
            .into_iter()
            .map(|(path, variant)| candidate(path, variant))
            .collect();
        let group: Vec<&SubtitleCandidate> = candidates.iter().collect();
        let best = select_best(&group).unwrap();
        assert_eq!(best.file.path, dense);
    }

    #[test]
    fn test_equal_files_prefer_lower_variant() {
        let dir = tempfile::TempDir::new().unwrap();
        let por2 = dir.path().join("Movie.por2.srt");
        let por3 = dir.path().join("Movie.por3.srt");
        std::fs::write(&por2, srt(20)).unwrap();
        std::fs::write(&por3, srt(20)).unwrap();

        let candidates = vec![candidate(&por3, 3), candidate(&por2, 2)];
        let group: Vec<&SubtitleCandidate> = candidates.iter().collect();
        assert_eq!(select_best(&group).unwrap().file.path, por2);
    }
}
