use crate::common::*;
use crate::error::LentilError;
use crate::vocabulary::Vocabulary;

use comfy_table::presets::ASCII_MARKDOWN;
use comfy_table::{Cell, ContentArrangement, Table};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

/// Label of the background pseudo-topic
pub const BACKGROUND_LABEL: &str = "bg";

/// Number of words shown per topic by default
pub const DEFAULT_TOP_K: usize = 20;

const TOPIC_HEADER: [&str; 2] = ["Topic #", "Words"];

/// A labelled list of words, most relevant first
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Topic {
    pub label: Box<str>,
    pub words: Vec<Box<str>>,
}

impl Topic {
    pub fn is_background(&self) -> bool {
        self.label.as_ref() == BACKGROUND_LABEL
    }
}

/// Indices sorted by descending score. Ties keep index order and NaN
/// sorts last.
pub fn rank_descending(scores: &[f32]) -> Vec<usize> {
    let key = |i: usize| {
        let x = scores[i];
        if x.is_nan() {
            f32::NEG_INFINITY
        } else {
            // -0.0 and 0.0 tie
            x + 0.0
        }
    };
    let mut indices: Vec<usize> = (0..scores.len()).collect();
    indices.sort_by(|&a, &b| key(b).total_cmp(&key(a)));
    indices
}

/// Turns the background vector and the topic-word matrix into word lists
#[derive(Clone, Debug)]
pub struct TopicExtractor {
    words: Vec<Box<str>>,
}

impl TopicExtractor {
    /// Tokens are resolved once here
    pub fn new(vocab: &Vocabulary) -> Self {
        Self {
            words: vocab.tokens().to_vec(),
        }
    }

    pub fn num_words(&self) -> usize {
        self.words.len()
    }

    fn top_words(&self, scores: &[f32], k: usize) -> Vec<Box<str>> {
        rank_descending(scores)
            .into_iter()
            .take(k)
            .map(|j| self.words[j].clone())
            .collect()
    }

    fn check_width(&self, what: &'static str, width: usize) -> crate::error::Result<()> {
        if width != self.words.len() {
            return Err(LentilError::dimension_mismatch(what, self.words.len(), width));
        }
        Ok(())
    }

    /// The `bg` row first, then topics labelled "0", "1", ...
    ///
    /// * `background` - current background values over the vocabulary
    /// * `topic_word` - one row of word weights per topic
    /// * `k` - words per topic (capped by the vocabulary size)
    pub fn extract(
        &self,
        background: &[f32],
        topic_word: &[Vec<f32>],
        k: usize,
    ) -> crate::error::Result<Vec<Topic>> {
        self.check_width("background width", background.len())?;
        for row in topic_word {
            self.check_width("topic-word width", row.len())?;
        }

        let mut topics = Vec::with_capacity(topic_word.len() + 1);
        topics.push(Topic {
            label: BACKGROUND_LABEL.into(),
            words: self.top_words(background, k),
        });
        for (t, row) in topic_word.iter().enumerate() {
            topics.push(Topic {
                label: t.to_string().into_boxed_str(),
                words: self.top_words(row, k),
            });
        }
        Ok(topics)
    }

    /// Same as [`extract`](Self::extract) with a `K x V` tensor
    pub fn extract_tensor(
        &self,
        background: &[f32],
        topic_word_kd: &Tensor,
        k: usize,
    ) -> anyhow::Result<Vec<Topic>> {
        let topic_word = topic_word_kd
            .to_device(&Device::Cpu)?
            .to_dtype(DType::F32)?
            .to_vec2::<f32>()?;
        Ok(self.extract(background, &topic_word, k)?)
    }
}

/// Make a token safe inside a table cell of space-separated words:
/// `\` -> `\\`, `|` -> `\p`, space -> `\s`, tab -> `\t`, other
/// whitespace -> `\u{hex}`
pub fn escape_token(token: &str) -> String {
    let mut ret = String::with_capacity(token.len());
    for c in token.chars() {
        match c {
            '\\' => ret.push_str("\\\\"),
            '|' => ret.push_str("\\p"),
            ' ' => ret.push_str("\\s"),
            '\t' => ret.push_str("\\t"),
            c if c.is_whitespace() => ret.push_str(&format!("\\u{{{:x}}}", c as u32)),
            c => ret.push(c),
        }
    }
    ret
}

/// Inverse of [`escape_token`]
pub fn unescape_token(escaped: &str) -> crate::error::Result<String> {
    let malformed = || LentilError::configuration(format!("malformed token `{}`", escaped));

    let mut ret = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            ret.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => ret.push('\\'),
            Some('p') => ret.push('|'),
            Some('s') => ret.push(' '),
            Some('t') => ret.push('\t'),
            Some('u') => {
                if chars.next() != Some('{') {
                    return Err(malformed());
                }
                let hex: String = chars.by_ref().take_while(|&h| h != '}').collect();
                let code = u32::from_str_radix(&hex, 16).map_err(|_| malformed())?;
                ret.push(char::from_u32(code).ok_or_else(malformed)?);
            }
            _ => return Err(malformed()),
        }
    }
    Ok(ret)
}

/// A markdown-style table with one row per topic; words are escaped
/// with [`escape_token`]
pub fn render_topics_table(topics: &[Topic]) -> String {
    let mut table = Table::new();
    table
        .load_preset(ASCII_MARKDOWN)
        .set_content_arrangement(ContentArrangement::Disabled)
        .set_header(TOPIC_HEADER.to_vec());

    for topic in topics {
        table.add_row(vec![
            Cell::new(topic.label.as_ref()),
            Cell::new(
                topic
                    .words
                    .iter()
                    .map(|w| escape_token(w))
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
        ]);
    }
    table.to_string()
}

pub fn topics_dir(serialization_dir: &Path) -> PathBuf {
    serialization_dir.join("topics")
}

/// `<serialization_dir>/topics/topics_<epoch>.txt`
pub fn topics_file_path(serialization_dir: &Path, epoch_num: usize) -> PathBuf {
    topics_dir(serialization_dir).join(format!("topics_{}.txt", epoch_num))
}

/// Render and write; an existing file of the same epoch is replaced
pub fn write_topics_file(
    serialization_dir: &Path,
    epoch_num: usize,
    topics: &[Topic],
) -> anyhow::Result<PathBuf> {
    mkdir(topics_dir(serialization_dir))?;
    let path = topics_file_path(serialization_dir, epoch_num);
    let mut writer = open_buf_writer(&path)?;
    writeln!(writer, "{}", render_topics_table(topics))?;
    writer.flush()?;
    Ok(path)
}

fn is_separator(line: &str) -> bool {
    line.chars()
        .all(|c| matches!(c, '|' | '-' | '+' | ':') || c.is_whitespace())
}

/// Read back a file written by [`write_topics_file`]
pub fn read_topics_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<Topic>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(LentilError::not_found(format!("topic file {}", path.display())).into());
    }
    let reader = open_buf_reader(path)?;

    let mut topics = vec![];
    let mut seen_header = false;
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || is_separator(line) {
            continue;
        }
        let cells: Vec<&str> = line
            .trim_start_matches('|')
            .trim_end_matches('|')
            .split('|')
            .map(str::trim)
            .collect();

        if !seen_header {
            seen_header = true;
            if cells.first() == Some(&TOPIC_HEADER[0]) {
                continue;
            }
        }

        let label = cells.first().copied().unwrap_or_default();
        let words = cells
            .get(1)
            .map(|w| {
                w.split_whitespace()
                    .map(|t| unescape_token(t).map(String::into_boxed_str))
                    .collect::<crate::error::Result<Vec<_>>>()
            })
            .transpose()?
            .unwrap_or_default();
        topics.push(Topic {
            label: label.into(),
            words,
        });
    }
    Ok(topics)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(ws: &[&str]) -> Vec<Box<str>> {
        ws.iter().map(|&w| w.into()).collect()
    }

    fn abc() -> TopicExtractor {
        let vocab = Vocabulary::from_tokens("vae", ["a", "b", "c"]).unwrap();
        TopicExtractor::new(&vocab)
    }

    #[test]
    fn test_background_row_comes_first() {
        let topics = abc()
            .extract(&[1.0, 3.0, 2.0], &[vec![0.1, 0.9, 0.5], vec![0.7, 0.2, 0.1]], 2)
            .unwrap();

        assert_eq!(topics.len(), 3);
        assert!(topics[0].is_background());
        assert_eq!(topics[0].words, words(&["b", "c"]));
        assert_eq!(topics[1].label.as_ref(), "0");
        assert_eq!(topics[1].words, words(&["b", "c"]));
        assert_eq!(topics[2].label.as_ref(), "1");
        assert_eq!(topics[2].words, words(&["a", "b"]));
    }

    #[test]
    fn test_k_is_capped_and_ties_are_stable() {
        let topics = abc().extract(&[0.0, 0.0, 0.0], &[], 10).unwrap();
        assert_eq!(topics.len(), 1);
        assert_eq!(topics[0].words, words(&["a", "b", "c"]));
    }

    #[test]
    fn test_width_mismatch() {
        let err = abc().extract(&[0.0, 1.0], &[], 2).unwrap_err();
        assert!(matches!(err, LentilError::DimensionMismatch { .. }));
        let err = abc().extract(&[0.0, 1.0, 2.0], &[vec![1.0]], 2).unwrap_err();
        assert!(matches!(
            err,
            LentilError::DimensionMismatch {
                expected: 3,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_nan_ranks_last() {
        assert_eq!(rank_descending(&[f32::NAN, 1.0, -1.0]), vec![1, 2, 0]);
    }

    #[test]
    fn test_topics_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let topics = abc()
            .extract(&[1.0, 3.0, 2.0], &[vec![0.1, 0.9, 0.5]], 3)
            .unwrap();

        let path = write_topics_file(dir.path(), 4, &topics).unwrap();
        assert_eq!(path, dir.path().join("topics").join("topics_4.txt"));
        // same epoch again just replaces it
        write_topics_file(dir.path(), 4, &topics).unwrap();

        assert_eq!(read_topics_file(&path).unwrap(), topics);
    }

    #[test]
    fn test_negative_zero_ties_with_zero() {
        assert_eq!(rank_descending(&[-0.0, 0.0]), vec![0, 1]);
        assert_eq!(rank_descending(&[0.0, -0.0, 1.0]), vec![2, 0, 1]);
    }

    #[test]
    fn test_tokens_with_spaces_and_bars_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let tokens = ["new york", "a|b", "c", "back\\slash", "tab\there", "nb\u{a0}sp"];
        let vocab = Vocabulary::from_tokens("vae", tokens).unwrap();
        let extractor = TopicExtractor::new(&vocab);

        let topics = extractor
            .extract(
                &[6.0, 5.0, 4.0, 3.0, 2.0, 1.0],
                &[vec![0.1, 0.9, 0.5, 0.3, 0.2, 0.8]],
                6,
            )
            .unwrap();
        assert_eq!(topics[0].words, words(&tokens));

        let path = write_topics_file(dir.path(), 1, &topics).unwrap();
        assert_eq!(read_topics_file(&path).unwrap(), topics);
    }

    #[test]
    fn test_escape_is_reversible() {
        for token in ["", "plain", "a b", "|", "\\p", "x\\", "\u{2003}"] {
            let escaped = escape_token(token);
            assert!(!escaped.contains('|'));
            assert!(!escaped.chars().any(char::is_whitespace));
            assert_eq!(unescape_token(&escaped).unwrap(), token);
        }
        assert!(unescape_token("bad\\q").unwrap_err().is_configuration());
        assert!(unescape_token("bad\\").unwrap_err().is_configuration());
    }

    #[test]
    fn test_missing_topics_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_topics_file(dir.path().join("nope.txt")).unwrap_err();
        assert!(err.downcast_ref::<LentilError>().unwrap().is_not_found());
    }
}
