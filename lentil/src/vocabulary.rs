use crate::common::*;
use crate::error::LentilError;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Namespace of the topic model's vocabulary
pub const VAE_NAMESPACE: &str = "vae";

/// Tokens that never count as words of the corpus
pub const SPECIAL_TOKENS: [&str; 4] = ["@@PADDING@@", "@@UNKNOWN@@", "@@START@@", "@@END@@"];

/// A fixed index <-> token mapping of one namespace
#[derive(Clone, Debug)]
pub struct Vocabulary {
    namespace: Box<str>,
    tokens: Vec<Box<str>>,
    index: HashMap<Box<str>, usize>,
    serialization_dir: Option<PathBuf>,
}

impl Vocabulary {
    /// Build from tokens in index order; duplicates are rejected
    pub fn from_tokens<I, S>(namespace: &str, tokens: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<Box<str>>,
    {
        let tokens: Vec<Box<str>> = tokens.into_iter().map(Into::into).collect();
        let mut index = HashMap::with_capacity(tokens.len());
        for (i, t) in tokens.iter().enumerate() {
            if index.insert(t.clone(), i).is_some() {
                return Err(LentilError::configuration(format!(
                    "duplicate token `{}` in namespace `{}`",
                    t, namespace
                ))
                .into());
            }
        }
        Ok(Self {
            namespace: namespace.into(),
            tokens,
            index,
            serialization_dir: None,
        })
    }

    /// One token per line, gzipped or not. Line `i` is index `i`, so a
    /// blank line is rejected rather than skipped.
    pub fn from_file<P: AsRef<Path>>(namespace: &str, vocab_file: P) -> anyhow::Result<Self> {
        let lines = read_lines(&vocab_file)?;
        let mut tokens = Vec::with_capacity(lines.len());
        for (i, line) in lines.iter().enumerate() {
            let token = line.trim();
            if token.is_empty() {
                return Err(LentilError::configuration(format!(
                    "blank line {} in {}",
                    i + 1,
                    vocab_file.as_ref().display()
                ))
                .into());
            }
            tokens.push(token.to_string().into_boxed_str());
        }
        let vocab = Self::from_tokens(namespace, tokens)?;
        info!(
            "read {} tokens into `{}` from {}",
            vocab.len(),
            namespace,
            vocab_file.as_ref().display()
        );
        Ok(vocab)
    }

    /// Directory under which per-epoch artifacts (e.g., `topics/`) go
    pub fn with_serialization_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.serialization_dir = Some(dir.into());
        self
    }

    pub fn serialization_dir(&self) -> Option<&Path> {
        self.serialization_dir.as_deref()
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn token(&self, index: usize) -> Option<&str> {
        self.tokens.get(index).map(|t| t.as_ref())
    }

    pub fn index(&self, token: &str) -> Option<usize> {
        self.index.get(token).copied()
    }

    pub fn tokens(&self) -> &[Box<str>] {
        &self.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_both_ways() {
        let vocab = Vocabulary::from_tokens(VAE_NAMESPACE, ["a", "b", "c"]).unwrap();
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.token(1), Some("b"));
        assert_eq!(vocab.index("c"), Some(2));
        assert_eq!(vocab.token(3), None);
        assert_eq!(vocab.index("z"), None);
        assert_eq!(vocab.namespace(), "vae");
    }

    #[test]
    fn test_duplicates_rejected() {
        let err = Vocabulary::from_tokens(VAE_NAMESPACE, ["a", "a"]).unwrap_err();
        let err = err.downcast_ref::<LentilError>().unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_blank_line_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("vocab.txt");

        std::fs::write(&file, "apple\n banana \ncherry\n").unwrap();
        let vocab = Vocabulary::from_file(VAE_NAMESPACE, &file).unwrap();
        assert_eq!(vocab.index("banana"), Some(1));
        assert_eq!(vocab.index("cherry"), Some(2));

        std::fs::write(&file, "apple\n\ncherry\n").unwrap();
        let err = Vocabulary::from_file(VAE_NAMESPACE, &file).unwrap_err();
        assert!(err.downcast_ref::<LentilError>().unwrap().is_configuration());
    }
}
