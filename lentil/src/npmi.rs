//! Normalized pointwise mutual information of topic words against a
//! reference corpus

use crate::common::*;
use crate::error::LentilError;
use crate::topics::Topic;

use matrix_util::mtx_io::read_mtx_triplets;
use nalgebra_sparse::CscMatrix;
use std::collections::HashMap;
use std::path::Path;

/// Words per topic considered by NPMI
pub const NPMI_TOP_N: usize = 10;

/// Anything that scores a list of topics by coherence
pub trait CoherenceScorer {
    /// Mean coherence over the non-background topics; NaN if no topic
    /// has a scorable pair
    fn score(&self, topics: &[Topic]) -> anyhow::Result<f64>;
}

/// Document sets of each word in a `documents x words` count matrix
#[derive(Clone, Debug)]
pub struct ReferenceCorpus {
    num_docs: usize,
    word_index: HashMap<Box<str>, usize>,
    word_docs: Vec<Vec<usize>>,
    top_n: usize,
}

impl ReferenceCorpus {
    /// Load `*.mtx[.gz]` counts and a `*.json` token-to-column map from
    /// `ref_dir`. The first file of each kind (by name) is used.
    pub fn from_directory<P: AsRef<Path>>(ref_dir: P) -> anyhow::Result<Self> {
        let ref_dir = ref_dir.as_ref();
        if !ref_dir.is_dir() {
            return Err(LentilError::not_found(format!(
                "reference directory {}",
                ref_dir.display()
            ))
            .into());
        }

        let mtx_file = list_files_with_suffix(ref_dir, &[".mtx", ".mtx.gz"])?
            .into_iter()
            .next()
            .ok_or_else(|| {
                LentilError::not_found(format!("reference counts in {}", ref_dir.display()))
            })?;

        let vocab_file = list_files_with_suffix(ref_dir, &[".json"])?
            .into_iter()
            .next()
            .ok_or_else(|| {
                LentilError::not_found(format!("reference vocabulary in {}", ref_dir.display()))
            })?;

        info!(
            "reference corpus: {}, {}",
            mtx_file.display(),
            vocab_file.display()
        );

        let word_index: HashMap<String, usize> = read_json(&vocab_file)?;
        let counts = read_mtx_triplets(&mtx_file)?.to_csc()?;
        Self::from_parts(&counts, word_index)
    }

    /// * `counts` - documents x words
    /// * `word_index` - token to column of `counts`
    pub fn from_parts(
        counts: &CscMatrix<f32>,
        word_index: HashMap<String, usize>,
    ) -> anyhow::Result<Self> {
        let ncols = counts.ncols();
        if let Some(&bad) = word_index.values().find(|&&j| j >= ncols) {
            return Err(LentilError::dimension_mismatch("reference word index", ncols, bad).into());
        }

        let word_docs = counts
            .col_iter()
            .map(|col| {
                col.row_indices()
                    .iter()
                    .zip(col.values())
                    .filter(|(_, &x)| x > 0.0)
                    .map(|(&i, _)| i)
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();

        Ok(Self {
            num_docs: counts.nrows(),
            word_index: word_index
                .into_iter()
                .map(|(w, j)| (w.into_boxed_str(), j))
                .collect(),
            word_docs,
            top_n: NPMI_TOP_N,
        })
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn num_docs(&self) -> usize {
        self.num_docs
    }

    fn docs(&self, word: &str) -> Option<&[usize]> {
        self.word_index
            .get(word)
            .map(|&j| self.word_docs[j].as_slice())
    }

    /// Number of documents containing `word`
    pub fn doc_frequency(&self, word: &str) -> Option<usize> {
        self.docs(word).map(<[usize]>::len)
    }

    /// Number of documents containing both words
    pub fn co_doc_frequency(&self, w1: &str, w2: &str) -> Option<usize> {
        let (a, b) = (self.docs(w1)?, self.docs(w2)?);
        let (mut i, mut j, mut n) = (0, 0, 0);
        while i < a.len() && j < b.len() {
            match a[i].cmp(&b[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    n += 1;
                    i += 1;
                    j += 1;
                }
            }
        }
        Some(n)
    }

    /// NPMI of a word pair; `None` if either word is unknown.
    ///
    /// 0 if the pair never co-occurs, 1 if it co-occurs in every
    /// document, otherwise `(ln N + ln c12 - ln c1 - ln c2) / (ln N - ln c12)`.
    pub fn pair_npmi(&self, w1: &str, w2: &str) -> Option<f64> {
        let c1 = self.doc_frequency(w1)? as f64;
        let c2 = self.doc_frequency(w2)? as f64;
        let c12 = self.co_doc_frequency(w1, w2)? as f64;
        let n = self.num_docs as f64;

        if c12 == 0.0 {
            Some(0.0)
        } else if c12 >= n {
            Some(1.0)
        } else {
            Some((n.ln() + c12.ln() - c1.ln() - c2.ln()) / (n.ln() - c12.ln()))
        }
    }

    /// Mean NPMI over all pairs `i < j` among the first `top_n` words
    /// known to the reference; `None` without any such pair
    pub fn topic_npmi(&self, words: &[Box<str>]) -> Option<f64> {
        let words = &words[..words.len().min(self.top_n)];
        let mut total = 0.0;
        let mut npairs = 0usize;
        for (i, w1) in words.iter().enumerate() {
            for w2 in &words[(i + 1)..] {
                if let Some(x) = self.pair_npmi(w1, w2) {
                    total += x;
                    npairs += 1;
                }
            }
        }
        (npairs > 0).then(|| total / npairs as f64)
    }
}

impl CoherenceScorer for ReferenceCorpus {
    fn score(&self, topics: &[Topic]) -> anyhow::Result<f64> {
        let scores = topics
            .iter()
            .filter(|t| !t.is_background())
            .filter_map(|t| self.topic_npmi(&t.words))
            .collect::<Vec<_>>();

        if scores.is_empty() {
            debug!("no topic has a word pair in the reference corpus");
            return Ok(f64::NAN);
        }
        Ok(scores.iter().sum::<f64>() / scores.len() as f64)
    }
}
