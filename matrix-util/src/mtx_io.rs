use crate::common_io::*;
use nalgebra_sparse::{CooMatrix, CscMatrix, CsrMatrix};
use rayon::prelude::*;
use std::io::Write;
use std::path::Path;

/// `(row, col, value)` with 0-based indices
pub type Triplet = (usize, usize, f32);

/// Triplets read from a MatrixMarket file along with its declared shape
pub struct MtxTriplets {
    pub nrows: usize,
    pub ncols: usize,
    pub triplets: Vec<Triplet>,
}

/// Write the triplets into a MatrixMarket file with 1-based indices
/// * `triplets` - the triplets to write
/// * `nrows` - number of rows
/// * `ncols` - number of columns
/// * `mtx_file` - the output file (e.g., "matrix.mtx.gz")
pub fn write_mtx_triplets<P: AsRef<Path>>(
    triplets: &[Triplet],
    nrows: usize,
    ncols: usize,
    mtx_file: P,
) -> anyhow::Result<()> {
    if let Some(parent_dir) = mtx_file.as_ref().parent() {
        mkdir(parent_dir)?;
    }

    let mut buf = open_buf_writer(mtx_file)?;

    writeln!(buf, "%%MatrixMarket matrix coordinate real general")?;
    writeln!(buf, "{}\t{}\t{}", nrows, ncols, triplets.len())?;

    for (row, col, val) in triplets {
        writeln!(buf, "{}\t{}\t{}", row + 1, col + 1, val)?;
    }

    buf.flush()?;
    Ok(())
}

/// Read a matrix market file and return its triplets (row, col, val)
/// with 0-based indices, sorted by row then column
/// * `mtx_file` - Path to the matrix market file
pub fn read_mtx_triplets<P: AsRef<Path>>(mtx_file: P) -> anyhow::Result<MtxTriplets> {
    let lines = read_lines(&mtx_file)?;

    let mut body = lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty() && !l.starts_with('%'));

    let header = body
        .next()
        .ok_or_else(|| anyhow::anyhow!("empty mtx file {}", mtx_file.as_ref().display()))?;

    let shape = header
        .split_whitespace()
        .map(|x| x.parse::<usize>())
        .collect::<Result<Vec<_>, _>>()?;

    let (nrows, ncols) = match shape.as_slice() {
        [nrows, ncols, _nnz] => (*nrows, *ncols),
        _ => return Err(anyhow::anyhow!("Failed to parse mtx header: {}", header)),
    };

    // Convert a triplet of strings to a triplet of usize, usize, f32
    fn parse_row_col_val(line: &str) -> anyhow::Result<Triplet> {
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.len() != 3 {
            return Err(anyhow::anyhow!("expected `row col value`: {}", line));
        }
        let row = words[0].parse::<usize>()?;
        let col = words[1].parse::<usize>()?;
        let val = words[2].parse::<f32>()?;
        if row == 0 || col == 0 {
            return Err(anyhow::anyhow!("mtx indices are 1-based: {}", line));
        }
        Ok((row - 1, col - 1, val))
    }

    let body: Vec<&str> = body.collect();
    let mut triplets = body
        .par_iter()
        .map(|l| parse_row_col_val(l))
        .collect::<anyhow::Result<Vec<_>>>()?;

    if let Some(&(i, j, _)) = triplets.iter().find(|&&(i, j, _)| i >= nrows || j >= ncols) {
        return Err(anyhow::anyhow!(
            "entry ({}, {}) exceeds the declared {} x {}",
            i + 1,
            j + 1,
            nrows,
            ncols
        ));
    }

    triplets.par_sort_by_key(|&(row, col, _)| (row, col));

    Ok(MtxTriplets {
        nrows,
        ncols,
        triplets,
    })
}

impl MtxTriplets {
    fn to_coo(&self) -> anyhow::Result<CooMatrix<f32>> {
        let rows = self.triplets.iter().map(|t| t.0).collect();
        let cols = self.triplets.iter().map(|t| t.1).collect();
        let vals = self.triplets.iter().map(|t| t.2).collect();
        CooMatrix::try_from_triplets(self.nrows, self.ncols, rows, cols, vals)
            .map_err(|e| anyhow::anyhow!("invalid triplets: {}", e))
    }

    /// Compressed sparse rows; duplicate entries are summed
    pub fn to_csr(&self) -> anyhow::Result<CsrMatrix<f32>> {
        Ok(CsrMatrix::from(&self.to_coo()?))
    }

    /// Compressed sparse columns; duplicate entries are summed
    pub fn to_csc(&self) -> anyhow::Result<CscMatrix<f32>> {
        Ok(CscMatrix::from(&self.to_coo()?))
    }
}
