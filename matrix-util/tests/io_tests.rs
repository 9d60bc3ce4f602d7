use matrix_util::common_io::*;
use matrix_util::mtx_io::*;
use std::collections::HashMap;

#[test]
fn lines_io_test() -> anyhow::Result<()> {
    let dir = create_temp_dir()?;

    for name in ["words.txt", "words.txt.gz"] {
        let file = dir.path().join(name);
        let words = vec!["alpha", "beta", "gamma"];
        write_lines(&words, &file)?;
        let back = read_lines(&file)?;
        assert_eq!(back.iter().map(|x| x.as_ref()).collect::<Vec<_>>(), words);
    }
    Ok(())
}

#[test]
fn mtx_io_test() -> anyhow::Result<()> {
    let dir = create_temp_dir()?;
    let mtx_file = dir.path().join("sub").join("counts.mtx.gz");

    let triplets = vec![(2, 1, 3.0), (0, 0, 1.0), (0, 2, 2.0)];
    write_mtx_triplets(&triplets, 3, 4, &mtx_file)?;

    let mtx = read_mtx_triplets(&mtx_file)?;
    assert_eq!((mtx.nrows, mtx.ncols), (3, 4));
    assert_eq!(mtx.triplets, vec![(0, 0, 1.0), (0, 2, 2.0), (2, 1, 3.0)]);

    let csc = mtx.to_csc()?;
    assert_eq!(csc.nnz(), 3);
    let col = csc.col(1);
    assert_eq!(col.row_indices(), &[2]);

    let csr = mtx.to_csr()?;
    assert_eq!(csr.row(0).col_indices(), &[0, 2]);
    Ok(())
}

#[test]
fn mtx_rejects_out_of_bounds() -> anyhow::Result<()> {
    let dir = create_temp_dir()?;
    let mtx_file = dir.path().join("bad.mtx");
    write_lines(
        &["%%MatrixMarket matrix coordinate real general", "2 2 1", "3 1 1.0"],
        &mtx_file,
    )?;
    assert!(read_mtx_triplets(&mtx_file).is_err());
    Ok(())
}

#[test]
fn json_and_listing_test() -> anyhow::Result<()> {
    let dir = create_temp_dir()?;
    let mut freq = HashMap::new();
    freq.insert("a".to_string(), 0.5f64);
    freq.insert("b".to_string(), 0.25f64);

    write_json(&freq, dir.path().join("freq.json"))?;
    write_lines(&["x"], dir.path().join("other.txt"))?;

    let back: HashMap<String, f64> = read_json(dir.path().join("freq.json"))?;
    assert_eq!(back, freq);

    let found = list_files_with_suffix(dir.path(), &[".json"])?;
    assert_eq!(found.len(), 1);
    assert!(found[0].ends_with("freq.json"));

    // directories that already exist are fine
    mkdir(dir.path())?;
    Ok(())
}
