use flate2::read::GzDecoder;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

///
/// Read every line of the input_file into memory
///
/// * `input_file` - file name--either gzipped or not
///
pub fn read_lines<P: AsRef<Path>>(input_file: P) -> anyhow::Result<Vec<Box<str>>> {
    let buf: Box<dyn BufRead> = open_buf_reader(input_file)?;
    let mut lines = vec![];
    for x in buf.lines() {
        lines.push(x?.into_boxed_str());
    }
    Ok(lines)
}

///
/// Write every line into the output_file
///
/// * `lines` - vector of lines
/// * `output_file` - file name--either gzipped or not
///
pub fn write_lines<T, P>(lines: &[T], output_file: P) -> anyhow::Result<()>
where
    T: std::fmt::Display,
    P: AsRef<Path>,
{
    let mut buf = open_buf_writer(output_file)?;
    for line in lines {
        if let Err(e) = writeln!(buf, "{}", line) {
            if e.kind() == std::io::ErrorKind::BrokenPipe {
                return Ok(());
            } else {
                return Err(anyhow::anyhow!("unexpected error: {}", e));
            }
        }
    }
    buf.flush()?;
    Ok(())
}

///
/// Write rows of numbers as a tab-separated table
///
/// * `rows` - each inner vector becomes one line
/// * `output_file` - file name--either gzipped or not
///
pub fn write_tsv<T, P>(rows: &[Vec<T>], output_file: P) -> anyhow::Result<()>
where
    T: std::fmt::Display,
    P: AsRef<Path>,
{
    let lines = rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|x| x.to_string())
                .collect::<Vec<_>>()
                .join("\t")
        })
        .collect::<Vec<_>>();
    write_lines(&lines, output_file)
}

///
/// Open a file for reading, and return a buffered reader
/// * `input_file` - file name--either gzipped or not
///
pub fn open_buf_reader<P: AsRef<Path>>(input_file: P) -> anyhow::Result<Box<dyn BufRead>> {
    let input_file = input_file.as_ref();
    let file = File::open(input_file)
        .map_err(|e| anyhow::anyhow!("failed to open {}: {}", input_file.display(), e))?;
    match input_file.extension().and_then(|x| x.to_str()) {
        Some("gz") => Ok(Box::new(BufReader::new(GzDecoder::new(file)))),
        _ => Ok(Box::new(BufReader::new(file))),
    }
}

///
/// Open a file for writing, and return a buffered writer
/// * `output_file` - file name--either gzipped or not
///
pub fn open_buf_writer<P: AsRef<Path>>(output_file: P) -> anyhow::Result<Box<dyn Write>> {
    let output_file = output_file.as_ref();

    // we can simply override with stdout
    if output_file.as_os_str().eq_ignore_ascii_case("stdout") {
        return Ok(Box::new(BufWriter::new(std::io::stdout())));
    }

    let file = File::create(output_file)?;
    match output_file.extension().and_then(|x| x.to_str()) {
        Some("gz") => {
            let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            Ok(Box::new(BufWriter::new(encoder)))
        }
        _ => Ok(Box::new(BufWriter::new(file))),
    }
}

///
/// Create the directory (and its parents); an existing directory is
/// not an error
///
pub fn mkdir<P: AsRef<Path>>(dir: P) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir.as_ref())?;
    Ok(())
}

///
/// Read a JSON document into `T`
///
pub fn read_json<T, P>(input_file: P) -> anyhow::Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let buf = open_buf_reader(&input_file)?;
    serde_json::from_reader(buf).map_err(|e| {
        anyhow::anyhow!(
            "failed to parse JSON {}: {}",
            input_file.as_ref().display(),
            e
        )
    })
}

///
/// Write `value` as pretty-printed JSON
///
pub fn write_json<T, P>(value: &T, output_file: P) -> anyhow::Result<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let mut buf = open_buf_writer(output_file)?;
    serde_json::to_writer_pretty(&mut buf, value)?;
    writeln!(buf)?;
    buf.flush()?;
    Ok(())
}

///
/// List files in `dir` whose names end with one of `suffixes`,
/// sorted by name
///
pub fn list_files_with_suffix<P: AsRef<Path>>(
    dir: P,
    suffixes: &[&str],
) -> anyhow::Result<Vec<PathBuf>> {
    let mut ret = vec![];
    for entry in std::fs::read_dir(dir.as_ref())? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let name = path
            .file_name()
            .and_then(|x| x.to_str())
            .unwrap_or_default();
        if suffixes.iter().any(|s| name.ends_with(s)) {
            ret.push(path);
        }
    }
    ret.sort();
    Ok(ret)
}

///
/// Create a temporary directory that is removed when dropped
///
pub fn create_temp_dir() -> anyhow::Result<tempfile::TempDir> {
    Ok(tempfile::tempdir()?)
}
