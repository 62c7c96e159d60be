use std::fs::File;
use std::io::{self, BufWriter, StdoutLock, Write};
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::types::Region;
use crate::walker::RegionSummary;

pub const COLUMNS: [&str; 7] = [
    "Parent",
    "Transcript",
    "Name",
    "Chromosome",
    "Start",
    "Stop",
    "Strand",
];

/// Write regions as a tab-separated table.
///
/// Summary metadata comes first as `# key=value` lines, then the column
/// header. Genes without a name leave the `Parent` column as `.`.
pub fn write_regions<W: Write>(
    mut out: W,
    summary: &RegionSummary,
    regions: &[Region],
) -> io::Result<()> {
    for (k, v) in summary.entries() {
        writeln!(out, "# {k}={v}")?;
    }
    writeln!(out, "{}", COLUMNS.join("\t"))?;

    for r in regions {
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            r.parent_name.as_deref().unwrap_or("."),
            r.transcript_name,
            r.region_name,
            r.seq_id,
            r.start,
            r.stop,
            r.strand
        )?;
    }
    out.flush()
}

/// Where a region table goes.
///
/// Call [`OutputSink::finish`] once writing is done; dropping a gzip sink
/// writes its trailer but loses any error from doing so.
pub enum OutputSink {
    Stdout(BufWriter<StdoutLock<'static>>),
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl OutputSink {
    /// Flush everything, including the gzip trailer.
    pub fn finish(self) -> io::Result<()> {
        match self {
            OutputSink::Stdout(mut w) => w.flush(),
            OutputSink::Plain(w) => w.into_inner().map(drop).map_err(|e| e.into_error()),
            OutputSink::Gzip(enc) => enc
                .finish()?
                .into_inner()
                .map(drop)
                .map_err(|e| e.into_error()),
        }
    }
}

impl Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputSink::Stdout(w) => w.write(buf),
            OutputSink::Plain(w) => w.write(buf),
            OutputSink::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputSink::Stdout(w) => w.flush(),
            OutputSink::Plain(w) => w.flush(),
            OutputSink::Gzip(w) => w.flush(),
        }
    }
}

/// Open an output sink: stdout for `-`, gzip for `.gz`, else a plain file.
pub fn open_output(path: &Path) -> io::Result<OutputSink> {
    if path.as_os_str() == "-" {
        return Ok(OutputSink::Stdout(BufWriter::new(io::stdout().lock())));
    }
    let f = File::create(path)?;
    let is_gz = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false);
    if is_gz {
        Ok(OutputSink::Gzip(GzEncoder::new(
            BufWriter::new(f),
            Compression::default(),
        )))
    } else {
        Ok(OutputSink::Plain(BufWriter::new(f)))
    }
}
