//! Delimited text reader and writer.
//!
//! The first line of a text point file names the dimensions; each following
//! non-empty line holds one point. All columns are read as float64.

use crate::pipeline::buffer::PointBuffer;
use crate::pipeline::error::PipelineResult;
use crate::pipeline::iterator::PointSource;
use crate::pipeline::options::Options;
use crate::pipeline::schema::{Dimension, Schema};
use crate::pipeline::stage::{ReaderDriver, WriterDriver};
use crate::types::DataType;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Lines, Write};
use std::path::{Path, PathBuf};

fn invalid_data(path: &Path, line: usize, message: impl std::fmt::Display) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("{}:{}: {}", path.display(), line, message),
    )
}

/// Split a line on `separator`, or on any whitespace when it is blank.
fn split_fields<'a>(line: &'a str, separator: &'a str) -> Box<dyn Iterator<Item = &'a str> + 'a> {
    if separator.trim().is_empty() {
        Box::new(line.split_whitespace())
    } else {
        Box::new(line.split(separator).map(str::trim))
    }
}

pub struct TextReader {
    filename: PathBuf,
    separator: String,
}

impl TextReader {
    pub const TYPE_NAME: &'static str = "drivers.text.reader";

    pub fn new(filename: impl Into<PathBuf>, separator: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            separator: separator.into(),
        }
    }

    pub fn from_options(options: &Options) -> PipelineResult<Self> {
        let filename = options.require::<String>(Self::TYPE_NAME, "filename")?;
        let separator = options.get_or(Self::TYPE_NAME, "separator", ",".to_string())?;
        Ok(Self::new(filename, separator))
    }

    fn open_lines(&self) -> io::Result<Lines<BufReader<File>>> {
        let file = File::open(&self.filename)?;
        Ok(BufReader::new(file).lines())
    }

    fn header(&self, lines: &mut Lines<BufReader<File>>) -> io::Result<Vec<String>> {
        let header = lines
            .next()
            .transpose()?
            .ok_or_else(|| invalid_data(&self.filename, 1, "missing header line"))?;
        let names: Vec<String> = split_fields(&header, &self.separator)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        if names.is_empty() {
            return Err(invalid_data(&self.filename, 1, "header names no dimensions"));
        }
        Ok(names)
    }
}

impl ReaderDriver for TextReader {
    fn schema(&self) -> PipelineResult<Schema> {
        let mut lines = self.open_lines()?;
        let names = self.header(&mut lines)?;
        Ok(Schema::with_dimensions(
            names.into_iter().map(|name| Dimension::named(name, DataType::Float64)),
        ))
    }

    fn num_points(&self) -> PipelineResult<u64> {
        let mut lines = self.open_lines()?;
        self.header(&mut lines)?;
        let mut count = 0;
        for line in lines {
            if !line?.trim().is_empty() {
                count += 1;
            }
        }
        Ok(count)
    }

    fn open(&self, schema: &Schema) -> PipelineResult<Box<dyn PointSource>> {
        let mut lines = self.open_lines()?;
        self.header(&mut lines)?;
        tracing::debug!("Opened text point file {}", self.filename.display());
        Ok(Box::new(TextSource {
            path: self.filename.clone(),
            separator: self.separator.clone(),
            names: schema.iter().map(|d| d.name.clone()).collect(),
            lines,
            line_no: 1,
            values: Vec::new(),
        }))
    }
}

struct TextSource {
    path: PathBuf,
    separator: String,
    names: Vec<String>,
    lines: Lines<BufReader<File>>,
    line_no: usize,
    values: Vec<f64>,
}

impl TextSource {
    /// Parse the next non-empty line into `self.values`.
    fn next_point(&mut self) -> io::Result<bool> {
        loop {
            let Some(line) = self.lines.next().transpose()? else {
                return Ok(false);
            };
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }

            self.values.clear();
            for field in split_fields(&line, &self.separator) {
                let value = field.parse::<f64>().map_err(|e| {
                    invalid_data(&self.path, self.line_no, format!("'{}': {}", field, e))
                })?;
                self.values.push(value);
            }
            if self.values.len() != self.names.len() {
                return Err(invalid_data(
                    &self.path,
                    self.line_no,
                    format!("expected {} fields, found {}", self.names.len(), self.values.len()),
                ));
            }
            return Ok(true);
        }
    }
}

impl PointSource for TextSource {
    fn read(&mut self, buffer: &mut PointBuffer, max: u32) -> PipelineResult<u32> {
        buffer.clear();
        let max = max.min(buffer.capacity());
        let columns: Vec<Option<usize>> = self
            .names
            .iter()
            .map(|name| buffer.layout().index_of(name))
            .collect();

        let mut count = 0;
        while count < max && self.next_point()? {
            for (column, value) in columns.iter().zip(&self.values) {
                if let Some(dim) = column {
                    buffer.set_f64(count, *dim, *value);
                }
            }
            count += 1;
        }

        buffer.set_len(count);
        Ok(count)
    }
}

pub struct TextWriter {
    filename: PathBuf,
    separator: String,
    precision: Option<usize>,
    out: Option<BufWriter<File>>,
    written: u64,
}

impl TextWriter {
    pub const TYPE_NAME: &'static str = "drivers.text.writer";

    pub fn new(filename: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            separator: ",".to_string(),
            precision: None,
            out: None,
            written: 0,
        }
    }

    pub fn from_options(options: &Options) -> PipelineResult<Self> {
        let mut writer = Self::new(options.require::<String>(Self::TYPE_NAME, "filename")?);
        writer.separator = options.get_or(Self::TYPE_NAME, "separator", writer.separator)?;
        writer.precision = options
            .get_opt::<u32>(Self::TYPE_NAME, "precision")?
            .map(|p| p as usize);
        Ok(writer)
    }

    fn out(&mut self) -> io::Result<&mut BufWriter<File>> {
        self.out
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "text writer is not open"))
    }
}

impl WriterDriver for TextWriter {
    fn begin(&mut self, schema: &Schema) -> PipelineResult<()> {
        let mut out = BufWriter::new(File::create(&self.filename)?);
        let header: Vec<&str> = schema.iter().map(|d| d.name.as_str()).collect();
        writeln!(out, "{}", header.join(&self.separator))?;
        self.out = Some(out);
        self.written = 0;
        tracing::debug!("Writing text points to {}", self.filename.display());
        Ok(())
    }

    fn write_buffer(&mut self, buffer: &PointBuffer) -> PipelineResult<u32> {
        let dims = buffer.schema().len();
        let separator = self.separator.clone();
        let precision = self.precision;
        let out = self.out()?;

        let mut row = String::new();
        for i in 0..buffer.len() {
            row.clear();
            for dim in 0..dims {
                if dim > 0 {
                    row.push_str(&separator);
                }
                let value = buffer.get_f64(i, dim).unwrap_or_default();
                match precision {
                    Some(p) => row.push_str(&format!("{:.*}", p, value)),
                    None => row.push_str(&value.to_string()),
                }
            }
            writeln!(out, "{}", row)?;
        }

        self.written += u64::from(buffer.len());
        Ok(buffer.len())
    }

    fn finish(&mut self) -> PipelineResult<()> {
        if let Some(mut out) = self.out.take() {
            out.flush()?;
        }
        tracing::debug!(
            "Wrote {} points to {}",
            self.written,
            self.filename.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::error::PipelineError;
    use crate::pipeline::schema::SchemaLayout;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_reader_schema_and_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "pts.txt", "X,Y,Z,Intensity\n1,2,3,4\n\n5,6,7,8\n");
        let reader = TextReader::new(&path, ",");

        let schema = reader.schema().unwrap();
        assert_eq!(schema.len(), 4);
        assert_eq!(schema.index_of("Intensity"), Some(3));
        assert_eq!(reader.num_points().unwrap(), 2);

        let mut source = reader.open(&schema).unwrap();
        let mut buf = PointBuffer::new(SchemaLayout::new(&schema), 8);
        assert_eq!(source.read(&mut buf, 8).unwrap(), 2);
        assert_eq!(buf.get_by_name(1, "Intensity"), Some(8.0));
    }

    #[test]
    fn test_whitespace_separator() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "pts.txt", "X Y Z\n1   2 3\n");
        let reader = TextReader::new(&path, " ");
        let schema = reader.schema().unwrap();
        let mut source = reader.open(&schema).unwrap();
        let mut buf = PointBuffer::new(SchemaLayout::new(&schema), 4);
        assert_eq!(source.read(&mut buf, 4).unwrap(), 1);
        assert_eq!(buf.get_by_name(0, "Z"), Some(3.0));
    }

    #[test]
    fn test_bad_row_is_invalid_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "pts.txt", "X,Y,Z\n1,2\n");
        let reader = TextReader::new(&path, ",");
        let schema = reader.schema().unwrap();
        let mut source = reader.open(&schema).unwrap();
        let mut buf = PointBuffer::new(SchemaLayout::new(&schema), 4);

        match source.read(&mut buf, 4) {
            Err(PipelineError::Io(e)) => {
                assert_eq!(e.kind(), io::ErrorKind::InvalidData);
                assert!(e.to_string().contains(":2:"));
            }
            other => panic!("expected io error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let reader = TextReader::new("/nonexistent/points.txt", ",");
        match reader.schema() {
            Err(PipelineError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::NotFound),
            other => panic!("expected io error, got {:?}", other),
        }
    }

    #[test]
    fn test_writer_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let opts = Options::new()
            .with("filename", path.as_path())
            .with("precision", 2);
        let mut writer = TextWriter::from_options(&opts).unwrap();

        let schema = Schema::xyz();
        let mut buf = PointBuffer::new(SchemaLayout::new(&schema), 2);
        buf.set_f64(0, 0, 1.0);
        buf.set_f64(0, 1, 2.5);
        buf.set_f64(0, 2, -3.25);
        buf.set_len(1);

        writer.begin(&schema).unwrap();
        assert_eq!(writer.write_buffer(&buf).unwrap(), 1);
        writer.finish().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "X,Y,Z\n1.00,2.50,-3.25\n");
    }
}
