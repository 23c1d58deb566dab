//! End-to-end tests for building, running and serializing pipelines

mod common;

use common::builders::{everything, ChainBuilder};
use common::{datapath, fixture};
use cloudpipe::pipeline::{
    PipelineError, PipelineKind, PipelineManager, PointBuffer, SchemaLayout, StageRef,
    TopologySnapshot, WriterDriver,
};
use cloudpipe::{run_writer_pipeline, Options, PipelineConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn drain(stage: &StageRef<'_>, capacity: u32) -> u64 {
    let mut buf = stage.allocate_buffer(capacity).unwrap();
    let mut iter = stage.create_sequential_iterator().unwrap();
    let mut total = 0u64;
    loop {
        let n = iter.read(&mut buf).unwrap();
        total += u64::from(n);
        if n < capacity {
            return total;
        }
    }
}

#[test]
fn test_api_composed_pipeline_writes_all_points() {
    let mut manager = PipelineManager::new();
    let chain = ChainBuilder::new(1065).crop(everything()).build(&mut manager);

    let np = manager.stage(chain.reader).unwrap().num_points().unwrap();
    let written = manager.writer(chain.writer).unwrap().write(Some(np)).unwrap();
    assert_eq!(written, 1065);
}

#[test]
fn test_reader_pipeline_single_read() {
    let mut manager = PipelineManager::new();
    let id = manager
        .read_reader_pipeline(datapath("pipeline_read.xml"))
        .unwrap();

    let stage = manager.stage(id).unwrap();
    let schema = stage.schema().unwrap();
    let mut data = PointBuffer::new(SchemaLayout::new(schema), 2048);
    let mut iter = stage.create_sequential_iterator().unwrap();

    assert_eq!(iter.read(&mut data).unwrap(), 1065);
    assert!(iter.at_end());
    assert_eq!(iter.read(&mut data).unwrap(), 0);
    assert_eq!(iter.read(&mut data).unwrap(), 0);
    assert_eq!(iter.index(), 1065);
}

#[test]
fn test_writer_pipeline_writes_all_points() {
    let mut manager = PipelineManager::new();
    let writer = manager
        .read_writer_pipeline(datapath("pipeline_write.xml"))
        .unwrap();

    assert_eq!(manager.writer(writer).unwrap().write(None).unwrap(), 1065);
}

#[test]
fn test_writer_pipeline_round_trip_is_exact() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("test.xml");

    let mut manager = PipelineManager::new();
    manager
        .read_writer_pipeline(datapath("pipeline_write.xml"))
        .unwrap();
    manager.write_writer_pipeline(&out).unwrap();

    let written = std::fs::read_to_string(&out).unwrap();
    assert_eq!(written, fixture("pipeline_write.xml"));
}

#[test]
fn test_reader_pipeline_round_trip_is_exact() {
    let mut manager = PipelineManager::new();
    manager
        .read_reader_pipeline(datapath("pipeline_read.xml"))
        .unwrap();
    assert_eq!(manager.to_xml_string().unwrap(), fixture("pipeline_read.xml"));
}

#[test]
fn test_api_built_options_serialize_losslessly() {
    let mut manager = PipelineManager::new();
    let mut options = Options::new().with("num_points", 12u64);
    options.add("note", "  padded  ");
    options.add_with_description("mode", "ramp", "line one\nline two\tend");
    let reader = manager.add_reader("drivers.faux.reader", options).unwrap();
    manager
        .add_writer("drivers.faux.writer", reader, Options::new())
        .unwrap();

    let first = manager.to_xml_string().unwrap();
    let mut reread = PipelineManager::new();
    let writer = reread.read_writer_pipeline_str(&first).unwrap();
    assert_eq!(reread.to_xml_string().unwrap(), first);

    let input = reread.stage(writer).unwrap().inputs()[0];
    let options = reread.stage(input).unwrap().options();
    assert_eq!(options.value("note").and_then(|v| v.as_str()), Some("padded"));
    assert_eq!(options.description("mode"), Some("line one\nline two\tend"));
}

#[test]
fn test_blank_option_name_never_reaches_a_document() {
    let mut manager = PipelineManager::new();
    let mut options = Options::new().with("num_points", 12u64);
    options.add("", "x");

    let err = manager
        .add_reader("drivers.faux.reader", options)
        .unwrap_err();
    assert_eq!(err.structure().unwrap().rule(), "missing-option-name");
    assert!(matches!(
        manager.to_xml_string(),
        Err(PipelineError::NoPipeline { .. })
    ));
}

#[test]
fn test_api_and_document_pipelines_agree() {
    let mut parsed = PipelineManager::new();
    let parsed_writer = parsed
        .read_writer_pipeline(datapath("pipeline_write.xml"))
        .unwrap();

    let mut built = PipelineManager::new();
    let mut reader_options = Options::new().with("num_points", 1065u64);
    reader_options.add_with_description("mode", "constant", "point placement");
    let reader = built.add_reader("drivers.faux.reader", reader_options).unwrap();
    let crop = built
        .add_filter(
            "filters.crop",
            reader,
            Options::new().with("bounds", everything()),
        )
        .unwrap();
    let built_writer = built
        .add_writer("drivers.faux.writer", crop, Options::new())
        .unwrap();

    assert_eq!(
        parsed.stage(parsed_writer).unwrap().schema().unwrap(),
        built.stage(built_writer).unwrap().schema().unwrap()
    );
    assert_eq!(built.to_xml_string().unwrap(), fixture("pipeline_write.xml"));
    assert_eq!(
        parsed.writer(parsed_writer).unwrap().write(None).unwrap(),
        built.writer(built_writer).unwrap().write(None).unwrap()
    );
}

#[test]
fn test_bad_documents_report_their_rule() {
    let cases = [
        ("pipeline_bad01.xml", PipelineKind::Writer, "missing-type"),
        ("pipeline_bad02.xml", PipelineKind::Writer, "missing-filter-input"),
        ("pipeline_bad03.xml", PipelineKind::Writer, "missing-multifilter-input"),
        ("pipeline_bad04.xml", PipelineKind::Writer, "missing-writer-input"),
        ("pipeline_bad05.xml", PipelineKind::Writer, "extra-filter-input"),
        ("pipeline_bad06.xml", PipelineKind::Writer, "extra-writer-input"),
        ("pipeline_bad07.xml", PipelineKind::Writer, "child-of-reader"),
        ("pipeline_bad08.xml", PipelineKind::Writer, "unknown-element"),
        ("pipeline_bad09.xml", PipelineKind::Writer, "missing-pipeline"),
        ("pipeline_bad10.xml", PipelineKind::Reader, "missing-pipeline"),
    ];

    let mut manager = PipelineManager::new();
    for (file, kind, rule) in cases {
        let result = match kind {
            PipelineKind::Reader => manager.read_reader_pipeline(datapath(file)),
            PipelineKind::Writer => manager.read_writer_pipeline(datapath(file)),
        };
        let err = result.unwrap_err();
        assert!(err.is_structure(), "{}: {}", file, err);
        assert_eq!(err.structure().unwrap().rule(), rule, "{}", file);
        assert!(manager.is_empty(), "{} left stages behind", file);
    }
}

#[test]
fn test_filter_child_count_errors_are_distinct() {
    let mut manager = PipelineManager::new();
    let missing = manager
        .read_writer_pipeline(datapath("pipeline_bad02.xml"))
        .unwrap_err();
    let extra = manager
        .read_writer_pipeline(datapath("pipeline_bad05.xml"))
        .unwrap_err();
    assert_ne!(missing.structure(), extra.structure());
}

#[test]
fn test_entry_points_are_exclusive() {
    let mut manager = PipelineManager::new();

    let err = manager
        .read_reader_pipeline(datapath("pipeline_write.xml"))
        .unwrap_err();
    assert_eq!(err.structure().unwrap().rule(), "wrong-pipeline-kind");

    let err = manager
        .read_writer_pipeline(datapath("pipeline_read.xml"))
        .unwrap_err();
    assert_eq!(err.structure().unwrap().rule(), "wrong-pipeline-kind");

    assert!(manager.is_empty());
}

#[test]
fn test_failed_parse_keeps_existing_graph() {
    let mut manager = PipelineManager::new();
    let root = manager
        .read_reader_pipeline(datapath("pipeline_read.xml"))
        .unwrap();
    let before = manager.len();

    // Structurally valid but names a driver that does not exist, so the
    // failure happens mid-build.
    let err = manager
        .read_writer_pipeline_str(
            r#"<Pipeline version="1.0">
                 <Writer type="drivers.faux.writer">
                   <Filter type="filters.missing">
                     <Reader type="drivers.faux.reader">
                       <Option name="num_points">4</Option>
                     </Reader>
                   </Filter>
                 </Writer>
               </Pipeline>"#,
        )
        .unwrap_err();
    assert!(matches!(err, PipelineError::UnknownDriver { .. }));

    assert_eq!(manager.len(), before);
    assert_eq!(manager.root(), Some(root));
    assert_eq!(drain(&manager.stage(root).unwrap(), 500), 1065);
}

#[test]
fn test_serialization_failure_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.xml");

    let mut manager = PipelineManager::new();
    manager
        .read_reader_pipeline(datapath("pipeline_read.xml"))
        .unwrap();

    let err = manager.write_writer_pipeline(&out).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::NoPipeline {
            expected: PipelineKind::Writer
        }
    ));
    assert!(!out.exists());
}

struct DropCounter(Arc<AtomicUsize>);

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

struct CountingWriter {
    _guard: DropCounter,
}

impl WriterDriver for CountingWriter {
    fn begin(&mut self, _schema: &cloudpipe::pipeline::Schema) -> cloudpipe::PipelineResult<()> {
        Ok(())
    }

    fn write_buffer(&mut self, buffer: &PointBuffer) -> cloudpipe::PipelineResult<u32> {
        Ok(buffer.len())
    }

    fn finish(&mut self) -> cloudpipe::PipelineResult<()> {
        Ok(())
    }
}

#[test]
fn test_dropping_manager_releases_stages() {
    let dropped = Arc::new(AtomicUsize::new(0));

    let mut manager = PipelineManager::new();
    let counter = dropped.clone();
    manager
        .registry_mut()
        .register_writer("tests.counting.writer", move |_| {
            Ok(Box::new(CountingWriter {
                _guard: DropCounter(counter.clone()),
            }))
        });

    let chain = ChainBuilder::new(10)
        .writer("tests.counting.writer", Options::new())
        .build(&mut manager);
    assert_eq!(manager.writer(chain.writer).unwrap().write(None).unwrap(), 10);
    assert_eq!(dropped.load(Ordering::SeqCst), 0);

    manager.clear();
    assert_eq!(dropped.load(Ordering::SeqCst), 1);
    assert!(matches!(
        manager.stage(chain.reader),
        Err(PipelineError::InvalidStage(_))
    ));

    ChainBuilder::new(10)
        .writer("tests.counting.writer", Options::new())
        .build(&mut manager);
    drop(manager);
    assert_eq!(dropped.load(Ordering::SeqCst), 2);
}

#[test]
fn test_topology_snapshot_after_prepare() {
    let mut manager = PipelineManager::new();
    manager
        .read_writer_pipeline(datapath("pipeline_write.xml"))
        .unwrap();
    let order = manager.prepare().unwrap();
    assert_eq!(order.len(), 3);

    let topology = manager.topology();
    assert!(topology.stages.iter().all(|s| s.schema.is_some()));
    assert_eq!(topology.sources().count(), 1);

    let json = topology.to_json().unwrap();
    assert!(json.contains("filters.crop"));
    assert_eq!(TopologySnapshot::from_json(&json).unwrap(), topology);
}

#[test]
fn test_run_writer_pipeline_helper() {
    let config = PipelineConfig::default().with_chunk_size(100);
    assert_eq!(
        run_writer_pipeline(datapath("pipeline_write.xml"), &config, None).unwrap(),
        1065
    );
    assert_eq!(
        run_writer_pipeline(datapath("pipeline_write.xml"), &config, Some(300)).unwrap(),
        300
    );

    let err = run_writer_pipeline(datapath("pipeline_bad01.xml"), &config, None).unwrap_err();
    assert!(err.to_string().contains("Failed to load pipeline"));
    assert!(err.pipeline_error().unwrap().is_structure());

    let err = run_writer_pipeline(datapath("no_such_file.xml"), &config, None).unwrap_err();
    assert!(matches!(err.pipeline_error(), Some(PipelineError::Io(_))));
}
