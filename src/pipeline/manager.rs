//! Pipeline manager: owns the stage arena and drives parse, build, execute
//! and serialize.
//!
//! Stages live in a single `Vec<Stage>` and refer to each other by
//! [`StageId`]. A stage is only ever created after all of its inputs, so the
//! arena order is already a valid dependency order and cycles cannot be
//! expressed. Dropping (or [`PipelineManager::clear`]ing) the manager drops
//! every stage at once.

use crate::config::PipelineConfig;
use crate::pipeline::buffer::PointBuffer;
use crate::pipeline::document::{PipelineDocument, StageDescriptor};
use crate::pipeline::error::{PipelineError, PipelineResult, StructureError};
use crate::pipeline::id::StageId;
use crate::pipeline::iterator::{PointSource, StageRandomIterator, StageSequentialIterator};
use crate::pipeline::kind::{PipelineKind, StageKind};
use crate::pipeline::options::Options;
use crate::pipeline::registry::StageRegistry;
use crate::pipeline::schema::{Schema, SchemaLayout};
use crate::pipeline::snapshot::{EdgeSnapshot, StageSnapshot, TopologySnapshot};
use crate::pipeline::stage::{Stage, StageDriver};
use std::path::Path;

/// Owner of one pipeline graph.
pub struct PipelineManager {
    stages: Vec<Stage>,
    /// Terminal stage of the graph built by a parse or `add_writer`.
    root: Option<StageId>,
    registry: StageRegistry,
    config: PipelineConfig,
}

impl PipelineManager {
    /// An empty manager with the built-in drivers and default settings.
    pub fn new() -> Self {
        Self::with_registry(StageRegistry::with_builtins())
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        let mut manager = Self::new();
        manager.config = config;
        manager
    }

    pub fn with_registry(registry: StageRegistry) -> Self {
        Self {
            stages: Vec::new(),
            root: None,
            registry,
            config: PipelineConfig::default(),
        }
    }

    pub fn registry(&self) -> &StageRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut StageRegistry {
        &mut self.registry
    }

    // ── Graph building ──

    pub fn add_reader(&mut self, type_name: &str, options: Options) -> PipelineResult<StageId> {
        let driver = self.create_driver(StageKind::Reader, type_name, &options)?;
        Ok(self.push_stage(type_name, options, Vec::new(), driver))
    }

    pub fn add_filter(
        &mut self,
        type_name: &str,
        input: StageId,
        options: Options,
    ) -> PipelineResult<StageId> {
        self.check_inputs(type_name, &[input])?;
        let driver = self.create_driver(StageKind::Filter, type_name, &options)?;
        Ok(self.push_stage(type_name, options, vec![input], driver))
    }

    pub fn add_multi_filter(
        &mut self,
        type_name: &str,
        inputs: &[StageId],
        options: Options,
    ) -> PipelineResult<StageId> {
        if inputs.is_empty() {
            return Err(PipelineError::InvalidInput {
                stage: type_name.to_string(),
                reason: "a multifilter needs at least one input".to_string(),
            });
        }
        self.check_inputs(type_name, inputs)?;
        let driver = self.create_driver(StageKind::MultiFilter, type_name, &options)?;
        Ok(self.push_stage(type_name, options, inputs.to_vec(), driver))
    }

    /// Add a writer and make it the root of the held graph.
    pub fn add_writer(
        &mut self,
        type_name: &str,
        input: StageId,
        options: Options,
    ) -> PipelineResult<StageId> {
        self.check_inputs(type_name, &[input])?;
        let driver = self.create_driver(StageKind::Writer, type_name, &options)?;
        let id = self.push_stage(type_name, options, vec![input], driver);
        self.root = Some(id);
        Ok(id)
    }

    /// Every stage must be expressible as a document, so option names that
    /// a document could not carry are refused here.
    fn create_driver(
        &self,
        kind: StageKind,
        type_name: &str,
        options: &Options,
    ) -> PipelineResult<StageDriver> {
        if options.iter().any(|entry| entry.name.trim().is_empty()) {
            return Err(StructureError::MissingOptionName {
                stage: type_name.to_string(),
            }
            .into());
        }
        self.registry.create(kind, type_name, options)
    }

    fn check_inputs(&self, type_name: &str, inputs: &[StageId]) -> PipelineResult<()> {
        for (i, &input) in inputs.iter().enumerate() {
            let stage = self.slot(input)?;
            if !stage.kind().can_be_input() {
                return Err(PipelineError::InvalidInput {
                    stage: type_name.to_string(),
                    reason: format!("{} is a writer and cannot feed another stage", input),
                });
            }
            if let Some(consumer) = stage.consumer {
                return Err(PipelineError::InputAlreadyConsumed { input, consumer });
            }
            if inputs[..i].contains(&input) {
                return Err(PipelineError::InvalidInput {
                    stage: type_name.to_string(),
                    reason: format!("{} is listed more than once", input),
                });
            }
        }
        Ok(())
    }

    fn push_stage(
        &mut self,
        type_name: &str,
        options: Options,
        inputs: Vec<StageId>,
        driver: StageDriver,
    ) -> StageId {
        let id = StageId::from_index(self.stages.len());
        for input in &inputs {
            if let Some(stage) = self.stages.get_mut(input.index()) {
                stage.consumer = Some(id);
            }
        }
        tracing::debug!(
            "Created {} stage {} '{}' with {} input(s)",
            driver.kind(),
            id,
            type_name,
            inputs.len()
        );
        self.stages
            .push(Stage::new(id, type_name.to_string(), options, inputs, driver));
        id
    }

    // ── Access ──

    fn slot(&self, id: StageId) -> PipelineResult<&Stage> {
        self.stages
            .get(id.index())
            .ok_or(PipelineError::InvalidStage(id))
    }

    fn single_input(stage: &Stage) -> PipelineResult<StageId> {
        stage
            .inputs
            .first()
            .copied()
            .ok_or_else(|| PipelineError::InvalidInput {
                stage: stage.type_name.clone(),
                reason: "stage has no input".to_string(),
            })
    }

    /// Handle to any stage of the graph.
    pub fn stage(&self, id: StageId) -> PipelineResult<StageRef<'_>> {
        self.slot(id)?;
        Ok(StageRef { manager: self, id })
    }

    /// Handle to a writer stage, for execution.
    pub fn writer(&mut self, id: StageId) -> PipelineResult<WriterRef<'_>> {
        let stage = self.slot(id)?;
        if !stage.kind().is_writer() {
            return Err(PipelineError::InvalidInput {
                stage: stage.type_name.clone(),
                reason: format!("{} is a {}, not a writer", id, stage.kind()),
            });
        }
        Ok(WriterRef { manager: self, id })
    }

    /// Terminal stage: the designated root, or the only stage nothing
    /// consumes.
    pub fn root(&self) -> Option<StageId> {
        self.root.or_else(|| {
            let mut unconsumed = self.stages.iter().filter(|s| s.consumer.is_none());
            match (unconsumed.next(), unconsumed.next()) {
                (Some(only), None) => Some(only.id),
                _ => None,
            }
        })
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stages(&self) -> impl Iterator<Item = &Stage> {
        self.stages.iter()
    }

    /// Drop every stage. Ids handed out earlier become invalid.
    pub fn clear(&mut self) {
        tracing::debug!("Releasing {} stages", self.stages.len());
        self.stages.clear();
        self.root = None;
    }

    // ── Schema and point counts ──

    /// Resolve (once) and return the output schema of `id`.
    fn resolve_schema(&self, id: StageId) -> PipelineResult<&Schema> {
        let stage = self.slot(id)?;
        if let Some(schema) = stage.schema.get() {
            return Ok(schema);
        }

        let schema = match &stage.driver {
            StageDriver::Reader(driver) => driver.schema()?,
            StageDriver::Filter(driver) => {
                let input = self.resolve_schema(Self::single_input(stage)?)?;
                driver.schema(input)?
            }
            StageDriver::MultiFilter(driver) => {
                let inputs = stage
                    .inputs
                    .iter()
                    .map(|&input| self.resolve_schema(input))
                    .collect::<PipelineResult<Vec<_>>>()?;
                driver.schema(&inputs)?
            }
            StageDriver::Writer(driver) => {
                let input = self.resolve_schema(Self::single_input(stage)?)?;
                driver.validate(input)?;
                input.clone()
            }
        };

        Ok(stage.schema.get_or_init(|| schema))
    }

    fn num_points(&self, id: StageId) -> PipelineResult<u64> {
        let stage = self.slot(id)?;
        match &stage.driver {
            StageDriver::Reader(driver) => driver.num_points(),
            StageDriver::Filter(driver) => {
                Ok(driver.num_points(self.num_points(Self::single_input(stage)?)?))
            }
            StageDriver::MultiFilter(driver) => {
                let counts = stage
                    .inputs
                    .iter()
                    .map(|&input| self.num_points(input))
                    .collect::<PipelineResult<Vec<_>>>()?;
                Ok(driver.num_points(&counts))
            }
            StageDriver::Writer(_) => self.num_points(Self::single_input(stage)?),
        }
    }

    /// Open the chain of sources ending at `id`. A writer yields what it
    /// would write.
    fn open_source(&self, id: StageId) -> PipelineResult<Box<dyn PointSource>> {
        let schema = self.resolve_schema(id)?;
        let stage = self.slot(id)?;
        match &stage.driver {
            StageDriver::Reader(driver) => driver.open(schema),
            StageDriver::Filter(driver) => {
                let input = Self::single_input(stage)?;
                let upstream = self.open_source(input)?;
                driver.open(self.resolve_schema(input)?, upstream)
            }
            StageDriver::MultiFilter(driver) => {
                let mut schemas = Vec::with_capacity(stage.inputs.len());
                let mut upstream = Vec::with_capacity(stage.inputs.len());
                for &input in &stage.inputs {
                    schemas.push(self.resolve_schema(input)?);
                    upstream.push(self.open_source(input)?);
                }
                driver.open(&schemas, upstream)
            }
            StageDriver::Writer(_) => self.open_source(Self::single_input(stage)?),
        }
    }

    /// Resolve every schema in dependency order, returning that order.
    pub fn prepare(&self) -> PipelineResult<Vec<StageId>> {
        let n = self.stages.len();
        let mut in_degree = vec![0usize; n];
        let mut consumers: Vec<Vec<usize>> = vec![Vec::new(); n];
        for stage in &self.stages {
            for input in &stage.inputs {
                consumers[input.index()].push(stage.id.index());
                in_degree[stage.id.index()] += 1;
            }
        }

        // Kahn's algorithm
        let mut queue: Vec<usize> = (0..n).rev().filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(index) = queue.pop() {
            order.push(StageId::from_index(index));
            for &next in &consumers[index] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    queue.push(next);
                }
            }
        }

        for &id in &order {
            self.resolve_schema(id)?;
        }
        tracing::debug!("Prepared {} stages", order.len());
        Ok(order)
    }

    // ── Execution ──

    fn run_writer(&mut self, id: StageId, max_points: Option<u64>) -> PipelineResult<u64> {
        let schema = self.resolve_schema(id)?.clone();
        let stage = self.slot(id)?;
        let input = Self::single_input(stage)?;
        let type_name = stage.type_name.clone();

        let mut iter = StageSequentialIterator::new(input, self.open_source(input)?);
        let chunk = self.config.execution.chunk_size.max(1);
        let mut buffer = PointBuffer::new(SchemaLayout::new(&schema), chunk);

        let Some(StageDriver::Writer(driver)) =
            self.stages.get_mut(id.index()).map(|s| &mut s.driver)
        else {
            return Err(PipelineError::InvalidStage(id));
        };

        tracing::info!("Writing pipeline through '{}'", type_name);
        driver.begin(&schema)?;

        let mut written = 0u64;
        loop {
            let want = match max_points {
                Some(max) => max.saturating_sub(written).min(u64::from(chunk)) as u32,
                None => chunk,
            };
            if want == 0 {
                break;
            }

            let got = iter.read_at_most(&mut buffer, want)?;
            if got > 0 {
                written += u64::from(driver.write_buffer(&buffer)?);
                tracing::debug!("Wrote chunk of {} points", got);
            }
            if got < want {
                break;
            }
        }

        driver.finish()?;
        tracing::info!("'{}' wrote {} points", type_name, written);
        Ok(written)
    }

    // ── Documents ──

    /// Parse a reader-pipeline document and build its graph.
    pub fn read_reader_pipeline(&mut self, path: impl AsRef<Path>) -> PipelineResult<StageId> {
        let text = std::fs::read_to_string(path)?;
        self.read_reader_pipeline_str(&text)
    }

    pub fn read_reader_pipeline_str(&mut self, text: &str) -> PipelineResult<StageId> {
        self.read_pipeline(text, PipelineKind::Reader)
    }

    /// Parse a writer-pipeline document and build its graph.
    pub fn read_writer_pipeline(&mut self, path: impl AsRef<Path>) -> PipelineResult<StageId> {
        let text = std::fs::read_to_string(path)?;
        self.read_writer_pipeline_str(&text)
    }

    pub fn read_writer_pipeline_str(&mut self, text: &str) -> PipelineResult<StageId> {
        self.read_pipeline(text, PipelineKind::Writer)
    }

    fn read_pipeline(&mut self, text: &str, kind: PipelineKind) -> PipelineResult<StageId> {
        let doc = PipelineDocument::parse(text, kind).map_err(|e| {
            tracing::warn!("Rejected {} document ({}): {}", kind, e.rule(), e);
            PipelineError::from(e)
        })?;

        // The new graph replaces the held one only once it is fully built.
        let previous = std::mem::take(&mut self.stages);
        let previous_root = self.root.take();
        match self.build(&doc.root) {
            Ok(id) => {
                self.root = Some(id);
                if !previous.is_empty() {
                    tracing::debug!("Released {} stages of the previous graph", previous.len());
                }
                tracing::info!("Built {} with {} stages", kind, self.stages.len());
                Ok(id)
            }
            Err(e) => {
                self.stages = previous;
                self.root = previous_root;
                tracing::warn!("Failed to build {}: {}", kind, e);
                Err(e)
            }
        }
    }

    /// Build a descriptor tree, inputs before the stage that uses them.
    fn build(&mut self, desc: &StageDescriptor) -> PipelineResult<StageId> {
        let inputs = desc
            .inputs
            .iter()
            .map(|input| self.build(input))
            .collect::<PipelineResult<Vec<_>>>()?;
        let driver = self.create_driver(desc.kind, &desc.type_name, &desc.options)?;
        Ok(self.push_stage(&desc.type_name, desc.options.clone(), inputs, driver))
    }

    fn describe(&self, id: StageId) -> PipelineResult<StageDescriptor> {
        let stage = self.slot(id)?;
        Ok(StageDescriptor {
            kind: stage.kind(),
            type_name: stage.type_name.clone(),
            options: stage.options.clone(),
            inputs: stage
                .inputs
                .iter()
                .map(|&input| self.describe(input))
                .collect::<PipelineResult<Vec<_>>>()?,
        })
    }

    /// Describe the held graph as a document of the given kind.
    pub fn to_document(&self, kind: PipelineKind) -> PipelineResult<PipelineDocument> {
        let root = self
            .root()
            .filter(|&id| {
                self.slot(id)
                    .is_ok_and(|s| PipelineKind::of_terminal(s.kind()) == kind)
            })
            .ok_or(PipelineError::NoPipeline { expected: kind })?;
        Ok(PipelineDocument::new(self.describe(root)?))
    }

    /// Canonical text of the held graph, whichever kind it is.
    pub fn to_xml_string(&self) -> PipelineResult<String> {
        let kind = self
            .root()
            .and_then(|id| self.slot(id).ok())
            .map(|s| PipelineKind::of_terminal(s.kind()))
            .ok_or(PipelineError::NoPipeline {
                expected: PipelineKind::Writer,
            })?;
        Ok(self.to_document(kind)?.to_xml())
    }

    /// Serialize the held writer pipeline. Nothing is written on error.
    pub fn write_writer_pipeline(&self, path: impl AsRef<Path>) -> PipelineResult<()> {
        let text = self.to_document(PipelineKind::Writer)?.to_xml();
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Serialize the held reader pipeline. Nothing is written on error.
    pub fn write_reader_pipeline(&self, path: impl AsRef<Path>) -> PipelineResult<()> {
        let text = self.to_document(PipelineKind::Reader)?.to_xml();
        std::fs::write(path, text)?;
        Ok(())
    }

    // ── Diagnostics ──

    pub fn topology(&self) -> TopologySnapshot {
        let stages = self
            .stages
            .iter()
            .map(|s| StageSnapshot {
                id: s.id,
                kind: s.kind(),
                type_name: s.type_name.clone(),
                options: s.options.clone(),
                schema: s.schema.get().cloned(),
            })
            .collect();
        let edges = self
            .stages
            .iter()
            .flat_map(|s| s.inputs.iter().map(move |&from| EdgeSnapshot { from, to: s.id }))
            .collect();

        TopologySnapshot {
            stages,
            edges,
            root: self.root(),
        }
    }
}

impl Default for PipelineManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PipelineManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineManager")
            .field("stages", &self.stages)
            .field("root", &self.root)
            .finish()
    }
}

/// Borrowed handle to a stage of a [`PipelineManager`].
#[derive(Clone, Copy)]
pub struct StageRef<'a> {
    manager: &'a PipelineManager,
    id: StageId,
}

impl<'a> StageRef<'a> {
    fn stage(&self) -> &'a Stage {
        // Validated when the handle was created, and the manager is borrowed.
        &self.manager.stages[self.id.index()]
    }

    pub fn id(&self) -> StageId {
        self.id
    }

    pub fn kind(&self) -> StageKind {
        self.stage().kind()
    }

    pub fn type_name(&self) -> &'a str {
        &self.stage().type_name
    }

    pub fn options(&self) -> &'a Options {
        &self.stage().options
    }

    pub fn inputs(&self) -> &'a [StageId] {
        &self.stage().inputs
    }

    /// Output schema, resolved on first call.
    pub fn schema(&self) -> PipelineResult<&'a Schema> {
        self.manager.resolve_schema(self.id)
    }

    /// Declared (or upper-bound) number of points.
    pub fn num_points(&self) -> PipelineResult<u64> {
        self.manager.num_points(self.id)
    }

    pub fn create_sequential_iterator(&self) -> PipelineResult<StageSequentialIterator> {
        Ok(StageSequentialIterator::new(
            self.id,
            self.manager.open_source(self.id)?,
        ))
    }

    /// Fails with `Unsupported` unless every stage in the chain can seek.
    pub fn create_random_iterator(&self) -> PipelineResult<StageRandomIterator> {
        let source = self.manager.open_source(self.id)?;
        if !source.supports_seek() {
            return Err(PipelineError::unsupported(
                self.type_name(),
                "random access",
            ));
        }
        Ok(StageRandomIterator::new(self.id, source))
    }

    /// A buffer laid out for this stage's schema.
    pub fn allocate_buffer(&self, capacity: u32) -> PipelineResult<PointBuffer> {
        Ok(PointBuffer::new(SchemaLayout::new(self.schema()?), capacity))
    }
}

impl std::fmt::Debug for StageRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.stage().fmt(f)
    }
}

/// Mutable handle to a writer stage.
pub struct WriterRef<'a> {
    manager: &'a mut PipelineManager,
    id: StageId,
}

impl WriterRef<'_> {
    pub fn id(&self) -> StageId {
        self.id
    }

    /// Pull points through the input chain into the writer until
    /// `max_points` are written or the input is exhausted. `None` writes
    /// everything. Returns the number of points written.
    pub fn write(&mut self, max_points: Option<u64>) -> PipelineResult<u64> {
        self.manager.run_writer(self.id, max_points)
    }

    pub fn schema(&self) -> PipelineResult<Schema> {
        self.manager.resolve_schema(self.id).cloned()
    }

    pub fn num_points(&self) -> PipelineResult<u64> {
        self.manager.num_points(self.id)
    }
}
