//! Stage registry: resolves a `type` string to a driver instance.

use crate::pipeline::drivers::{
    CropFilter, DecimationFilter, FauxReader, FauxWriter, MosaicFilter, TextReader, TextWriter,
};
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::kind::StageKind;
use crate::pipeline::options::Options;
use crate::pipeline::stage::{
    FilterDriver, MultiFilterDriver, ReaderDriver, StageDriver, WriterDriver,
};
use std::collections::HashMap;

type ReaderFactory = Box<dyn Fn(&Options) -> PipelineResult<Box<dyn ReaderDriver>> + Send + Sync>;
type FilterFactory = Box<dyn Fn(&Options) -> PipelineResult<Box<dyn FilterDriver>> + Send + Sync>;
type MultiFilterFactory =
    Box<dyn Fn(&Options) -> PipelineResult<Box<dyn MultiFilterDriver>> + Send + Sync>;
type WriterFactory = Box<dyn Fn(&Options) -> PipelineResult<Box<dyn WriterDriver>> + Send + Sync>;

/// A factory tagged with the stage kind it produces.
enum Factory {
    Reader(ReaderFactory),
    Filter(FilterFactory),
    MultiFilter(MultiFilterFactory),
    Writer(WriterFactory),
}

impl Factory {
    fn kind(&self) -> StageKind {
        match self {
            Factory::Reader(_) => StageKind::Reader,
            Factory::Filter(_) => StageKind::Filter,
            Factory::MultiFilter(_) => StageKind::MultiFilter,
            Factory::Writer(_) => StageKind::Writer,
        }
    }
}

/// Maps stage type names to driver factories.
pub struct StageRegistry {
    factories: HashMap<String, Factory>,
}

impl StageRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A registry holding every built-in driver.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_reader(FauxReader::TYPE_NAME, |opts| {
            Ok(Box::new(FauxReader::from_options(opts)?))
        });
        registry.register_reader(TextReader::TYPE_NAME, |opts| {
            Ok(Box::new(TextReader::from_options(opts)?))
        });
        registry.register_filter(CropFilter::TYPE_NAME, |opts| {
            Ok(Box::new(CropFilter::from_options(opts)?))
        });
        registry.register_filter(DecimationFilter::TYPE_NAME, |opts| {
            Ok(Box::new(DecimationFilter::from_options(opts)?))
        });
        registry.register_multi_filter(MosaicFilter::TYPE_NAME, |opts| {
            Ok(Box::new(MosaicFilter::from_options(opts)?))
        });
        registry.register_writer(FauxWriter::TYPE_NAME, |opts| {
            Ok(Box::new(FauxWriter::from_options(opts)?))
        });
        registry.register_writer(TextWriter::TYPE_NAME, |opts| {
            Ok(Box::new(TextWriter::from_options(opts)?))
        });
        registry
    }

    pub fn register_reader<F>(&mut self, type_name: impl Into<String>, factory: F)
    where
        F: Fn(&Options) -> PipelineResult<Box<dyn ReaderDriver>> + Send + Sync + 'static,
    {
        self.insert(type_name.into(), Factory::Reader(Box::new(factory)));
    }

    pub fn register_filter<F>(&mut self, type_name: impl Into<String>, factory: F)
    where
        F: Fn(&Options) -> PipelineResult<Box<dyn FilterDriver>> + Send + Sync + 'static,
    {
        self.insert(type_name.into(), Factory::Filter(Box::new(factory)));
    }

    pub fn register_multi_filter<F>(&mut self, type_name: impl Into<String>, factory: F)
    where
        F: Fn(&Options) -> PipelineResult<Box<dyn MultiFilterDriver>> + Send + Sync + 'static,
    {
        self.insert(type_name.into(), Factory::MultiFilter(Box::new(factory)));
    }

    pub fn register_writer<F>(&mut self, type_name: impl Into<String>, factory: F)
    where
        F: Fn(&Options) -> PipelineResult<Box<dyn WriterDriver>> + Send + Sync + 'static,
    {
        self.insert(type_name.into(), Factory::Writer(Box::new(factory)));
    }

    fn insert(&mut self, type_name: String, factory: Factory) {
        if self.factories.insert(type_name.clone(), factory).is_some() {
            tracing::debug!("Replaced stage factory for '{}'", type_name);
        }
    }

    /// Construct the driver for `type_name`, which must be of `expected` kind.
    pub fn create(
        &self,
        expected: StageKind,
        type_name: &str,
        options: &Options,
    ) -> PipelineResult<StageDriver> {
        let factory = self
            .factories
            .get(type_name)
            .ok_or_else(|| PipelineError::UnknownDriver {
                type_name: type_name.to_string(),
            })?;

        let found = factory.kind();
        if found != expected {
            return Err(PipelineError::DriverKindMismatch {
                type_name: type_name.to_string(),
                expected,
                found,
            });
        }

        Ok(match factory {
            Factory::Reader(f) => StageDriver::Reader(f(options)?),
            Factory::Filter(f) => StageDriver::Filter(f(options)?),
            Factory::MultiFilter(f) => StageDriver::MultiFilter(f(options)?),
            Factory::Writer(f) => StageDriver::Writer(f(options)?),
        })
    }

    /// Kind of stage registered under `type_name`.
    pub fn kind_of(&self, type_name: &str) -> Option<StageKind> {
        self.factories.get(type_name).map(Factory::kind)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Registered type names, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for StageRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for StageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageRegistry")
            .field("types", &self.type_names())
            .finish()
    }
}
