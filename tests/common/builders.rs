//! Builders for test pipelines

use cloudpipe::pipeline::{PipelineManager, StageId};
use cloudpipe::{Bounds, Options};

/// Crop box covering every point the faux reader produces
pub fn everything() -> Bounds {
    Bounds::new(0.0, 0.0, 0.0, 1_000_000.0, 1_000_000.0, 1_000_000.0)
}

/// Builder for reader → (crop) → writer chains on a fresh manager
pub struct ChainBuilder {
    num_points: u64,
    crop: Option<Bounds>,
    writer: &'static str,
    writer_options: Options,
}

/// Stage ids of a built chain
pub struct Chain {
    pub reader: StageId,
    pub crop: Option<StageId>,
    pub writer: StageId,
}

impl ChainBuilder {
    pub fn new(num_points: u64) -> Self {
        Self {
            num_points,
            crop: None,
            writer: "drivers.faux.writer",
            writer_options: Options::new(),
        }
    }

    pub fn crop(mut self, bounds: Bounds) -> Self {
        self.crop = Some(bounds);
        self
    }

    pub fn writer(mut self, type_name: &'static str, options: Options) -> Self {
        self.writer = type_name;
        self.writer_options = options;
        self
    }

    pub fn build(self, manager: &mut PipelineManager) -> Chain {
        let reader = manager
            .add_reader(
                "drivers.faux.reader",
                Options::new().with("num_points", self.num_points),
            )
            .unwrap();
        let crop = self.crop.map(|bounds| {
            manager
                .add_filter("filters.crop", reader, Options::new().with("bounds", bounds))
                .unwrap()
        });
        let writer = manager
            .add_writer(self.writer, crop.unwrap_or(reader), self.writer_options)
            .unwrap();

        Chain {
            reader,
            crop,
            writer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_builder() {
        let mut manager = PipelineManager::new();
        let chain = ChainBuilder::new(5).crop(everything()).build(&mut manager);

        assert_eq!(manager.len(), 3);
        assert!(chain.crop.is_some());
        assert_eq!(manager.root(), Some(chain.writer));
    }
}
