//! `filters.crop`: keep the points inside (or outside) a 3-D box.

use super::scratch;
use crate::pipeline::buffer::PointBuffer;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::iterator::PointSource;
use crate::pipeline::options::Options;
use crate::pipeline::schema::{Schema, SchemaLayout};
use crate::pipeline::stage::FilterDriver;
use crate::types::Bounds;

pub struct CropFilter {
    bounds: Bounds,
    outside: bool,
}

impl CropFilter {
    pub const TYPE_NAME: &'static str = "filters.crop";

    pub fn new(bounds: Bounds, outside: bool) -> Self {
        Self { bounds, outside }
    }

    pub fn from_options(options: &Options) -> PipelineResult<Self> {
        let bounds = options.require::<Bounds>(Self::TYPE_NAME, "bounds")?;
        if bounds.is_empty() {
            return Err(PipelineError::InvalidOption {
                stage: Self::TYPE_NAME.to_string(),
                option: "bounds".to_string(),
                value: bounds.to_string(),
                reason: "min exceeds max on at least one axis".to_string(),
            });
        }
        let outside = options.get_or(Self::TYPE_NAME, "outside", false)?;
        Ok(Self::new(bounds, outside))
    }
}

impl FilterDriver for CropFilter {
    fn schema(&self, input: &Schema) -> PipelineResult<Schema> {
        input.require(&["X", "Y", "Z"], Self::TYPE_NAME)?;
        Ok(input.clone())
    }

    fn open(
        &self,
        input_schema: &Schema,
        upstream: Box<dyn PointSource>,
    ) -> PipelineResult<Box<dyn PointSource>> {
        input_schema.require(&["X", "Y", "Z"], Self::TYPE_NAME)?;
        let layout = SchemaLayout::new(input_schema);
        // require() above guarantees all three are present.
        let xyz = [
            layout.index_of("X").unwrap_or_default(),
            layout.index_of("Y").unwrap_or_default(),
            layout.index_of("Z").unwrap_or_default(),
        ];

        Ok(Box::new(CropSource {
            upstream,
            layout,
            scratch: None,
            xyz,
            bounds: self.bounds,
            outside: self.outside,
            upstream_done: false,
        }))
    }
}

struct CropSource {
    upstream: Box<dyn PointSource>,
    layout: SchemaLayout,
    scratch: Option<PointBuffer>,
    xyz: [usize; 3],
    bounds: Bounds,
    outside: bool,
    upstream_done: bool,
}

impl PointSource for CropSource {
    fn read(&mut self, buffer: &mut PointBuffer, max: u32) -> PipelineResult<u32> {
        buffer.clear();
        let max = max.min(buffer.capacity());

        // Keep pulling until the request is met; a short upstream read ends it.
        while buffer.len() < max && !self.upstream_done {
            let want = max - buffer.len();
            let chunk = scratch(&mut self.scratch, &self.layout, want);
            let want = want.min(chunk.capacity());
            let got = self.upstream.read(chunk, want)?;

            for i in 0..got {
                let (Some(x), Some(y), Some(z)) = (
                    chunk.get_f64(i, self.xyz[0]),
                    chunk.get_f64(i, self.xyz[1]),
                    chunk.get_f64(i, self.xyz[2]),
                ) else {
                    continue;
                };
                if self.bounds.contains(x, y, z) != self.outside {
                    buffer.push_from(chunk, i);
                }
            }

            if got < want {
                self.upstream_done = true;
            }
        }

        Ok(buffer.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::drivers::test_util::{drain_x, VecSource};
    use crate::pipeline::schema::Dimension;
    use crate::types::DataType;

    fn points() -> Vec<[f64; 3]> {
        (0..10).map(|i| [i as f64, 0.5, 0.5]).collect()
    }

    #[test]
    fn test_crop_inside() {
        let crop = CropFilter::new(Bounds::new(2.0, 0.0, 0.0, 5.0, 1.0, 1.0), false);
        let mut source = crop.open(&Schema::xyz(), VecSource::boxed(points())).unwrap();
        assert_eq!(drain_x(source.as_mut(), 3), vec![2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_crop_outside() {
        let crop = CropFilter::new(Bounds::new(2.0, 0.0, 0.0, 5.0, 1.0, 1.0), true);
        let mut source = crop.open(&Schema::xyz(), VecSource::boxed(points())).unwrap();
        assert_eq!(
            drain_x(source.as_mut(), 4),
            vec![0.0, 1.0, 6.0, 7.0, 8.0, 9.0]
        );
    }

    #[test]
    fn test_crop_fills_buffer_across_upstream_reads() {
        // Only every other point survives, so one request spans several pulls.
        let pts: Vec<[f64; 3]> = (0..20)
            .map(|i| [i as f64, if i % 2 == 0 { 0.5 } else { 5.0 }, 0.5])
            .collect();
        let crop = CropFilter::new(Bounds::new(0.0, 0.0, 0.0, 100.0, 1.0, 1.0), false);
        let mut source = crop.open(&Schema::xyz(), VecSource::boxed(pts)).unwrap();

        let mut buf = crate::pipeline::drivers::test_util::xyz_buffer(4);
        assert_eq!(source.read(&mut buf, 4).unwrap(), 4);
        assert_eq!(buf.get_f64(3, 0), Some(6.0));
    }

    #[test]
    fn test_crop_requires_xyz() {
        let crop = CropFilter::new(Bounds::default(), false);
        let schema = Schema::with_dimensions([Dimension::named("X", DataType::Float64)]);
        assert!(matches!(
            crop.schema(&schema),
            Err(PipelineError::Schema { .. })
        ));
    }

    #[test]
    fn test_bounds_option_required() {
        assert!(matches!(
            CropFilter::from_options(&Options::new()),
            Err(PipelineError::MissingOption { .. })
        ));
        let crop = CropFilter::from_options(
            &Options::new()
                .with("bounds", "([0, 1000000], [0, 1000000], [0, 1000000])")
                .with("outside", "false"),
        )
        .unwrap();
        assert!(!crop.outside);
        assert!(crop.bounds.contains(1000000.0, 0.0, 0.0));

        assert!(matches!(
            CropFilter::from_options(&Options::new().with("bounds", "([5, 1], [0, 1], [0, 1])")),
            Err(PipelineError::InvalidOption { ref option, .. }) if option == "bounds"
        ));
    }
}
