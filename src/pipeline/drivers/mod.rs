//! Built-in stage drivers.

pub mod crop;
pub mod decimation;
pub mod faux;
pub mod mosaic;
pub mod text;

pub use crop::CropFilter;
pub use decimation::DecimationFilter;
pub use faux::{FauxMode, FauxReader, FauxWriter};
pub use mosaic::MosaicFilter;
pub use text::{TextReader, TextWriter};

use crate::pipeline::buffer::PointBuffer;
use crate::pipeline::schema::SchemaLayout;

/// Upper bound on the scratch buffers filters pull their input into.
const MAX_SCRATCH_POINTS: u32 = 65_536;

/// Scratch buffer of at least `capacity` points, reallocated only when it
/// has to grow.
fn scratch<'a>(
    slot: &'a mut Option<PointBuffer>,
    layout: &SchemaLayout,
    capacity: u32,
) -> &'a mut PointBuffer {
    let capacity = capacity.clamp(1, MAX_SCRATCH_POINTS);
    if slot.as_ref().is_some_and(|b| b.capacity() < capacity) {
        *slot = None;
    }
    slot.get_or_insert_with(|| PointBuffer::new(layout.clone(), capacity))
}

#[cfg(test)]
pub(crate) mod test_util {
    use crate::pipeline::buffer::PointBuffer;
    use crate::pipeline::error::PipelineResult;
    use crate::pipeline::iterator::PointSource;
    use crate::pipeline::schema::{Schema, SchemaLayout};

    /// In-memory source of XYZ points.
    pub struct VecSource {
        pub points: Vec<[f64; 3]>,
        pub pos: usize,
    }

    impl VecSource {
        pub fn boxed(points: Vec<[f64; 3]>) -> Box<dyn PointSource> {
            Box::new(Self { points, pos: 0 })
        }
    }

    impl PointSource for VecSource {
        fn read(&mut self, buffer: &mut PointBuffer, max: u32) -> PipelineResult<u32> {
            buffer.clear();
            let n = (self.points.len() - self.pos).min(max as usize) as u32;
            for i in 0..n {
                let p = self.points[self.pos + i as usize];
                for (dim, value) in p.iter().enumerate() {
                    buffer.set_f64(i, dim, *value);
                }
            }
            buffer.set_len(n);
            self.pos += n as usize;
            Ok(n)
        }

        fn supports_seek(&self) -> bool {
            true
        }

        fn seek(&mut self, index: u64) -> PipelineResult<()> {
            self.pos = (index as usize).min(self.points.len());
            Ok(())
        }
    }

    pub fn xyz_buffer(capacity: u32) -> PointBuffer {
        PointBuffer::new(SchemaLayout::new(&Schema::xyz()), capacity)
    }

    /// Drain a source in chunks of `chunk` points, collecting X values.
    pub fn drain_x(source: &mut dyn PointSource, chunk: u32) -> Vec<f64> {
        let mut buf = xyz_buffer(chunk);
        let mut xs = Vec::new();
        loop {
            let n = source.read(&mut buf, chunk).unwrap();
            xs.extend((0..n).map(|i| buf.get_f64(i, 0).unwrap()));
            if n < chunk {
                break;
            }
        }
        xs
    }
}
