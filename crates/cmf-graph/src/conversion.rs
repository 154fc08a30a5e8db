//! Conversion driver.
//!
//! A [`Conversion`] bundles a pipeline with its input and output node and
//! runs tickets against the output until the image is complete.
//!
//! ```rust
//! use std::sync::Arc;
//! use cmf_core::Image;
//! use cmf_graph::{AccessMode, Conversion};
//!
//! let conv = Conversion::from_image(Arc::new(Image::filled(16, 8, &[0.25, 0.5, 0.75])))?;
//! let array = conv.render(None)?;
//! assert_eq!(array.get(15, 7), Some(&[0.25, 0.5, 0.75][..]));
//!
//! let mut ticket = conv.create_ticket(AccessMode::Pixels(4))?;
//! let mut array = conv.create_array(&ticket)?;
//! let pulls = conv.run_to_end(&mut ticket, &mut array)?;
//! assert_eq!(pulls, 32);
//! # Ok::<(), cmf_graph::GraphError>(())
//! ```

use std::sync::Arc;

use cmf_core::{DataType, Image, PixelArray, Rectangle};
use tracing::{debug, info};

use crate::api::{Geometry, Status};
use crate::modules::{output, root};
use crate::node::{ConnectFlags, NodeId, PlugRef, Selector};
use crate::options::Options;
use crate::pipeline::Pipeline;
use crate::ticket::{AccessMode, PixelAccess};
use crate::GraphResult;

/// A pipeline with designated input and output nodes.
#[derive(Debug)]
pub struct Conversion {
    pipeline: Pipeline,
    input: NodeId,
    output: NodeId,
}

impl Conversion {
    /// Wraps an assembled pipeline.
    pub fn new(pipeline: Pipeline, input: NodeId, output: NodeId) -> Self {
        Self {
            pipeline,
            input,
            output,
        }
    }

    /// Root → output conversion over an in-memory image.
    pub fn from_image(image: Arc<Image>) -> GraphResult<Self> {
        let mut pipeline = Pipeline::new();
        let input = root::create(&mut pipeline, image)?;
        let output = pipeline.create_node(output::REGISTRATION, Options::new())?;
        pipeline.connect(input, Selector::Next, output, Selector::Next, ConnectFlags::default())?;
        Ok(Self::new(pipeline, input, output))
    }

    /// Underlying pipeline.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Underlying pipeline, for inserting nodes.
    pub fn pipeline_mut(&mut self) -> &mut Pipeline {
        &mut self.pipeline
    }

    /// Input node.
    pub fn input(&self) -> NodeId {
        self.input
    }

    /// Output node.
    pub fn output(&self) -> NodeId {
        self.output
    }

    /// Size of the delivered image.
    pub fn output_geometry(&self) -> GraphResult<Geometry> {
        self.pipeline.output_geometry(self.output)
    }

    /// Descriptor of the delivered image, without samples.
    pub fn output_image(&self) -> GraphResult<Arc<Image>> {
        let g = self.output_geometry()?;
        Ok(Arc::new(Image::descriptor(g.width, g.height, g.channels)))
    }

    fn anchor(&self) -> PlugRef {
        PlugRef::new(self.output, 0)
    }

    /// Ticket over the whole output image.
    ///
    /// `Pixels(0)` takes the step from [`GraphConfig::default_pixels_n`].
    ///
    /// [`GraphConfig::default_pixels_n`]: crate::GraphConfig::default_pixels_n
    pub fn create_ticket(&self, mode: AccessMode) -> GraphResult<PixelAccess> {
        let mode = match mode {
            AccessMode::Pixels(0) => AccessMode::Pixels(self.pipeline.config().default_pixels_n),
            m => m,
        };
        Ok(PixelAccess::new(0.0, 0.0, self.anchor(), mode, self.output_image()?))
    }

    /// Array covering a ticket's region.
    pub fn create_array(&self, ticket: &PixelAccess) -> GraphResult<PixelArray> {
        Ok(PixelArray::new(
            ticket.output_image_roi(),
            ticket.output_image().channels(),
        ))
    }

    /// One pull through the output node.
    pub fn run(&self, ticket: &mut PixelAccess, array: &mut PixelArray) -> GraphResult<Status> {
        self.pipeline.run(self.output, self.anchor(), ticket, array)
    }

    /// Pulls until the ticket is exhausted. Returns the number of pulls.
    pub fn run_to_end(&self, ticket: &mut PixelAccess, array: &mut PixelArray) -> GraphResult<usize> {
        let mut pulls = 0;
        while self.run(ticket, array)? == Status::Success {
            pulls += 1;
        }
        debug!(pulls, ticket = ticket.id(), "conversion finished");
        Ok(pulls)
    }

    /// Renders `roi` (the whole image with `None`) in one region pull.
    pub fn render(&self, roi: Option<Rectangle>) -> GraphResult<PixelArray> {
        let mut ticket = self.create_ticket(AccessMode::Region)?;
        if let Some(roi) = roi {
            ticket = ticket.with_roi(roi);
        }
        let mut array = self.create_array(&ticket)?;
        self.run(&mut ticket, &mut array)?;
        info!(roi = %ticket.output_image_roi(), written = array.written_points(), "rendered");
        Ok(array)
    }

    /// Renders the whole output into an image.
    pub fn to_image(&self, data_type: DataType) -> GraphResult<Image> {
        Ok(self.render(None)?.to_image(data_type)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_sub_region() {
        let conv = Conversion::from_image(Arc::new(Image::filled(8, 8, &[1.0]))).unwrap();
        let array = conv
            .render(Some(Rectangle::new(2.0, 2.0, 3.0, 3.0)))
            .unwrap();
        assert_eq!(array.bounds(), Rectangle::new(2.0, 2.0, 3.0, 3.0));
        assert_eq!(array.get(4, 4), Some(&[1.0][..]));
        assert_eq!(array.get(5, 5), None);
    }

    #[test]
    fn test_default_step_from_config() {
        let conv = Conversion::from_image(Arc::new(Image::filled(4, 4, &[0.0]))).unwrap();
        let t = conv.create_ticket(AccessMode::Pixels(0)).unwrap();
        assert_eq!(t.mode(), AccessMode::Pixels(1));
    }

    #[test]
    fn test_to_image() {
        let conv = Conversion::from_image(Arc::new(Image::filled(3, 2, &[0.5, 0.5, 0.5]))).unwrap();
        let image = conv.to_image(DataType::Float).unwrap();
        assert_eq!((image.width(), image.height(), image.channels()), (3, 2, 3));
        assert_eq!(image.point(2, 1), Some(&[0.5, 0.5, 0.5][..]));
    }
}
