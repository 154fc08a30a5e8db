//! Image source node.
//!
//! Serves pixels of an image held in its socket, or of a netpbm file named
//! by the `filename` option. Files are opened when the context is built and
//! decoded on the first pull.

use std::sync::Arc;

use cmf_core::{Image, PixelArray};
use tracing::{debug, trace};

use crate::api::{BackendContext, FilterApi, Geometry, Status};
use crate::connector::Connector;
use crate::node::{NodeId, PlugRef, SocketRef};
use crate::options::Options;
use crate::pipeline::Pipeline;
use crate::ticket::{AccessMode, PixelAccess};
use crate::{GraphError, GraphResult};

/// Registration of [`RootImage`].
pub const REGISTRATION: &str = "org/cmf/image/root";

/// Option naming a file to read when the socket holds no image.
pub const FILENAME: &str = "filename";

/// Leaf node without plugs.
#[derive(Debug)]
pub struct RootImage {
    sockets: Vec<Connector>,
}

impl RootImage {
    /// Root node kind with one image socket.
    pub fn new() -> Self {
        Self {
            sockets: vec![Connector::image("Img").with_name("Image", "source image")],
        }
    }
}

impl Default for RootImage {
    fn default() -> Self {
        Self::new()
    }
}

/// Creates a root node serving `image`.
pub fn create(pipeline: &mut Pipeline, image: Arc<Image>) -> GraphResult<NodeId> {
    let node = pipeline.create_node(REGISTRATION, Options::new())?;
    pipeline.set_socket_data(SocketRef::new(node, 0), Some(image))?;
    Ok(node)
}

/// Image behind a root node.
pub fn source_image(pipeline: &Pipeline, node: NodeId) -> GraphResult<Arc<Image>> {
    pipeline
        .context(node)?
        .downcast::<Image>()
        .map_err(|_| GraphError::context(node, "context is not an image"))
}

impl FilterApi for RootImage {
    fn registration(&self) -> &str {
        REGISTRATION
    }

    fn plugs(&self) -> &[Connector] {
        &[]
    }

    fn sockets(&self) -> &[Connector] {
        &self.sockets
    }

    fn build_context(&self, pipeline: &Pipeline, node: NodeId) -> GraphResult<BackendContext> {
        if let Some(image) = pipeline.socket_data(SocketRef::new(node, 0))? {
            return Ok(image);
        }
        let core = pipeline.node(node)?.core();
        let Some(path) = core.options().get_str(FILENAME) else {
            return Err(GraphError::context(node, "no image data and no filename"));
        };
        let image = Image::open(path).map_err(GraphError::IoFailure)?;
        debug!(%node, path, width = image.width(), height = image.height(), "root image opened");
        Ok(Arc::new(image))
    }

    fn output_geometry(&self, pipeline: &Pipeline, node: NodeId) -> GraphResult<Geometry> {
        let image = source_image(pipeline, node)?;
        Ok(Geometry::new(image.width(), image.height(), image.channels()))
    }

    fn run(
        &self,
        pipeline: &Pipeline,
        node: NodeId,
        _requestor: PlugRef,
        ticket: &mut PixelAccess,
        array: &mut PixelArray,
    ) -> GraphResult<Status> {
        let image = source_image(pipeline, node)?;
        let work = ticket.work_roi();
        if work.is_empty() {
            return Ok(Status::Success);
        }
        let (w, h) = (image.width(), image.height());

        if ticket.mode() == AccessMode::Pixels(1) {
            let (nx, ny) = ticket.native_start(w, h);
            if nx >= 0 && ny >= 0 && nx < i64::from(w) && ny < i64::from(h) {
                image.load().map_err(GraphError::IoFailure)?;
                let pixel = image
                    .point(nx as u32, ny as u32)
                    .ok_or(GraphError::NoSample { x: nx, y: ny })?;
                let (x0, y0, _, _) = work.pixel_span();
                array.set(x0, y0, pixel);
                trace!(%node, nx, ny, "point served");
                return Ok(Status::Success);
            }
        }

        let out = ticket.output_image();
        let scale_x = f64::from(w) / f64::from(out.width().max(1));
        let scale_y = f64::from(h) / f64::from(out.height().max(1));
        let written = image
            .fill_array(&work, scale_x, scale_y, array)
            .map_err(GraphError::IoFailure)?;
        trace!(%node, roi = %work, scale_x, scale_y, written, "region filled");
        Ok(Status::Success)
    }
}

#[cfg(test)]
mod tests {
    use cmf_core::Rectangle;

    use super::*;

    fn ramp(w: u32, h: u32) -> Image {
        let data = (0..w * h).map(|i| i as f32).collect();
        Image::from_data(w, h, 1, data).unwrap()
    }

    #[test]
    fn test_point_in_native_grid() {
        let mut p = Pipeline::new();
        let root = create(&mut p, Arc::new(ramp(4, 4))).unwrap();
        let out = Arc::new(Image::descriptor(4, 4, 1));
        let mut t = PixelAccess::new(2.0, 1.0, PlugRef::new(NodeId(9), 0), AccessMode::Pixels(1), out);
        let mut a = PixelArray::new(Rectangle::from_size(4.0, 4.0), 1);
        p.run(root, PlugRef::new(NodeId(9), 0), &mut t, &mut a).unwrap();
        assert_eq!(a.get(2, 1), Some(&[6.0][..]));
        assert_eq!(a.written_points(), 1);
    }

    #[test]
    fn test_region_fill_rescales() {
        let mut p = Pipeline::new();
        let root = create(&mut p, Arc::new(ramp(4, 4))).unwrap();
        // the consumer sees a 2x2 image
        let out = Arc::new(Image::descriptor(2, 2, 1));
        let mut t = PixelAccess::new(0.0, 0.0, PlugRef::new(NodeId(9), 0), AccessMode::Region, out);
        let mut a = PixelArray::new(Rectangle::from_size(2.0, 2.0), 1);
        p.run(root, PlugRef::new(NodeId(9), 0), &mut t, &mut a).unwrap();
        assert_eq!(a.get(0, 0), Some(&[5.0][..]));
        assert_eq!(a.get(1, 1), Some(&[15.0][..]));
    }

    #[test]
    fn test_missing_file_is_io_failure() {
        let mut p = Pipeline::new();
        let opts = Options::new().with(FILENAME, "/nonexistent/cmf/root.ppm");
        let root = p.create_node(REGISTRATION, opts).unwrap();
        let err = p.output_geometry(root).unwrap_err();
        assert!(matches!(err, GraphError::IoFailure(_)));
    }

    #[test]
    fn test_without_source_fails() {
        let mut p = Pipeline::new();
        let root = p.create_node(REGISTRATION, Options::new()).unwrap();
        assert!(matches!(p.context(root), Err(GraphError::Context { .. })));
    }
}
