//! Nearest-neighbour resample node.
//!
//! The node's output is `width` x `height` pixels (or the producer size
//! times `factor`). A pull is forwarded with its region scaled by
//! `producer / local` per axis and widened to whole producer pixels, into a
//! temporary array in the producer's grid, then resampled into the caller's
//! array.

use std::sync::Arc;

use cmf_core::{Image, PixelArray};
use tracing::trace;

use crate::api::{FilterApi, Geometry, Status};
use crate::connector::Connector;
use crate::node::{NodeId, PlugRef};
use crate::options::Options;
use crate::pipeline::Pipeline;
use crate::ticket::PixelAccess;
use crate::{GraphError, GraphResult};

/// Registration of [`Scale`].
pub const REGISTRATION: &str = "org/cmf/image/scale";

/// Output width option.
pub const WIDTH: &str = "width";
/// Output height option.
pub const HEIGHT: &str = "height";
/// Uniform factor option, used when no size is given.
pub const FACTOR: &str = "factor";

/// Single-producer resample.
#[derive(Debug)]
pub struct Scale {
    plugs: Vec<Connector>,
    sockets: Vec<Connector>,
}

impl Scale {
    /// Scale node with one image plug and socket.
    pub fn new() -> Self {
        Self {
            plugs: vec![Connector::image("Img").with_name("Image", "image to scale").plug()],
            sockets: vec![Connector::image("Img").with_name("Image", "scaled image")],
        }
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self::new()
    }
}

fn positive_int(options: &Options, key: &str) -> GraphResult<Option<u32>> {
    match options.get(key) {
        None => Ok(None),
        Some(_) => match options.get_int(key) {
            Some(v) if v >= 1 && v <= i64::from(u32::MAX) => Ok(Some(v as u32)),
            _ => Err(GraphError::invalid_options(
                REGISTRATION,
                format!("{key} must be a positive integer"),
            )),
        },
    }
}

impl FilterApi for Scale {
    fn registration(&self) -> &str {
        REGISTRATION
    }

    fn plugs(&self) -> &[Connector] {
        &self.plugs
    }

    fn sockets(&self) -> &[Connector] {
        &self.sockets
    }

    fn validate_options(&self, options: &Options) -> GraphResult<()> {
        let width = positive_int(options, WIDTH)?;
        let height = positive_int(options, HEIGHT)?;
        if width.is_some() != height.is_some() {
            return Err(GraphError::invalid_options(
                REGISTRATION,
                "width and height go together",
            ));
        }
        if let Some(f) = options.get_double(FACTOR) {
            if !(f.is_finite() && f > 0.0) {
                return Err(GraphError::invalid_options(REGISTRATION, "factor must be > 0"));
            }
        }
        Ok(())
    }

    fn output_geometry(&self, pipeline: &Pipeline, node: NodeId) -> GraphResult<Geometry> {
        let upstream = pipeline.upstream_geometry(PlugRef::new(node, 0))?;
        let options = pipeline.node(node)?.core().options();
        if let (Some(w), Some(h)) = (positive_int(options, WIDTH)?, positive_int(options, HEIGHT)?) {
            return Ok(Geometry::new(w, h, upstream.channels));
        }
        let f = options.get_double(FACTOR).unwrap_or(1.0);
        Ok(Geometry::new(
            ((f64::from(upstream.width) * f).round() as u32).max(1),
            ((f64::from(upstream.height) * f).round() as u32).max(1),
            upstream.channels,
        ))
    }

    fn run(
        &self,
        pipeline: &Pipeline,
        node: NodeId,
        _requestor: PlugRef,
        ticket: &mut PixelAccess,
        array: &mut PixelArray,
    ) -> GraphResult<Status> {
        let work = ticket.work_roi();
        if work.is_empty() {
            return Ok(Status::Success);
        }
        let plug = PlugRef::new(node, 0);
        let producer = pipeline.upstream_geometry(plug)?;
        let local = self.output_geometry(pipeline, node)?;
        let fx = f64::from(producer.width) / f64::from(local.width.max(1));
        let fy = f64::from(producer.height) / f64::from(local.height.max(1));

        let out = ticket.output_image();
        let grid = Arc::new(Image::descriptor(
            (f64::from(out.width()) * fx).round() as u32,
            (f64::from(out.height()) * fy).round() as u32,
            out.channels(),
        ));
        // upscaling maps the request inside single producer pixels
        let forward = work.scaled(fx, fy).expanded_to_grid();
        trace!(%node, roi = %work, forward = %forward, fx, fy, "scale forward");

        let mut upstream = ticket.fork_into(grid, forward);
        let mut scratch = PixelArray::new(forward, array.channels());
        let status = pipeline.run_plug(plug, &mut upstream, &mut scratch)?;
        if !scratch.is_allocated() {
            return Ok(status);
        }

        let (sx0, sy0, sx1, sy1) = scratch.bounds().pixel_span();
        let ch = (array.channels() as usize).max(1);
        array.for_each_row_mut(&work, |y, x0, row| {
            let ny = (((y as f64 + 0.5) * fy).floor() as i64).clamp(sy0, sy1 - 1);
            for (k, px) in row.chunks_mut(ch).enumerate() {
                let gx = x0 + k as i64;
                let nx = (((gx as f64 + 0.5) * fx).floor() as i64).clamp(sx0, sx1 - 1);
                if let Some(src) = scratch.get(nx, ny) {
                    px.copy_from_slice(src);
                }
            }
        });
        Ok(status)
    }
}
