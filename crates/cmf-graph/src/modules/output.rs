//! Pass-through terminal.
//!
//! The output node produces nothing itself: it forwards each pull to the
//! producer on its plug and then advances the ticket cursor, so a driver
//! can keep calling `run` until [`Status::Terminal`].

use cmf_core::PixelArray;
use tracing::trace;

use crate::api::{FilterApi, Status};
use crate::connector::Connector;
use crate::node::{NodeId, PlugRef};
use crate::pipeline::Pipeline;
use crate::ticket::PixelAccess;
use crate::GraphResult;

/// Registration of [`Output`].
pub const REGISTRATION: &str = "org/cmf/image/output";

/// Terminal node with one plug and no sockets.
#[derive(Debug)]
pub struct Output {
    plugs: Vec<Connector>,
}

impl Output {
    /// Output node kind with one image plug.
    pub fn new() -> Self {
        Self {
            plugs: vec![Connector::image("Img").with_name("Image", "image to deliver").plug()],
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterApi for Output {
    fn registration(&self) -> &str {
        REGISTRATION
    }

    fn plugs(&self) -> &[Connector] {
        &self.plugs
    }

    fn sockets(&self) -> &[Connector] {
        &[]
    }

    fn run(
        &self,
        pipeline: &Pipeline,
        node: NodeId,
        _requestor: PlugRef,
        ticket: &mut PixelAccess,
        array: &mut PixelArray,
    ) -> GraphResult<Status> {
        let status = pipeline.run_plug(PlugRef::new(node, 0), ticket, array)?;
        ticket.calculate_next_start_pixel();
        trace!(%node, ?status, exhausted = ticket.is_exhausted(), "output pulled");
        Ok(status)
    }
}
