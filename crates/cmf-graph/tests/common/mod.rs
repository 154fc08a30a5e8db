//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use cmf_core::{PixelArray, Rectangle};
use cmf_graph::connector::{Capabilities, Connector};
use cmf_graph::prelude::*;
use cmf_graph::GraphConfig;

/// Installs a test log writer once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Leaf that records every request and fills it with a constant.
#[derive(Debug)]
pub struct Recorder {
    registration: String,
    sockets: Vec<Connector>,
    width: u32,
    height: u32,
    value: f32,
    fail: bool,
    calls: Mutex<Vec<Rectangle>>,
}

impl Recorder {
    pub fn new(registration: &str, width: u32, height: u32, value: f32) -> Arc<Self> {
        Arc::new(Self {
            registration: registration.to_string(),
            sockets: vec![Connector::image("Img")],
            width,
            height,
            value,
            fail: false,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// A recorder whose runs always fail after recording.
    pub fn failing(registration: &str, width: u32, height: u32) -> Arc<Self> {
        Arc::new(Self {
            registration: registration.to_string(),
            sockets: vec![Connector::image("Img")],
            width,
            height,
            value: 0.0,
            fail: true,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Requested regions, in call order.
    pub fn calls(&self) -> Vec<Rectangle> {
        self.calls.lock().unwrap().clone()
    }
}

impl FilterApi for Recorder {
    fn registration(&self) -> &str {
        &self.registration
    }

    fn plugs(&self) -> &[Connector] {
        &[]
    }

    fn sockets(&self) -> &[Connector] {
        &self.sockets
    }

    fn output_geometry(&self, _: &Pipeline, _: NodeId) -> GraphResult<Geometry> {
        Ok(Geometry::new(self.width, self.height, 1))
    }

    fn run(
        &self,
        _: &Pipeline,
        _: NodeId,
        _: PlugRef,
        ticket: &mut PixelAccess,
        array: &mut PixelArray,
    ) -> GraphResult<Status> {
        self.calls.lock().unwrap().push(ticket.output_image_roi());
        if self.fail {
            return Err(GraphError::NoSample { x: 0, y: 0 });
        }
        let value = self.value;
        array.for_each_row_mut(&ticket.work_roi(), |_, _, row| row.fill(value));
        Ok(Status::Success)
    }
}

/// Consumer recording socket events; its plug needs sub-pixel support
/// when built with [`Sink::subpixel`].
#[derive(Debug)]
pub struct Sink {
    registration: String,
    plugs: Vec<Connector>,
    events: Mutex<Vec<SocketEvent>>,
}

impl Sink {
    pub fn new(registration: &str) -> Arc<Self> {
        Arc::new(Self {
            registration: registration.to_string(),
            plugs: vec![Connector::image("Img").plug()],
            events: Mutex::new(Vec::new()),
        })
    }

    pub fn subpixel(registration: &str) -> Arc<Self> {
        Arc::new(Self {
            registration: registration.to_string(),
            plugs: vec![
                Connector::image("Img").plug().requiring(Capabilities {
                    subpixel: true,
                    ..Default::default()
                }),
            ],
            events: Mutex::new(Vec::new()),
        })
    }

    pub fn events(&self) -> Vec<SocketEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl FilterApi for Sink {
    fn registration(&self) -> &str {
        &self.registration
    }

    fn plugs(&self) -> &[Connector] {
        &self.plugs
    }

    fn sockets(&self) -> &[Connector] {
        &[]
    }

    fn plug_event(&self, pipeline: &Pipeline, plug: PlugRef, event: SocketEvent) {
        self.events.lock().unwrap().push(event);
        pipeline.invalidate_context(plug.node);
    }

    fn run(
        &self,
        pipeline: &Pipeline,
        node: NodeId,
        _: PlugRef,
        ticket: &mut PixelAccess,
        array: &mut PixelArray,
    ) -> GraphResult<Status> {
        pipeline.run_plug(PlugRef::new(node, 0), ticket, array)
    }
}

/// Pipeline over the built-ins plus the given test backends.
pub fn pipeline_with(apis: &[Arc<dyn FilterApi>]) -> Pipeline {
    pipeline_with_config(apis, GraphConfig::default())
}

pub fn pipeline_with_config(apis: &[Arc<dyn FilterApi>], config: GraphConfig) -> Pipeline {
    init_tracing();
    let registry = Registry::with_builtins();
    for api in apis {
        registry.register(api.clone());
    }
    Pipeline::with_registry(Arc::new(registry)).with_config(config)
}

/// Region ticket anchored at `out`'s plug over a `width` x `height` image.
pub fn region_ticket(out: NodeId, width: u32, height: u32, channels: u32) -> PixelAccess {
    let image = Arc::new(cmf_core::Image::descriptor(width, height, channels));
    PixelAccess::new(0.0, 0.0, PlugRef::new(out, 0), AccessMode::Region, image)
}

/// Splitter with one region option per rectangle.
pub fn regions_options(regions: &[Rectangle]) -> Options {
    regions
        .iter()
        .enumerate()
        .fold(Options::new(), |o, (i, r)| o.with(i.to_string(), *r))
}

/// Links `source` socket 0 to the next free plug of `target`.
pub fn link(p: &mut Pipeline, source: NodeId, target: NodeId) {
    p.connect(source, Selector::Next, target, Selector::Next, ConnectFlags::default())
        .unwrap();
}
