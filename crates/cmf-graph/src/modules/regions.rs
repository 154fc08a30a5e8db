//! Fan-out region splitter.
//!
//! Plug `i` is responsible for the region stored under option `"i"`. Each
//! pull is split into one forked ticket per branch, the branch region
//! trimmed to the requested pixels. Branches left without points are not
//! called at all.
//!
//! ```yaml
//! "0": { x: 0.0, y: 0.0, width: 50.0, height: 100.0 }
//! "1": { x: 50.0, y: 0.0, width: 50.0, height: 100.0 }
//! relative: false
//! ```
//!
//! Regions are in output image pixels, or in 0..1 units of the output image
//! with `relative: true`.

use cmf_core::PixelArray;
use tracing::{debug, trace};

use crate::api::{FilterApi, Status};
use crate::connector::Connector;
use crate::node::{NodeId, PlugRef};
use crate::options::{OptionValue, Options};
use crate::pipeline::Pipeline;
use crate::ticket::PixelAccess;
use crate::{GraphError, GraphResult};

/// Registration of [`Regions`].
pub const REGISTRATION: &str = "org/cmf/image/regions";

/// Option switching regions to relative units.
pub const RELATIVE: &str = "relative";

/// Splitter with one declared optional plug that grows on demand.
#[derive(Debug)]
pub struct Regions {
    plugs: Vec<Connector>,
    sockets: Vec<Connector>,
}

impl Regions {
    /// Splitter node kind.
    pub fn new() -> Self {
        Self {
            plugs: vec![
                Connector::image("Img")
                    .with_name("Image", "image regions plug")
                    .plug()
                    .mandatory(false),
            ],
            sockets: vec![Connector::image("Img").with_name("Image", "image regions socket")],
        }
    }
}

impl Default for Regions {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterApi for Regions {
    fn registration(&self) -> &str {
        REGISTRATION
    }

    fn plugs(&self) -> &[Connector] {
        &self.plugs
    }

    fn plugs_last_add(&self) -> usize {
        usize::MAX
    }

    fn sockets(&self) -> &[Connector] {
        &self.sockets
    }

    fn validate_options(&self, options: &Options) -> GraphResult<()> {
        for (key, value) in options.iter() {
            if key == RELATIVE {
                if !matches!(value, OptionValue::Bool(_)) {
                    return Err(GraphError::invalid_options(REGISTRATION, "relative must be a bool"));
                }
            } else if key.parse::<usize>().is_ok() {
                if !matches!(value, OptionValue::Region(_)) {
                    return Err(GraphError::invalid_options(
                        REGISTRATION,
                        format!("option {key:?} is not a region"),
                    ));
                }
            }
        }
        Ok(())
    }

    fn run(
        &self,
        pipeline: &Pipeline,
        node: NodeId,
        _requestor: PlugRef,
        ticket: &mut PixelAccess,
        array: &mut PixelArray,
    ) -> GraphResult<Status> {
        let options = pipeline.node(node)?.core().options().clone();
        let n = pipeline.check_upstream_count(node, options.region_count())?;
        let plugs = pipeline.node(node)?.plugs();
        let relative = options.get_bool(RELATIVE).unwrap_or(false);
        let work = ticket.work_roi();
        let out = ticket.output_image().clone();

        let mut first_error = None;
        for i in 0..n {
            if !plugs[i].is_connected() {
                debug!(%node, branch = i, "branch skipped, plug open");
                continue;
            }
            let Some(mut roi) = options.region(i) else {
                continue;
            };
            if relative {
                roi = roi.to_absolute(f64::from(out.width()), f64::from(out.height()));
            }
            roi.trim(&work);
            if roi.count_points() <= 0 {
                trace!(%node, branch = i, "branch skipped, empty region");
                continue;
            }

            let mut branch = ticket.fork(roi);
            debug!(%node, branch = i, %roi, ticket = branch.id(), "branch run");
            if let Err(e) = pipeline.run_plug(PlugRef::new(node, i), &mut branch, array) {
                debug!(%node, branch = i, error = %e, "branch failed");
                first_error.get_or_insert(GraphError::BranchFailed {
                    index: i,
                    roi,
                    source: Box::new(e),
                });
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(Status::Success),
        }
    }
}

#[cfg(test)]
mod tests {
    use cmf_core::Rectangle;

    use super::*;

    #[test]
    fn test_option_validation() {
        let api = Regions::new();
        let ok = Options::new()
            .with("0", Rectangle::from_size(1.0, 1.0))
            .with(RELATIVE, true);
        assert!(api.validate_options(&ok).is_ok());

        let bad = Options::new().with("0", "left half");
        assert!(matches!(
            api.validate_options(&bad),
            Err(GraphError::InvalidOptions { .. })
        ));
    }
}
