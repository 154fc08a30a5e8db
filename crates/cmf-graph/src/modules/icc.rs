//! ICC colour conversion node.
//!
//! Converts the pixels of its producer from `profile_in` to `profile_out`
//! with the given rendering `intent`. Profiles are built-in names
//! (`srgb`, `linear-srgb`, `adobe-rgb`, `display-p3`, `rec2020`) or paths
//! to `.icc` files. The compiled transform is the node's backend context:
//! built on the first pull, dropped whenever options change.

use std::sync::{Arc, Mutex, PoisonError};

use cmf_core::PixelArray;
use cmf_icc::{Intent, Profile, Transform};
use tracing::{debug, trace};

use crate::api::{BackendContext, FilterApi, Status};
use crate::connector::Connector;
use crate::node::{NodeId, PlugRef};
use crate::options::{OptionValue, Options};
use crate::pipeline::Pipeline;
use crate::ticket::PixelAccess;
use crate::{GraphError, GraphResult};

/// Registration of [`IccConvert`].
pub const REGISTRATION: &str = "org/cmf/colour/icc";

/// Source profile option.
pub const PROFILE_IN: &str = "profile_in";
/// Destination profile option.
pub const PROFILE_OUT: &str = "profile_out";
/// Rendering intent option, a name or ICC number.
pub const INTENT: &str = "intent";

const DEFAULT_PROFILE: &str = "srgb";

/// Single-producer colour conversion.
#[derive(Debug)]
pub struct IccConvert {
    plugs: Vec<Connector>,
    sockets: Vec<Connector>,
}

impl IccConvert {
    /// Node kind converting RGB(A) pixels.
    pub fn new() -> Self {
        Self {
            plugs: vec![
                Connector::image("Img")
                    .with_name("Image", "pixels to convert")
                    .with_channels(3, 255)
                    .plug(),
            ],
            sockets: vec![
                Connector::image("Img")
                    .with_name("Image", "converted pixels")
                    .with_channels(3, 255),
            ],
        }
    }
}

impl Default for IccConvert {
    fn default() -> Self {
        Self::new()
    }
}

fn intent(options: &Options) -> GraphResult<Intent> {
    match options.get(INTENT) {
        None => Ok(Intent::default()),
        Some(OptionValue::Int(i)) => Intent::from_index(*i)
            .ok_or_else(|| GraphError::invalid_options(REGISTRATION, format!("intent {i} out of range"))),
        Some(OptionValue::String(s)) => Ok(s.parse()?),
        Some(_) => Err(GraphError::invalid_options(REGISTRATION, "intent must be a name or number")),
    }
}

/// Compiled transform behind an ICC node.
pub fn transform(pipeline: &Pipeline, node: NodeId) -> GraphResult<Arc<Mutex<Transform>>> {
    pipeline
        .context(node)?
        .downcast::<Mutex<Transform>>()
        .map_err(|_| GraphError::context(node, "context is not an icc transform"))
}

impl FilterApi for IccConvert {
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
        intent(options)?;
        for key in [PROFILE_IN, PROFILE_OUT] {
            if options.get(key).is_some() && options.get_str(key).is_none() {
                return Err(GraphError::invalid_options(
                    REGISTRATION,
                    format!("{key} must be a profile name or path"),
                ));
            }
        }
        Ok(())
    }

    fn build_context(&self, pipeline: &Pipeline, node: NodeId) -> GraphResult<BackendContext> {
        let options = pipeline.node(node)?.core().options();
        let src = Profile::resolve(options.get_str(PROFILE_IN).unwrap_or(DEFAULT_PROFILE))?;
        let dst = Profile::resolve(options.get_str(PROFILE_OUT).unwrap_or(DEFAULT_PROFILE))?;
        let intent = intent(options)?;
        let transform = Transform::new(&src, &dst, intent)?;
        debug!(%node, source = src.name(), dest = dst.name(), %intent, "icc context built");
        Ok(Arc::new(Mutex::new(transform)))
    }

    fn run(
        &self,
        pipeline: &Pipeline,
        node: NodeId,
        _requestor: PlugRef,
        ticket: &mut PixelAccess,
        array: &mut PixelArray,
    ) -> GraphResult<Status> {
        let transform = transform(pipeline, node)?;
        let status = pipeline.run_plug(PlugRef::new(node, 0), ticket, array)?;
        if !array.is_allocated() {
            return Ok(status);
        }

        let work = ticket.work_roi();
        let channels = array.channels();
        let transform = transform.lock().unwrap_or_else(PoisonError::into_inner);
        let mut failure = None;
        array.for_each_row_mut(&work, |_, _, row| {
            if failure.is_none() {
                failure = transform.apply_interleaved(row, channels).err();
            }
        });
        if let Some(e) = failure {
            return Err(e.into());
        }
        trace!(%node, roi = %work, "icc applied");
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_option() {
        assert_eq!(intent(&Options::new()).unwrap(), Intent::Perceptual);
        assert_eq!(
            intent(&Options::new().with(INTENT, 1i64)).unwrap(),
            Intent::RelativeColorimetric
        );
        assert_eq!(
            intent(&Options::new().with(INTENT, "saturation")).unwrap(),
            Intent::Saturation
        );
        assert!(intent(&Options::new().with(INTENT, 7i64)).is_err());
        assert!(matches!(
            intent(&Options::new().with(INTENT, "vivid")),
            Err(GraphError::Icc(_))
        ));
    }

    #[test]
    fn test_profile_option_type() {
        let api = IccConvert::new();
        assert!(api
            .validate_options(&Options::new().with(PROFILE_OUT, true))
            .is_err());
        assert!(api
            .validate_options(&Options::new().with(PROFILE_OUT, "linear-srgb"))
            .is_ok());
    }
}
