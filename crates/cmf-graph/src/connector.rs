//! Connector descriptors and compatibility checks.
//!
//! A [`Connector`] describes what an endpoint can exchange: data types,
//! channel range, layout capabilities. It never holds pixels. Nodes clone
//! the connectors their backend declares into their plugs and sockets.
//!
//! # Matching
//!
//! [`check`] decides whether a socket may serve a plug. A socket carrying a
//! custom matcher ([`Connector::set_match`]) decides alone. Otherwise:
//!
//! 1. every registration key of the plug occurs in the socket's registration,
//! 2. both sides share at least one [`DataType`],
//! 3. the channel ranges overlap, and so do the colour channel ranges,
//! 4. capabilities required by either side are declared by the other.
//!
//! ```rust
//! use cmf_graph::connector::{check, Capabilities, Connector};
//!
//! let socket = Connector::image("Img");
//! let plug = Connector::image("Img")
//!     .plug()
//!     .requiring(Capabilities { subpixel: true, ..Default::default() });
//! assert!(check(&socket, &plug).is_err());
//! ```

use std::fmt;
use std::sync::Arc;

use cmf_core::DataType;
use serde::{Deserialize, Serialize};

use crate::registration;

/// Registration shared by the image connectors of the built-in nodes.
pub const IMAGE_CONNECTOR: &str = "org/cmf/image/connector/image";

/// Custom compatibility predicate `(socket, plug) -> bool`.
pub type Matcher = Arc<dyn Fn(&Connector, &Connector) -> bool + Send + Sync>;

/// Pixel layout capabilities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    /// Channels in separate planes.
    pub planar: bool,
    /// Channels interleaved per pixel.
    pub interwoven: bool,
    /// Channel order swapped (BGR).
    pub swap: bool,
    /// Sample byte order swapped.
    pub swap_bytes: bool,
    /// Inverted values.
    pub revert: bool,
    /// Premultiplied alpha.
    pub premultiplied_alpha: bool,
    /// Straight alpha.
    pub nonpremultiplied_alpha: bool,
    /// Sub-pixel addressing.
    pub subpixel: bool,
}

impl Capabilities {
    /// Interleaved pixels with straight alpha, the common default.
    pub const fn interleaved() -> Self {
        Self {
            planar: false,
            interwoven: true,
            swap: false,
            swap_bytes: false,
            revert: false,
            premultiplied_alpha: false,
            nonpremultiplied_alpha: true,
            subpixel: false,
        }
    }

    fn flags(&self) -> [(&'static str, bool); 8] {
        [
            ("planar", self.planar),
            ("interwoven", self.interwoven),
            ("swap", self.swap),
            ("swap_bytes", self.swap_bytes),
            ("revert", self.revert),
            ("premultiplied_alpha", self.premultiplied_alpha),
            ("nonpremultiplied_alpha", self.nonpremultiplied_alpha),
            ("subpixel", self.subpixel),
        ]
    }

    /// Names of `required` flags not declared by `self`.
    pub fn missing(&self, required: &Capabilities) -> Vec<&'static str> {
        self.flags()
            .into_iter()
            .zip(required.flags())
            .filter(|((_, have), (_, need))| *need && !*have)
            .map(|((name, _), _)| name)
            .collect()
    }
}

/// Endpoint descriptor.
#[derive(Clone)]
pub struct Connector {
    nick: String,
    name: String,
    description: String,
    registration: String,
    is_plug: bool,
    data_types: Vec<DataType>,
    channels: (u32, u32),
    colours: (u32, u32),
    caps: Capabilities,
    requires: Capabilities,
    mandatory: bool,
    matcher: Option<Matcher>,
}

impl Connector {
    /// Image connector accepting every data type and 1..=255 channels.
    pub fn image(nick: impl Into<String>) -> Self {
        let nick = nick.into();
        Self {
            name: nick.clone(),
            nick,
            description: String::new(),
            registration: IMAGE_CONNECTOR.to_string(),
            is_plug: false,
            data_types: DataType::ALL.to_vec(),
            channels: (1, 255),
            colours: (1, 255),
            caps: Capabilities::interleaved(),
            requires: Capabilities::default(),
            mandatory: true,
            matcher: None,
        }
    }

    /// Marks the connector as a plug (consumer side).
    pub fn plug(mut self) -> Self {
        self.is_plug = true;
        self
    }

    /// Sets the plug flag.
    pub fn set_is_plug(&mut self, is_plug: bool) {
        self.is_plug = is_plug;
    }

    /// Sets the long name and description.
    pub fn with_name(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.name = name.into();
        self.description = description.into();
        self
    }

    /// Replaces the registration string.
    pub fn with_registration(mut self, registration: impl Into<String>) -> Self {
        self.registration = registration.into();
        self
    }

    /// Restricts accepted data types.
    pub fn with_data_types(mut self, types: &[DataType]) -> Self {
        self.data_types = types.to_vec();
        self
    }

    /// Sets the inclusive channel count range.
    pub fn with_channels(mut self, min: u32, max: u32) -> Self {
        self.channels = (min, max);
        self
    }

    /// Sets the inclusive colour channel count range.
    pub fn with_colours(mut self, min: u32, max: u32) -> Self {
        self.colours = (min, max);
        self
    }

    /// Declared capabilities.
    pub fn with_caps(mut self, caps: Capabilities) -> Self {
        self.caps = caps;
        self
    }

    /// Capabilities the remote side must declare.
    pub fn requiring(mut self, requires: Capabilities) -> Self {
        self.requires = requires;
        self
    }

    /// Sets whether a plug must be connected for its node to run.
    ///
    /// Plugs are mandatory unless cleared here. Sockets ignore the flag.
    pub fn mandatory(mut self, mandatory: bool) -> Self {
        self.mandatory = mandatory;
        self
    }

    /// Installs a custom matcher, consulted when this connector is a socket.
    pub fn set_match<F>(&mut self, f: F)
    where
        F: Fn(&Connector, &Connector) -> bool + Send + Sync + 'static,
    {
        self.matcher = Some(Arc::new(f));
    }

    /// Builder form of [`Connector::set_match`].
    pub fn with_match<F>(mut self, f: F) -> Self
    where
        F: Fn(&Connector, &Connector) -> bool + Send + Sync + 'static,
    {
        self.set_match(f);
        self
    }

    /// Custom matcher, if any.
    pub fn matcher(&self) -> Option<&Matcher> {
        self.matcher.as_ref()
    }

    /// Short identifier.
    pub fn nick(&self) -> &str {
        &self.nick
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Description text.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Registration string.
    pub fn reg(&self) -> &str {
        &self.registration
    }

    /// Consumer side flag.
    pub fn is_plug(&self) -> bool {
        self.is_plug
    }

    /// Accepted data types.
    pub fn data_types(&self) -> &[DataType] {
        &self.data_types
    }

    /// Channel range.
    pub fn channels(&self) -> (u32, u32) {
        self.channels
    }

    /// Colour channel range.
    pub fn colours(&self) -> (u32, u32) {
        self.colours
    }

    /// Declared capabilities.
    pub fn caps(&self) -> &Capabilities {
        &self.caps
    }

    /// Required capabilities.
    pub fn requires(&self) -> &Capabilities {
        &self.requires
    }

    /// Must be connected.
    pub fn is_mandatory(&self) -> bool {
        self.mandatory
    }
}

impl fmt::Debug for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connector")
            .field("nick", &self.nick)
            .field("registration", &self.registration)
            .field("is_plug", &self.is_plug)
            .field("data_types", &self.data_types)
            .field("channels", &self.channels)
            .field("colours", &self.colours)
            .field("caps", &self.caps)
            .field("requires", &self.requires)
            .field("custom_match", &self.matcher.is_some())
            .finish_non_exhaustive()
    }
}

/// Decides whether `socket` may serve `plug`.
///
/// Returns the first failed check as text.
pub fn check(socket: &Connector, plug: &Connector) -> Result<(), String> {
    if let Some(matcher) = socket.matcher() {
        return if matcher(socket, plug) {
            Ok(())
        } else {
            Err("rejected by custom matcher".to_string())
        };
    }

    if !registration::matches(socket.reg(), plug.reg()) {
        return Err(format!(
            "registration {:?} does not cover {:?}",
            socket.reg(),
            plug.reg()
        ));
    }

    if !plug.data_types.iter().any(|t| socket.data_types.contains(t)) {
        return Err("no common data type".to_string());
    }

    let (smin, smax) = socket.channels;
    let (pmin, pmax) = plug.channels;
    if smin > pmax || pmin > smax {
        return Err(format!(
            "channel ranges {smin}..={smax} and {pmin}..={pmax} do not overlap"
        ));
    }

    let (smin, smax) = socket.colours;
    let (pmin, pmax) = plug.colours;
    if smin > pmax || pmin > smax {
        return Err(format!(
            "colour ranges {smin}..={smax} and {pmin}..={pmax} do not overlap"
        ));
    }

    let missing = socket.caps.missing(&plug.requires);
    if !missing.is_empty() {
        return Err(format!("socket lacks {}", missing.join(", ")));
    }
    let missing = plug.caps.missing(&socket.requires);
    if !missing.is_empty() {
        return Err(format!("plug lacks {}", missing.join(", ")));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_image_connectors_match() {
        let socket = Connector::image("Img");
        let plug = Connector::image("Img").plug();
        assert!(plug.is_plug());
        assert!(check(&socket, &plug).is_ok());
    }

    #[test]
    fn test_subpixel_requirement() {
        let socket = Connector::image("Img");
        let plug = Connector::image("Img").plug().requiring(Capabilities {
            subpixel: true,
            ..Default::default()
        });
        let reason = check(&socket, &plug).unwrap_err();
        assert!(reason.contains("subpixel"));

        let capable = Connector::image("Img").with_caps(Capabilities {
            subpixel: true,
            ..Capabilities::interleaved()
        });
        assert!(check(&capable, &plug).is_ok());
    }

    #[test]
    fn test_data_types_and_channels() {
        let socket = Connector::image("Img").with_data_types(&[DataType::U8]);
        let plug = Connector::image("Img").plug().with_data_types(&[DataType::Float]);
        assert!(check(&socket, &plug).is_err());

        let socket = Connector::image("Img").with_channels(1, 1);
        let plug = Connector::image("Img").plug().with_channels(3, 4);
        assert!(check(&socket, &plug).unwrap_err().contains("channel"));
    }

    #[test]
    fn test_colour_ranges() {
        let grey = Connector::image("Img").with_colours(1, 1);
        let rgb_only = Connector::image("Img").plug().with_colours(3, 3);
        assert!(check(&grey, &rgb_only).unwrap_err().contains("colour"));
        assert!(check(&Connector::image("Img").with_colours(3, 4), &rgb_only).is_ok());
        assert_eq!(rgb_only.colours(), (3, 3));
    }

    #[test]
    fn test_registration_keys() {
        let socket = Connector::image("Img");
        let plug = Connector::image("Img").plug().with_registration("org/cmf/mesh");
        assert!(check(&socket, &plug).is_err());
    }

    #[test]
    fn test_custom_matcher_overrides() {
        let socket = Connector::image("Img")
            .with_data_types(&[DataType::U8])
            .with_match(|_, plug| plug.nick() == "Any");
        let plug = Connector::image("Any").plug().with_data_types(&[DataType::Double]);
        assert!(check(&socket, &plug).is_ok());
        assert!(check(&socket, &Connector::image("Other").plug()).is_err());
    }
}
