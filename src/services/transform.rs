//! Translates a [`TransformBody`] into an ordered chain of media-service
//! transformation steps.
//!
//! Sections are applied in a fixed order (circle, effect, resize, text,
//! rotate) and a section contributes nothing unless its `use_filter` flag is
//! set and its numeric inputs are non-zero.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fmt::Display;

use crate::models::TransformBody;

/// A single directive inside a transformation step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformParam {
    Angle,
    Color,
    Crop,
    Effect,
    Flags,
    Gravity,
    Height,
    Overlay,
    Radius,
    Width,
    Y,
}

impl TransformParam {
    /// URL shorthand understood by the delivery CDN
    pub fn shorthand(&self) -> &'static str {
        match self {
            TransformParam::Angle => "a",
            TransformParam::Color => "co",
            TransformParam::Crop => "c",
            TransformParam::Effect => "e",
            TransformParam::Flags => "fl",
            TransformParam::Gravity => "g",
            TransformParam::Height => "h",
            TransformParam::Overlay => "l",
            TransformParam::Radius => "r",
            TransformParam::Width => "w",
            TransformParam::Y => "y",
        }
    }
}

/// One `/`-separated component of a delivery URL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformStep {
    params: Vec<(TransformParam, String)>,
}

impl TransformStep {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, param: TransformParam, value: impl Into<String>) -> Self {
        self.params.push((param, value.into()));
        self
    }

    pub fn params(&self) -> &[(TransformParam, String)] {
        &self.params
    }

    pub fn get(&self, param: TransformParam) -> Option<&str> {
        self.params
            .iter()
            .find(|(p, _)| *p == param)
            .map(|(_, v)| v.as_str())
    }
}

impl Display for TransformStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered: Vec<String> = self
            .params
            .iter()
            .map(|(param, value)| format!("{}_{}", param.shorthand(), value))
            .collect();
        write!(f, "{}", rendered.join(","))
    }
}

/// Renders a whole chain as a delivery URL path fragment
pub fn chain_to_path(steps: &[TransformStep]) -> String {
    steps
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("/")
}

/// Characters left readable inside a text overlay
const OVERLAY_KEEP: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~');

/// Escapes caption text for a `l_text:` overlay
///
/// Commas and slashes are structural in delivery URLs, so they are escaped
/// twice and reach the renderer as literal characters.
pub fn escape_overlay_text(text: &str) -> String {
    let once = utf8_percent_encode(text, OVERLAY_KEEP).to_string();
    once.replace("%2C", "%252C").replace("%2F", "%252F")
}

fn circle_steps(body: &TransformBody) -> Vec<TransformStep> {
    let circle = &body.circle;
    if !(circle.use_filter && circle.height > 0 && circle.width > 0) {
        return vec![];
    }
    vec![
        TransformStep::new()
            .with(TransformParam::Gravity, "face")
            .with(TransformParam::Height, circle.height.to_string())
            .with(TransformParam::Width, circle.width.to_string())
            .with(TransformParam::Crop, "thumb"),
        TransformStep::new().with(TransformParam::Radius, "max"),
    ]
}

fn effect_steps(body: &TransformBody) -> Vec<TransformStep> {
    let effect = &body.effect;
    if !effect.use_filter {
        return vec![];
    }

    let mut chosen: Option<&str> = None;
    if effect.art_audrey {
        chosen = Some("art:audrey");
    }
    if effect.art_zorro {
        chosen = Some("art:zorro");
    }
    if effect.blur {
        chosen = Some("blur:300");
    }
    if effect.cartoonify {
        chosen = Some("cartoonify");
    }

    chosen
        .map(|e| vec![TransformStep::new().with(TransformParam::Effect, e)])
        .unwrap_or_default()
}

fn resize_steps(body: &TransformBody) -> Vec<TransformStep> {
    let resize = &body.resize;
    if !(resize.use_filter && resize.height > 0 && resize.width > 0) {
        return vec![];
    }

    let crop = if resize.fill {
        "fill"
    } else if resize.crop {
        "crop"
    } else {
        return vec![];
    };

    vec![TransformStep::new()
        .with(TransformParam::Gravity, "auto")
        .with(TransformParam::Height, resize.height.to_string())
        .with(TransformParam::Width, resize.width.to_string())
        .with(TransformParam::Crop, crop)]
}

fn text_steps(body: &TransformBody) -> Vec<TransformStep> {
    let text = &body.text;
    if !(text.use_filter && text.font_size > 0 && !text.text.trim().is_empty()) {
        return vec![];
    }

    let overlay = format!(
        "text:Times_{}_bold:{}",
        text.font_size,
        escape_overlay_text(&text.text)
    );

    vec![
        TransformStep::new()
            .with(TransformParam::Color, "rgb:FFFF00")
            .with(TransformParam::Overlay, overlay),
        TransformStep::new()
            .with(TransformParam::Flags, "layer_apply")
            .with(TransformParam::Gravity, "south")
            .with(TransformParam::Y, "20"),
    ]
}

fn rotate_steps(body: &TransformBody) -> Vec<TransformStep> {
    let rotate = &body.rotate;
    if !(rotate.use_filter && rotate.width > 0 && rotate.degree != 0) {
        return vec![];
    }

    vec![
        TransformStep::new()
            .with(TransformParam::Width, rotate.width.to_string())
            .with(TransformParam::Crop, "scale"),
        TransformStep::new().with(TransformParam::Angle, "vflip"),
        TransformStep::new().with(TransformParam::Angle, rotate.degree.to_string()),
    ]
}

/// Builds the full transformation chain for a request body
pub fn build_chain(body: &TransformBody) -> Vec<TransformStep> {
    let mut chain = Vec::new();
    chain.extend(circle_steps(body));
    chain.extend(effect_steps(body));
    chain.extend(resize_steps(body));
    chain.extend(text_steps(body));
    chain.extend(rotate_steps(body));
    chain
}
