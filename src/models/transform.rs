use serde::{Deserialize, Serialize};
use validator::Validate;

fn default_side() -> u32 {
    400
}

fn default_font_size() -> u32 {
    70
}

fn default_degree() -> i32 {
    45
}

/// Face-centred circular crop
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransformCircle {
    #[serde(default)]
    pub use_filter: bool,
    #[serde(default = "default_side")]
    pub height: u32,
    #[serde(default = "default_side")]
    pub width: u32,
}

impl Default for TransformCircle {
    fn default() -> Self {
        Self {
            use_filter: false,
            height: default_side(),
            width: default_side(),
        }
    }
}

/// Artistic effects; when several are set the last in declaration order wins
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TransformEffect {
    #[serde(default)]
    pub use_filter: bool,
    #[serde(default)]
    pub art_audrey: bool,
    #[serde(default)]
    pub art_zorro: bool,
    #[serde(default)]
    pub cartoonify: bool,
    #[serde(default)]
    pub blur: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransformResize {
    #[serde(default)]
    pub use_filter: bool,
    #[serde(default)]
    pub crop: bool,
    #[serde(default)]
    pub fill: bool,
    #[serde(default = "default_side")]
    pub height: u32,
    #[serde(default = "default_side")]
    pub width: u32,
}

impl Default for TransformResize {
    fn default() -> Self {
        Self {
            use_filter: false,
            crop: false,
            fill: false,
            height: default_side(),
            width: default_side(),
        }
    }
}

/// Caption rendered at the bottom of the image
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct TransformText {
    #[serde(default)]
    pub use_filter: bool,
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub text: String,
}

impl Default for TransformText {
    fn default() -> Self {
        Self {
            use_filter: false,
            font_size: default_font_size(),
            text: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct TransformRotate {
    #[serde(default)]
    pub use_filter: bool,
    #[serde(default = "default_side")]
    pub width: u32,
    #[serde(default = "default_degree")]
    #[validate(range(min = -360, max = 360))]
    pub degree: i32,
}

impl Default for TransformRotate {
    fn default() -> Self {
        Self {
            use_filter: false,
            width: default_side(),
            degree: default_degree(),
        }
    }
}

/// Request body of the transform endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Validate)]
pub struct TransformBody {
    #[serde(default)]
    pub circle: TransformCircle,
    #[serde(default)]
    pub effect: TransformEffect,
    #[serde(default)]
    pub resize: TransformResize,
    #[serde(default)]
    #[validate(nested)]
    pub text: TransformText,
    #[serde(default)]
    #[validate(nested)]
    pub rotate: TransformRotate,
}
