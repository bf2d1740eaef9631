//! Operation catalogue: the concrete filters and their text templates.
//!
//! Each [`Filter`] variant knows its name, how many inputs it consumes and how
//! it renders as filtergraph text. The compiler treats rendering as a leaf
//! capability; it never inspects filter parameters.

use crate::format::escape_text;

/// A concrete media operation.
///
/// Numeric parameters render with Rust's shortest round-trip formatting
/// (`0.5`, `0.90909094`), except [`Filter::Atempo`], which always prints two
/// decimals.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Resize to `width`x`height`, optionally forcing a square sample aspect ratio.
    Scale {
        /// Target width (`-1`/`-2` keep aspect ratio).
        width: i32,
        /// Target height (`-1`/`-2` keep aspect ratio).
        height: i32,
        /// Append `setsar=1:1`.
        set_sar: bool,
    },
    /// Place the second input on top of the first at an expression position.
    Overlay {
        /// Horizontal position expression.
        x: String,
        /// Vertical position expression.
        y: String,
    },
    /// Place the second input in the centre of the first.
    OverlayCenter,
    /// Make pixels of `color` transparent.
    ColorKey {
        /// Key colour (`#00ff00`, `green`, ...).
        color: String,
        /// Similarity threshold.
        similarity: f32,
    },
    /// Retime frames: `setpts=factor*PTS`.
    SetPts {
        /// Presentation timestamp multiplier (0.5 = double speed).
        factor: f32,
    },
    /// Draw a rectangle.
    DrawBox {
        /// Left edge.
        x: i32,
        /// Top edge.
        y: i32,
        /// Box width.
        width: i32,
        /// Box height.
        height: i32,
        /// Box colour.
        color: String,
        /// Line thickness or `fill`.
        thickness: String,
    },
    /// Box blur with per-plane radii.
    BoxBlur {
        /// Luma radius expression.
        luma_radius: String,
        /// Chroma radius expression.
        chroma_radius: String,
        /// Number of blur passes on luma.
        luma_power: u32,
    },
    /// Apply a colour curves preset.
    Curves {
        /// Preset name (`vintage`, `lighter`, ...).
        preset: String,
    },
    /// Rotate by an angle expression in radians.
    Rotate {
        /// Angle expression (`PI`, `t*0.1`, ...).
        angle: String,
    },
    /// Change audio tempo without changing pitch.
    Atempo {
        /// Tempo multiplier.
        speed: f32,
    },
    /// Render text onto video.
    DrawText {
        /// The literal text; escaped when rendered.
        text: String,
        /// Horizontal position expression.
        x: String,
        /// Vertical position expression.
        y: String,
        /// Font colour.
        font_color: String,
        /// Font size in pixels.
        font_size: u32,
    },
    /// Crop to a sub-rectangle.
    Crop {
        /// Output width expression.
        width: String,
        /// Output height expression.
        height: String,
        /// Left edge expression.
        x: String,
        /// Top edge expression.
        y: String,
    },
    /// Scale audio volume.
    Volume {
        /// Linear gain.
        level: f32,
    },
    /// Audio echo.
    Echo {
        /// Input gain.
        in_gain: f32,
        /// Output gain.
        out_gain: f32,
        /// `|`-separated delays in milliseconds.
        delays: String,
        /// `|`-separated decays.
        decays: String,
    },
    /// Convert pixel format.
    Format {
        /// Pixel format name (`yuv420p`, ...).
        pix_fmt: String,
    },
}

impl Filter {
    /// Creates a [`Filter::Scale`].
    pub fn scale(width: i32, height: i32, set_sar: bool) -> Self {
        Self::Scale {
            width,
            height,
            set_sar,
        }
    }

    /// Creates a [`Filter::Overlay`] at the given position expressions.
    pub fn overlay(x: impl Into<String>, y: impl Into<String>) -> Self {
        Self::Overlay {
            x: x.into(),
            y: y.into(),
        }
    }

    /// Creates a [`Filter::OverlayCenter`].
    pub fn overlay_center() -> Self {
        Self::OverlayCenter
    }

    /// Creates a [`Filter::ColorKey`].
    pub fn color_key(color: impl Into<String>, similarity: f32) -> Self {
        Self::ColorKey {
            color: color.into(),
            similarity,
        }
    }

    /// Creates a [`Filter::SetPts`] that plays `speed` times faster.
    ///
    /// `speed` must be positive and finite. Zero renders `setpts=inf*PTS`
    /// and NaN renders `setpts=NaN*PTS`, neither of which ffmpeg accepts.
    pub fn speed(speed: f32) -> Self {
        Self::SetPts {
            factor: 1.0 / speed,
        }
    }

    /// Creates a [`Filter::DrawBox`].
    pub fn draw_box(
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        color: impl Into<String>,
        thickness: impl Into<String>,
    ) -> Self {
        Self::DrawBox {
            x,
            y,
            width,
            height,
            color: color.into(),
            thickness: thickness.into(),
        }
    }

    /// Creates a [`Filter::BoxBlur`].
    pub fn box_blur(
        luma_radius: impl Into<String>,
        chroma_radius: impl Into<String>,
        luma_power: u32,
    ) -> Self {
        Self::BoxBlur {
            luma_radius: luma_radius.into(),
            chroma_radius: chroma_radius.into(),
            luma_power,
        }
    }

    /// Creates a [`Filter::Curves`].
    pub fn curves(preset: impl Into<String>) -> Self {
        Self::Curves {
            preset: preset.into(),
        }
    }

    /// Creates a [`Filter::Rotate`].
    pub fn rotate(angle: impl Into<String>) -> Self {
        Self::Rotate {
            angle: angle.into(),
        }
    }

    /// Creates a [`Filter::Atempo`].
    pub fn atempo(speed: f32) -> Self {
        Self::Atempo { speed }
    }

    /// Creates a [`Filter::DrawText`].
    pub fn draw_text(
        text: impl Into<String>,
        x: impl Into<String>,
        y: impl Into<String>,
        font_color: impl Into<String>,
        font_size: u32,
    ) -> Self {
        Self::DrawText {
            text: text.into(),
            x: x.into(),
            y: y.into(),
            font_color: font_color.into(),
            font_size,
        }
    }

    /// Creates a [`Filter::Crop`].
    pub fn crop(
        width: impl Into<String>,
        height: impl Into<String>,
        x: impl Into<String>,
        y: impl Into<String>,
    ) -> Self {
        Self::Crop {
            width: width.into(),
            height: height.into(),
            x: x.into(),
            y: y.into(),
        }
    }

    /// Creates a [`Filter::Volume`].
    pub fn volume(level: f32) -> Self {
        Self::Volume { level }
    }

    /// Creates a [`Filter::Echo`].
    pub fn echo(
        in_gain: f32,
        out_gain: f32,
        delays: impl Into<String>,
        decays: impl Into<String>,
    ) -> Self {
        Self::Echo {
            in_gain,
            out_gain,
            delays: delays.into(),
            decays: decays.into(),
        }
    }

    /// Creates a [`Filter::Format`].
    pub fn format(pix_fmt: impl Into<String>) -> Self {
        Self::Format {
            pix_fmt: pix_fmt.into(),
        }
    }

    /// Returns the filter's name as used in the filtergraph.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Scale { .. } => "scale",
            Self::Overlay { .. } | Self::OverlayCenter => "overlay",
            Self::ColorKey { .. } => "colorkey",
            Self::SetPts { .. } => "setpts",
            Self::DrawBox { .. } => "drawbox",
            Self::BoxBlur { .. } => "boxblur",
            Self::Curves { .. } => "curves",
            Self::Rotate { .. } => "rotate",
            Self::Atempo { .. } => "atempo",
            Self::DrawText { .. } => "drawtext",
            Self::Crop { .. } => "crop",
            Self::Volume { .. } => "volume",
            Self::Echo { .. } => "aecho",
            Self::Format { .. } => "format",
        }
    }

    /// Number of input streams the filter consumes.
    pub fn arity(&self) -> usize {
        match self {
            Self::Overlay { .. } | Self::OverlayCenter => 2,
            _ => 1,
        }
    }

    /// Whether the filter accepts an `enable='...'` timeline expression.
    pub fn supports_timeline(&self) -> bool {
        matches!(
            self,
            Self::DrawBox { .. } | Self::Curves { .. } | Self::DrawText { .. } | Self::Volume { .. }
        )
    }

    /// Renders the filter as filtergraph text, without labels.
    pub fn render(&self) -> String {
        match self {
            Self::Scale {
                width,
                height,
                set_sar,
            } => {
                if *set_sar {
                    format!("scale={width}:{height},setsar=1:1")
                } else {
                    format!("scale={width}:{height}")
                }
            }
            Self::Overlay { x, y } => format!("overlay={x}:{y}"),
            Self::OverlayCenter => "overlay=main_w/2-overlay_w/2:main_h/2-overlay_h/2".to_string(),
            Self::ColorKey { color, similarity } => format!("colorkey={color}:{similarity}"),
            Self::SetPts { factor } => format!("setpts={factor}*PTS"),
            Self::DrawBox {
                x,
                y,
                width,
                height,
                color,
                thickness,
            } => format!("drawbox=x={x}:y={y}:w={width}:h={height}:color={color}:t={thickness}"),
            Self::BoxBlur {
                luma_radius,
                chroma_radius,
                luma_power,
            } => format!(
                "boxblur=luma_radius={luma_radius}:chroma_radius={chroma_radius}:luma_power={luma_power}"
            ),
            Self::Curves { preset } => format!("curves=preset={preset}"),
            Self::Rotate { angle } => format!("rotate={angle}"),
            Self::Atempo { speed } => format!("atempo={speed:.2}"),
            Self::DrawText {
                text,
                x,
                y,
                font_color,
                font_size,
            } => format!(
                "drawtext=text={}:fontsize={font_size}:fontcolor={font_color}:x={x}:y={y}",
                escape_text(text)
            ),
            Self::Crop {
                width,
                height,
                x,
                y,
            } => format!("crop={width}:{height}:{x}:{y}"),
            Self::Volume { level } => format!("volume={level}"),
            Self::Echo {
                in_gain,
                out_gain,
                delays,
                decays,
            } => format!("aecho={in_gain}:{out_gain}:{delays}:{decays}"),
            Self::Format { pix_fmt } => format!("format=pix_fmts={pix_fmt}"),
        }
    }
}

/// Temporal gate for timeline-capable filters.
///
/// An explicit `enable` expression wins over `since`/`until`. With both bounds
/// set the gate is `between(t, S, U)`, with one it is `gte`/`lte`; bounds print
/// with two decimals.
///
/// ```rust
/// use ffgraph_core::Timeline;
///
/// let gate = Timeline::new().since(3.0);
/// assert_eq!(gate.expression().as_deref(), Some("gte(t, 3.00)"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    enable: Option<String>,
    since: Option<f64>,
    until: Option<f64>,
}

impl Timeline {
    /// Creates an empty gate (always active).
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a raw `enable` expression.
    pub fn enable(mut self, expr: impl Into<String>) -> Self {
        self.enable = Some(expr.into());
        self
    }

    /// Active from `t` seconds onward.
    pub fn since(mut self, t: f64) -> Self {
        self.since = Some(t);
        self
    }

    /// Active until `t` seconds.
    pub fn until(mut self, t: f64) -> Self {
        self.until = Some(t);
        self
    }

    /// Active between `start` and `end` seconds.
    pub fn between(self, start: f64, end: f64) -> Self {
        self.since(start).until(end)
    }

    /// Returns the gating expression, or `None` if the gate is empty.
    pub fn expression(&self) -> Option<String> {
        if let Some(expr) = self.enable.as_ref().filter(|e| !e.is_empty()) {
            return Some(expr.clone());
        }
        match (self.since, self.until) {
            (Some(since), Some(until)) => Some(format!("between(t, {since:.2}, {until:.2})")),
            (Some(since), None) => Some(format!("gte(t, {since:.2})")),
            (None, Some(until)) => Some(format!("lte(t, {until:.2})")),
            (None, None) => None,
        }
    }

    /// Appends the gate to rendered filter text.
    pub(crate) fn apply(&self, text: String) -> String {
        match self.expression() {
            Some(expr) => format!("{text}:enable='{expr}'"),
            None => text,
        }
    }
}
