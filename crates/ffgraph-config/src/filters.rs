//! Registry of operation kinds that pipeline files can name.
//!
//! Each entry pairs a [`FilterDescriptor`] (id, category, parameter specs)
//! with a factory that builds the core [`Filter`] from string parameters.
//! Parameter values arrive as strings; the factory parses them into typed
//! values and falls back to each parameter's default.
//!
//! # Example
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use ffgraph_config::{FilterRegistry, Operation};
//! use ffgraph_core::Filter;
//!
//! let registry = FilterRegistry::new();
//! let mut params = BTreeMap::new();
//! params.insert("angle".to_string(), "PI".to_string());
//!
//! let op = registry.create("rotate", &params).unwrap();
//! assert_eq!(op, Operation::Filter(Filter::rotate("PI")));
//! ```

use std::collections::BTreeMap;
use std::str::FromStr;

use ffgraph_core::Filter;

use crate::error::ConfigError;

/// Operation id of the audio fan-in node.
pub const MERGE: &str = "merge";

/// Category of operation kind, used to group the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterCategory {
    /// Operates on video frames.
    Video,
    /// Operates on audio samples.
    Audio,
    /// Combines several streams.
    Composite,
}

impl FilterCategory {
    /// Returns a human-readable name for the category.
    pub const fn name(&self) -> &'static str {
        match self {
            FilterCategory::Video => "Video",
            FilterCategory::Audio => "Audio",
            FilterCategory::Composite => "Composite",
        }
    }
}

/// One named parameter of an operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    /// Key in the pipeline file's `params` table.
    pub name: &'static str,
    /// Value used when the key is absent; `None` means the key is required.
    pub default: Option<&'static str>,
    /// Short description for listings.
    pub description: &'static str,
}

impl ParamSpec {
    const fn required(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            default: None,
            description,
        }
    }

    const fn optional(name: &'static str, default: &'static str, description: &'static str) -> Self {
        Self {
            name,
            default: Some(default),
            description,
        }
    }
}

/// Describes an operation kind in the registry.
#[derive(Debug, Clone)]
pub struct FilterDescriptor {
    /// Identifier used in pipeline files (lowercase, no spaces).
    pub id: &'static str,
    /// Brief description of the operation.
    pub description: &'static str,
    /// Category for organization.
    pub category: FilterCategory,
    /// Accepted parameters.
    pub params: &'static [ParamSpec],
    /// Whether `since`/`until`/`enable` may be attached.
    pub timeline: bool,
}

const SCALE_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("width", "Target width (-1/-2 keep aspect)"),
    ParamSpec::required("height", "Target height (-1/-2 keep aspect)"),
    ParamSpec::optional("set_sar", "false", "Append setsar=1:1"),
];

const COLORKEY_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("color", "Key colour"),
    ParamSpec::optional("similarity", "0.3", "Similarity threshold"),
];

const SPEED_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("speed", "Speed multiplier (2 = twice as fast)"),
];

const DRAWBOX_PARAMS: &[ParamSpec] = &[
    ParamSpec::optional("x", "0", "Left edge"),
    ParamSpec::optional("y", "0", "Top edge"),
    ParamSpec::required("width", "Box width"),
    ParamSpec::required("height", "Box height"),
    ParamSpec::optional("color", "black", "Box colour"),
    ParamSpec::optional("thickness", "3", "Line thickness or 'fill'"),
];

const BOXBLUR_PARAMS: &[ParamSpec] = &[
    ParamSpec::optional("luma_radius", "2", "Luma radius expression"),
    ParamSpec::optional("chroma_radius", "2", "Chroma radius expression"),
    ParamSpec::optional("luma_power", "1", "Blur passes on luma"),
];

const CURVES_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("preset", "Preset name (vintage, lighter, ...)"),
];

const ROTATE_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("angle", "Angle expression (PI, t*0.1, ...)"),
];

const DRAWTEXT_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("text", "Literal text"),
    ParamSpec::optional("x", "0", "Horizontal position expression"),
    ParamSpec::optional("y", "0", "Vertical position expression"),
    ParamSpec::optional("font_color", "white", "Font colour"),
    ParamSpec::optional("font_size", "24", "Font size in pixels"),
];

const CROP_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("width", "Output width expression"),
    ParamSpec::required("height", "Output height expression"),
    ParamSpec::optional("x", "(in_w-out_w)/2", "Left edge expression"),
    ParamSpec::optional("y", "(in_h-out_h)/2", "Top edge expression"),
];

const FORMAT_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("pix_fmt", "Pixel format (yuv420p, ...)"),
];

const ATEMPO_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("speed", "Tempo multiplier"),
];

const VOLUME_PARAMS: &[ParamSpec] = &[
    ParamSpec::required("level", "Linear gain"),
];

const AECHO_PARAMS: &[ParamSpec] = &[
    ParamSpec::optional("in_gain", "0.6", "Input gain"),
    ParamSpec::optional("out_gain", "0.3", "Output gain"),
    ParamSpec::optional("delays", "1000", "'|'-separated delays in ms"),
    ParamSpec::optional("decays", "0.5", "'|'-separated decays"),
];

const OVERLAY_PARAMS: &[ParamSpec] = &[
    ParamSpec::optional("x", "0", "Horizontal position expression"),
    ParamSpec::optional("y", "0", "Vertical position expression"),
];

/// What a registry factory produces.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// A catalogued filter with a fixed arity.
    Filter(Filter),
    /// An audio merge over two or more inputs.
    Merge,
}

/// Typed access to one node's string parameters.
pub struct Params<'a> {
    filter: &'static str,
    specs: &'static [ParamSpec],
    values: &'a BTreeMap<String, String>,
}

impl Params<'_> {
    fn raw(&self, name: &str) -> Result<&str, ConfigError> {
        if let Some(value) = self.values.get(name) {
            return Ok(value);
        }
        self.specs
            .iter()
            .find(|spec| spec.name == name)
            .and_then(|spec| spec.default)
            .ok_or_else(|| ConfigError::invalid_param(self.filter, name, "missing required value"))
    }

    /// The value (or default) as an owned string.
    pub fn text(&self, name: &str) -> Result<String, ConfigError> {
        self.raw(name).map(str::to_string)
    }

    /// The value (or default) parsed as `T`.
    pub fn parse<T: FromStr>(&self, name: &str) -> Result<T, ConfigError> {
        let raw = self.raw(name)?;
        raw.trim().parse().map_err(|_| {
            ConfigError::invalid_param(
                self.filter,
                name,
                format!("cannot parse '{raw}' as {}", std::any::type_name::<T>()),
            )
        })
    }

    /// A strictly positive, finite number.
    pub fn positive(&self, name: &str) -> Result<f32, ConfigError> {
        let value: f32 = self.parse(name)?;
        if value.is_finite() && value > 0.0 {
            Ok(value)
        } else {
            Err(ConfigError::invalid_param(
                self.filter,
                name,
                "must be a positive number",
            ))
        }
    }
}

/// Factory function type for building operations from parameters.
type FilterFactory = fn(&Params<'_>) -> Result<Operation, ConfigError>;

/// Internal entry in the registry.
struct RegistryEntry {
    descriptor: FilterDescriptor,
    factory: FilterFactory,
}

/// Registry of all operation kinds a pipeline file may use.
pub struct FilterRegistry {
    entries: Vec<RegistryEntry>,
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterRegistry {
    /// Create a new registry with all built-in operations registered.
    pub fn new() -> Self {
        let mut registry = Self {
            entries: Vec::with_capacity(17),
        };
        registry.register_builtin_filters();
        registry
    }

    fn register_builtin_filters(&mut self) {
        // Video
        self.register(
            FilterDescriptor {
                id: "scale",
                description: "Resize, optionally forcing square pixels",
                category: FilterCategory::Video,
                params: SCALE_PARAMS,
                timeline: false,
            },
            |p| {
                Ok(Operation::Filter(Filter::scale(
                    p.parse("width")?,
                    p.parse("height")?,
                    p.parse("set_sar")?,
                )))
            },
        );

        self.register(
            FilterDescriptor {
                id: "colorkey",
                description: "Make pixels of one colour transparent",
                category: FilterCategory::Video,
                params: COLORKEY_PARAMS,
                timeline: false,
            },
            |p| {
                Ok(Operation::Filter(Filter::color_key(
                    p.text("color")?,
                    p.parse("similarity")?,
                )))
            },
        );

        self.register(
            FilterDescriptor {
                id: "speed",
                description: "Change playback speed by retiming frames (setpts)",
                category: FilterCategory::Video,
                params: SPEED_PARAMS,
                timeline: false,
            },
            |p| Ok(Operation::Filter(Filter::speed(p.positive("speed")?))),
        );

        self.register(
            FilterDescriptor {
                id: "drawbox",
                description: "Draw a rectangle",
                category: FilterCategory::Video,
                params: DRAWBOX_PARAMS,
                timeline: true,
            },
            |p| {
                Ok(Operation::Filter(Filter::draw_box(
                    p.parse("x")?,
                    p.parse("y")?,
                    p.parse("width")?,
                    p.parse("height")?,
                    p.text("color")?,
                    p.text("thickness")?,
                )))
            },
        );

        self.register(
            FilterDescriptor {
                id: "boxblur",
                description: "Box blur with per-plane radii",
                category: FilterCategory::Video,
                params: BOXBLUR_PARAMS,
                timeline: false,
            },
            |p| {
                Ok(Operation::Filter(Filter::box_blur(
                    p.text("luma_radius")?,
                    p.text("chroma_radius")?,
                    p.parse("luma_power")?,
                )))
            },
        );

        self.register(
            FilterDescriptor {
                id: "curves",
                description: "Apply a colour curves preset",
                category: FilterCategory::Video,
                params: CURVES_PARAMS,
                timeline: true,
            },
            |p| Ok(Operation::Filter(Filter::curves(p.text("preset")?))),
        );

        self.register(
            FilterDescriptor {
                id: "rotate",
                description: "Rotate by an angle expression in radians",
                category: FilterCategory::Video,
                params: ROTATE_PARAMS,
                timeline: false,
            },
            |p| Ok(Operation::Filter(Filter::rotate(p.text("angle")?))),
        );

        self.register(
            FilterDescriptor {
                id: "drawtext",
                description: "Render text onto video",
                category: FilterCategory::Video,
                params: DRAWTEXT_PARAMS,
                timeline: true,
            },
            |p| {
                Ok(Operation::Filter(Filter::draw_text(
                    p.text("text")?,
                    p.text("x")?,
                    p.text("y")?,
                    p.text("font_color")?,
                    p.parse("font_size")?,
                )))
            },
        );

        self.register(
            FilterDescriptor {
                id: "crop",
                description: "Crop to a sub-rectangle",
                category: FilterCategory::Video,
                params: CROP_PARAMS,
                timeline: false,
            },
            |p| {
                Ok(Operation::Filter(Filter::crop(
                    p.text("width")?,
                    p.text("height")?,
                    p.text("x")?,
                    p.text("y")?,
                )))
            },
        );

        self.register(
            FilterDescriptor {
                id: "format",
                description: "Convert pixel format",
                category: FilterCategory::Video,
                params: FORMAT_PARAMS,
                timeline: false,
            },
            |p| Ok(Operation::Filter(Filter::format(p.text("pix_fmt")?))),
        );

        // Audio
        self.register(
            FilterDescriptor {
                id: "atempo",
                description: "Change audio tempo without changing pitch",
                category: FilterCategory::Audio,
                params: ATEMPO_PARAMS,
                timeline: false,
            },
            |p| Ok(Operation::Filter(Filter::atempo(p.positive("speed")?))),
        );

        self.register(
            FilterDescriptor {
                id: "volume",
                description: "Scale audio volume",
                category: FilterCategory::Audio,
                params: VOLUME_PARAMS,
                timeline: true,
            },
            |p| Ok(Operation::Filter(Filter::volume(p.parse("level")?))),
        );

        self.register(
            FilterDescriptor {
                id: "aecho",
                description: "Audio echo",
                category: FilterCategory::Audio,
                params: AECHO_PARAMS,
                timeline: false,
            },
            |p| {
                Ok(Operation::Filter(Filter::echo(
                    p.parse("in_gain")?,
                    p.parse("out_gain")?,
                    p.text("delays")?,
                    p.text("decays")?,
                )))
            },
        );

        // Composite
        self.register(
            FilterDescriptor {
                id: "overlay",
                description: "Place the second input on top of the first",
                category: FilterCategory::Composite,
                params: OVERLAY_PARAMS,
                timeline: false,
            },
            |p| Ok(Operation::Filter(Filter::overlay(p.text("x")?, p.text("y")?))),
        );

        self.register(
            FilterDescriptor {
                id: "overlay_center",
                description: "Place the second input in the centre of the first",
                category: FilterCategory::Composite,
                params: &[],
                timeline: false,
            },
            |_| Ok(Operation::Filter(Filter::overlay_center())),
        );

        self.register(
            FilterDescriptor {
                id: MERGE,
                description: "Merge two or more audio streams (amerge)",
                category: FilterCategory::Composite,
                params: &[],
                timeline: false,
            },
            |_| Ok(Operation::Merge),
        );
    }

    /// Register an operation kind with its factory function.
    fn register(&mut self, descriptor: FilterDescriptor, factory: FilterFactory) {
        self.entries.push(RegistryEntry {
            descriptor,
            factory,
        });
    }

    /// Get all registered operation descriptors.
    pub fn all_filters(&self) -> impl Iterator<Item = &FilterDescriptor> {
        self.entries.iter().map(|e| &e.descriptor)
    }

    /// Get operation descriptors in a specific category.
    pub fn filters_in_category(
        &self,
        category: FilterCategory,
    ) -> impl Iterator<Item = &FilterDescriptor> {
        self.entries
            .iter()
            .filter(move |e| e.descriptor.category == category)
            .map(|e| &e.descriptor)
    }

    /// Look up a descriptor by id.
    pub fn find(&self, id: &str) -> Option<&FilterDescriptor> {
        self.entries
            .iter()
            .find(|e| e.descriptor.id == id)
            .map(|e| &e.descriptor)
    }

    /// Build the operation `id` from string parameters.
    ///
    /// Unknown ids give [`ConfigError::UnknownFilter`]; unknown keys, missing
    /// required keys and unparsable values give
    /// [`ConfigError::InvalidParameter`].
    pub fn create(
        &self,
        id: &str,
        values: &BTreeMap<String, String>,
    ) -> Result<Operation, ConfigError> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.descriptor.id == id)
            .ok_or_else(|| ConfigError::UnknownFilter(id.to_string()))?;
        let specs = entry.descriptor.params;
        if let Some(unknown) = values.keys().find(|k| !specs.iter().any(|s| s.name == k.as_str())) {
            return Err(ConfigError::invalid_param(
                entry.descriptor.id,
                unknown.as_str(),
                "unknown parameter",
            ));
        }
        let params = Params {
            filter: entry.descriptor.id,
            specs,
            values,
        };
        (entry.factory)(&params)
    }

    /// Number of registered operation kinds.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_registry_has_every_kind() {
        let registry = FilterRegistry::new();
        assert_eq!(registry.len(), 16);
        for id in [
            "scale",
            "overlay",
            "overlay_center",
            "colorkey",
            "speed",
            "drawbox",
            "boxblur",
            "curves",
            "rotate",
            "atempo",
            "drawtext",
            "crop",
            "volume",
            "aecho",
            "format",
            MERGE,
        ] {
            assert!(registry.find(id).is_some(), "missing {id}");
        }
    }

    #[test]
    fn test_timeline_flag_matches_filter() {
        let registry = FilterRegistry::new();
        for (id, values) in [
            ("drawbox", params(&[("width", "10"), ("height", "10")])),
            ("curves", params(&[("preset", "vintage")])),
            ("rotate", params(&[("angle", "PI")])),
            ("volume", params(&[("level", "0.5")])),
        ] {
            let descriptor = registry.find(id).unwrap();
            let Operation::Filter(filter) = registry.create(id, &values).unwrap() else {
                panic!("{id} is not a filter");
            };
            assert_eq!(descriptor.timeline, filter.supports_timeline(), "{id}");
        }
    }

    #[test]
    fn test_create_uses_defaults() {
        let registry = FilterRegistry::new();
        let op = registry
            .create("scale", &params(&[("width", "400"), ("height", "-2")]))
            .unwrap();
        assert_eq!(op, Operation::Filter(Filter::scale(400, -2, false)));

        let op = registry.create("aecho", &BTreeMap::new()).unwrap();
        let Operation::Filter(filter) = op else {
            panic!("aecho is a filter");
        };
        assert_eq!(filter.render(), "aecho=0.6:0.3:1000:0.5");
    }

    #[test]
    fn test_create_speed_renders_setpts() {
        let registry = FilterRegistry::new();
        let Operation::Filter(filter) = registry
            .create("speed", &params(&[("speed", "2")]))
            .unwrap()
        else {
            panic!("speed is a filter");
        };
        assert_eq!(filter.render(), "setpts=0.5*PTS");
    }

    #[test]
    fn test_create_merge() {
        let registry = FilterRegistry::new();
        assert_eq!(
            registry.create(MERGE, &BTreeMap::new()).unwrap(),
            Operation::Merge
        );
    }

    #[test]
    fn test_unknown_filter() {
        let registry = FilterRegistry::new();
        let err = registry.create("sharpen", &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownFilter(ref id) if id == "sharpen"));
    }

    #[test]
    fn test_unknown_parameter() {
        let registry = FilterRegistry::new();
        let err = registry
            .create("rotate", &params(&[("angle", "PI"), ("speed", "2")]))
            .unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidParameter { ref param, .. } if param == "speed")
        );
    }

    #[test]
    fn test_missing_required_parameter() {
        let registry = FilterRegistry::new();
        let err = registry
            .create("scale", &params(&[("width", "400")]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid parameter 'height' for filter 'scale': missing required value"
        );
    }

    #[test]
    fn test_unparsable_parameter() {
        let registry = FilterRegistry::new();
        let err = registry
            .create("scale", &params(&[("width", "wide"), ("height", "1")]))
            .unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidParameter { ref param, .. } if param == "width")
        );
    }

    #[test]
    fn test_speed_must_be_positive() {
        let registry = FilterRegistry::new();
        for bad in ["0", "-1", "inf"] {
            assert!(
                registry.create("speed", &params(&[("speed", bad)])).is_err(),
                "speed={bad}"
            );
        }
    }

    #[test]
    fn test_filters_in_category() {
        let registry = FilterRegistry::new();
        let audio: Vec<&str> = registry
            .filters_in_category(FilterCategory::Audio)
            .map(|d| d.id)
            .collect();
        assert_eq!(audio, ["atempo", "volume", "aecho"]);
    }
}
