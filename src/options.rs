use serde::{Deserialize, Serialize};

macro_rules! option_table {
    (
        $(#[$attr:meta])*
        $name:ident, tag = $tag:literal, default = $default:ident {
            $($variant:ident = $code:literal => $label:literal,)+
        }
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "u16", into = "u16")]
        #[repr(u16)]
        pub enum $name {
            $($variant = $code,)+
        }

        impl $name {
            pub const TAG: &'static str = $tag;
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            pub fn from_code(code: u16) -> Option<Self> {
                match code {
                    $($code => Some($name::$variant),)+
                    _ => None,
                }
            }

            /// Maps an out-of-table code to the default variant.
            pub fn coerce(code: u16) -> Self {
                Self::from_code(code).unwrap_or_else(|| {
                    tracing::warn!(tag = $tag, code, "unknown code, using default");
                    Self::default()
                })
            }

            pub fn code(self) -> u16 {
                self as u16
            }

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl TryFrom<u16> for $name {
            type Error = String;

            fn try_from(code: u16) -> Result<Self, Self::Error> {
                Self::from_code(code).ok_or_else(|| format!("{} is not a valid {} code", code, $tag))
            }
        }

        impl From<$name> for u16 {
            fn from(value: $name) -> u16 {
                value.code()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

option_table! {
    /// Orientation of the stored image (0th IFD, tag 0x0112).
    Orientation, tag = "Orientation", default = Normal {
        Normal = 1 => "Normal (0°)",
        Rotate180 = 3 => "Upside down (180°)",
        Rotate90Cw = 6 => "Rotated 90° CW",
        Rotate90Ccw = 8 => "Rotated 90° CCW",
    }
}

option_table! {
    MeteringMode, tag = "MeteringMode", default = Unknown {
        Unknown = 0 => "Unknown",
        Average = 1 => "Average",
        CenterWeightedAverage = 2 => "Center-weighted average",
        Spot = 3 => "Spot",
        MultiSpot = 4 => "Multi-spot",
        Pattern = 5 => "Multi-segment",
        Partial = 6 => "Partial",
    }
}

option_table! {
    ExposureMode, tag = "ExposureMode", default = Auto {
        Auto = 0 => "Auto exposure",
        Manual = 1 => "Manual exposure",
    }
}

option_table! {
    LightSource, tag = "LightSource", default = Unknown {
        Unknown = 0 => "Unknown",
        Daylight = 1 => "Daylight",
        Fluorescent = 2 => "Fluorescent",
        Tungsten = 3 => "Tungsten",
        Flash = 4 => "Flash",
        FineWeather = 9 => "Fine weather",
        CloudyWeather = 10 => "Cloudy weather",
        Shade = 11 => "Shade",
        DaylightFluorescent = 12 => "Daylight fluorescent",
        DayWhiteFluorescent = 13 => "Day white fluorescent",
        CoolWhiteFluorescent = 14 => "Cool white fluorescent",
        WhiteFluorescent = 15 => "White fluorescent",
        StandardLightA = 17 => "Standard light A",
        StandardLightB = 18 => "Standard light B",
        StandardLightC = 19 => "Standard light C",
        D55 = 20 => "D55",
        D65 = 21 => "D65",
        D75 = 22 => "D75",
        Other = 255 => "Other",
    }
}

option_table! {
    SensingMethod, tag = "SensingMethod", default = NotDefined {
        NotDefined = 1 => "Not defined",
        OneChipColorArea = 2 => "One-chip color area sensor",
        TwoChipColorArea = 3 => "Two-chip color area sensor",
        ThreeChipColorArea = 4 => "Three-chip color area sensor",
        ColorSequentialArea = 5 => "Color sequential area sensor",
        Trilinear = 7 => "Trilinear sensor",
        ColorSequentialLinear = 8 => "Color sequential linear sensor",
    }
}

option_table! {
    WhiteBalance, tag = "WhiteBalance", default = Auto {
        Auto = 0 => "Auto",
        Manual = 1 => "Manual",
    }
}

option_table! {
    /// Only "did not fire" and "fired" are editable; other flash bit
    /// patterns are coerced to `NoFlash`.
    Flash, tag = "Flash", default = NoFlash {
        NoFlash = 0 => "No flash",
        Fired = 1 => "Flash",
    }
}
