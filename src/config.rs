use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const BYTE_ORDER_ENV: &str = "EXIFEDIT_BYTE_ORDER";
const DEFAULT_OUTPUT_SUFFIX: &str = "_modified";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Byte order of the TIFF data written back into an image.
pub enum ByteOrder {
    /// Same order as the blob that was loaded (big-endian if there was none).
    #[default]
    Keep,
    Big,
    Little,
}

impl ByteOrder {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "keep" | "auto" => Some(ByteOrder::Keep),
            "big" | "be" | "mm" | "motorola" => Some(ByteOrder::Big),
            "little" | "le" | "ii" | "intel" => Some(ByteOrder::Little),
            _ => None,
        }
    }

    /// Resolves to `little_endian` for the writer given the loaded order.
    pub fn little_endian(self, loaded_little_endian: bool) -> bool {
        match self {
            ByteOrder::Keep => loaded_little_endian,
            ByteOrder::Big => false,
            ByteOrder::Little => true,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
/// Persisted settings for the command-line editor.
pub struct EditorConfig {
    pub byte_order: ByteOrder,
    pub output_suffix: Option<String>,
    /// `tracing` filter used when `RUST_LOG` is not set.
    pub log_filter: Option<String>,
}

impl EditorConfig {
    /// `exifedit/config.toml` under the platform config directory.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("exifedit").join("config.toml"))
    }

    /// Reads the editor settings. A missing or unreadable file means stock
    /// settings; a malformed one is reported and then ignored.
    pub fn load() -> Self {
        match Self::config_path().map(|path| std::fs::read_to_string(&path)) {
            Some(Ok(contents)) => Self::parse(&contents),
            _ => Self::default(),
        }
    }

    fn parse(contents: &str) -> Self {
        toml::from_str(contents).unwrap_or_else(|err| {
            eprintln!("exifedit: ignoring malformed config: {err}");
            Self::default()
        })
    }

    /// Byte order after applying the environment override, if it is valid.
    pub fn effective_byte_order(&self) -> ByteOrder {
        std::env::var(BYTE_ORDER_ENV)
            .ok()
            .and_then(|raw| ByteOrder::parse(&raw))
            .unwrap_or(self.byte_order)
    }

    pub fn output_suffix(&self) -> &str {
        self.output_suffix.as_deref().unwrap_or(DEFAULT_OUTPUT_SUFFIX)
    }
}
