use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use exifedit::config::EditorConfig;
use exifedit::{DecodeStatus, Decoded, FormValues, decode, jpeg};

const USAGE: &str = "usage: exifedit show <image.jpg>\n       exifedit edit <image.jpg> <edits.toml> [output.jpg]";

fn init_logging(config: &EditorConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter.as_deref().unwrap_or("warn")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load(path: &Path) -> Result<(Vec<u8>, Decoded)> {
    let image = std::fs::read(path).with_context(|| format!("read failed for {}", path.display()))?;
    let blob = jpeg::extract_exif(&image)
        .with_context(|| format!("not a readable JPEG: {}", path.display()))?;
    let decoded =
        decode(&blob).with_context(|| format!("corrupt EXIF data in {}", path.display()))?;
    Ok((image, decoded))
}

fn output_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    let ext = input
        .extension()
        .map(|e| e.to_string_lossy())
        .unwrap_or_else(|| "jpg".into());
    input.with_file_name(format!("{}{}.{}", stem, suffix, ext))
}

fn show(path: &Path) -> Result<()> {
    let (_, decoded) = load(path)?;
    if decoded.status == DecodeStatus::NoMetadataPresent {
        eprintln!("exifedit: no EXIF metadata found in {}", path.display());
    }
    let (form, coordinate_errors) = FormValues::from_record(&decoded.record);
    let errors: Vec<String> = decoded
        .field_errors
        .iter()
        .chain(&coordinate_errors)
        .map(|e| e.to_string())
        .collect();
    let report = json!({
        "status": decoded.status,
        "record": decoded.record,
        "flat": decoded.flat,
        "form": form.with_defaults(),
        "errors": errors,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn edit(config: &EditorConfig, path: &Path, edits: &Path, output: Option<PathBuf>) -> Result<()> {
    let (image, decoded) = load(path)?;
    for err in &decoded.field_errors {
        eprintln!("exifedit: {}", err);
    }

    let patch: toml::Table = toml::from_str(
        &std::fs::read_to_string(edits)
            .with_context(|| format!("read failed for {}", edits.display()))?,
    )
    .with_context(|| format!("invalid TOML in {}", edits.display()))?;

    let (form, coordinate_errors) = FormValues::from_record(&decoded.record);
    for err in &coordinate_errors {
        eprintln!("exifedit: {}; coordinate dropped unless set in the edit file", err);
    }
    let record = form
        .overlay(patch)
        .and_then(|form| form.apply(&decoded.record))
        .context("edit rejected, nothing written")?;

    let little_endian = config
        .effective_byte_order()
        .little_endian(decoded.little_endian());
    let blob = decoded.encode_as(&record, little_endian)?;
    let modified = jpeg::embed_exif(&image, &blob)?;

    let output = output.unwrap_or_else(|| output_path(path, config.output_suffix()));
    std::fs::write(&output, modified)
        .with_context(|| format!("write failed for {}", output.display()))?;
    eprintln!("exifedit: wrote {}", output.display());
    Ok(())
}

fn main() -> Result<()> {
    let config = EditorConfig::load();
    init_logging(&config);

    let mut args = std::env::args().skip(1);
    let command = args.next().context(USAGE)?;
    match command.as_str() {
        "show" => {
            let path = args.next().map(PathBuf::from).context(USAGE)?;
            show(&path)
        }
        "edit" => {
            let path = args.next().map(PathBuf::from).context(USAGE)?;
            let edits = args.next().map(PathBuf::from).context(USAGE)?;
            let output = args.next().map(PathBuf::from);
            edit(&config, &path, &edits, output)
        }
        _ => anyhow::bail!("unknown command `{}`\n{}", command, USAGE),
    }
}

#[cfg(test)]
mod tests {
    use super::output_path;
    use std::path::{Path, PathBuf};

    #[test]
    fn output_sits_next_to_input_with_suffix() {
        assert_eq!(
            output_path(Path::new("/photos/IMG_001.JPG"), "_modified"),
            PathBuf::from("/photos/IMG_001_modified.JPG")
        );
    }

    #[test]
    fn output_defaults_to_jpg_extension() {
        assert_eq!(
            output_path(Path::new("scan"), "-edited"),
            PathBuf::from("scan-edited.jpg")
        );
    }
}
