pub mod fastercap;
pub mod fasthenry;
pub mod voxhenry;

pub use fastercap::{read_panels, write_panels, PanelKind, PanelRecord};
pub use fasthenry::{read_fasthenry, FastHenryDeck, FastHenrySummary, NodeId, Segment};
pub use voxhenry::{parse_port_nodes, parse_voxel_records, PortNode, VoxHenryDeck, VoxelRecord};

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use crate::error::{ExportError, Result};

/// Opens `path` for writing, creating missing parent directories.
///
/// # Errors
///
/// Returns [`ExportError::AlreadyExists`] if the file exists and `overwrite`
/// is false, or an I/O error.
pub(crate) fn create_output(path: &Path, overwrite: bool) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(ExportError::from)?;
    }
    if path.exists() && !overwrite {
        return Err(ExportError::AlreadyExists(path.to_path_buf()).into());
    }
    let file = File::create(path).map_err(ExportError::from)?;
    Ok(BufWriter::new(file))
}

/// Labels become single deck tokens: whitespace runs turn into `_`.
pub(crate) fn token(label: &str) -> String {
    label.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Formats a float like C's `%g`: six significant digits, trailing zeros
/// removed, exponent form outside `1e-4 ..= 1e6`.
#[must_use]
pub fn format_g(x: f64) -> String {
    if x == 0.0 || !x.is_finite() {
        return format!("{x}");
    }
    let sci = format!("{x:.5e}");
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let exp: i32 = exp.parse().unwrap_or(0);
    if (-4..6).contains(&exp) {
        let decimals = usize::try_from(5 - exp).unwrap_or(0);
        trim_fraction(&format!("{x:.decimals$}")).to_string()
    } else {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_fraction(mantissa), exp.abs())
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn format_g_matches_printf() {
        assert_eq!(format_g(5.8e7), "5.8e+07");
        assert_eq!(format_g(1e-6), "1e-06");
        assert_eq!(format_g(0.0001), "0.0001");
        assert_eq!(format_g(123_456.0), "123456");
        assert_eq!(format_g(1_234_567.0), "1.23457e+06");
        assert_eq!(format_g(-2.5), "-2.5");
        assert_eq!(format_g(0.0), "0");
        assert_eq!(format_g(999_999.5), "1e+06");
    }

    #[test]
    fn output_refuses_to_clobber() {
        let dir = std::env::temp_dir().join(format!("emvox-out-{}", std::process::id()));
        let path = dir.join("nested").join("deck.vhr");
        let _ = fs::remove_dir_all(&dir);
        drop(create_output(&path, false).unwrap());
        assert!(path.exists());
        let err = create_output(&path, false).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert!(create_output(&path, true).is_ok());
        fs::remove_dir_all(&dir).unwrap();
    }
}
