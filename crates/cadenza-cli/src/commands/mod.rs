//! CLI command implementations.

pub mod info;
pub mod render;

/// Format a linear level as dBFS.
fn dbfs(level: f32) -> String {
    if level > 0.0 {
        format!("{level:.4} ({:.1} dBFS)", 20.0 * level.log10())
    } else {
        "0.0000 (-inf dBFS)".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::dbfs;

    #[test]
    fn levels_in_dbfs() {
        assert_eq!(dbfs(1.0), "1.0000 (0.0 dBFS)");
        assert_eq!(dbfs(0.5), "0.5000 (-6.0 dBFS)");
        assert_eq!(dbfs(0.0), "0.0000 (-inf dBFS)");
    }
}
