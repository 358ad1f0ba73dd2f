use std::path::Path;

use serde::Serialize;

use mmdbforge::fixture;

use crate::{app::GlobalOptions, output::print_output};

#[derive(Debug, Serialize)]
pub struct GenerateResult {
    pub file: String,
    pub bytes: u64,
}

#[derive(Debug, Serialize)]
pub struct GenerateFailure {
    pub file: String,
    pub error: String,
}

/// Write the fixture to `path`.
fn generate(path: &Path) -> Result<GenerateResult, GenerateFailure> {
    let file = path.display().to_string();
    match fixture::generate(path) {
        Ok(bytes) => Ok(GenerateResult { file, bytes }),
        Err(e) => Err(GenerateFailure {
            file,
            error: e.to_string(),
        }),
    }
}

/// Write the fixture to the working directory.
///
/// Failures are reported but do not change the exit status. Without `--json` the fixture has
/// already logged the failing step.
pub fn run(opts: &GlobalOptions) -> anyhow::Result<()> {
    match generate(Path::new(fixture::OUTPUT_FILE)) {
        Ok(result) => print_output(&result, opts, |result| {
            println!("{} has now been created", result.file);
        }),
        Err(failure) => print_output(&failure, opts, |_| {}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_reports_the_written_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(fixture::OUTPUT_FILE);

        let result = generate(&path).unwrap();
        assert_eq!(result.file, path.display().to_string());
        assert_eq!(result.bytes, std::fs::metadata(&path).unwrap().len());
    }

    #[test]
    fn generate_failure_carries_the_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join(fixture::OUTPUT_FILE);

        let failure = generate(&path).unwrap_err();
        assert_eq!(failure.file, path.display().to_string());
        assert!(!failure.error.is_empty());
        assert!(!path.exists());

        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["error"], serde_json::json!(failure.error));
    }
}
