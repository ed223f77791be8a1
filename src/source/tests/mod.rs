
use super::*;
use crate::test_utils::*;
use tempfile::tempdir;

/// Reader that fails every read, for exercising the degrade path.
pub struct BrokenReader;

impl SourceReader for BrokenReader {
    fn read(&self, path: &Path) -> Result<SourceRecord> {
        Err(Error::Schema(format!("cannot decode {}", path.display())))
    }
}
