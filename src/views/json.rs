//! JSON view: the result sequence as a machine-readable array.

use crate::error::Result;
use crate::result_set::TestResultSet;

/// Render the set as a pretty-printed JSON array of result objects, in
/// set order. Absent fields serialize as `null`.
pub fn render(results: &TestResultSet) -> Result<String> {
    Ok(serde_json::to_string_pretty(results.all())?)
}
