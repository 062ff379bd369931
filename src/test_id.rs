//! Stable test identifiers
//!
//! TRX documents link a `UnitTestResult` to its `UnitTest` definition
//! through `testId`/`executionId` GUIDs. When writing a document we derive
//! those ids from the fully qualified test name, so the same test always
//! serializes to the same id and written files diff deterministically
//! across runs.

use uuid::Uuid;

/// Namespace under which test-name ids are generated, to avoid collision
/// with other name-based UUIDs.
const TEST_ID_NAMESPACE: Uuid = Uuid::from_u128(0x9334b516_fb34_4dd9_af0b_3c6f3de2ae1b);

/// Derive a stable 128-bit identifier from a test name.
///
/// The result is a name-based (version 3, MD5) UUID: the same input always
/// yields the same id, across independent process runs. This is not a
/// security boundary, only a repeatable mapping from names to GUIDs.
pub fn stable_test_id(name: &str) -> Uuid {
    Uuid::new_v3(&TEST_ID_NAMESPACE, name.as_bytes())
}
