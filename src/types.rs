/// Raw column header as it appears in an input file.
/// Example: `"\u{feff}Project "`, `"Issue ID"`
pub type RawHeader = String;
/// Canonical column header after normalization.
/// Examples: `project`, `issueid`, `stacklayer`, `gpu_relevant`
pub type CanonicalHeader = String;
/// Project name attached to every issue row.
/// Examples: `cuda-quantum`, `qiskit-aer`
pub type ProjectName = String;
/// Stable per-project issue identifier.
/// Examples: `1024`, `#88` (opaque text, never parsed as a number)
pub type IssueId = String;
/// Globally unique issue key after merging.
/// Example: `cuda-quantum#1024`
pub type Uid = String;
/// Free-text categorical label after trimming.
/// Examples: `Runtime/Simulator`, `Memory`, `API misuse`
pub type CategoryLabel = String;
/// A single cell value read from an input table (opaque text).
/// Examples: `closed`, `2024-03-01T12:00:00Z`, `X`, ``
pub type CellValue = String;
/// Dataset label used in diagnostics and overview outputs.
/// Examples: `CUDA-Q`, `Qiskit (GPU-relevant)`
pub type DatasetLabel = String;
