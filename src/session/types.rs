/// One open checkout: a claim on bytes `[start, end)` of `filename`, pinned to
/// the ledger version observed when the range was read.
///
/// Invariant: `0 <= start < end <= file size at open`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub filename: String,
    pub start: u64,
    pub end: u64,
    /// Ledger version when the range was read; commits are rejected if any
    /// replica has moved past it since.
    pub version_at_open: i64,
}
