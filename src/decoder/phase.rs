//! デコード状態の定義

/// デコード状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DecodePhase {
    /// 行待ち
    Line,
    /// 行のデコード完了 (以降のデータはボディ)
    Complete,
}
