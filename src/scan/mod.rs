//! メールのスキャンとトラッカーへの反映
//!
//! 読み込み（mail）→ 分類（classifier）→ 抽出（extract）→ 突き合わせ（reconcile）の順に処理する。

pub mod ats;
pub mod classifier;
pub mod extract;
pub mod mail;
pub mod reconcile;
