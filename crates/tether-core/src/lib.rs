//! tether-core
//!
//! 標準ライブラリが普通は提供する 2 つの実行時プリミティブ。
//!
//! # モジュール構成
//! - **functor**: 型消去された呼び出し wrapper（`Functor<'a, Args, R>`）
//! - **shared**: 手書きの参照カウント（`SharedPtr<T>` / `WeakPtr<T>` + deleter）
//! - **error**: エラー型（`TetherError`）
//!
//! 2 つのモジュールは互いに依存しません。

pub mod error;
pub mod functor;
pub mod shared;

pub use self::error::{Result, TetherError};
pub use self::functor::Functor;
pub use self::shared::{SharedPtr, WeakPtr};
