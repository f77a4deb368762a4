//! Functor - 型消去された呼び出し wrapper
//!
//! 関数・関数オブジェクト・closure・(オブジェクト, メンバ関数) を
//! 1 つのシグネチャ `R(Args...)` の後ろに隠します。
//!
//! # 二層構造
//! - **表層**: `Functor<'a, Args, R>` - 小さく clone しやすい値
//! - **内部**: `FunctorImpl<Args, R>` - object-safe, type erasure
//!
//! `Args` は tuple で表します（`()`, `(A1,)`, `(A1, A2)`, ... 最大 6 個）。

pub mod invoke;
mod handler;
mod wrapper;

pub use self::invoke::{ByMut, ByRef, Invoke, InvokeMember, ObjectPtr, ObjectPtrMut};
pub use self::wrapper::Functor;
