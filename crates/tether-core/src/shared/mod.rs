//! Shared - strong / weak の参照カウント付きポインタ
//!
//! `std::rc::Rc` を使わず、control block を手で管理します。
//!
//! # 状態遷移（管理対象 1 つにつき）
//! - **Unowned** → 最初の `SharedPtr` で **Owned(1)**
//! - **Owned(n)** → clone / drop で **Owned(n ± 1)**
//! - **Owned(1)** → 最後の drop / reset で **Destroyed**（終端、deleter が一度だけ走る）
//!
//! `WeakPtr` は Owned / Destroyed を観測するだけで、遷移を起こすのは
//! Owned からの `lock()` だけです。
//!
//! # スレッド
//! カウントは atomic ではありません。どちらのハンドルも `Send` / `Sync` ではないので、
//! スレッドをまたいだ共有はコンパイル時に拒否されます。

mod control;
pub mod deleter;
mod shared_ptr;
mod status;
mod upcast;
mod weak_ptr;

pub use self::deleter::{DefaultDelete, Deleter, NoopDelete};
pub use self::shared_ptr::SharedPtr;
pub use self::status::PtrStatus;
pub use self::upcast::Upcast;
pub use self::weak_ptr::WeakPtr;
