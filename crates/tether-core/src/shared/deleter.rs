//! Deleter - 管理対象の破棄方法（destruction policy）
//!
//! # 学習ポイント
//! - `unsafe fn` を持つ trait（呼び出し側が前提条件を保証する）
//! - closure への blanket impl と具体型の impl の共存

use std::ptr::NonNull;

/// Deleter は「ポインタを受け取って値を正しく破棄する」方法
///
/// `SharedPtr` の strong count が 1 → 0 になった瞬間に一度だけ呼ばれます。
/// `get_deleter::<D>()` で取り出せるよう、登録する deleter は `'static` です。
pub trait Deleter<T: ?Sized> {
    /// # Safety
    /// - `ptr` はハンドル構築時に渡されたポインタそのもの
    /// - 1 つの `ptr` につき最大 1 回しか呼ばれない
    unsafe fn delete(&mut self, ptr: NonNull<T>);
}

/// `Box` 由来のポインタを `Box` に戻して drop する（既定の deleter）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultDelete;

impl<T: ?Sized> Deleter<T> for DefaultDelete {
    unsafe fn delete(&mut self, ptr: NonNull<T>) {
        // SAFETY: DefaultDelete は Box::leak / Box::into_raw 由来のポインタにだけ
        // 結び付けられる（from_box / from_raw の前提条件）。
        drop(unsafe { Box::from_raw(ptr.as_ptr()) });
    }
}

/// 何もしない deleter（所有していないポインタ用）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoopDelete;

impl<T: ?Sized> Deleter<T> for NoopDelete {
    unsafe fn delete(&mut self, _ptr: NonNull<T>) {}
}

impl<T: ?Sized, F> Deleter<T> for F
where
    F: FnMut(NonNull<T>),
{
    unsafe fn delete(&mut self, ptr: NonNull<T>) {
        self(ptr)
    }
}
