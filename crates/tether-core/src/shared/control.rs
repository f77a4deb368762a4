//! Control block - 参照カウントと destruction policy の置き場所
//!
//! Layout: `[Header | value: NonNull<T> | deleter: D]`（1 回の heap 確保）
//!
//! - strong: 生きている `SharedPtr` の数
//! - weak: 生きている `WeakPtr` の数 + 1（値の破棄が終わるまで、strong 側がまとめて 1 つ持つ）
//! - strong が 1 → 0 で値を破棄し deleter を drop、weak が 0 で block を解放
//!
//! weak 側が block を生かし続けるので、最後の `SharedPtr` より長生きした
//! `WeakPtr` が解放済みのカウントを読むことはありません。

use std::any::TypeId;
use std::cell::Cell;
use std::mem::ManuallyDrop;
use std::ptr::NonNull;

use super::deleter::Deleter;

/// 型消去された control block の先頭部分
///
/// 具体型 `ControlBlock<T, D>` への操作は monomorphize された関数ポインタ経由。
pub(crate) struct Header {
    strong: Cell<usize>,
    weak: Cell<usize>,
    /// strong 側がまとめて持つ weak 1 つを、まだ返していないか
    implicit_weak: Cell<bool>,
    deleter_type: TypeId,
    destroy: unsafe fn(NonNull<Header>),
    deallocate: unsafe fn(NonNull<Header>),
    locate_deleter: unsafe fn(NonNull<Header>) -> *const (),
}

#[repr(C)]
struct ControlBlock<T: ?Sized, D> {
    header: Header,
    value: NonNull<T>,
    deleter: ManuallyDrop<D>,
}

/// 1 つのハンドルが指す (control block, 値) の組
///
/// `value` は upcast 後の型で、元の型のポインタは control block 側にあります。
pub(crate) struct Link<T: ?Sized> {
    pub(crate) ctrl: NonNull<Header>,
    pub(crate) value: NonNull<T>,
}

impl<T: ?Sized> Clone for Link<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for Link<T> {}

impl Header {
    /// 値と deleter を持つ control block を確保する（strong = 1, weak = 1）
    pub(crate) fn allocate<T, D>(value: NonNull<T>, deleter: D) -> NonNull<Header>
    where
        T: ?Sized,
        D: Deleter<T> + 'static,
    {
        let block = Box::new(ControlBlock {
            header: Header {
                strong: Cell::new(1),
                weak: Cell::new(1),
                implicit_weak: Cell::new(true),
                deleter_type: TypeId::of::<D>(),
                destroy: destroy_value::<T, D>,
                deallocate: deallocate_block::<T, D>,
                locate_deleter: deleter_ptr::<T, D>,
            },
            value,
            deleter: ManuallyDrop::new(deleter),
        });
        NonNull::from(Box::leak(block)).cast()
    }

    pub(crate) fn strong(&self) -> usize {
        self.strong.get()
    }

    /// 生きている `WeakPtr` の数（strong 側の 1 を除く）
    ///
    /// 値の破棄中は strong == 0 でも implicit weak がまだ残っているので、
    /// strong ではなく `implicit_weak` を見ます。
    pub(crate) fn weak(&self) -> usize {
        self.weak.get() - usize::from(self.implicit_weak.get())
    }

    pub(crate) fn increment_strong(&self) {
        let strong = self.strong.get();
        debug_assert!(strong > 0, "strong count resurrected from zero");
        self.strong.set(strong.checked_add(1).unwrap_or_else(|| std::process::abort()));
    }

    /// strong > 0 のときだけ strong を増やす（weak からの昇格）
    pub(crate) fn try_increment_strong(&self) -> bool {
        if self.strong.get() == 0 {
            return false;
        }
        self.increment_strong();
        true
    }

    pub(crate) fn increment_weak(&self) {
        let weak = self.weak.get();
        self.weak.set(weak.checked_add(1).unwrap_or_else(|| std::process::abort()));
    }

    /// 登録された deleter が `D` なら、そのアドレスを返す
    ///
    /// # Safety
    /// `ctrl` は strong > 0 の control block
    pub(crate) unsafe fn deleter<D: 'static>(ctrl: NonNull<Header>) -> Option<NonNull<D>> {
        // SAFETY: 呼び出し側が ctrl の有効性を保証する。
        let header = unsafe { ctrl.as_ref() };
        if header.deleter_type != TypeId::of::<D>() {
            return None;
        }
        // SAFETY: TypeId が一致したので deleter は D。
        let ptr = unsafe { (header.locate_deleter)(ctrl) };
        NonNull::new(ptr.cast_mut().cast::<D>())
    }
}

/// strong を 1 つ返す。0 になったら値を破棄し、strong 側の weak を返す。
///
/// # Safety
/// 呼び出し側が strong 参照を 1 つ所有していて、これ以降それを使わない。
pub(crate) unsafe fn release_strong(ctrl: NonNull<Header>) {
    let (destroy, last) = {
        // SAFETY: strong 参照を持っているので block は生きている。
        let header = unsafe { ctrl.as_ref() };
        let strong = header.strong.get();
        debug_assert!(strong > 0, "SharedPtr released twice");
        header.strong.set(strong - 1);
        (header.destroy, strong == 1)
    };

    if last {
        tracing::trace!(ctrl = ?ctrl, "strong count reached zero, destroying value");
        // SAFETY: strong が 0 になったのはこの 1 回だけ。implicit weak がまだ block を守っている。
        unsafe {
            destroy(ctrl);
            ctrl.as_ref().implicit_weak.set(false);
            release_weak(ctrl);
        }
    }
}

/// weak を 1 つ返す。0 になったら control block を解放する。
///
/// # Safety
/// 呼び出し側が weak 参照（`WeakPtr` か strong 側の implicit weak）を 1 つ所有している。
pub(crate) unsafe fn release_weak(ctrl: NonNull<Header>) {
    let (deallocate, last) = {
        // SAFETY: weak 参照を持っているので block は生きている。
        let header = unsafe { ctrl.as_ref() };
        let weak = header.weak.get();
        debug_assert!(weak > 0, "WeakPtr released twice");
        header.weak.set(weak - 1);
        (header.deallocate, weak == 1)
    };

    if last {
        tracing::trace!(ctrl = ?ctrl, "control block released");
        // SAFETY: 最後の参照なので誰も block を見ていない。
        unsafe { deallocate(ctrl) };
    }
}

unsafe fn destroy_value<T: ?Sized, D: Deleter<T>>(ctrl: NonNull<Header>) {
    let block = ctrl.cast::<ControlBlock<T, D>>().as_ptr();
    // SAFETY: ctrl は ControlBlock<T, D> として確保されている。strong == 0 なので
    // deleter への参照はどこにも残っていない。
    unsafe {
        let value = (*block).value;
        (*block).deleter.delete(value);
        ManuallyDrop::drop(&mut (*block).deleter);
    }
}

unsafe fn deallocate_block<T: ?Sized, D>(ctrl: NonNull<Header>) {
    // SAFETY: Header::allocate の Box を戻す。deleter は destroy_value で drop 済み。
    drop(unsafe { Box::from_raw(ctrl.cast::<ControlBlock<T, D>>().as_ptr()) });
}

unsafe fn deleter_ptr<T: ?Sized, D>(ctrl: NonNull<Header>) -> *const () {
    let block = ctrl.cast::<ControlBlock<T, D>>().as_ptr();
    // SAFETY: 参照を作らずにフィールドのアドレスだけ取る。
    unsafe { (&raw const (*block).deleter).cast() }
}
