//! SharedPtr - 参照カウント付きの所有ハンドル（strong）
//!
//! # 学習ポイント
//! - `NonNull` + `PhantomData` による手書きの共有所有権
//! - Rust の move は bitwise なので、「move 後に空になる」操作は `take()` で表す
//! - 自己代入は borrow checker が禁止するので、同じ control block 同士の `assign` を no-op にする

use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::ptr::NonNull;

use super::control::{self, Header, Link};
use super::deleter::{DefaultDelete, Deleter};
use super::status::PtrStatus;
use super::upcast::Upcast;
use super::weak_ptr::WeakPtr;

/// SharedPtr はヒープ上の値を共有所有する
///
/// # 不変条件
/// - 空のハンドルは control block も値も持たない（`use_count() == 0`）
/// - 値の破棄は strong count が 1 → 0 になった瞬間に一度だけ
///
/// # スレッド
/// カウントは `Cell<usize>` で、`Send` / `Sync` ではありません。
///
/// # 使用例
/// ```
/// use tether_core::shared::SharedPtr;
///
/// let mut a = SharedPtr::new(5_i64);
/// let b = a.clone();
/// assert_eq!(b.use_count(), 2);
///
/// let c = a.take();
/// assert!(a.is_empty());
/// assert_eq!(*c, 5);
/// assert_eq!(c.use_count(), 2);
/// ```
pub struct SharedPtr<T: ?Sized> {
    link: Option<Link<T>>,
    _owns: PhantomData<T>,
}

impl<T> SharedPtr<T> {
    /// 値を box して、既定の deleter で管理する
    pub fn new(value: T) -> Self {
        Self::from_box(Box::new(value))
    }
}

impl<T: ?Sized> SharedPtr<T> {
    /// 何も所有しない空のハンドル
    pub const fn empty() -> Self {
        Self {
            link: None,
            _owns: PhantomData,
        }
    }

    pub fn from_box(value: Box<T>) -> Self {
        Self::with_deleter(value, DefaultDelete)
    }

    /// `value` の破棄を `deleter` に任せる
    ///
    /// `deleter` は `Box` 由来のポインタを受け取ります。解放しなければ leak します。
    pub fn with_deleter<D>(value: Box<T>, deleter: D) -> Self
    where
        D: Deleter<T> + 'static,
    {
        Self::from_parts(NonNull::from(Box::leak(value)), deleter)
    }

    /// raw pointer から構築する。null なら空のハンドル。
    ///
    /// # Safety
    /// `ptr` は null か、`Box::into_raw` で得た他に所有者のいないポインタ。
    pub unsafe fn from_raw(ptr: *mut T) -> Self {
        // SAFETY: 前提条件をそのまま引き継ぐ。
        unsafe { Self::from_raw_with_deleter(ptr, DefaultDelete) }
    }

    /// raw pointer と deleter から構築する。null なら deleter は呼ばれずに drop される。
    ///
    /// # Safety
    /// `ptr` は null か、最後の `SharedPtr` が消えるまで有効で、
    /// `deleter` に一度だけ渡してよいポインタ。
    pub unsafe fn from_raw_with_deleter<D>(ptr: *mut T, deleter: D) -> Self
    where
        D: Deleter<T> + 'static,
    {
        match NonNull::new(ptr) {
            Some(value) => Self::from_parts(value, deleter),
            None => Self::empty(),
        }
    }

    fn from_parts<D>(value: NonNull<T>, deleter: D) -> Self
    where
        D: Deleter<T> + 'static,
    {
        let ctrl = Header::allocate(value, deleter);
        tracing::trace!(ctrl = ?ctrl, "control block allocated");
        Self::from_link(Link { ctrl, value })
    }

    /// strong をすでに 1 つ確保済みの link から構築する
    pub(crate) fn from_link(link: Link<T>) -> Self {
        Self {
            link: Some(link),
            _owns: PhantomData,
        }
    }

    /// weak からの昇格。期限切れなら空のハンドル。
    pub fn from_weak(weak: &WeakPtr<T>) -> Self {
        weak.lock()
    }

    /// 中身を持ち出し、`self` を空にする（count は変わらない）
    pub fn take(&mut self) -> Self {
        std::mem::replace(self, Self::empty())
    }

    /// `other` と所有権を共有する（copy assignment）
    ///
    /// すでに同じ control block を共有しているなら何もしません。
    pub fn assign<U>(&mut self, other: &SharedPtr<U>)
    where
        U: ?Sized + Upcast<T>,
    {
        if self.same_owner(other) {
            return;
        }
        *self = other.upcast_ref();
    }

    /// `other` の所有権を移す（move assignment）。`other` は空になる。
    pub fn assign_take<U>(&mut self, other: &mut SharedPtr<U>)
    where
        U: ?Sized + Upcast<T>,
    {
        self.reset();
        *self = other.take().upcast();
    }

    /// 所有権を手放して空になる
    pub fn reset(&mut self) {
        if let Some(link) = self.link.take() {
            // SAFETY: この link の strong を 1 つ持っていて、take したので二度と使わない。
            unsafe { control::release_strong(link.ctrl) };
        }
    }

    /// 所有権を手放し、`value` を新しく所有する
    pub fn reset_with(&mut self, value: Box<T>) {
        self.reset();
        *self = Self::from_box(value);
    }

    pub fn reset_with_deleter<D>(&mut self, value: Box<T>, deleter: D)
    where
        D: Deleter<T> + 'static,
    {
        self.reset();
        *self = Self::with_deleter(value, deleter);
    }

    /// # Safety
    /// `from_raw` と同じ。
    pub unsafe fn reset_raw(&mut self, ptr: *mut T) {
        // SAFETY: 前提条件をそのまま引き継ぐ。
        unsafe { self.reset_raw_with_deleter(ptr, DefaultDelete) };
    }

    /// 所有権を手放し、`ptr` を `deleter` 付きで新しく所有する。null なら空になる。
    ///
    /// # Safety
    /// `from_raw_with_deleter` と同じ。
    pub unsafe fn reset_raw_with_deleter<D>(&mut self, ptr: *mut T, deleter: D)
    where
        D: Deleter<T> + 'static,
    {
        self.reset();
        // SAFETY: 前提条件をそのまま引き継ぐ。
        *self = unsafe { Self::from_raw_with_deleter(ptr, deleter) };
    }

    pub fn get(&self) -> Option<&T> {
        // SAFETY: strong を持っている間、値は生きている。
        self.link.map(|link| unsafe { &*link.value.as_ptr() })
    }

    /// 唯一の所有者で、weak も無いときだけ `&mut T` を返す
    pub fn get_mut(&mut self) -> Option<&mut T> {
        if self.use_count() != 1 || self.weak_count() != 0 {
            return None;
        }
        // SAFETY: 他に値へ到達できるハンドルが無い。
        self.link.map(|link| unsafe { &mut *link.value.as_ptr() })
    }

    pub fn as_ptr(&self) -> Option<NonNull<T>> {
        self.link.map(|link| link.value)
    }

    pub fn is_empty(&self) -> bool {
        self.link.is_none()
    }

    /// strong count（空なら 0）
    pub fn use_count(&self) -> usize {
        self.header().map_or(0, Header::strong)
    }

    /// 生きている `WeakPtr` の数（空なら 0）
    pub fn weak_count(&self) -> usize {
        self.header().map_or(0, Header::weak)
    }

    /// 同じ control block を共有しているか（型が違っても比較できる）
    pub fn same_owner<U: ?Sized>(&self, other: &SharedPtr<U>) -> bool {
        self.ctrl() == other.ctrl()
    }

    /// 同じ値を指しているか（アドレス比較、空同士は true）
    pub fn ptr_eq<U: ?Sized>(&self, other: &SharedPtr<U>) -> bool {
        match (self.as_ptr(), other.as_ptr()) {
            (Some(a), Some(b)) => a.cast::<()>() == b.cast::<()>(),
            (None, None) => true,
            _ => false,
        }
    }

    /// 登録された deleter が正確に `D` 型なら、その参照を返す
    pub fn get_deleter<D: 'static>(&self) -> Option<&D> {
        let link = self.link?;
        // SAFETY: strong を持っているので deleter はまだ drop されていない。
        let deleter = unsafe { Header::deleter::<D>(link.ctrl) }?;
        // SAFETY: deleter は control block と同じだけ生き、&self の間は strong > 0。
        Some(unsafe { &*deleter.as_ptr() })
    }

    pub fn downgrade(&self) -> WeakPtr<T> {
        match self.link {
            Some(link) => WeakPtr::from_link(link),
            None => WeakPtr::new(),
        }
    }

    /// 変換可能な型のハンドルに変える（count は変わらない）
    pub fn upcast<U>(mut self) -> SharedPtr<U>
    where
        U: ?Sized,
        T: Upcast<U>,
    {
        match self.link.take() {
            Some(link) => SharedPtr::from_link(Link {
                ctrl: link.ctrl,
                value: <T as Upcast<U>>::upcast(link.value),
            }),
            None => SharedPtr::empty(),
        }
    }

    /// 所有権を共有した、変換後の型のハンドルを作る（count + 1）
    pub fn upcast_ref<U>(&self) -> SharedPtr<U>
    where
        U: ?Sized,
        T: Upcast<U>,
    {
        self.clone().upcast()
    }

    pub fn status(&self) -> PtrStatus {
        PtrStatus {
            use_count: self.use_count(),
            weak_count: self.weak_count(),
            expired: self.is_empty(),
        }
    }

    fn header(&self) -> Option<&Header> {
        // SAFETY: strong を持っている間、control block は生きている。
        self.link.map(|link| unsafe { &*link.ctrl.as_ptr() })
    }

    pub(crate) fn ctrl(&self) -> Option<NonNull<Header>> {
        self.link.map(|link| link.ctrl)
    }
}

impl<T: ?Sized> Clone for SharedPtr<T> {
    fn clone(&self) -> Self {
        match self.link {
            Some(link) => {
                // SAFETY: strong を持っているので control block は生きている。
                unsafe { link.ctrl.as_ref() }.increment_strong();
                Self::from_link(link)
            }
            None => Self::empty(),
        }
    }
}

impl<T: ?Sized> Drop for SharedPtr<T> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<T: ?Sized> Default for SharedPtr<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// `operator->` 相当
///
/// # Panics
/// 空のハンドルを deref すると panic します。空かもしれないなら `get()` を使ってください。
impl<T: ?Sized> Deref for SharedPtr<T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self.get() {
            Some(value) => value,
            None => panic!("dereferenced an empty SharedPtr"),
        }
    }
}

impl<T> From<T> for SharedPtr<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: ?Sized> From<Box<T>> for SharedPtr<T> {
    fn from(value: Box<T>) -> Self {
        Self::from_box(value)
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for SharedPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedPtr")
            .field("value", &self.get())
            .field("use_count", &self.use_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::deleter::NoopDelete;
    use rstest::rstest;
    use std::cell::Cell;
    use std::rc::Rc;

    /// drop の回数を数える値
    struct Tracked {
        value: i64,
        drops: Rc<Cell<u32>>,
    }

    impl Tracked {
        fn new(value: i64, drops: &Rc<Cell<u32>>) -> Self {
            Self {
                value,
                drops: drops.clone(),
            }
        }
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    trait Valued {
        fn value(&self) -> i64;
    }

    struct Base {
        value: i64,
        dropped: Rc<Cell<bool>>,
    }

    impl Drop for Base {
        fn drop(&mut self) {
            self.dropped.set(true);
        }
    }

    struct Derived {
        base: Base,
        dropped: Rc<Cell<bool>>,
    }

    impl Derived {
        fn new(value: i64, base_dropped: &Rc<Cell<bool>>, derived_dropped: &Rc<Cell<bool>>) -> Self {
            Self {
                base: Base {
                    value,
                    dropped: base_dropped.clone(),
                },
                dropped: derived_dropped.clone(),
            }
        }
    }

    impl Drop for Derived {
        fn drop(&mut self) {
            self.dropped.set(true);
        }
    }

    impl Valued for Derived {
        fn value(&self) -> i64 {
            self.base.value
        }
    }

    crate::impl_upcast!(Derived => dyn Valued);

    /// テスト用 deleter: 呼ばれたことを記録し、フィールドを外から書き換えられる
    struct TestDeleter {
        field: Rc<Cell<i64>>,
        called: Rc<Cell<bool>>,
    }

    impl Deleter<i64> for TestDeleter {
        unsafe fn delete(&mut self, ptr: NonNull<i64>) {
            self.called.set(true);
            drop(unsafe { Box::from_raw(ptr.as_ptr()) });
        }
    }

    fn flags() -> (Rc<Cell<bool>>, Rc<Cell<bool>>) {
        (Rc::new(Cell::new(false)), Rc::new(Cell::new(false)))
    }

    #[test]
    fn constructors_track_use_count() {
        let ptr1: SharedPtr<i64> = SharedPtr::empty();
        assert_eq!(ptr1.use_count(), 0);

        let ptr2 = SharedPtr::new(3_i64);
        assert_eq!(ptr2.use_count(), 1);

        let mut ptr3 = ptr2.clone();
        assert_eq!(ptr2.use_count(), 2);
        assert_eq!(ptr3.use_count(), 2);
        assert_eq!(*ptr2, 3);
        assert_eq!(*ptr3, 3);

        let ptr4 = ptr3.take();
        assert_eq!(*ptr4, 3);
        assert_eq!(ptr4.use_count(), 2);
        assert_eq!(ptr3.use_count(), 0);
        assert!(ptr3.get().is_none());
    }

    #[test]
    fn null_raw_pointer_yields_empty_handle() {
        let ptr = unsafe { SharedPtr::<i64>::from_raw(std::ptr::null_mut()) };
        assert!(ptr.is_empty());
        assert_eq!(ptr.use_count(), 0);
        assert!(ptr.get_deleter::<DefaultDelete>().is_none());
    }

    #[test]
    fn raw_pointer_is_released_by_default_deleter() {
        let drops = Rc::new(Cell::new(0));
        let raw = Box::into_raw(Box::new(Tracked::new(1, &drops)));
        let ptr = unsafe { SharedPtr::from_raw(raw) };
        assert_eq!(ptr.value, 1);
        assert!(ptr.get_deleter::<DefaultDelete>().is_some());

        drop(ptr);
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn convertible_constructors_share_one_count() {
        let (base_dropped, derived_dropped) = flags();
        let mut ptr5 = SharedPtr::new(Derived::new(5, &base_dropped, &derived_dropped));
        let mut ptr6: SharedPtr<dyn Valued> = ptr5.upcast_ref();

        assert_eq!(ptr5.value(), 5);
        assert_eq!(ptr5.use_count(), 2);
        assert_eq!(ptr6.value(), 5);
        assert_eq!(ptr6.use_count(), 2);
        assert!(ptr5.same_owner(&ptr6));

        let mut ptr7: SharedPtr<dyn Valued> = ptr5.take().upcast();
        assert_eq!(ptr7.value(), 5);
        assert!(ptr5.get().is_none());
        assert_eq!(ptr7.use_count(), 2);
        assert_eq!(ptr5.use_count(), 0);

        ptr7.reset();
        assert!(!derived_dropped.get());
        ptr6.reset();

        assert!(ptr7.get().is_none());
        assert!(ptr6.get().is_none());
        assert_eq!(ptr7.use_count(), 0);
        assert_eq!(ptr6.use_count(), 0);
        assert!(derived_dropped.get());
        assert!(base_dropped.get());
    }

    #[test]
    fn assignment_operators_follow_ownership() {
        let mut ptr1 = SharedPtr::new(5_i64);
        let mut ptr2 = SharedPtr::new(7_i64);
        assert_eq!((ptr1.use_count(), *ptr1), (1, 5));
        assert_eq!((ptr2.use_count(), *ptr2), (1, 7));

        ptr1.assign(&ptr2);
        assert_eq!((ptr1.use_count(), *ptr1), (2, 7));
        assert_eq!((ptr2.use_count(), *ptr2), (2, 7));

        ptr1.assign_take(&mut ptr2);
        assert_eq!((ptr1.use_count(), *ptr1), (1, 7));
        assert_eq!(ptr2.use_count(), 0);
        assert!(ptr2.get().is_none());

        let (base_dropped, derived_dropped) = flags();
        let (base_dropped2, derived_dropped2) = flags();
        let mut ptr5 = SharedPtr::new(Derived::new(5, &base_dropped, &derived_dropped));
        let mut ptr6: SharedPtr<dyn Valued> =
            SharedPtr::from_box(Box::new(Derived::new(42, &base_dropped2, &derived_dropped2)));
        assert_eq!((ptr5.value(), ptr5.use_count()), (5, 1));
        assert_eq!((ptr6.value(), ptr6.use_count()), (42, 1));

        ptr6.assign(&ptr5);
        assert_eq!((ptr5.value(), ptr5.use_count()), (5, 2));
        assert_eq!((ptr6.value(), ptr6.use_count()), (5, 2));
        assert!(base_dropped2.get());
        assert!(derived_dropped2.get());

        ptr6.assign_take(&mut ptr5);
        assert!(ptr5.get().is_none());
        assert_eq!(ptr5.use_count(), 0);
        assert_eq!((ptr6.value(), ptr6.use_count()), (5, 1));

        ptr6.reset();
        assert!(ptr6.get().is_none());
        assert_eq!(ptr6.use_count(), 0);
        assert!(base_dropped.get());
        assert!(derived_dropped.get());
    }

    #[test]
    fn custom_deleter_is_shared_and_called_once() {
        let field = Rc::new(Cell::new(0));
        let called = Rc::new(Cell::new(false));
        let deleter = TestDeleter {
            field: field.clone(),
            called: called.clone(),
        };
        let mut ptr1 = SharedPtr::with_deleter(Box::new(5_i64), deleter);
        let mut ptr2: SharedPtr<i64> = SharedPtr::empty();
        assert_eq!((ptr1.use_count(), *ptr1), (1, 5));

        let found = ptr1.get_deleter::<TestDeleter>().unwrap();
        found.field.set(5);
        assert_eq!(field.get(), 5);

        ptr2.assign(&ptr1);
        assert_eq!((ptr1.use_count(), *ptr1), (2, 5));
        assert_eq!((ptr2.use_count(), *ptr2), (2, 5));

        let found = ptr2.get_deleter::<TestDeleter>().unwrap();
        found.field.set(found.field.get() + 5);
        assert_eq!(field.get(), 10);

        ptr1.reset();
        assert!(!called.get());
        ptr2.reset();
        assert!(called.get());

        assert_eq!(ptr1.use_count(), 0);
        assert!(ptr1.get().is_none());
        assert_eq!(ptr2.use_count(), 0);
        assert!(ptr2.get().is_none());
    }

    #[test]
    fn get_deleter_with_wrong_type_is_none() {
        let ptr = SharedPtr::new(1_u8);
        assert!(ptr.get_deleter::<DefaultDelete>().is_some());
        assert!(ptr.get_deleter::<TestDeleter>().is_none());
        assert!(ptr.get_deleter::<u8>().is_none());
    }

    #[test]
    fn deleter_itself_is_dropped_with_value() {
        let deleter_drops = Rc::new(Cell::new(0));
        let tracker = Tracked::new(0, &deleter_drops);
        let deleter = move |p: NonNull<i64>| {
            let _keep = &tracker;
            drop(unsafe { Box::from_raw(p.as_ptr()) });
        };

        let ptr = SharedPtr::with_deleter(Box::new(1_i64), deleter);
        let weak = ptr.downgrade();
        drop(ptr);

        assert_eq!(deleter_drops.get(), 1);
        assert!(weak.expired());
    }

    #[test]
    fn self_assignment_is_a_no_op() {
        let drops = Rc::new(Cell::new(0));
        let mut h = SharedPtr::new(Tracked::new(3, &drops));
        let alias = h.clone();

        h.assign(&alias);
        assert_eq!(h.use_count(), 2);
        drop(alias);

        h = h.clone();
        assert_eq!(h.use_count(), 1);
        assert_eq!(h.value, 3);
        assert_eq!(drops.get(), 0);
    }

    #[test]
    fn copy_move_reset_scenario_destroys_once() {
        let drops = Rc::new(Cell::new(0));
        let mut a = SharedPtr::new(Tracked::new(5, &drops));
        assert_eq!(a.use_count(), 1);

        let mut b = a.clone();
        assert_eq!((a.use_count(), b.use_count()), (2, 2));

        let mut c = b.take();
        assert_eq!(c.use_count(), 2);
        assert_eq!(b.use_count(), 0);
        assert!(b.get().is_none());

        a.reset();
        assert_eq!(drops.get(), 0);
        c.reset();
        assert_eq!(drops.get(), 1);
    }

    #[rstest]
    #[case::single(1)]
    #[case::few(3)]
    #[case::many(32)]
    fn use_count_equals_live_handles(#[case] copies: usize) {
        let drops = Rc::new(Cell::new(0));
        let root = SharedPtr::new(Tracked::new(0, &drops));
        let mut family: Vec<SharedPtr<Tracked>> = (1..copies).map(|_| root.clone()).collect();
        assert_eq!(root.use_count(), copies);

        while let Some(handle) = family.pop() {
            assert_eq!(handle.use_count(), family.len() + 2);
        }
        assert_eq!(root.use_count(), 1);
        assert_eq!(drops.get(), 0);

        drop(root);
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn reset_with_replaces_the_value() {
        let drops = Rc::new(Cell::new(0));
        let mut ptr = SharedPtr::new(Tracked::new(1, &drops));
        ptr.reset_with(Box::new(Tracked::new(2, &drops)));
        assert_eq!(drops.get(), 1);
        assert_eq!((ptr.value, ptr.use_count()), (2, 1));

        ptr.reset_with_deleter(Box::new(Tracked::new(3, &drops)), BoxDelete);
        assert_eq!(drops.get(), 2);
        assert!(ptr.get_deleter::<BoxDelete>().is_some());
    }

    /// `Tracked` 専用の deleter（reset_with_deleter 用）
    struct BoxDelete;

    impl Deleter<Tracked> for BoxDelete {
        unsafe fn delete(&mut self, ptr: NonNull<Tracked>) {
            drop(unsafe { Box::from_raw(ptr.as_ptr()) });
        }
    }

    #[test]
    fn get_mut_requires_exclusive_ownership() {
        let mut ptr = SharedPtr::new(1_i64);
        *ptr.get_mut().unwrap() += 1;
        assert_eq!(*ptr, 2);

        let other = ptr.clone();
        assert!(ptr.get_mut().is_none());
        drop(other);

        let weak = ptr.downgrade();
        assert!(ptr.get_mut().is_none());
        drop(weak);
        assert!(ptr.get_mut().is_some());
    }

    #[test]
    #[should_panic(expected = "empty SharedPtr")]
    fn deref_of_empty_handle_panics() {
        let ptr: SharedPtr<i64> = SharedPtr::default();
        let _value: i64 = *ptr;
    }

    #[test]
    fn status_reports_counts() {
        let ptr = SharedPtr::new(0_u8);
        let _weak = ptr.downgrade();
        assert_eq!(
            ptr.status(),
            PtrStatus {
                use_count: 1,
                weak_count: 1,
                expired: false
            }
        );
        assert_eq!(
            SharedPtr::<u8>::empty().status(),
            PtrStatus {
                use_count: 0,
                weak_count: 0,
                expired: true
            }
        );
    }

    #[test]
    fn ptr_eq_compares_value_addresses() {
        let a = SharedPtr::new(String::from("a"));
        let b = a.clone();
        let other = SharedPtr::new(String::from("a"));

        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&other));
        assert!(!a.ptr_eq(&SharedPtr::<String>::empty()));
        assert!(SharedPtr::<u8>::empty().ptr_eq(&SharedPtr::<String>::empty()));
    }

    /// 呼び出し回数と drop 回数を数える deleter
    struct CountingDelete {
        calls: Rc<Cell<u32>>,
        drops: Rc<Cell<u32>>,
    }

    impl CountingDelete {
        fn new(calls: &Rc<Cell<u32>>, drops: &Rc<Cell<u32>>) -> Self {
            Self {
                calls: calls.clone(),
                drops: drops.clone(),
            }
        }
    }

    impl Deleter<Tracked> for CountingDelete {
        unsafe fn delete(&mut self, ptr: NonNull<Tracked>) {
            self.calls.set(self.calls.get() + 1);
            drop(unsafe { Box::from_raw(ptr.as_ptr()) });
        }
    }

    impl Drop for CountingDelete {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    fn counters() -> (Rc<Cell<u32>>, Rc<Cell<u32>>, Rc<Cell<u32>>) {
        (Rc::new(Cell::new(0)), Rc::new(Cell::new(0)), Rc::new(Cell::new(0)))
    }

    #[test]
    fn raw_pointer_with_deleter_runs_it_once() {
        let (values, calls, deleter_drops) = counters();
        let raw = Box::into_raw(Box::new(Tracked::new(9, &values)));
        let deleter = CountingDelete::new(&calls, &deleter_drops);
        let ptr = unsafe { SharedPtr::from_raw_with_deleter(raw, deleter) };
        let copy = ptr.clone();

        assert_eq!(copy.value, 9);
        assert!(copy.get_deleter::<CountingDelete>().is_some());
        assert!(copy.get_deleter::<DefaultDelete>().is_none());

        drop(ptr);
        assert_eq!(calls.get(), 0);
        drop(copy);
        assert_eq!((values.get(), calls.get(), deleter_drops.get()), (1, 1, 1));
    }

    #[test]
    fn null_raw_pointer_drops_deleter_without_calling_it() {
        let (_, calls, deleter_drops) = counters();
        let ptr = unsafe {
            SharedPtr::<Tracked>::from_raw_with_deleter(
                std::ptr::null_mut(),
                CountingDelete::new(&calls, &deleter_drops),
            )
        };

        assert!(ptr.is_empty());
        assert_eq!(ptr.use_count(), 0);
        assert!(ptr.get_deleter::<CountingDelete>().is_none());
        assert_eq!((calls.get(), deleter_drops.get()), (0, 1));
    }

    #[test]
    fn reset_raw_replaces_and_clears_ownership() {
        let (values, _, _) = counters();
        let mut ptr = SharedPtr::new(Tracked::new(1, &values));
        let weak = ptr.downgrade();

        unsafe { ptr.reset_raw(Box::into_raw(Box::new(Tracked::new(2, &values)))) };
        assert_eq!(values.get(), 1);
        assert!(weak.expired());
        assert_eq!(ptr.value, 2);
        assert_eq!(ptr.use_count(), 1);
        assert!(ptr.get_deleter::<DefaultDelete>().is_some());

        unsafe { ptr.reset_raw(std::ptr::null_mut()) };
        assert!(ptr.is_empty());
        assert_eq!(values.get(), 2);
    }

    #[test]
    fn reset_raw_with_deleter_installs_new_policy() {
        let (values, calls, deleter_drops) = counters();
        let mut ptr = SharedPtr::new(Tracked::new(1, &values));

        let raw = Box::into_raw(Box::new(Tracked::new(2, &values)));
        let deleter = CountingDelete::new(&calls, &deleter_drops);
        unsafe { ptr.reset_raw_with_deleter(raw, deleter) };
        assert_eq!(values.get(), 1);
        assert_eq!(ptr.value, 2);
        assert!(ptr.get_deleter::<CountingDelete>().is_some());

        ptr.reset();
        assert_eq!((values.get(), calls.get(), deleter_drops.get()), (2, 1, 1));
    }

    #[test]
    fn noop_delete_leaves_borrowed_value_alone() {
        let (values, _, _) = counters();
        let mut value = Tracked::new(5, &values);
        {
            let raw: *mut Tracked = &mut value;
            let ptr = unsafe { SharedPtr::from_raw_with_deleter(raw, NoopDelete) };
            let copy = ptr.clone();
            assert_eq!(copy.value, 5);
            assert_eq!(copy.get_deleter::<NoopDelete>(), Some(&NoopDelete));
            assert!(copy.get_deleter::<DefaultDelete>().is_none());
        }
        assert_eq!(values.get(), 0);
        value.value += 1;
        assert_eq!(value.value, 6);
    }
}
