//! Upcast - `SharedPtr<Derived>` → `SharedPtr<Base>` の変換可能性
//!
//! 変換できるかどうかは trait bound (`T: Upcast<U>`) でコンパイル時に決まります。
//! 具体型 → trait object の変換は `impl_upcast!` で宣言します。

use std::ptr::NonNull;

/// `Self` へのポインタを `U` へのポインタに変換できる
///
/// # Safety
/// `upcast` は同じオブジェクトを指すポインタを返すこと
/// （別の allocation や、オブジェクトの外を指してはいけない）。
pub unsafe trait Upcast<U: ?Sized> {
    fn upcast(ptr: NonNull<Self>) -> NonNull<U>;
}

unsafe impl<T: ?Sized> Upcast<T> for T {
    fn upcast(ptr: NonNull<T>) -> NonNull<T> {
        ptr
    }
}

/// 具体型から trait object（または unsized 型）への upcast を宣言する
///
/// ```
/// use tether_core::impl_upcast;
/// use tether_core::shared::SharedPtr;
///
/// trait Shape {
///     fn area(&self) -> f64;
/// }
///
/// struct Square(f64);
///
/// impl Shape for Square {
///     fn area(&self) -> f64 {
///         self.0 * self.0
///     }
/// }
///
/// impl_upcast!(Square => dyn Shape);
///
/// let square = SharedPtr::new(Square(2.0));
/// let shape: SharedPtr<dyn Shape> = square.upcast_ref();
/// assert_eq!(shape.area(), 4.0);
/// assert_eq!(square.use_count(), 2);
/// ```
///
/// 変換は unsized coercion なので、`$to` に coerce できない型を書くとコンパイルエラーになります。
#[macro_export]
macro_rules! impl_upcast {
    ($($from:ty => $to:ty),+ $(,)?) => {
        $(
            unsafe impl $crate::shared::Upcast<$to> for $from {
                fn upcast(ptr: ::core::ptr::NonNull<Self>) -> ::core::ptr::NonNull<$to> {
                    ptr
                }
            }
        )+
    };
}
