//! Invoke traits - 呼び出し可能な値とシグネチャ `R(Args...)` の対応付け
//!
//! # 学習ポイント
//! - 可変長ジェネリクスの代わりに tuple (`()`, `(A1,)`, `(A1, A2)`, ...) を使う
//! - `macro_rules!` で arity ごとの blanket impl を生成
//! - Trait のパラメータが異なる impl は重ならない（coherence）

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{Result, TetherError};

/// Invoke は「`Args` を受け取って `R` を返す」呼び出し
///
/// `FnMut(A1, ..) -> R` を満たすもの（closure, 関数, 関数ポインタ,
/// 状態を持つ関数オブジェクト）すべてに実装されています。
pub trait Invoke<Args, R> {
    fn invoke(&mut self, args: Args) -> R;
}

/// メンバ関数のレシーバが `&self`（読み取りのみ）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ByRef;

/// メンバ関数のレシーバが `&mut self`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ByMut;

/// InvokeMember は「オブジェクト + メンバ関数」の呼び出し
///
/// `P` はオブジェクト側（`ObjectPtr`）、`Mode` はレシーバの種類です。
/// - `ByRef`: `FnMut(&T, A1, ..) -> R`（`&self` のメソッド）
/// - `ByMut`: `FnMut(&mut T, A1, ..) -> R`（`&mut self` のメソッド）
///
/// `Mode` は `Type::method` のシグネチャから推論されます。
pub trait InvokeMember<P: ObjectPtr, Args, R, Mode> {
    fn invoke_member(&mut self, obj: &mut P, args: Args) -> Result<R>;
}

macro_rules! impl_invoke {
    ($($arg:ident: $ty:ident),*) => {
        impl<Fun, Ret, $($ty,)*> Invoke<($($ty,)*), Ret> for Fun
        where
            Fun: FnMut($($ty),*) -> Ret,
        {
            fn invoke(&mut self, ($($arg,)*): ($($ty,)*)) -> Ret {
                self($($arg),*)
            }
        }

        impl<Fun, P, Ret, $($ty,)*> InvokeMember<P, ($($ty,)*), Ret, ByRef> for Fun
        where
            P: ObjectPtr,
            Fun: FnMut(&P::Target, $($ty),*) -> Ret,
        {
            fn invoke_member(&mut self, obj: &mut P, ($($arg,)*): ($($ty,)*)) -> Result<Ret> {
                obj.with_target(|target| self(target, $($arg),*))
            }
        }

        impl<Fun, P, Ret, $($ty,)*> InvokeMember<P, ($($ty,)*), Ret, ByMut> for Fun
        where
            P: ObjectPtrMut,
            Fun: FnMut(&mut P::Target, $($ty),*) -> Ret,
        {
            fn invoke_member(&mut self, obj: &mut P, ($($arg,)*): ($($ty,)*)) -> Result<Ret> {
                obj.with_target_mut(|target| self(target, $($arg),*))
            }
        }
    };
}

impl_invoke!();
impl_invoke!(a1: A1);
impl_invoke!(a1: A1, a2: A2);
impl_invoke!(a1: A1, a2: A2, a3: A3);
impl_invoke!(a1: A1, a2: A2, a3: A3, a4: A4);
impl_invoke!(a1: A1, a2: A2, a3: A3, a4: A4, a5: A5);
impl_invoke!(a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6);

/// ObjectPtr はメンバ呼び出しの「オブジェクト側」
///
/// wrapper はオブジェクトの寿命を延ばしません。`&T` / `&mut T` を渡した場合、
/// 寿命は呼び出し側が管理し、borrow checker がそれを保証します。
///
/// `Rc<T>` は `Rc<RefCell<T>>` と impl が重なるので実装していません。
/// 共有オブジェクトは `Rc<RefCell<T>>` で渡します。
pub trait ObjectPtr {
    type Target: ?Sized;

    /// 対象オブジェクトへの `&` を `f` に渡す
    fn with_target<R>(&mut self, f: impl FnOnce(&Self::Target) -> R) -> Result<R>;
}

/// `&mut self` のメソッドも呼べるオブジェクト側
pub trait ObjectPtrMut: ObjectPtr {
    /// 対象オブジェクトへの `&mut` を `f` に渡す
    fn with_target_mut<R>(&mut self, f: impl FnOnce(&mut Self::Target) -> R) -> Result<R>;
}

impl<T: ?Sized> ObjectPtr for &T {
    type Target = T;

    fn with_target<R>(&mut self, f: impl FnOnce(&T) -> R) -> Result<R> {
        Ok(f(*self))
    }
}

impl<T: ?Sized> ObjectPtr for &mut T {
    type Target = T;

    fn with_target<R>(&mut self, f: impl FnOnce(&T) -> R) -> Result<R> {
        Ok(f(&**self))
    }
}

impl<T: ?Sized> ObjectPtrMut for &mut T {
    fn with_target_mut<R>(&mut self, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        Ok(f(&mut **self))
    }
}

impl<T: ?Sized> ObjectPtr for Box<T> {
    type Target = T;

    fn with_target<R>(&mut self, f: impl FnOnce(&T) -> R) -> Result<R> {
        Ok(f(&**self))
    }
}

impl<T: ?Sized> ObjectPtrMut for Box<T> {
    fn with_target_mut<R>(&mut self, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        Ok(f(&mut **self))
    }
}

/// 共有オブジェクト。`RefCell` の borrow 規則に反する呼び出しは `ObjectBusy` を返します。
impl<T: ?Sized> ObjectPtr for Rc<RefCell<T>> {
    type Target = T;

    fn with_target<R>(&mut self, f: impl FnOnce(&T) -> R) -> Result<R> {
        let target = self.try_borrow().map_err(|_| TetherError::ObjectBusy)?;
        Ok(f(&*target))
    }
}

impl<T: ?Sized> ObjectPtrMut for Rc<RefCell<T>> {
    fn with_target_mut<R>(&mut self, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        let mut target = self
            .try_borrow_mut()
            .map_err(|_| TetherError::ObjectBusy)?;
        Ok(f(&mut *target))
    }
}
