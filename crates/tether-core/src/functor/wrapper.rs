//! Functor - シグネチャ `R(Args...)` の呼び出し wrapper
//!
//! # 学習ポイント
//! - `Rc<RefCell<dyn Trait + 'a>>` による共有所有権 + 型消去
//! - clone はターゲットを共有する（deep copy しない）
//! - 未初期化の呼び出しは undefined behavior ではなくエラー

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::handler::{FunctorHandler, FunctorImpl, MemHandler};
use super::invoke::{Invoke, InvokeMember, ObjectPtr};
use crate::error::{Result, TetherError};

/// Functor は任意の呼び出し可能な値を 1 つの型に閉じ込める
///
/// # 使用例
/// ```
/// use tether_core::functor::Functor;
///
/// let add: Functor<(i32, i32), i32> = Functor::new(|a: i32, b: i32| a + b);
/// assert_eq!(add.call((2, 3)).unwrap(), 5);
///
/// let copy = add.clone();
/// assert!(copy.ptr_eq(&add));
/// assert_eq!(add.share_count(), 2);
/// ```
///
/// # 寿命 `'a`
/// ターゲットが借用（`&mut T` のオブジェクト、参照を捕捉した closure）を
/// 含む場合、その寿命が `'a` になります。
pub struct Functor<'a, Args, R> {
    target: Option<Rc<RefCell<dyn FunctorImpl<Args, R> + 'a>>>,
}

impl<'a, Args, R> Functor<'a, Args, R> {
    /// ターゲットを持たない wrapper
    pub fn empty() -> Self {
        Self { target: None }
    }

    /// 関数・closure・関数オブジェクトから構築（値として保持）
    pub fn new<F>(fun: F) -> Self
    where
        F: Invoke<Args, R> + 'a,
    {
        Self::from_impl(FunctorHandler::new(fun))
    }

    /// (オブジェクト, メンバ関数) から構築
    ///
    /// `obj` は `&T` / `&mut T` / `Box<T>` / `Rc<RefCell<T>>` のいずれか。
    /// `&self` のメソッドはどれでも、`&mut self` のメソッドは `&T` 以外で束縛できます。
    pub fn from_member<P, M, Mode>(obj: P, fun: M) -> Self
    where
        P: ObjectPtr + 'a,
        M: InvokeMember<P, Args, R, Mode> + 'a,
        Mode: 'a,
    {
        Self::from_impl(MemHandler::new(obj, fun))
    }

    fn from_impl<H>(handler: H) -> Self
    where
        H: FunctorImpl<Args, R> + 'a,
    {
        let target: Rc<RefCell<dyn FunctorImpl<Args, R> + 'a>> = Rc::new(RefCell::new(handler));
        Self {
            target: Some(target),
        }
    }

    /// ターゲットを呼び出す
    ///
    /// # Errors
    /// - `EmptyFunctor`: ターゲット未設定
    /// - `ReentrantCall`: 同じターゲットが実行中（ターゲットの中から自分を呼んだ）
    /// - `ObjectBusy`: `Rc<RefCell<T>>` のオブジェクトが呼び出し側で borrow 中
    pub fn call(&self, args: Args) -> Result<R> {
        let Some(target) = &self.target else {
            tracing::debug!("call on empty functor");
            return Err(TetherError::EmptyFunctor);
        };
        let mut target = target.try_borrow_mut().map_err(|_| {
            tracing::debug!("re-entrant functor call rejected");
            TetherError::ReentrantCall
        })?;
        target.call(args)
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_none()
    }

    /// 同じターゲットを共有している wrapper の数（空なら 0）
    pub fn share_count(&self) -> usize {
        self.target.as_ref().map_or(0, Rc::strong_count)
    }

    /// 2 つの wrapper が同じターゲットを指しているか
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.target, &other.target) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<Args, R> Clone for Functor<'_, Args, R> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
        }
    }
}

impl<Args, R> Default for Functor<'_, Args, R> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<Args, R> fmt::Debug for Functor<'_, Args, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Functor")
            .field("empty", &self.is_empty())
            .field("share_count", &self.share_count())
            .finish()
    }
}
