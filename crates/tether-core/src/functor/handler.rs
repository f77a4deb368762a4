//! Handler - 型消去された呼び出しターゲット
//!
//! # 学習ポイント
//! - Object-safe trait (FunctorImpl)
//! - Type erasure パターン (FunctorHandler<F> / MemHandler<P, M> → dyn FunctorImpl)
//! - ターゲットの種類は crate 内で閉じている（2 種類のみ）

use std::marker::PhantomData;

use super::invoke::{Invoke, InvokeMember, ObjectPtr};
use crate::error::Result;

/// FunctorImpl はシグネチャ `R(Args...)` だけでパラメータ化された抽象ターゲット
///
/// 具体的な型（closure の型、オブジェクトの型）は実装側に隠れます。
pub(crate) trait FunctorImpl<Args, R> {
    fn call(&mut self, args: Args) -> Result<R>;
}

/// 関数・関数オブジェクト・closure を値として保持する adapter
pub(crate) struct FunctorHandler<F> {
    fun: F,
}

impl<F> FunctorHandler<F> {
    pub(crate) fn new(fun: F) -> Self {
        Self { fun }
    }
}

impl<F, Args, R> FunctorImpl<Args, R> for FunctorHandler<F>
where
    F: Invoke<Args, R>,
{
    fn call(&mut self, args: Args) -> Result<R> {
        Ok(self.fun.invoke(args))
    }
}

/// (オブジェクト, メンバ関数) のペアを保持する adapter
///
/// `Mode` はレシーバの種類（`ByRef` / `ByMut`）で、値としては持ちません。
pub(crate) struct MemHandler<P, M, Mode> {
    obj: P,
    fun: M,
    _mode: PhantomData<fn() -> Mode>,
}

impl<P, M, Mode> MemHandler<P, M, Mode> {
    pub(crate) fn new(obj: P, fun: M) -> Self {
        Self {
            obj,
            fun,
            _mode: PhantomData,
        }
    }
}

impl<P, M, Mode, Args, R> FunctorImpl<Args, R> for MemHandler<P, M, Mode>
where
    P: ObjectPtr,
    M: InvokeMember<P, Args, R, Mode>,
{
    fn call(&mut self, args: Args) -> Result<R> {
        self.fun.invoke_member(&mut self.obj, args)
    }
}
